//! ESRI ASCII grid rasters.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail, ensure};
use geo::{Point, Rect};
use ndarray::Array2;

/// A north-up raster read from an ESRI ASCII grid (`.asc`) file.
#[derive(Debug, Clone)]
pub struct AsciiGrid {
    /// Lower-left corner of the lower-left pixel.
    xll: f64,
    yll: f64,
    cellsize: f64,
    nodata: Option<f64>,
    /// Row 0 is the northernmost row.
    values: Array2<f64>,
}

impl AsciiGrid {
    #[inline] pub fn nrows(&self) -> usize { self.values.nrows() }

    #[inline] pub fn ncols(&self) -> usize { self.values.ncols() }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("[raster] Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("[raster] Failed to parse {}", path.display()))
    }

    /// Parse the header (`ncols`, `nrows`, `xllcorner|xllcenter`,
    /// `yllcorner|yllcenter`, `cellsize`, optional `NODATA_value`) and the
    /// row-major body.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace().peekable();
        let (mut ncols, mut nrows, mut cellsize, mut nodata) = (None, None, None, None);
        let (mut xll, mut yll, mut centered) = (None, None, false);

        while let Some(key) = tokens.peek().filter(|t| t.starts_with(|c: char| c.is_ascii_alphabetic())) {
            let key = key.to_ascii_lowercase();
            tokens.next();
            let value: f64 = tokens.next()
                .ok_or_else(|| anyhow!("header key {key} has no value"))?
                .parse()
                .with_context(|| format!("header key {key}"))?;
            match key.as_str() {
                "ncols" => ncols = Some(value as usize),
                "nrows" => nrows = Some(value as usize),
                "xllcorner" => xll = Some(value),
                "yllcorner" => yll = Some(value),
                "xllcenter" => { xll = Some(value); centered = true }
                "yllcenter" => { yll = Some(value); centered = true }
                "cellsize" => cellsize = Some(value),
                "nodata_value" => nodata = Some(value),
                other => bail!("unknown header key {other}"),
            }
        }

        let ncols = ncols.ok_or_else(|| anyhow!("missing ncols"))?;
        let nrows = nrows.ok_or_else(|| anyhow!("missing nrows"))?;
        let cellsize = cellsize.ok_or_else(|| anyhow!("missing cellsize"))?;
        let (mut xll, mut yll) = (xll.ok_or_else(|| anyhow!("missing xllcorner"))?, yll.ok_or_else(|| anyhow!("missing yllcorner"))?);
        ensure!(cellsize > 0.0, "cellsize must be positive");
        if centered {
            xll -= cellsize / 2.0;
            yll -= cellsize / 2.0;
        }

        let body = tokens.map(|t| t.parse::<f64>().with_context(|| format!("bad pixel value {t:?}")))
            .collect::<Result<Vec<_>>>()?;
        ensure!(body.len() == nrows * ncols, "expected {} pixels, found {}", nrows * ncols, body.len());
        let values = Array2::from_shape_vec((nrows, ncols), body)?;

        Ok(Self { xll, yll, cellsize, nodata, values })
    }

    fn is_valid(&self, v: f64) -> bool {
        v.is_finite() && self.nodata.is_none_or(|nd| v != nd)
    }

    /// Centre point of pixel `(row, col)`.
    pub fn pixel_centre(&self, row: usize, col: usize) -> Point<f64> {
        Point::new(
            self.xll + (col as f64 + 0.5) * self.cellsize,
            self.yll + ((self.nrows() - row) as f64 - 0.5) * self.cellsize,
        )
    }

    /// Valid pixels whose centres fall inside `rect` (inclusive).
    pub fn pixels_in(&self, rect: &Rect<f64>) -> impl Iterator<Item = (Point<f64>, f64)> + '_ {
        let ymax = self.yll + self.nrows() as f64 * self.cellsize;
        let span = |lo: f64, hi: f64, n: usize| {
            let first = (lo / self.cellsize - 0.5).ceil().max(0.0) as usize;
            let last = ((hi / self.cellsize - 0.5).floor() + 1.0).clamp(0.0, n as f64) as usize;
            first..last.max(first)
        };
        let cols = span(rect.min().x - self.xll, rect.max().x - self.xll, self.ncols());
        let rows = span(ymax - rect.max().y, ymax - rect.min().y, self.nrows());

        rows.flat_map(move |r| cols.clone().map(move |c| (r, c)))
            .filter_map(|(r, c)| {
                let v = self.values[[r, c]];
                self.is_valid(v).then(|| (self.pixel_centre(r, c), v))
            })
    }
}
