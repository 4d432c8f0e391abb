use std::path::Path;

use anyhow::Result;
use geo::{Geometry, MultiPolygon, Point};
use serde_json::json;

use crate::{error::ScoreError, records::{Cell, Record, SpatialRecordSet}};

/// Geometry operations the scoring core consumes as black boxes.
///
/// Implementations own any engine setup they need; the pipeline only holds
/// a reference to one and never initializes global state.
pub trait GeometryBackend {
    /// Rectangular grid over `boundary`, clipped to it, with spacing in metres.
    fn make_grid(&self, boundary: &MultiPolygon<f64>, h_spacing_m: f64, v_spacing_m: f64, region: &str) -> Result<Vec<Cell>>;

    fn centroid_of(&self, geometry: &MultiPolygon<f64>) -> Option<Point<f64>>;

    /// Statistics of the raster at `raster` inside every cell.
    fn zonal_stats(&self, raster: &Path, cells: &[Cell]) -> Result<Vec<ZonalResult>>;

    /// Overlay cells with land-cover polygons.
    fn intersect(&self, cells: &[Cell], land: &[LandFeature]) -> Result<Vec<LandFragment>>;
}

/// Raster statistics of one cell. `mean` is `None` when no valid pixel
/// falls inside the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalResult {
    pub cell_id: String,
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
}

impl ZonalResult {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(&self.cell_id);
        record.set("cell_id", json!(self.cell_id))
            .set("count", json!(self.count))
            .set("sum", json!(self.sum))
            .set("mean", json!(self.mean));
        record
    }

    /// Unparseable or non-finite statistics read as missing.
    pub fn from_record(record: &Record) -> Self {
        Self {
            cell_id: record.str("cell_id").unwrap_or_else(|| record.id.clone()),
            count: record.f64("count").map_or(0, |c| c.max(0.0) as usize),
            sum: record.f64("sum").unwrap_or(0.0),
            mean: record.f64("mean"),
        }
    }

    pub fn from_records(set: &SpatialRecordSet) -> Result<Vec<Self>> {
        set.require_columns(&["mean"])?;
        Ok(set.iter().map(Self::from_record).collect())
    }
}

/// A land-cover polygon labelled with its class.
#[derive(Debug, Clone, PartialEq)]
pub struct LandFeature {
    pub id: String,
    pub class: String,
    pub geometry: MultiPolygon<f64>,
}

impl LandFeature {
    pub fn from_record(record: &Record, table: &str) -> Result<Self> {
        let class = record.str("fclass").ok_or_else(|| ScoreError::schema(table, "fclass"))?;
        let geometry = match &record.geometry {
            Some(Geometry::MultiPolygon(mp)) => mp.clone(),
            Some(Geometry::Polygon(p)) => MultiPolygon(vec![p.clone()]),
            _ => return Err(ScoreError::schema(table, "geometry").into()),
        };
        Ok(Self { id: record.id.clone(), class, geometry })
    }

    pub fn from_records(set: &SpatialRecordSet) -> Result<Vec<Self>> {
        set.iter().map(|r| Self::from_record(r, set.name())).collect()
    }
}

/// The overlap of one cell with one land-cover polygon. Areas in km².
#[derive(Debug, Clone, PartialEq)]
pub struct LandFragment {
    pub cell_id: String,
    pub class: String,
    pub fragment_area: f64,
    pub cell_area: f64,
    pub ratio: f64,
}

impl LandFragment {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(&self.cell_id);
        record.set("cell_id", json!(self.cell_id))
            .set("fclass", json!(self.class))
            .set("fragment_area", json!(self.fragment_area))
            .set("cell_area", json!(self.cell_area))
            .set("ratio", json!(self.ratio));
        record
    }

    pub fn from_record(record: &Record, table: &str) -> Result<Self> {
        let cell_id = record.str("cell_id").ok_or_else(|| ScoreError::schema(table, "cell_id"))?;
        let class = record.str("fclass").ok_or_else(|| ScoreError::schema(table, "fclass"))?;
        let ratio = record.f64("ratio").ok_or_else(|| ScoreError::schema(table, "ratio"))?;
        Ok(Self {
            cell_id,
            class,
            fragment_area: record.f64("fragment_area").unwrap_or(f64::NAN),
            cell_area: record.f64("cell_area").unwrap_or(f64::NAN),
            ratio,
        })
    }

    pub fn from_records(set: &SpatialRecordSet) -> Result<Vec<Self>> {
        set.iter().map(|r| Self::from_record(r, set.name())).collect()
    }
}
