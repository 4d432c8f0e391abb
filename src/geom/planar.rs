use std::path::Path;

use anyhow::{Result, ensure};
use geo::{BooleanOps, BoundingRect, Centroid, Contains, MultiPolygon, Point, Rect, coord};
use rstar::RTree;
use tracing::debug;

use crate::{
    geom::{AsciiGrid, GeometryBackend, KM_PER_DEGREE, LandFeature, LandFragment, ZonalResult, area_km2, bbox::BoundingBox},
    records::Cell,
};

/// Backend over lon/lat geometries using `geo` boolean ops and ESRI ASCII
/// grid rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarBackend;

impl PlanarBackend {
    pub fn new() -> Self { Self }
}

impl GeometryBackend for PlanarBackend {
    fn make_grid(&self, boundary: &MultiPolygon<f64>, h_spacing_m: f64, v_spacing_m: f64, region: &str) -> Result<Vec<Cell>> {
        ensure!(h_spacing_m > 0.0 && v_spacing_m > 0.0, "grid spacing must be positive");
        let Some(bounds) = boundary.bounding_rect() else { return Ok(Vec::new()) };

        // Convert metre spacing to degrees at the boundary's mid latitude.
        let mid_lat = (bounds.min().y + bounds.max().y) / 2.0;
        let dy = v_spacing_m / 1000.0 / KM_PER_DEGREE;
        let dx = h_spacing_m / 1000.0 / (KM_PER_DEGREE * mid_lat.to_radians().cos().max(1e-6));

        let nrows = ((bounds.height() / dy).ceil() as usize).max(1);
        let ncols = ((bounds.width() / dx).ceil() as usize).max(1);

        let mut cells = Vec::new();
        for row in 0..nrows {
            let top = bounds.max().y - row as f64 * dy;
            for col in 0..ncols {
                let left = bounds.min().x + col as f64 * dx;
                let tile = Rect::new(coord! { x: left, y: top - dy }, coord! { x: left + dx, y: top }).to_polygon();

                let clipped = if boundary.contains(&tile) {
                    MultiPolygon(vec![tile])
                } else {
                    boundary.intersection(&MultiPolygon(vec![tile]))
                };
                if clipped.0.is_empty() || area_km2(&clipped) <= 0.0 { continue }

                cells.push(Cell::new(format!("{region}_{}", cells.len()), region, clipped));
            }
        }

        debug!(region, rows = nrows, cols = ncols, cells = cells.len(), "grid generated");
        Ok(cells)
    }

    fn centroid_of(&self, geometry: &MultiPolygon<f64>) -> Option<Point<f64>> {
        geometry.centroid()
    }

    /// Pixels count toward a cell when their centre lies inside it.
    fn zonal_stats(&self, raster: &Path, cells: &[Cell]) -> Result<Vec<ZonalResult>> {
        let grid = AsciiGrid::read(raster)?;
        Ok(cells.iter().map(|cell| {
            let (mut count, mut sum) = (0usize, 0.0);
            if let Some(rect) = cell.geometry.bounding_rect() {
                for (centre, value) in grid.pixels_in(&rect) {
                    if cell.geometry.contains(&centre) {
                        count += 1;
                        sum += value;
                    }
                }
            }
            ZonalResult {
                cell_id: cell.cell_id.clone(),
                count,
                sum,
                mean: (count > 0).then(|| sum / count as f64),
            }
        }).collect())
    }

    fn intersect(&self, cells: &[Cell], land: &[LandFeature]) -> Result<Vec<LandFragment>> {
        let rtree = RTree::bulk_load(
            land.iter().enumerate()
                .filter_map(|(i, feature)| feature.geometry.bounding_rect().map(|r| BoundingBox::new(i, r)))
                .collect()
        );

        let mut fragments = Vec::new();
        for cell in cells {
            let Some(rect) = cell.geometry.bounding_rect() else { continue };
            let cell_area = area_km2(&cell.geometry);
            if cell_area <= 0.0 { continue }

            let mut candidates = rtree.locate_in_envelope_intersecting(&BoundingBox::envelope_of(&rect))
                .map(BoundingBox::idx)
                .collect::<Vec<_>>();
            candidates.sort_unstable();

            for i in candidates {
                let overlap = cell.geometry.intersection(&land[i].geometry);
                let fragment_area = area_km2(&overlap);
                if fragment_area <= 0.0 { continue }
                fragments.push(LandFragment {
                    cell_id: cell.cell_id.clone(),
                    class: land[i].class.clone(),
                    fragment_area,
                    cell_area,
                    ratio: (fragment_area / cell_area).min(1.0),
                });
            }
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{Area, Polygon};

    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
    }

    #[test]
    fn grid_covers_boundary_in_row_major_order() {
        // 0.02 degrees ~ 2.2 km at the equator; 1 km spacing gives 3 x 3 tiles.
        let boundary = square(0.0, 0.0, 0.02, 0.02);
        let cells = PlanarBackend.make_grid(&boundary, 1000.0, 1000.0, "r").unwrap();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0].cell_id, "r_0");
        assert_eq!(cells[8].cell_id, "r_8");
        assert!(cells[0].geometry.bounding_rect().unwrap().max().y > cells[3].geometry.bounding_rect().unwrap().max().y);

        let covered = cells.iter().map(|c| c.geometry.unsigned_area()).sum::<f64>();
        assert_abs_diff_eq!(covered, boundary.unsigned_area(), epsilon = 1e-9);
        assert!(cells.iter().all(|c| c.region_name == "r" && c.area > 0.0));
    }

    #[test]
    fn triangle_boundary_clips_cells() {
        let triangle = MultiPolygon(vec![Polygon::new(
            vec![(0.0, 0.0), (0.02, 0.0), (0.0, 0.02), (0.0, 0.0)].into(),
            vec![],
        )]);
        let cells = PlanarBackend.make_grid(&triangle, 1000.0, 1000.0, "t").unwrap();
        assert!(cells.len() < 9);
        let covered = cells.iter().map(|c| c.geometry.unsigned_area()).sum::<f64>();
        assert_abs_diff_eq!(covered, triangle.unsigned_area(), epsilon = 1e-9);
    }

    #[test]
    fn zonal_stats_count_pixel_centres() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dni.asc");
        std::fs::write(&path, "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -1\n1 2\n3 -1\n").unwrap();

        let cells = vec![
            Cell::new("a", "r", square(0.0, 0.0, 2.0, 2.0)),
            Cell::new("b", "r", square(1.0, 0.0, 2.0, 1.0)),
            Cell::new("c", "r", square(5.0, 5.0, 6.0, 6.0)),
        ];
        let stats = PlanarBackend.zonal_stats(&path, &cells).unwrap();
        assert_eq!(stats[0], ZonalResult { cell_id: "a".into(), count: 3, sum: 6.0, mean: Some(2.0) });
        assert_eq!(stats[1].count, 0);
        assert_eq!(stats[1].mean, None);
        assert_eq!(stats[2].mean, None);
    }

    #[test]
    fn intersect_reports_ratio_per_land_polygon() {
        let cells = vec![Cell::new("a", "r", square(0.0, 0.0, 0.01, 0.01))];
        let land = vec![
            LandFeature { id: "1".into(), class: "grass".into(), geometry: square(0.0, 0.0, 0.005, 0.01) },
            LandFeature { id: "2".into(), class: "forest".into(), geometry: square(0.005, 0.0, 0.02, 0.01) },
            LandFeature { id: "3".into(), class: "farmland".into(), geometry: square(1.0, 1.0, 2.0, 2.0) },
        ];
        let fragments = PlanarBackend.intersect(&cells, &land).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].class, "grass");
        assert_abs_diff_eq!(fragments[0].ratio, 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(fragments[1].ratio, 0.5, epsilon = 1e-4);
    }
}
