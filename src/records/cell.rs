use anyhow::Result;
use geo::{Geometry, MultiPolygon};
use serde_json::json;

use crate::{error::ScoreError, geom, records::{Record, SpatialRecordSet}};

/// One grid parcel under evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub cell_id: String,
    pub region_name: String,
    pub geometry: MultiPolygon<f64>,
    /// Area in km².
    pub area: f64,
    /// Perimeter in km.
    pub perimeter: f64,
}

impl Cell {
    /// Build a cell, measuring area and perimeter from the lon/lat geometry.
    pub fn new(cell_id: impl Into<String>, region_name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            cell_id: cell_id.into(),
            region_name: region_name.into(),
            area: geom::area_km2(&geometry),
            perimeter: geom::perimeter_km(&geometry),
            geometry,
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new(&self.cell_id)
            .with_geometry(self.geometry.clone());
        record.set("cell_id", json!(self.cell_id))
            .set("region_name", json!(self.region_name))
            .set("area", json!(self.area))
            .set("perimeter", json!(self.perimeter));
        record
    }

    /// Rebuild a cell from a grid record. Area and perimeter are recomputed
    /// when the record does not carry them.
    pub fn from_record(record: &Record, table: &str) -> Result<Self> {
        let geometry = match &record.geometry {
            Some(Geometry::MultiPolygon(mp)) => mp.clone(),
            Some(Geometry::Polygon(p)) => MultiPolygon(vec![p.clone()]),
            _ => return Err(ScoreError::schema(table, "geometry").into()),
        };
        let mut cell = Self::new(&record.id, record.str("region_name").unwrap_or_default(), geometry);
        if let Some(area) = record.f64("area") { cell.area = area }
        if let Some(perimeter) = record.f64("perimeter") { cell.perimeter = perimeter }
        Ok(cell)
    }

    /// Read all cells of a grid table.
    pub fn from_records(set: &SpatialRecordSet) -> Result<Vec<Self>> {
        set.iter().map(|r| Self::from_record(r, set.name())).collect()
    }
}
