use anyhow::Result;
use geo::{Geometry, Point};
use serde_json::json;

use crate::{error::ScoreError, records::{Record, SpatialRecordSet}};

/// A representative point of a cell or facility, x = longitude, y = latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self { id: id.into(), x, y }
    }

    #[inline] pub fn point(&self) -> Point<f64> { Point::new(self.x, self.y) }

    /// Read coordinates from the `x`/`y` columns, falling back to a Point
    /// geometry. Neither present is a `Schema` error naming the column.
    pub fn from_record(record: &Record, table: &str) -> Result<Self> {
        let from_geometry = match &record.geometry {
            Some(Geometry::Point(p)) => Some((p.x(), p.y())),
            _ => None,
        };
        let x = record.f64("x").or(from_geometry.map(|(x, _)| x))
            .ok_or_else(|| ScoreError::schema(table, "x"))?;
        let y = record.f64("y").or(from_geometry.map(|(_, y)| y))
            .ok_or_else(|| ScoreError::schema(table, "y"))?;
        Ok(Self::new(&record.id, x, y))
    }

    pub fn from_records(set: &SpatialRecordSet) -> Result<Vec<Self>> {
        set.iter().map(|r| Self::from_record(r, set.name())).collect()
    }

    /// Serialize with `id_column` holding the identifier.
    pub fn to_record(&self, id_column: &str) -> Record {
        let mut record = Record::new(&self.id).with_geometry(self.point());
        record.set(id_column, json!(self.id))
            .set("x", json!(self.x))
            .set("y", json!(self.y));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_from_columns_win_over_geometry() {
        let mut record = Record::new("f1").with_geometry(Point::new(9.0, 9.0));
        record.set("x", 1.0).set("y", 2.0);
        assert_eq!(Centroid::from_record(&record, "t").unwrap(), Centroid::new("f1", 1.0, 2.0));
    }

    #[test]
    fn coordinates_fall_back_to_point_geometry() {
        let record = Record::new("f1").with_geometry(Point::new(17.0, 51.1));
        assert_eq!(Centroid::from_record(&record, "t").unwrap(), Centroid::new("f1", 17.0, 51.1));
    }

    #[test]
    fn missing_coordinates_name_the_column() {
        let mut record = Record::new("f1");
        record.set("x", 1.0);
        let err = Centroid::from_record(&record, "dso_facilities").unwrap_err();
        match err.downcast_ref::<ScoreError>() {
            Some(ScoreError::Schema { column, .. }) => assert_eq!(column, "y"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
