use std::path::Path;

use anyhow::{Context, Result};
use geo::Geometry;
use serde_json::{Map, Value, json};

use crate::{common, error::ScoreError};

/// One row of a spatial table: a stable identifier, scalar attributes and
/// an optional geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub attributes: Map<String, Value>,
    pub geometry: Option<Geometry<f64>>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: Map::new(), geometry: None }
    }

    pub fn with_geometry(mut self, geometry: impl Into<Geometry<f64>>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Numeric attribute. Numeric strings are parsed; null, non-finite and
    /// unparseable values read as missing.
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.attributes.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    /// String attribute; numbers are rendered so that integer ids read back as text.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// An ordered collection of records, named after the table it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialRecordSet {
    name: String,
    records: Vec<Record>,
}

impl SpatialRecordSet {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self { name: name.into(), records }
    }

    #[inline] pub fn name(&self) -> &str { &self.name }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn records(&self) -> &[Record] { &self.records }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Record> { self.records.iter() }

    pub fn push(&mut self, record: Record) { self.records.push(record) }

    pub fn into_records(self) -> Vec<Record> { self.records }

    /// Fail with `Schema` naming the first column some record lacks.
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for &column in columns {
            if self.records.iter().any(|r| !r.has(column)) {
                return Err(ScoreError::schema(&self.name, column).into());
            }
        }
        Ok(())
    }

    /// Fail with `EmptyInput` when the table has no rows.
    pub fn require_non_empty(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(ScoreError::empty(format!("{} has no rows", self.name)).into());
        }
        Ok(())
    }

    /// Attach the `region_name` and `created` columns carried by every artifact.
    pub fn stamp(&mut self, region: &str, created: &str) {
        for record in &mut self.records {
            record.set("region_name", json!(region));
            record.set("created", json!(created));
        }
    }

    /// Read a GeoJSON FeatureCollection. With `id_column`, each feature's id
    /// is taken from that property (missing => `Schema` error); otherwise the
    /// GeoJSON feature id or the feature index is used.
    pub fn read_geojson(path: &Path, name: &str, id_column: Option<&str>) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[records] Failed to read {}", path.display()))?;
        common::read_records_from_geojson_bytes(&bytes, name, id_column)
            .with_context(|| format!("[records] Failed to parse {}", path.display()))
    }

    /// Write the set as a GeoJSON artifact (atomically).
    pub fn write_geojson(&self, path: &Path) -> Result<()> {
        let bytes = common::write_records_to_geojson_bytes(self)?;
        common::write_artifact(path, &bytes)
    }
}

impl<'a> IntoIterator for &'a SpatialRecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter { self.records.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        let mut r = Record::new("a");
        r.set("n", 2.5).set("s", " 3 ").set("bad", "n/a").set("null", Value::Null);
        assert_eq!(r.f64("n"), Some(2.5));
        assert_eq!(r.f64("s"), Some(3.0));
        assert_eq!(r.f64("bad"), None);
        assert_eq!(r.f64("null"), None);
        assert_eq!(r.f64("absent"), None);
    }

    #[test]
    fn integer_ids_read_as_text() {
        let mut r = Record::new("a");
        r.set("dso_id", 17);
        assert_eq!(r.str("dso_id").as_deref(), Some("17"));
    }

    #[test]
    fn require_columns_names_missing_column() {
        let mut a = Record::new("a");
        a.set("x", 1.0).set("y", 2.0);
        let mut b = Record::new("b");
        b.set("x", 1.0);
        let set = SpatialRecordSet::new("facilities", vec![a, b]);

        let err = set.require_columns(&["x", "y"]).unwrap_err();
        match err.downcast_ref::<ScoreError>() {
            Some(ScoreError::Schema { table, column }) => {
                assert_eq!(table, "facilities");
                assert_eq!(column, "y");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_set_rejected() {
        let set = SpatialRecordSet::new("grid", vec![]);
        let err = set.require_non_empty().unwrap_err();
        assert!(matches!(err.downcast_ref::<ScoreError>(), Some(ScoreError::EmptyInput { .. })));
    }
}
