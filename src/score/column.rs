use crate::records::SpatialRecordSet;

/// One named per-cell score column; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaColumn {
    pub name: String,
    pub values: Vec<(String, Option<f64>)>,
}

impl CriteriaColumn {
    pub fn new(name: impl Into<String>, values: Vec<(String, Option<f64>)>) -> Self {
        Self { name: name.into(), values }
    }

    #[inline] pub fn len(&self) -> usize { self.values.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// First value recorded for `cell_id`.
    pub fn get(&self, cell_id: &str) -> Option<f64> {
        self.values.iter().find(|(id, _)| id == cell_id).and_then(|&(_, v)| v)
    }

    /// Take `value_column` of each record, keyed by its `cell_id` attribute
    /// (or the record id). Unparseable values read as missing.
    pub fn from_records(set: &SpatialRecordSet, value_column: &str, name: impl Into<String>) -> Self {
        Self::new(name, set.iter()
            .map(|r| (r.str("cell_id").unwrap_or_else(|| r.id.clone()), r.f64(value_column)))
            .collect())
    }
}
