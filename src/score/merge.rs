use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::{records::Cell, score::CriteriaColumn};

/// Per-cell table of the base grid columns plus one column per criterion.
/// Rows follow the order of the base cells.
#[derive(Debug, Clone)]
pub struct MergedScores {
    frame: DataFrame,
    criteria: Vec<String>,
}

impl MergedScores {
    #[inline] pub fn height(&self) -> usize { self.frame.height() }

    #[inline] pub fn frame(&self) -> &DataFrame { &self.frame }

    /// Names of the merged criterion columns, in merge order.
    #[inline] pub fn criteria(&self) -> &[String] { &self.criteria }

    pub fn cell_ids(&self) -> Result<Vec<String>> {
        Ok(self.frame.column("cell_id")?.str()?.into_iter()
            .map(|id| id.unwrap_or_default().to_string())
            .collect())
    }

    /// Values of one criterion column; nulls are missing.
    pub fn values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.frame.column(column)
            .with_context(|| format!("[score::merge] no column {column}"))?
            .f64()?
            .into_iter()
            .collect())
    }
}

/// Left-join every criterion column onto the base cells by `cell_id`.
/// The result has exactly one row per base cell; cells a criterion does
/// not cover get a null, and duplicate ids in a criterion keep the first.
pub fn merge_scores(base: &[Cell], criteria: &[CriteriaColumn]) -> Result<MergedScores> {
    let mut frame = DataFrame::new(vec![
        Column::new("cell_id".into(), base.iter().map(|c| c.cell_id.as_str()).collect::<Vec<_>>()),
        Column::new("area".into(), base.iter().map(|c| c.area).collect::<Vec<_>>()),
        Column::new("perimeter".into(), base.iter().map(|c| c.perimeter).collect::<Vec<_>>()),
        Column::new("region_name".into(), base.iter().map(|c| c.region_name.as_str()).collect::<Vec<_>>()),
    ])?.with_row_index("idx".into(), None)?;

    let mut names = Vec::with_capacity(criteria.len());
    for column in criteria {
        if frame.get_column_index(&column.name).is_some() {
            bail!("[score::merge] duplicate column {}", column.name);
        }
        if column.is_empty() {
            warn!(criterion = %column.name, "criterion has no rows; every cell will be missing it");
        }

        let mut seen = HashSet::new();
        let (ids, values): (Vec<&str>, Vec<Option<f64>>) = column.values.iter()
            .filter(|(id, _)| seen.insert(id.as_str()))
            .map(|(id, v)| (id.as_str(), *v))
            .unzip();
        if ids.len() < column.len() {
            debug!(criterion = %column.name, dropped = column.len() - ids.len(), "duplicate cell ids ignored");
        }

        let right = DataFrame::new(vec![
            Column::new("cell_id".into(), ids),
            Column::new(column.name.as_str().into(), values),
        ])?;
        frame = frame.left_join(&right, ["cell_id"], ["cell_id"])
            .with_context(|| format!("[score::merge] Failed to join {}", column.name))?;
        names.push(column.name.clone());
    }

    let frame = frame.sort(["idx"], SortMultipleOptions::default())?.drop("idx")?;
    Ok(MergedScores { frame, criteria: names })
}
