use std::collections::HashMap;

use serde_json::json;

use crate::{geom::LandFragment, records::Record, score::CriteriaColumn};

/// Land-cover summary of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LandRatioResult {
    pub cell_id: String,
    /// Share of the cell covered by eligible classes; `None` when no
    /// eligible fragment intersects the cell.
    pub ratio: Option<f64>,
    /// Class with the most fragments in the cell; ties go to the first seen.
    pub dominant_class: String,
}

impl LandRatioResult {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(&self.cell_id);
        record.set("cell_id", json!(self.cell_id))
            .set("land_score", json!(self.ratio))
            .set("dominant_class", json!(self.dominant_class));
        record
    }
}

#[derive(Default)]
struct CellTally {
    eligible: Option<f64>,
    /// (class, fragment count) in first-seen order.
    classes: Vec<(String, usize)>,
}

/// Group fragments by cell, in first-seen cell order.
pub fn aggregate_land(fragments: &[LandFragment], eligible_classes: &[String]) -> Vec<LandRatioResult> {
    let mut order = Vec::new();
    let mut tallies: HashMap<&str, CellTally> = HashMap::new();

    for fragment in fragments {
        let tally = tallies.entry(fragment.cell_id.as_str()).or_insert_with(|| {
            order.push(fragment.cell_id.as_str());
            CellTally::default()
        });

        if eligible_classes.iter().any(|c| *c == fragment.class) && fragment.ratio.is_finite() {
            *tally.eligible.get_or_insert(0.0) += fragment.ratio;
        }
        match tally.classes.iter_mut().find(|(class, _)| *class == fragment.class) {
            Some((_, count)) => *count += 1,
            None => tally.classes.push((fragment.class.clone(), 1)),
        }
    }

    order.into_iter()
        .filter_map(|cell_id| {
            let tally = tallies.remove(cell_id)?;
            // max_by_key keeps the last maximum; scan in reverse so the first seen wins.
            let dominant_class = tally.classes.iter().rev()
                .max_by_key(|(_, count)| *count)
                .map(|(class, _)| class.clone())
                .unwrap_or_default();
            Some(LandRatioResult {
                cell_id: cell_id.to_string(),
                ratio: tally.eligible.map(|r| r.clamp(0.0, 1.0)),
                dominant_class,
            })
        })
        .collect()
}

/// The `land_score` criterion column of aggregated results.
pub fn land_column(results: &[LandRatioResult]) -> CriteriaColumn {
    CriteriaColumn::new("land_score", results.iter().map(|r| (r.cell_id.clone(), r.ratio)).collect())
}
