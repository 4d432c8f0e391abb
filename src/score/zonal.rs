use crate::{geom::ZonalResult, score::CriteriaColumn};

/// Reduce zonal statistics to the `{criterion}_score` column of cell means.
/// A missing mean stays missing; zero-filling happens at normalization.
pub fn adapt_zonal(zonal: &[ZonalResult], criterion: &str) -> CriteriaColumn {
    CriteriaColumn::new(
        format!("{criterion}_score"),
        zonal.iter()
            .map(|z| (z.cell_id.clone(), z.mean.filter(|m| m.is_finite())))
            .collect(),
    )
}
