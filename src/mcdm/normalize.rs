use anyhow::Result;
use ndarray::Array2;
use tracing::warn;

use crate::{
    config::{CriterionSpec, Polarity},
    error::ScoreError,
    mcdm::CriteriaMatrix,
};

/// Map every column to [0,1] by its polarity, then fill missing values
/// with 0. Pre-scaled columns pass through unchanged (benefit) or flip as
/// `1 - v` (cost), with a warning for values outside [0,1]; raw columns are min-max scaled, and a constant raw column
/// becomes all zeros.
pub fn normalize(matrix: &CriteriaMatrix, criteria: &[CriterionSpec]) -> Result<CriteriaMatrix> {
    let mut out = Array2::zeros((matrix.nrows(), matrix.ncols()));

    for (j, name) in matrix.columns().iter().enumerate() {
        let spec = criteria.iter().find(|c| c.column() == *name)
            .ok_or_else(|| ScoreError::schema("criteria config", name.as_str()))?;
        let column = matrix.column(j);

        let scale: Box<dyn Fn(f64) -> f64> = if spec.pre_scaled {
            let outside = column.iter().filter(|v| !v.is_nan() && !(0.0..=1.0).contains(*v)).count();
            if outside > 0 {
                warn!(criterion = %name, values = outside, "pre-scaled criterion has values outside [0,1]");
            }
            match spec.polarity {
                Polarity::Benefit => Box::new(|v: f64| v),
                Polarity::Cost => Box::new(|v: f64| 1.0 - v),
            }
        } else {
            let present = column.iter().copied().filter(|v| !v.is_nan());
            let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let span = max - min;
            if !(span > f64::EPSILON * max.abs().max(1.0)) {
                warn!(criterion = %name, "constant criterion normalizes to zero");
                Box::new(|_: f64| 0.0)
            } else {
                match spec.polarity {
                    Polarity::Benefit => Box::new(move |v: f64| (v - min) / span),
                    Polarity::Cost => Box::new(move |v: f64| (max - v) / span),
                }
            }
        };

        for (i, &v) in column.iter().enumerate() {
            out[[i, j]] = if v.is_nan() { 0.0 } else { scale(v) };
        }
    }

    Ok(matrix.with_values(out))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::config::SiteConfig;

    fn criteria() -> Vec<CriterionSpec> {
        SiteConfig::default().criteria
    }

    #[test]
    fn two_row_benefit_column() {
        let m = CriteriaMatrix::from_rows(&["a", "b"], &["dni_score"], &[vec![0.0], vec![10.0]]).unwrap();
        let n = normalize(&m, &criteria()).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn raw_cost_column_is_inverted() {
        let m = CriteriaMatrix::from_rows(&["a", "b", "c"], &["dem_score"], &[vec![100.0], vec![300.0], vec![200.0]]).unwrap();
        let n = normalize(&m, &criteria()).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn constant_column_is_all_zero() {
        let m = CriteriaMatrix::from_rows(&["a", "b", "c"], &["temp_score"], &[vec![7.0], vec![7.0], vec![f64::NAN]]).unwrap();
        let n = normalize(&m, &criteria()).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn pre_scaled_columns_follow_polarity() {
        let m = CriteriaMatrix::from_rows(
            &["a", "b"],
            &["dso_score", "solar_score"],
            &[vec![0.25, 0.25], vec![1.0, 0.0]],
        ).unwrap();
        let n = normalize(&m, &criteria()).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![0.25, 1.0]);
        assert_eq!(n.column(1).to_vec(), vec![0.75, 1.0]);
    }

    #[test]
    fn out_of_range_pre_scaled_values_are_not_clamped() {
        let m = CriteriaMatrix::from_rows(
            &["a", "b"],
            &["road_score", "solar_score"],
            &[vec![1.5, 1.25], vec![-0.5, 0.5]],
        ).unwrap();
        let n = normalize(&m, &criteria()).unwrap();
        assert_eq!(n.column(0).to_vec(), vec![1.5, -0.5]);
        assert_eq!(n.column(1).to_vec(), vec![-0.25, 0.5]);
    }

    #[test]
    fn missing_values_fill_with_zero_after_scaling() {
        let m = CriteriaMatrix::from_rows(
            &["a", "b", "c"],
            &["pvout_score", "land_score"],
            &[vec![2.0, f64::NAN], vec![f64::NAN, 0.5], vec![4.0, 1.0]],
        ).unwrap();
        let n = normalize(&m, &criteria()).unwrap();
        assert!(!n.has_missing());
        assert_eq!(n.column(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(n.column(1)[1], 0.5);
        assert_eq!(n.column(1)[0], 0.0);
        assert!(n.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn unknown_column_is_schema_error() {
        let m = CriteriaMatrix::from_rows(&["a"], &["wind_score"], &[vec![1.0]]).unwrap();
        let err = normalize(&m, &criteria()).unwrap_err();
        assert!(matches!(err.downcast_ref::<ScoreError>(), Some(ScoreError::Schema { .. })));
    }
}
