use anyhow::{Result, ensure};
use ndarray::Axis;
use serde_json::json;

use crate::{
    mcdm::{CriteriaMatrix, WeightVector},
    records::Record,
};

/// TOPSIS outcome for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub cell_id: String,
    pub composite_score: f64,
    /// 1 is most suitable.
    pub rank: usize,
}

impl RankedResult {
    /// Append `composite_score` and `rank` to a record.
    pub fn annotate(&self, record: &mut Record) {
        record.set("composite_score", json!(self.composite_score))
            .set("rank", json!(self.rank));
    }
}

/// Rank cells by relative closeness to the ideal solution. Every column is
/// treated as benefit-type. Results are returned in matrix row order;
/// ranks form a permutation of `1..=N` ordered by score descending, then
/// `cell_id` ascending.
pub fn rank_topsis(matrix: &CriteriaMatrix, weights: &WeightVector) -> Result<Vec<RankedResult>> {
    ensure!(weights.len() == matrix.ncols(), "{} weights for {} criteria", weights.len(), matrix.ncols());
    ensure!(weights.columns() == matrix.columns(), "weights and matrix columns differ");
    ensure!(!matrix.has_missing(), "matrix must be normalized before ranking");

    let w = ndarray::Array1::from(weights.as_slice().to_vec());
    let weighted = matrix.values() * &w;

    let best = weighted.fold_axis(Axis(0), f64::NEG_INFINITY, |a, &b| a.max(b));
    let worst = weighted.fold_axis(Axis(0), f64::INFINITY, |a, &b| a.min(b));

    let scores = weighted.axis_iter(Axis(0)).map(|row| {
        let d_best = (&row - &best).mapv(|v| v * v).sum().sqrt();
        let d_worst = (&row - &worst).mapv(|v| v * v).sum().sqrt();
        let total = d_best + d_worst;
        if total > 0.0 { d_worst / total } else { 0.0 }
    }).collect::<Vec<_>>();

    let ids = matrix.ids();
    let mut order = (0..ids.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then_with(|| ids[a].cmp(&ids[b])));

    let mut ranks = vec![0; ids.len()];
    for (position, &i) in order.iter().enumerate() {
        ranks[i] = position + 1;
    }

    Ok(ids.iter().zip(scores).zip(ranks)
        .map(|((id, composite_score), rank)| RankedResult { cell_id: id.clone(), composite_score, rank })
        .collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::mcdm::critic_weights;

    fn equal(m: &CriteriaMatrix) -> WeightVector {
        WeightVector::equal(m.columns().to_vec())
    }

    #[test]
    fn symmetric_rows_tie_and_break_by_cell_id() {
        let m = CriteriaMatrix::from_rows(&["r_b", "r_a"], &["x", "y"], &[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let ranked = rank_topsis(&m, &equal(&m)).unwrap();
        assert_abs_diff_eq!(ranked[0].composite_score, 0.5);
        assert_abs_diff_eq!(ranked[1].composite_score, 0.5);
        assert_eq!(ranked[1].rank, 1);
        assert_eq!(ranked[0].rank, 2);
    }

    #[test]
    fn ranks_are_a_permutation_led_by_best_score() {
        let m = CriteriaMatrix::from_rows(&["a", "b", "c", "d", "e"], &["x", "y", "z"], &[
            vec![0.1, 0.9, 0.3],
            vec![1.0, 1.0, 1.0],
            vec![0.0, 0.0, 0.0],
            vec![0.5, 0.4, 0.8],
            vec![0.5, 0.4, 0.8],
        ]).unwrap();
        let ranked = rank_topsis(&m, &critic_weights(&m, 42)).unwrap();

        let mut ranks = ranked.iter().map(|r| r.rank).collect::<Vec<_>>();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);

        let top = ranked.iter().find(|r| r.rank == 1).unwrap();
        assert_eq!(top.cell_id, "b");
        assert_abs_diff_eq!(top.composite_score, 1.0);
        assert_eq!(ranked.iter().find(|r| r.cell_id == "c").unwrap().composite_score, 0.0);
        assert!(ranked[3].rank < ranked[4].rank);
        assert!(ranked.iter().all(|r| (0.0..=1.0).contains(&r.composite_score)));
    }

    #[test]
    fn identical_rows_score_zero() {
        let m = CriteriaMatrix::from_rows(&["a", "b"], &["x"], &[vec![0.3], vec![0.3]]).unwrap();
        let ranked = rank_topsis(&m, &equal(&m)).unwrap();
        assert!(ranked.iter().all(|r| r.composite_score == 0.0));
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn unnormalized_matrix_rejected() {
        let m = CriteriaMatrix::from_rows(&["a"], &["x"], &[vec![f64::NAN]]).unwrap();
        assert!(rank_topsis(&m, &equal(&m)).is_err());
    }
}
