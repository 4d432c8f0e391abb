use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, warn};

use crate::mcdm::{CriteriaMatrix, WeightVector};

/// Magnitude of the perturbation added before correlating.
const JITTER: f64 = 1e-12;

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two rows.
fn std_dev(column: ArrayView1<'_, f64>) -> f64 {
    let n = column.len();
    if n < 2 { return 0.0 }
    let mean = column.sum() / n as f64;
    (column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
}

fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len() as f64;
    let (ma, mb) = (a.sum() / n, b.sum() / n);
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    let denom = (va * vb).sqrt();
    if denom > 0.0 && denom.is_finite() { (cov / denom).clamp(-1.0, 1.0) } else { 0.0 }
}

/// CRITIC weights of a normalized matrix:
/// `C_j = σ_j · Σ_l (1 - |R_jl|)`, `w_j = C_j / Σ C`.
///
/// Correlations are taken on a copy jittered by a generator seeded with
/// `seed`, so weights are reproducible. Columns with zero variance correlate
/// at 0 with every other column. If every `C_j` is ~0 the weights are equal.
pub fn critic_weights(matrix: &CriteriaMatrix, seed: u64) -> WeightVector {
    let k = matrix.ncols();
    let columns = matrix.columns().to_vec();
    if k == 0 || matrix.nrows() == 0 {
        return WeightVector::equal(columns);
    }

    let sigma = (0..k).map(|j| std_dev(matrix.column(j))).collect::<Vec<_>>();

    let mut rng = StdRng::seed_from_u64(seed);
    let jittered = matrix.values().mapv(|v| v + rng.random_range(-JITTER..JITTER));

    let corr = Array2::from_shape_fn((k, k), |(j, l)| {
        if j == l {
            1.0
        } else if sigma[j] == 0.0 || sigma[l] == 0.0 {
            0.0
        } else {
            pearson(jittered.column(j), jittered.column(l))
        }
    });

    let contrast = (0..k)
        .map(|j| sigma[j] * corr.row(j).iter().map(|r| 1.0 - r.abs()).sum::<f64>())
        .collect::<Vec<_>>();
    let total = contrast.iter().sum::<f64>();
    debug!(?sigma, ?contrast, "critic contrast");

    if !(total > 1e-9) {
        warn!(criteria = k, "criteria carry no contrast; using equal weights");
        return WeightVector::equal(columns);
    }
    WeightVector::new(columns, contrast).unwrap_or_else(|_| WeightVector::equal(matrix.columns().to_vec()))
}
