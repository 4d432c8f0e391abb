mod critic;
mod matrix;
mod normalize;
mod topsis;

pub use critic::critic_weights;
pub use matrix::{CriteriaMatrix, WeightVector};
pub use normalize::normalize;
pub use topsis::{RankedResult, rank_topsis};
