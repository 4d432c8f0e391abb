mod distance;
mod index;
mod scorer;

pub use distance::DistanceMode;
pub use scorer::{Closeness, ProximityResult, ProximityScorer, score_nearest};
