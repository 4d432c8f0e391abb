mod column;
mod land;
mod merge;
mod zonal;

pub use column::CriteriaColumn;
pub use land::{LandRatioResult, aggregate_land, land_column};
pub use merge::{MergedScores, merge_scores};
pub use zonal::adapt_zonal;
