mod cell;
mod centroid;
mod record;

pub use cell::Cell;
pub use centroid::Centroid;
pub use record::{Record, SpatialRecordSet};
