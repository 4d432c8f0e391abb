use serde::{Deserialize, Serialize};

use crate::{geom::haversine_km, records::Centroid};

/// Kilometres per degree in the planar approximation.
pub(crate) const PLANAR_KM_PER_DEGREE: f64 = 111.0;

/// How subject-to-facility distances are measured. The two modes are not
/// numerically interchangeable; one region's criterion uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    /// Exact great-circle distance over the full pairwise matrix.
    Haversine,
    /// Euclidean distance in degrees times 111 km, via a nearest-neighbour index.
    Planar,
}

impl DistanceMode {
    /// Distance in km between two lon/lat points.
    pub(crate) fn km(self, a: &Centroid, b: &Centroid) -> f64 {
        match self {
            Self::Haversine => haversine_km(a.point(), b.point()),
            Self::Planar => (a.x - b.x).hypot(a.y - b.y) * PLANAR_KM_PER_DEGREE,
        }
    }
}
