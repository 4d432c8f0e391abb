use geo::Rect;
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a land feature by index.
#[derive(Debug, Clone)]
pub(super) struct BoundingBox {
    idx: usize,
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(super) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Index of the feature this box bounds.
    pub(super) fn idx(&self) -> usize { self.idx }

    /// Envelope of an arbitrary rectangle, for querying.
    pub(super) fn envelope_of(rect: &Rect<f64>) -> AABB<[f64; 2]> {
        AABB::from_corners(rect.min().into(), rect.max().into())
    }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        Self::envelope_of(&self.bbox)
    }
}
