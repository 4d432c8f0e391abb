use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::records::Centroid;

/// A facility position in the nearest-neighbour index.
#[derive(Debug, Clone, Copy)]
struct FacilityPoint {
    idx: usize,
    xy: [f64; 2],
}

impl RTreeObject for FacilityPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xy)
    }
}

impl PointDistance for FacilityPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let (dx, dy) = (self.xy[0] - point[0], self.xy[1] - point[1]);
        dx * dx + dy * dy
    }
}

/// 2D index over facility coordinates, built once per batch.
pub(super) struct FacilityIndex {
    rtree: RTree<FacilityPoint>,
}

impl FacilityIndex {
    pub(super) fn new(facilities: &[Centroid]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                facilities.iter().enumerate()
                    .map(|(idx, f)| FacilityPoint { idx, xy: [f.x, f.y] })
                    .collect()
            ),
        }
    }

    /// Index of the nearest facility in degree space. Equidistant facilities
    /// resolve to the one listed first.
    pub(super) fn nearest(&self, subject: &Centroid) -> Option<usize> {
        let mut hits = self.rtree.nearest_neighbor_iter_with_distance_2(&[subject.x, subject.y]);
        let (first, best) = hits.next()?;
        Some(hits.take_while(|&(_, d2)| d2 <= best)
            .map(|(f, _)| f.idx)
            .fold(first.idx, usize::min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_prefers_first_listed_on_ties() {
        let facilities = vec![
            Centroid::new("f0", 5.0, 5.0),
            Centroid::new("f1", 1.0, 0.0),
            Centroid::new("f2", -1.0, 0.0),
        ];
        let index = FacilityIndex::new(&facilities);
        assert_eq!(index.nearest(&Centroid::new("s", 0.0, 0.0)), Some(1));
        assert_eq!(index.nearest(&Centroid::new("s", 4.0, 4.0)), Some(0));
        assert_eq!(FacilityIndex::new(&[]).nearest(&Centroid::new("s", 0.0, 0.0)), None);
    }
}
