use anyhow::Result;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    error::ScoreError,
    proximity::{DistanceMode, index::FacilityIndex},
    records::{Centroid, Record},
};

/// Which end of the distance range scores 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closeness {
    /// Nearest subject scores 1.0 (infrastructure to connect to).
    NearerIsBetter,
    /// Farthest subject scores 1.0 (competing or undesirable facilities).
    FartherIsBetter,
}

/// Nearest facility of one subject and its normalized closeness score.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityResult {
    pub subject_id: String,
    pub nearest_facility_id: String,
    pub nearest_facility_x: f64,
    pub nearest_facility_y: f64,
    pub distance_km: f64,
    pub score: f64,
}

impl ProximityResult {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(&self.subject_id);
        record.set("cell_id", json!(self.subject_id))
            .set("nearest_facility_id", json!(self.nearest_facility_id))
            .set("nearest_facility_x", json!(self.nearest_facility_x))
            .set("nearest_facility_y", json!(self.nearest_facility_y))
            .set("distance_km", json!(self.distance_km))
            .set("score", json!(self.score));
        record
    }
}

/// Nearest-facility scorer for one criterion.
#[derive(Debug, Clone, Copy)]
pub struct ProximityScorer {
    mode: DistanceMode,
    closeness: Closeness,
    chunk_size: usize,
}

impl ProximityScorer {
    pub fn new(mode: DistanceMode, closeness: Closeness) -> Self {
        Self { mode, closeness, chunk_size: 10_000 }
    }

    /// Bound the subject rows held in one pairwise-distance block.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Find every subject's nearest facility and derive its score.
    pub fn score(&self, subjects: &[Centroid], facilities: &[Centroid]) -> Result<Vec<ProximityResult>> {
        if subjects.is_empty() {
            return Err(ScoreError::empty("no subjects to score").into());
        }
        if facilities.is_empty() {
            return Err(ScoreError::empty("no facilities to measure against").into());
        }

        let nearest = match self.mode {
            DistanceMode::Haversine => self.nearest_exact(subjects, facilities),
            DistanceMode::Planar => nearest_indexed(subjects, facilities),
        };

        let distances = nearest.iter().map(|&(_, d)| d).collect::<Vec<_>>();
        let scores = closeness_scores(&distances, self.closeness);

        Ok(subjects.iter().zip(nearest).zip(scores)
            .map(|((subject, (j, distance_km)), score)| {
                let facility = &facilities[j];
                ProximityResult {
                    subject_id: subject.id.clone(),
                    nearest_facility_id: facility.id.clone(),
                    nearest_facility_x: facility.x,
                    nearest_facility_y: facility.y,
                    distance_km,
                    score,
                }
            })
            .collect())
    }

    /// Row-wise minimum and argmin of the subject-by-facility distance
    /// matrix, materialized one chunk of subjects at a time.
    fn nearest_exact(&self, subjects: &[Centroid], facilities: &[Centroid]) -> Vec<(usize, f64)> {
        let mut nearest = Vec::with_capacity(subjects.len());
        for (k, chunk) in subjects.chunks(self.chunk_size).enumerate() {
            let block = Array2::from_shape_fn((chunk.len(), facilities.len()), |(i, j)| {
                self.mode.km(&chunk[i], &facilities[j])
            });
            nearest.extend(block.axis_iter(Axis(0)).map(|row| {
                row.iter().enumerate().fold((0, f64::INFINITY), |best, (j, &d)| {
                    if d < best.1 { (j, d) } else { best }
                })
            }));
            debug!(chunk = k, rows = chunk.len(), facilities = facilities.len(), "distance chunk done");
        }
        nearest
    }
}

fn nearest_indexed(subjects: &[Centroid], facilities: &[Centroid]) -> Vec<(usize, f64)> {
    let index = FacilityIndex::new(facilities);
    subjects.iter()
        .map(|s| {
            let j = index.nearest(s).unwrap_or(0);
            (j, DistanceMode::Planar.km(s, &facilities[j]))
        })
        .collect()
}

/// Linear min-max inversion of distances, so the nearest subject scores 1.
/// `FartherIsBetter` flips the result again. Uniform distances score 1
/// before the flip.
fn closeness_scores(distances: &[f64], closeness: Closeness) -> Vec<f64> {
    let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let max = distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    let degenerate = !(span > f64::EPSILON * max.abs().max(1.0));
    if degenerate {
        warn!(rows = distances.len(), distance_km = min, "all subjects equidistant from nearest facility");
    }

    distances.iter()
        .map(|&d| {
            let near = if degenerate { 1.0 } else { (1.0 - (d - min) / span).clamp(0.0, 1.0) };
            match closeness {
                Closeness::NearerIsBetter => near,
                Closeness::FartherIsBetter => 1.0 - near,
            }
        })
        .collect()
}

/// Score subjects against facilities with the given metric and polarity.
pub fn score_nearest(
    subjects: &[Centroid],
    facilities: &[Centroid],
    mode: DistanceMode,
    closeness: Closeness,
    chunk_size: usize,
) -> Result<Vec<ProximityResult>> {
    ProximityScorer::new(mode, closeness)
        .with_chunk_size(chunk_size)
        .score(subjects, facilities)
}
