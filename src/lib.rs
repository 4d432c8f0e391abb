#![doc = "pvsite public API"]
mod common;
mod config;
mod error;
mod geom;
mod mcdm;
mod pipeline;
mod proximity;
mod records;
mod score;

#[doc(inline)]
pub use config::{CriterionSpec, Polarity, SiteConfig};

#[doc(inline)]
pub use error::ScoreError;

#[doc(inline)]
pub use geom::{AsciiGrid, GeometryBackend, LandFeature, LandFragment, PlanarBackend, ZonalResult};

#[doc(inline)]
pub use records::{Cell, Centroid, Record, SpatialRecordSet};

#[doc(inline)]
pub use proximity::{Closeness, DistanceMode, ProximityResult, ProximityScorer, score_nearest};

#[doc(inline)]
pub use score::{CriteriaColumn, LandRatioResult, MergedScores, adapt_zonal, aggregate_land, land_column, merge_scores};

#[doc(inline)]
pub use mcdm::{CriteriaMatrix, RankedResult, WeightVector, critic_weights, normalize, rank_topsis};

#[doc(inline)]
pub use pipeline::{
    ArtifactStatus, Pipeline, ProximityRule, RegionLayout, RegionManifest, RunReport, Stage, StepOutcome,
    StepPlan, StepSelection, StepState, run_steps,
};
