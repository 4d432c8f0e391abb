mod layout;
mod manifest;
mod runner;
mod stage;
mod steps;

pub use layout::RegionLayout;
pub use manifest::{ArtifactStatus, RegionManifest};
pub use runner::{RunReport, StepOutcome, StepPlan, StepState, run_steps};
pub use stage::{ProximityRule, Stage, StepSelection};
pub use steps::Pipeline;
