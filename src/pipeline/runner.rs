use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{common::require_file_exists, error::ScoreError, pipeline::Stage};

/// Lifecycle of one step within an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Skipped,
    Completed,
    Failed,
}

/// What a step reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub stage: Stage,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub stage: Stage,
    pub state: StepState,
    pub reason: Option<String>,
}

/// Per-step outcomes of one invocation, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub region: String,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn state_of(&self, stage: Stage) -> Option<StepState> {
        self.outcomes.iter().find(|o| o.stage == stage).map(|o| o.state)
    }

    pub fn count(&self, state: StepState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// Evaluate each plan in order.
///
/// A step is skipped when its output exists and `force` is false, fails
/// when a required input is absent, and otherwise runs `exec`. A failing
/// step, including a forced one whose inputs are gone, leaves no output
/// behind and does not stop later steps, except for an artifact write
/// failure, which aborts the run.
pub fn run_steps<F>(region: &str, plans: &[StepPlan], force: bool, mut exec: F) -> Result<RunReport>
where
    F: FnMut(&StepPlan) -> Result<()>,
{
    let mut report = RunReport { region: region.to_string(), outcomes: Vec::with_capacity(plans.len()) };

    for plan in plans {
        let step = plan.stage.id();
        let stage = plan.stage.name();
        let mut outcome = StepOutcome { stage: plan.stage, state: StepState::Pending, reason: None };

        if plan.output.exists() && !force {
            outcome.state = StepState::Skipped;
            info!(step, stage, region, state = "skipped", "output exists: {}", plan.output.display());
        } else if let Some(missing) = plan.inputs.iter().find_map(|p| require_file_exists(p).err()) {
            discard_output(plan);
            let reason = missing.to_string();
            warn!(step, stage, region, state = "failed", "{reason}");
            outcome.state = StepState::Failed;
            outcome.reason = Some(reason);
        } else {
            match exec(plan) {
                Ok(()) => {
                    outcome.state = StepState::Completed;
                    info!(step, stage, region, state = "completed", "wrote {}", plan.output.display());
                }
                Err(err) => {
                    discard_output(plan);
                    let fatal = err.downcast_ref::<ScoreError>().is_some_and(ScoreError::is_fatal);
                    if fatal {
                        error!(step, stage, region, state = "failed", "{err:#}");
                        return Err(err.context(format!("step {step} ({stage}) for region {region}")));
                    }
                    warn!(step, stage, region, state = "failed", "{err:#}");
                    outcome.state = StepState::Failed;
                    outcome.reason = Some(format!("{err:#}"));
                }
            }
        }
        report.outcomes.push(outcome);
    }

    info!(
        region,
        completed = report.count(StepState::Completed),
        skipped = report.count(StepState::Skipped),
        failed = report.count(StepState::Failed),
        "run finished"
    );
    Ok(report)
}

/// A failed step must not leave a previous output looking complete.
fn discard_output(plan: &StepPlan) {
    if plan.output.exists() {
        if let Err(err) = std::fs::remove_file(&plan.output) {
            warn!(path = %plan.output.display(), "could not remove stale output: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io};

    use super::*;

    fn plan(dir: &std::path::Path, stage: Stage, inputs: &[&str]) -> StepPlan {
        StepPlan {
            stage,
            inputs: inputs.iter().map(|name| dir.join(name)).collect(),
            output: dir.join(format!("{}.out", stage.name())),
        }
    }

    #[test]
    fn skip_fail_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("boundary"), b"b").unwrap();
        fs::write(dir.path().join("centroid.out"), b"done").unwrap();

        let plans = vec![
            plan(dir.path(), Stage::Grid, &["boundary"]),
            plan(dir.path(), Stage::Centroid, &["grid.out"]),
            plan(dir.path(), Stage::Dso, &["absent"]),
        ];
        let mut ran = Vec::new();
        let report = run_steps("r", &plans, false, |p| {
            ran.push(p.stage);
            fs::write(&p.output, b"x")?;
            Ok(())
        }).unwrap();

        assert_eq!(ran, vec![Stage::Grid]);
        assert_eq!(report.state_of(Stage::Grid), Some(StepState::Completed));
        assert_eq!(report.state_of(Stage::Centroid), Some(StepState::Skipped));
        assert_eq!(report.state_of(Stage::Dso), Some(StepState::Failed));
        assert!(report.outcomes[2].reason.as_deref().unwrap().contains("absent"));
    }

    #[test]
    fn step_error_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let plans = vec![plan(dir.path(), Stage::Dni, &[]), plan(dir.path(), Stage::Dem, &[])];
        let report = run_steps("r", &plans, false, |p| {
            if p.stage == Stage::Dni {
                return Err(ScoreError::EmptyInput { what: "no pixels".into() }.into());
            }
            fs::write(&p.output, b"x")?;
            Ok(())
        }).unwrap();
        assert_eq!(report.state_of(Stage::Dni), Some(StepState::Failed));
        assert_eq!(report.state_of(Stage::Dem), Some(StepState::Completed));
    }

    #[test]
    fn forced_step_with_missing_input_removes_old_output() {
        let dir = tempfile::tempdir().unwrap();
        let plans = vec![plan(dir.path(), Stage::Solar, &["solar_facilities"])];
        fs::write(&plans[0].output, b"stale").unwrap();

        let report = run_steps("r", &plans, true, |_| panic!("must not execute")).unwrap();
        assert_eq!(report.state_of(Stage::Solar), Some(StepState::Failed));
        assert!(!plans[0].output.exists());
    }

    #[test]
    fn write_failure_aborts_and_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let plans = vec![plan(dir.path(), Stage::Grid, &[]), plan(dir.path(), Stage::Centroid, &[])];
        fs::write(&plans[0].output, b"stale").unwrap();

        let mut ran = 0;
        let err = run_steps("r", &plans, true, |p| {
            ran += 1;
            Err(ScoreError::ArtifactWrite {
                path: p.output.clone(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            }.into())
        }).unwrap_err();

        assert_eq!(ran, 1);
        assert!(err.downcast_ref::<ScoreError>().is_some_and(ScoreError::is_fatal));
        assert!(!plans[0].output.exists());
    }
}
