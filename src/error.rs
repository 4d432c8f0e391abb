//! Error taxonomy for scoring and pipeline steps.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the scoring core. They travel inside `anyhow::Error`
/// and are classified by the pipeline runner with `downcast_ref`.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// A required column is absent. Fatal to the current step only.
    #[error("missing required column `{column}` in {table}")]
    Schema { table: String, column: String },

    /// Zero rows where at least one is required. Fatal to the current step only.
    #[error("empty input: {what}")]
    EmptyInput { what: String },

    /// A declared input artifact does not exist. The step is failed with a warning.
    #[error("missing input artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// An output artifact could not be written. Fatal to the process.
    #[error("failed to write artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScoreError {
    pub(crate) fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema { table: table.into(), column: column.into() }
    }

    pub(crate) fn empty(what: impl Into<String>) -> Self {
        Self::EmptyInput { what: what.into() }
    }

    /// Whether this error must abort the whole run instead of one step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ArtifactWrite { .. })
    }
}
