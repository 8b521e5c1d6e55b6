use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::process_runner::ProcessError;
use crate::domain::models::{JobPaths, JobRequest, Stage};

/// Everything an adapter needs to run one stage of one job.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub job_id: Uuid,
    pub request: &'a JobRequest,
    pub paths: &'a JobPaths,
}

impl StageContext<'_> {
    /// Per-invocation budget. Every stage gets the full job budget.
    pub fn timeout(&self) -> Duration {
        self.request.timeout()
    }
}

/// Reasons an adapter could not complete its stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{0}")]
    ToolFailed(String),

    #[error("{} did not produce {}", .stage, .path.display())]
    MissingArtifact { stage: Stage, path: PathBuf },

    #[error("failed to prepare {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stage aborted: {0}")]
    Aborted(String),
}

impl StageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The stage ended abnormally rather than reporting an error.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// One external capability behind a uniform shape.
///
/// Adapters tolerate the wrapped tool's own failure signalling (scanners exit
/// non-zero when findings are present). They return an error only when the
/// invocation could not happen, timed out, or a mandatory artifact is missing.
#[async_trait]
pub trait StageAdapter: Send + Sync {
    /// The stage this adapter executes.
    fn stage(&self) -> Stage;

    /// Run the stage and return the artifact paths it produced.
    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError>;
}
