//! Domain errors for the analyzer job engine.

use thiserror::Error;
use uuid::Uuid;

use super::models::job::JobStatus;

/// Domain-level errors surfaced by the job registry and the job service.
///
/// Stage and process failures never appear here: the orchestrator turns them
/// into step and job state instead.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job already registered: {0}")]
    DuplicateJob(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: JobStatus, to: JobStatus },

    #[error("No step is running for job {0}")]
    NoRunningStep(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Report not available for job {0}")]
    ReportNotAvailable(Uuid),

    #[error("Artifact '{name}' not found for job {job_id}")]
    ArtifactNotFound { job_id: Uuid, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomainError {
    /// Whether this error is a boundary-level not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::JobNotFound(_) | Self::ReportNotAvailable(_) | Self::ArtifactNotFound { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
