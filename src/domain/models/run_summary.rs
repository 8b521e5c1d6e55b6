//! Last-known run summary per source repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{Capability, JobStatus};

/// Compact record of the most recent terminal job for a repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Repository URL with any embedded credential redacted
    pub repo_url: String,
    /// Job that produced this summary
    pub job_id: Uuid,
    /// Terminal status of that job
    pub status: JobStatus,
    /// When the summary was recorded
    pub recorded_at: DateTime<Utc>,
    /// Capabilities the job selected
    pub capabilities: Vec<Capability>,
    /// Artifact file names present when the job finished
    pub artifacts: Vec<String>,
}
