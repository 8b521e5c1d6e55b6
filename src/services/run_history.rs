//! Last-known run summary per repository URL.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::artifacts::list_artifacts;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Job, RunSummary};
use crate::domain::ports::TerminalHook;
use crate::infrastructure::logging::redact_url;

/// Run history keyed by the redacted repository URL.
///
/// Last writer wins, ordered by job completion time: a summary for a job that
/// finished earlier never replaces one that finished later, whatever order
/// the hooks happen to run in.
#[derive(Debug, Default)]
pub struct RunHistory {
    runs: RwLock<HashMap<String, RunSummary>>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `summary`. Returns `false` when a later run is already recorded.
    pub async fn record(&self, mut summary: RunSummary) -> bool {
        let key = redact_url(&summary.repo_url);
        summary.repo_url.clone_from(&key);

        let mut runs = self.runs.write().await;
        if let Some(existing) = runs.get(&key) {
            if existing.recorded_at > summary.recorded_at {
                tracing::debug!(
                    repo_url = %key,
                    kept = %existing.job_id,
                    dropped = %summary.job_id,
                    "newer run already recorded"
                );
                return false;
            }
        }
        runs.insert(key, summary);
        true
    }

    pub async fn lookup(&self, repo_url: &str) -> Option<RunSummary> {
        self.runs.read().await.get(&redact_url(repo_url)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[async_trait]
impl TerminalHook for RunHistory {
    fn name(&self) -> &'static str {
        "run_history"
    }

    async fn on_terminal(&self, job: &Job) -> DomainResult<()> {
        let artifacts = list_artifacts(&job.paths.reports_dir).await?;
        let summary = RunSummary {
            repo_url: job.request.repo_url.clone(),
            job_id: job.id,
            status: job.status,
            recorded_at: job.finished_at.unwrap_or_else(chrono::Utc::now),
            capabilities: job.request.capabilities.clone(),
            artifacts,
        };
        self.record(summary).await;
        Ok(())
    }
}
