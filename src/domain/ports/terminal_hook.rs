use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Job;

/// Post-processing run once a job has reached a terminal status.
///
/// Hooks are best-effort: an error or panic is logged and discarded and never
/// changes the job's status.
#[async_trait]
pub trait TerminalHook: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn on_terminal(&self, job: &Job) -> DomainResult<()>;
}
