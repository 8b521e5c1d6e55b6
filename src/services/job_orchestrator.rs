//! Job orchestrator: the per-job pipeline state machine.
//!
//! Runs clone, the selected scanners in canonical order, index and report.
//! The cancellation flag is checked before every stage. Scanner errors are
//! recorded on their step and the pipeline moves on; an error in a mandatory
//! stage fails the job and stops the pipeline. After the terminal transition
//! the terminal hooks run, and only then are waiters notified.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tracing::Instrument;

use super::job_registry::JobHandle;
use crate::domain::models::{FailureKind, Job, JobPaths, JobRequest, JobStatus, Stage, StepStatus};
use crate::domain::ports::{StageContext, StageError, TerminalHook};
use crate::infrastructure::logging::redact_url;
use crate::infrastructure::tools::Toolchain;

/// First fatal cause of a Failed job. `Display` is the job message.
#[derive(Debug, Error)]
pub enum JobFailure {
    #[error("job canceled before {before} stage")]
    Canceled { before: Stage },

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("{stage} stage aborted: {reason}")]
    Aborted { stage: Stage, reason: String },
}

impl JobFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Canceled { .. } => FailureKind::Canceled,
            Self::StageFailed { .. } => FailureKind::StageFailed,
            Self::Aborted { .. } => FailureKind::Aborted,
        }
    }

    fn from_stage_error(stage: Stage, error: StageError) -> Self {
        match error {
            StageError::Aborted(reason) => Self::Aborted { stage, reason },
            source => Self::StageFailed { stage, source },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_string())
}

/// Executes jobs against a toolchain.
pub struct JobOrchestrator {
    toolchain: Toolchain,
    hooks: Vec<Arc<dyn TerminalHook>>,
}

impl JobOrchestrator {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TerminalHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Run a job to a terminal status.
    ///
    /// Only the first call for a handle executes anything; later calls return
    /// immediately.
    pub async fn run(&self, handle: Arc<JobHandle>) {
        if !handle.try_claim() {
            tracing::warn!(job_id = %handle.id(), "job already claimed, not running it again");
            return;
        }
        let span = tracing::info_span!("job", job_id = %handle.id());
        self.execute(&handle).instrument(span).await;
    }

    async fn execute(&self, handle: &JobHandle) {
        let started = handle
            .update(|job| {
                job.start()
                    .map(|()| (job.request.clone(), job.paths.clone()))
            })
            .await;
        let (request, paths) = match started {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(error = %e, "job could not be started");
                return;
            }
        };
        handle.publish(JobStatus::Running);
        tracing::info!(
            repo_url = %redact_url(&request.repo_url),
            capabilities = ?request.capabilities,
            timeout_secs = request.timeout_secs,
            "job started"
        );

        let outcome = self.run_stages(handle, &request, &paths).await;

        let finished = handle
            .update(|job| match &outcome {
                Ok(()) => job.succeed(),
                Err(failure) => job.fail(failure.kind(), failure.to_string()),
            })
            .await;
        if let Err(e) = finished {
            tracing::error!(error = %e, "failed to record terminal status");
        }

        let job = handle.snapshot().await;
        match &outcome {
            Ok(()) => tracing::info!(steps = job.steps.len(), "job succeeded"),
            Err(failure) => tracing::warn!(
                kind = ?failure.kind(),
                reason = %failure,
                steps = job.steps.len(),
                "job failed"
            ),
        }

        self.run_hooks(&job).await;
        handle.publish(job.status);
    }

    async fn run_stages(
        &self,
        handle: &JobHandle,
        request: &JobRequest,
        paths: &JobPaths,
    ) -> Result<(), JobFailure> {
        let ctx = StageContext {
            job_id: handle.id(),
            request,
            paths,
        };

        for stage in Stage::plan(&request.capabilities) {
            if handle.is_canceled().await {
                tracing::info!(stage = %stage, "cancellation observed, not starting stage");
                return Err(JobFailure::Canceled { before: stage });
            }

            handle
                .update(|job| job.begin_step(stage))
                .await
                .map_err(|e| JobFailure::Aborted {
                    stage,
                    reason: e.to_string(),
                })?;

            let span = tracing::info_span!("stage", stage = %stage);
            let result = self.invoke(stage, &ctx).instrument(span).await;

            match result {
                Ok(artifacts) => {
                    tracing::info!(stage = %stage, artifacts = artifacts.len(), "stage succeeded");
                    self.complete(handle, StepStatus::Succeeded, None).await;
                }
                Err(error) if !stage.is_mandatory() => {
                    tracing::warn!(stage = %stage, error = %error, "scanner stage failed, continuing");
                    self.complete(handle, StepStatus::Failed, Some(error.to_string()))
                        .await;
                }
                Err(error) => {
                    tracing::error!(stage = %stage, error = %error, "mandatory stage failed");
                    // the failure handler reconciles the running step
                    return Err(JobFailure::from_stage_error(stage, error));
                }
            }
        }
        Ok(())
    }

    /// Invoke the stage adapter, turning a panic into an aborted stage.
    async fn invoke(&self, stage: Stage, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let Some(adapter) = self.toolchain.adapter_for(stage) else {
            return Err(StageError::ToolFailed(format!(
                "no adapter configured for {stage} stage"
            )));
        };
        match AssertUnwindSafe(adapter.invoke(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(StageError::Aborted(panic_message(payload.as_ref()))),
        }
    }

    async fn complete(&self, handle: &JobHandle, status: StepStatus, message: Option<String>) {
        if let Err(e) = handle.update(|job| job.complete_step(status, message)).await {
            tracing::error!(error = %e, "failed to record step outcome");
        }
    }

    async fn run_hooks(&self, job: &Job) {
        for hook in &self.hooks {
            match AssertUnwindSafe(hook.on_terminal(job)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(hook = hook.name(), error = %e, "terminal hook failed");
                }
                Err(payload) => {
                    tracing::warn!(
                        hook = hook.name(),
                        panic = %panic_message(payload.as_ref()),
                        "terminal hook panicked"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("toolchain", &self.toolchain)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::models::Capability;
    use crate::domain::ports::StageAdapter;
    use crate::services::job_registry::JobRegistry;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct ScriptedAdapter {
        stage: Stage,
        behavior: Behavior,
        calls: Arc<Mutex<Vec<Stage>>>,
    }

    #[async_trait]
    impl StageAdapter for ScriptedAdapter {
        fn stage(&self) -> Stage {
            self.stage
        }

        async fn invoke(&self, _ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
            self.calls.lock().unwrap().push(self.stage);
            match self.behavior {
                Behavior::Succeed => Ok(vec![]),
                Behavior::Fail => Err(StageError::ToolFailed(format!("{} broke", self.stage))),
                Behavior::Panic => panic!("adapter exploded"),
            }
        }
    }

    fn toolchain(overrides: &[(Stage, Behavior)], calls: &Arc<Mutex<Vec<Stage>>>) -> Toolchain {
        let mut toolchain = Toolchain::default();
        for stage in Stage::plan(&Capability::ALL) {
            let behavior = overrides
                .iter()
                .find(|(s, _)| *s == stage)
                .map_or(Behavior::Succeed, |(_, b)| *b);
            toolchain = toolchain.with_adapter(Arc::new(ScriptedAdapter {
                stage,
                behavior,
                calls: Arc::clone(calls),
            }));
        }
        toolchain
    }

    fn job(capabilities: Vec<Capability>) -> Job {
        let request = JobRequest {
            repo_url: "https://github.com/acme/widgets".to_string(),
            access_token: None,
            branch: None,
            capabilities,
            static_analysis_config: PathBuf::from("configs/semgrep.yml"),
            timeout_secs: 60,
        };
        Job::new(Uuid::new_v4(), request, Path::new("/nonexistent/work"))
    }

    async fn run(orchestrator: &JobOrchestrator, job: Job) -> Job {
        let registry = JobRegistry::new();
        let handle = registry.insert(job).await.unwrap();
        orchestrator.run(Arc::clone(&handle)).await;
        handle.snapshot().await
    }

    fn step_summary(job: &Job) -> Vec<(Stage, StepStatus)> {
        job.steps.iter().map(|s| (s.name, s.status)).collect()
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = JobOrchestrator::new(toolchain(&[], &calls));
        let job = run(&orchestrator, job(Capability::ALL.to_vec())).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.steps.len(), 6);
        assert!(job.steps.iter().all(|s| s.status == StepStatus::Succeeded));
        assert!(job.message.is_none());
        assert_eq!(*calls.lock().unwrap(), Stage::plan(&Capability::ALL));
    }

    #[tokio::test]
    async fn test_scanner_failure_does_not_stop_pipeline() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = JobOrchestrator::new(toolchain(
            &[(Stage::Scan(Capability::StaticAnalysis), Behavior::Fail)],
            &calls,
        ));
        let job = run(
            &orchestrator,
            job(vec![Capability::SecretScan, Capability::StaticAnalysis]),
        )
        .await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(
            step_summary(&job),
            vec![
                (Stage::Clone, StepStatus::Succeeded),
                (Stage::Scan(Capability::StaticAnalysis), StepStatus::Failed),
                (Stage::Scan(Capability::SecretScan), StepStatus::Succeeded),
                (Stage::Index, StepStatus::Succeeded),
                (Stage::Report, StepStatus::Succeeded),
            ]
        );
        assert_eq!(
            job.steps[1].message.as_deref(),
            Some("static_analysis broke")
        );
    }

    #[tokio::test]
    async fn test_clone_failure_stops_everything() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator =
            JobOrchestrator::new(toolchain(&[(Stage::Clone, Behavior::Fail)], &calls));
        let job = run(&orchestrator, job(vec![Capability::SecretScan])).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure, Some(FailureKind::StageFailed));
        assert_eq!(step_summary(&job), vec![(Stage::Clone, StepStatus::Failed)]);
        assert!(job.message.as_deref().unwrap().contains("clone"));
        assert_eq!(*calls.lock().unwrap(), vec![Stage::Clone]);
    }

    #[tokio::test]
    async fn test_index_failure_skips_report() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator =
            JobOrchestrator::new(toolchain(&[(Stage::Index, Behavior::Fail)], &calls));
        let job = run(&orchestrator, job(vec![])).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            step_summary(&job),
            vec![
                (Stage::Clone, StepStatus::Succeeded),
                (Stage::Index, StepStatus::Failed),
            ]
        );
        assert_eq!(job.message.as_deref(), Some("index stage failed: index broke"));
    }

    #[tokio::test]
    async fn test_panicking_stage_is_reconciled() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator =
            JobOrchestrator::new(toolchain(&[(Stage::Report, Behavior::Panic)], &calls));
        let job = run(&orchestrator, job(vec![])).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure, Some(FailureKind::Aborted));
        let last = job.steps.last().unwrap();
        assert_eq!(last.name, Stage::Report);
        assert_eq!(last.status, StepStatus::Failed);
        assert!(last.finished_at.is_some());
        assert!(job.message.as_deref().unwrap().contains("adapter exploded"));
    }

    #[tokio::test]
    async fn test_panicking_scanner_is_tolerated() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = JobOrchestrator::new(toolchain(
            &[(Stage::Scan(Capability::DependencyScan), Behavior::Panic)],
            &calls,
        ));
        let job = run(&orchestrator, job(vec![Capability::DependencyScan])).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.steps[1].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancel_before_start_records_no_steps() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = JobOrchestrator::new(toolchain(&[], &calls));
        let registry = JobRegistry::new();
        let handle = registry.insert(job(vec![Capability::SecretScan])).await.unwrap();
        handle.request_cancel().await;

        orchestrator.run(Arc::clone(&handle)).await;
        let job = handle.snapshot().await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure, Some(FailureKind::Canceled));
        assert!(job.steps.is_empty());
        assert_eq!(job.message.as_deref(), Some("job canceled before clone stage"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_adapter_fails_mandatory_stage() {
        let orchestrator = JobOrchestrator::new(Toolchain::default());
        let job = run(&orchestrator, job(vec![])).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.message.as_deref().unwrap().contains("no adapter configured"));
    }

    #[tokio::test]
    async fn test_second_run_is_ignored() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = JobOrchestrator::new(toolchain(&[], &calls));
        let registry = JobRegistry::new();
        let handle = registry.insert(job(vec![])).await.unwrap();

        orchestrator.run(Arc::clone(&handle)).await;
        orchestrator.run(Arc::clone(&handle)).await;

        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(handle.snapshot().await.steps.len(), 3);
    }

    struct FailingHook;

    #[async_trait]
    impl TerminalHook for FailingHook {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn on_terminal(&self, _job: &Job) -> DomainResult<()> {
            Err(DomainError::ValidationFailed("history store offline".to_string()))
        }
    }

    struct PanickingHook;

    #[async_trait]
    impl TerminalHook for PanickingHook {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn on_terminal(&self, _job: &Job) -> DomainResult<()> {
            panic!("hook exploded")
        }
    }

    #[tokio::test]
    async fn test_hook_failures_never_change_status() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = JobOrchestrator::new(toolchain(&[], &calls))
            .with_hook(Arc::new(FailingHook))
            .with_hook(Arc::new(PanickingHook));
        let registry = JobRegistry::new();
        let handle = registry.insert(job(vec![])).await.unwrap();

        orchestrator.run(Arc::clone(&handle)).await;

        assert_eq!(handle.snapshot().await.status, JobStatus::Succeeded);
        assert_eq!(handle.wait_terminal().await, JobStatus::Succeeded);
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            JobFailure::Canceled { before: Stage::Index }.kind(),
            FailureKind::Canceled
        );
        let aborted = JobFailure::from_stage_error(Stage::Index, StageError::Aborted("x".into()));
        assert_eq!(aborted.kind(), FailureKind::Aborted);
        let failed =
            JobFailure::from_stage_error(Stage::Clone, StageError::ToolFailed("git clone failed".into()));
        assert_eq!(failed.kind(), FailureKind::StageFailed);
        assert_eq!(failed.to_string(), "clone stage failed: git clone failed");
    }
}
