//! Boundary-facing job API.
//!
//! Submission validates the request, registers a Pending job and hands it to a
//! background task; every other operation reads registry state and the job's
//! working directory without waiting on the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifacts::{is_safe_artifact_name, list_artifacts};
use super::job_orchestrator::JobOrchestrator;
use super::job_registry::{JobHandle, JobRegistry};
use super::run_history::RunHistory;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Capability, Config, FailureKind, Job, JobRequest, JobStatus, JobsConfig, RunSummary, Step,
};
use crate::domain::ports::{ProcessRunner, TerminalHook};
use crate::infrastructure::logging::redact_url;
use crate::infrastructure::tools::toolchain::absolute;
use crate::infrastructure::tools::{capability_availability, ToolProbe, Toolchain};

/// Submission as received from a boundary.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub repo_url: String,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    /// Defaults to every capability
    #[serde(default)]
    pub capabilities: Option<Vec<Capability>>,
    /// Static-analysis rule file, relative to the tool config root
    #[serde(default)]
    pub static_analysis_config: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl AnalyzeRequest {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for AnalyzeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeRequest")
            .field("repo_url", &redact_url(&self.repo_url))
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("branch", &self.branch)
            .field("capabilities", &self.capabilities)
            .field("static_analysis_config", &self.static_analysis_config)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Acknowledgement of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Read-only snapshot of a job for boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: Uuid,
    pub repo_url: String,
    pub branch: Option<String>,
    pub status: JobStatus,
    pub canceled: bool,
    pub message: Option<String>,
    pub failure: Option<FailureKind>,
    pub capabilities: Vec<Capability>,
    pub timeout_secs: u64,
    pub steps: Vec<Step>,
    /// File names currently present in the reports directory
    pub artifacts: Vec<String>,
    pub report_available: bool,
    pub reports_dir_present: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One line of the job listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub repo_url: String,
    pub status: JobStatus,
    pub canceled: bool,
    pub created_at: DateTime<Utc>,
}

/// Tool and capability availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub capabilities: BTreeMap<String, bool>,
    pub tools: BTreeMap<String, bool>,
}

/// The job service.
pub struct JobService {
    registry: Arc<JobRegistry>,
    orchestrator: Arc<JobOrchestrator>,
    history: Arc<RunHistory>,
    probe: ToolProbe,
    jobs: JobsConfig,
}

impl JobService {
    /// Wire the production toolchain for `config` on top of `runner`.
    pub fn new(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        let toolchain = Toolchain::from_config(&config.tools, Arc::clone(&runner));
        let probe = ToolProbe::from_config(&config.tools, runner);
        Self::with_toolchain(config.jobs.clone(), toolchain, probe)
    }

    /// Build a service around an explicit toolchain.
    pub fn with_toolchain(mut jobs: JobsConfig, toolchain: Toolchain, probe: ToolProbe) -> Self {
        // tools run with other working directories, so job paths must not be relative
        jobs.work_root = absolute(&jobs.work_root);
        let history = Arc::new(RunHistory::new());
        let hook: Arc<dyn TerminalHook> = history.clone();
        let orchestrator = JobOrchestrator::new(toolchain).with_hook(hook);
        Self {
            registry: Arc::new(JobRegistry::new()),
            orchestrator: Arc::new(orchestrator),
            history,
            probe,
            jobs,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn jobs_config(&self) -> &JobsConfig {
        &self.jobs
    }

    /// Check a submission and turn it into an immutable job request.
    pub fn validate(&self, request: AnalyzeRequest) -> DomainResult<JobRequest> {
        let repo_url = request.repo_url.trim().to_string();
        if !(repo_url.starts_with("https://") || repo_url.starts_with("http://")) {
            return Err(DomainError::ValidationFailed(
                "repo_url must be an http(s) URL".to_string(),
            ));
        }

        let access_token = request.access_token.filter(|t| !t.is_empty());
        if let Some(ref token) = access_token {
            if token.len() < self.jobs.min_token_length {
                return Err(DomainError::ValidationFailed(format!(
                    "access_token must be at least {} characters",
                    self.jobs.min_token_length
                )));
            }
        }

        if let Some(ref branch) = request.branch {
            if branch.trim().is_empty() || branch.starts_with('-') {
                return Err(DomainError::ValidationFailed(
                    "branch must be non-empty and must not start with '-'".to_string(),
                ));
            }
        }

        let timeout_secs = request
            .timeout_secs
            .unwrap_or(self.jobs.default_timeout_secs);
        if !(self.jobs.min_timeout_secs..=self.jobs.max_timeout_secs).contains(&timeout_secs) {
            return Err(DomainError::ValidationFailed(format!(
                "timeout_secs must be between {} and {}",
                self.jobs.min_timeout_secs, self.jobs.max_timeout_secs
            )));
        }

        let capabilities = match request.capabilities {
            Some(selected) => Capability::canonical(&selected),
            None => Capability::ALL.to_vec(),
        };

        let static_analysis_config = request
            .static_analysis_config
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.jobs.default_static_analysis_config.clone());

        Ok(JobRequest {
            repo_url,
            access_token,
            branch: request.branch,
            capabilities,
            static_analysis_config: PathBuf::from(static_analysis_config),
            timeout_secs,
        })
    }

    /// Register a job and start it in the background. Never waits on the
    /// pipeline.
    pub async fn submit(&self, request: AnalyzeRequest) -> DomainResult<SubmitResponse> {
        let request = self.validate(request)?;
        let job = Job::new(Uuid::new_v4(), request, &self.jobs.work_root);
        let job_id = job.id;
        let status = job.status;

        let handle = self.registry.insert(job).await?;
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move { orchestrator.run(handle).await });

        tracing::info!(job_id = %job_id, "job submitted");
        Ok(SubmitResponse { job_id, status })
    }

    pub async fn status(&self, job_id: Uuid) -> DomainResult<JobStatusView> {
        let handle = self.registry.get(job_id).await?;
        Self::view(&handle).await
    }

    /// Set the cancellation flag. Does not wait for the job to stop.
    pub async fn cancel(&self, job_id: Uuid) -> DomainResult<()> {
        let handle = self.registry.get(job_id).await?;
        if handle.request_cancel().await {
            tracing::info!(job_id = %job_id, "cancellation requested");
        }
        Ok(())
    }

    /// The report markdown, once the report stage has written it.
    pub async fn report(&self, job_id: Uuid) -> DomainResult<String> {
        let handle = self.registry.get(job_id).await?;
        let path = handle.snapshot().await.paths.report_path;
        match tokio::fs::read_to_string(&path).await {
            Ok(markdown) => Ok(markdown),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DomainError::ReportNotAvailable(job_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Raw content of one file in the job's reports directory.
    pub async fn artifact(&self, job_id: Uuid, name: &str) -> DomainResult<Vec<u8>> {
        let handle = self.registry.get(job_id).await?;
        let not_found = || DomainError::ArtifactNotFound {
            job_id,
            name: name.to_string(),
        };
        if !is_safe_artifact_name(name) {
            return Err(not_found());
        }
        let path = handle.snapshot().await.paths.reports_dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::IsADirectory
                ) =>
            {
                Err(not_found())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Raw availability of each external tool.
    pub async fn tools(&self) -> BTreeMap<String, bool> {
        self.probe.probe().await
    }

    pub async fn capabilities(&self) -> CapabilityReport {
        let tools = self.tools().await;
        CapabilityReport {
            capabilities: capability_availability(&tools),
            tools,
        }
    }

    /// Last-known run for a repository. Performs no work.
    pub async fn last_run(&self, repo_url: &str) -> Option<RunSummary> {
        self.history.lookup(repo_url).await
    }

    /// Every registered job, newest first.
    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        let mut summaries = Vec::new();
        for handle in self.registry.list().await {
            let job = handle.snapshot().await;
            summaries.push(JobSummary {
                job_id: job.id,
                repo_url: redact_url(&job.request.repo_url),
                status: job.status,
                canceled: job.canceled,
                created_at: job.created_at,
            });
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Resolve once the job is terminal and its post-processing has run.
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> DomainResult<JobStatusView> {
        let handle = self.registry.get(job_id).await?;
        handle.wait_terminal().await;
        Self::view(&handle).await
    }

    async fn view(handle: &JobHandle) -> DomainResult<JobStatusView> {
        let job = handle.snapshot().await;
        let artifacts = list_artifacts(&job.paths.reports_dir).await?;
        let reports_dir_present = tokio::fs::try_exists(&job.paths.reports_dir)
            .await
            .unwrap_or(false);
        let report_available = tokio::fs::try_exists(&job.paths.report_path)
            .await
            .unwrap_or(false);

        Ok(JobStatusView {
            job_id: job.id,
            repo_url: redact_url(&job.request.repo_url),
            branch: job.request.branch,
            status: job.status,
            canceled: job.canceled,
            message: job.message,
            failure: job.failure,
            capabilities: job.request.capabilities,
            timeout_secs: job.request.timeout_secs,
            steps: job.steps,
            artifacts,
            report_available,
            reports_dir_present,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        })
    }
}

impl fmt::Debug for JobService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobService")
            .field("orchestrator", &self.orchestrator)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}
