//! Job domain model.
//!
//! A job is one end-to-end assessment of a remote repository: clone, the
//! selected scanners, index, report. Each executed stage leaves a [`Step`]
//! behind, in execution order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// File name of the generated report inside the job's output directory.
pub const REPORT_FILE_NAME: &str = "sow.md";

/// File name of the record list written by the indexer.
pub const INDEX_RECORDS_FILE: &str = "records.json";

/// A selectable analysis function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Static analysis (semgrep)
    #[serde(alias = "semgrep")]
    StaticAnalysis,
    /// Secret scanning (gitleaks)
    #[serde(alias = "gitleaks")]
    SecretScan,
    /// SBOM generation and vulnerability matching (syft + grype)
    #[serde(alias = "sbom")]
    DependencyScan,
}

impl Capability {
    /// Every capability, in canonical execution order.
    pub const ALL: [Self; 3] = [Self::StaticAnalysis, Self::SecretScan, Self::DependencyScan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticAnalysis => "static_analysis",
            Self::SecretScan => "secret_scan",
            Self::DependencyScan => "dependency_scan",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "static_analysis" | "semgrep" => Some(Self::StaticAnalysis),
            "secret_scan" | "gitleaks" => Some(Self::SecretScan),
            "dependency_scan" | "sbom" => Some(Self::DependencyScan),
            _ => None,
        }
    }

    /// Deduplicate a selection and put it in canonical order.
    pub fn canonical(selected: &[Self]) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|c| selected.contains(c))
            .collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Registered, not yet claimed by an execution
    Pending,
    /// Claimed by its execution and running stages
    Running,
    /// Report stage completed
    Succeeded,
    /// A mandatory stage failed or the job was canceled
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[Self::Running],
            Self::Running => &[Self::Succeeded, Self::Failed],
            Self::Succeeded | Self::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Succeeded,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Clone,
    Scan(Capability),
    Index,
    Report,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Scan(capability) => capability.as_str(),
            Self::Index => "index",
            Self::Report => "report",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clone" => Some(Self::Clone),
            "index" => Some(Self::Index),
            "report" => Some(Self::Report),
            other => Capability::from_str(other).map(Self::Scan),
        }
    }

    /// Mandatory stages fail the job; scanner stages are best-effort.
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, Self::Scan(_))
    }

    /// The fixed stage sequence for a capability selection.
    pub fn plan(capabilities: &[Capability]) -> Vec<Self> {
        let mut stages = vec![Self::Clone];
        stages.extend(Capability::canonical(capabilities).into_iter().map(Self::Scan));
        stages.push(Self::Index);
        stages.push(Self::Report);
        stages
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown stage: {name}")))
    }
}

/// Recorded outcome of one stage execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: Stage,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl Step {
    fn start(stage: Stage) -> Self {
        Self {
            name: stage,
            status: StepStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            message: None,
        }
    }

    fn finish(&mut self, status: StepStatus, message: Option<String>) {
        self.status = status;
        self.finished_at = Some(not_before(self.started_at));
        self.message = message;
    }
}

/// Why a job ended Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The cancellation flag was observed at a stage boundary
    Canceled,
    /// A mandatory stage reported an error
    StageFailed,
    /// A stage ended abnormally (panicked)
    Aborted,
}

/// Immutable submission parameters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub repo_url: String,
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,
    pub branch: Option<String>,
    pub capabilities: Vec<Capability>,
    pub static_analysis_config: PathBuf,
    pub timeout_secs: u64,
}

impl JobRequest {
    /// Budget applied to every process invocation of every stage.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRequest")
            .field("repo_url", &self.repo_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("branch", &self.branch)
            .field("capabilities", &self.capabilities)
            .field("static_analysis_config", &self.static_analysis_config)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Filesystem layout of a job, derived from its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub index_dir: PathBuf,
    pub out_dir: PathBuf,
    pub report_path: PathBuf,
}

impl JobPaths {
    pub fn for_job(work_root: &Path, id: Uuid) -> Self {
        let job_dir = work_root.join(id.simple().to_string());
        let out_dir = job_dir.join("out");
        Self {
            repo_dir: job_dir.join("repo"),
            reports_dir: job_dir.join("reports"),
            index_dir: job_dir.join("data").join("index"),
            report_path: out_dir.join(REPORT_FILE_NAME),
            out_dir,
            job_dir,
        }
    }
}

/// A job record.
///
/// Status moves Pending → Running → {Succeeded | Failed} and never leaves a
/// terminal state. At most one step is Running at a time and it is always the
/// last one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub request: JobRequest,
    pub status: JobStatus,
    pub steps: Vec<Step>,
    pub canceled: bool,
    pub message: Option<String>,
    pub failure: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub paths: JobPaths,
}

impl Job {
    pub fn new(id: Uuid, request: JobRequest, work_root: &Path) -> Self {
        Self {
            id,
            request,
            status: JobStatus::Pending,
            steps: Vec::new(),
            canceled: false,
            message: None,
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            paths: JobPaths::for_job(work_root, id),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The step currently in Running state, if any.
    pub fn running_step(&self) -> Option<&Step> {
        self.steps
            .last()
            .filter(|step| step.status == StepStatus::Running)
    }

    /// Pending → Running.
    pub fn start(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(not_before(self.created_at));
        Ok(())
    }

    /// Append a Running step for `stage`.
    pub fn begin_step(&mut self, stage: Stage) -> DomainResult<()> {
        if self.status != JobStatus::Running {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: JobStatus::Running,
            });
        }
        if let Some(step) = self.steps.last_mut() {
            if step.status == StepStatus::Running {
                step.finish(
                    StepStatus::Failed,
                    Some("superseded before completion".to_string()),
                );
            }
        }
        self.steps.push(Step::start(stage));
        Ok(())
    }

    /// Attach the terminal outcome to the running step.
    pub fn complete_step(&mut self, status: StepStatus, message: Option<String>) -> DomainResult<()> {
        let id = self.id;
        let step = self
            .steps
            .last_mut()
            .filter(|step| step.status == StepStatus::Running)
            .ok_or(DomainError::NoRunningStep(id))?;
        let status = if status.is_terminal() {
            status
        } else {
            StepStatus::Failed
        };
        step.finish(status, message);
        Ok(())
    }

    /// Running → Succeeded.
    pub fn succeed(&mut self) -> DomainResult<()> {
        self.transition(JobStatus::Succeeded)?;
        if self.running_step().is_some() {
            self.complete_step(StepStatus::Succeeded, None)?;
        }
        self.finish_clock();
        Ok(())
    }

    /// Running → Failed. A step still Running is reconciled to Failed.
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) -> DomainResult<()> {
        self.transition(JobStatus::Failed)?;
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "job failed".to_string();
        }
        if self.running_step().is_some() {
            self.complete_step(StepStatus::Failed, Some(message.clone()))?;
        }
        self.message = Some(message);
        self.failure = Some(kind);
        self.finish_clock();
        Ok(())
    }

    /// Set the cancellation flag. Returns `true` the first time.
    pub fn request_cancel(&mut self) -> bool {
        !std::mem::replace(&mut self.canceled, true)
    }

    fn transition(&mut self, to: JobStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    fn finish_clock(&mut self) {
        let floor = self.started_at.unwrap_or(self.created_at);
        self.finished_at = Some(not_before(floor));
    }
}

/// Current time, clamped so timestamps never run backwards.
fn not_before(floor: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(floor)
}
