//! Service layer: job registry, orchestration and the boundary-facing job API.

pub mod artifacts;
pub mod job_orchestrator;
pub mod job_registry;
pub mod job_service;
pub mod run_history;

pub use job_orchestrator::{JobFailure, JobOrchestrator};
pub use job_registry::{JobHandle, JobRegistry};
pub use job_service::{
    AnalyzeRequest, CapabilityReport, JobService, JobStatusView, JobSummary, SubmitResponse,
};
pub use run_history::RunHistory;
