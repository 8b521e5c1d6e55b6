//! Analyzer - repository security assessment service
//!
//! Accepts analysis jobs for remote repositories, runs each one through a
//! fixed pipeline of external tools (clone, scanners, index, report) in its own
//! working directory, and exposes status, cancellation and results.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Job model, errors and ports
//! - **Service Layer** (`services`): Registry, orchestration and the job API
//! - **Infrastructure Layer** (`infrastructure`): Processes, tool adapters, config, logging
//! - **Adapters** (`adapters`): HTTP boundary
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use analyzer::{AnalyzeRequest, Config, JobService, TokioProcessRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = JobService::new(&Config::default(), Arc::new(TokioProcessRunner::new()));
//!     let accepted = service.submit(AnalyzeRequest::new("https://github.com/acme/app")).await?;
//!     let view = service.wait_for_terminal(accepted.job_id).await?;
//!     println!("{}", view.status);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Capability, Config, Job, JobRequest, JobStatus, JobsConfig, LoggingConfig, RunSummary, Stage,
    Step, StepStatus, ToolsConfig,
};
pub use domain::ports::{ProcessRunner, StageAdapter, TerminalHook};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::process::TokioProcessRunner;
pub use services::{AnalyzeRequest, JobService, JobStatusView};
