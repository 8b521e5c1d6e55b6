pub mod config;
pub mod job;
pub mod run_summary;

pub use config::{
    Config, ExternalCommand, JobsConfig, LogFormat, LoggingConfig, RotationPolicy, ServerConfig,
    ToolsConfig,
};
pub use job::{
    Capability, FailureKind, Job, JobPaths, JobRequest, JobStatus, Stage, Step, StepStatus,
    INDEX_RECORDS_FILE, REPORT_FILE_NAME,
};
pub use run_summary::RunSummary;
