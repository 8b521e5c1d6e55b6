//! Implementation of the `analyzer run` command.
//!
//! Runs a single job through the same service the HTTP API uses and blocks
//! until it is terminal.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::load_config;
use crate::cli::output::output;
use crate::cli::types::RunArgs;
use crate::domain::models::JobStatus;
use crate::infrastructure::logging::init_stderr;
use crate::infrastructure::process::TokioProcessRunner;
use crate::services::{AnalyzeRequest, JobService};

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    init_stderr(&config.logging.level)?;

    let access_token = match args.token_env {
        Some(ref var) => Some(
            std::env::var(var)
                .with_context(|| format!("environment variable {var} is not set"))?,
        ),
        None => None,
    };

    let request = AnalyzeRequest {
        repo_url: args.repo_url,
        access_token,
        branch: args.branch,
        capabilities: (!args.capabilities.is_empty()).then_some(args.capabilities),
        static_analysis_config: args.static_analysis_config,
        timeout_secs: args.timeout_secs,
    };

    let service = JobService::new(&config, Arc::new(TokioProcessRunner::new()));
    let accepted = service.submit(request).await?;
    tracing::info!(job_id = %accepted.job_id, "waiting for job");

    let view = service.wait_for_terminal(accepted.job_id).await?;
    output(&view, json_mode);

    if view.status == JobStatus::Failed {
        bail!(
            "job {} failed: {}",
            view.job_id,
            view.message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
