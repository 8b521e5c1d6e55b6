//! Implementation of the `analyzer serve` command.

use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::load_config;
use crate::adapters::http::JobsHttpServer;
use crate::cli::types::ServeArgs;
use crate::infrastructure::logging::LoggerImpl;
use crate::infrastructure::process::TokioProcessRunner;
use crate::services::JobService;

pub async fn execute(args: ServeArgs, _json_mode: bool) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let _logger = LoggerImpl::init(&config.logging)?;

    let runner = Arc::new(TokioProcessRunner::new());
    let service = Arc::new(JobService::new(&config, runner));
    tracing::info!(
        work_root = %service.jobs_config().work_root.display(),
        "job service ready"
    );

    JobsHttpServer::new(service, config.server)
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
        })
        .await
        .map_err(|e| anyhow!(e))
}
