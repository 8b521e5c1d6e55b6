//! Implementation of the `analyzer tools` command.

use std::sync::Arc;

use anyhow::Result;

use super::load_config;
use crate::cli::output::output;
use crate::cli::types::ToolsArgs;
use crate::infrastructure::logging::init_stderr;
use crate::infrastructure::process::TokioProcessRunner;
use crate::infrastructure::tools::{capability_availability, ToolProbe};
use crate::services::CapabilityReport;

pub async fn execute(args: ToolsArgs, json_mode: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    init_stderr(&config.logging.level)?;

    let probe = ToolProbe::from_config(&config.tools, Arc::new(TokioProcessRunner::new()));
    let tools = probe.probe().await;
    let report = CapabilityReport {
        capabilities: capability_availability(&tools),
        tools,
    };
    output(&report, json_mode);
    Ok(())
}
