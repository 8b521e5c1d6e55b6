//! Mandatory index and report stages.
//!
//! Unlike the scanners these fail the stage on a non-zero exit and verify
//! that the artifact the next consumer depends on was written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::{ExternalCommand, Stage, INDEX_RECORDS_FILE};
use crate::domain::ports::{
    CommandSpec, ProcessOutput, ProcessRunner, StageAdapter, StageContext, StageError,
};

fn base_command(command: &ExternalCommand) -> CommandSpec {
    CommandSpec::new(&command.program).args(command.args.iter().cloned())
}

fn tool_failure(stage: Stage, output: &ProcessOutput) -> StageError {
    let detail = output.stderr.trim();
    let code = output
        .exit_code
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    if detail.is_empty() {
        StageError::ToolFailed(format!("{stage} exited with status {code}"))
    } else {
        StageError::ToolFailed(format!("{stage} exited with status {code}: {detail}"))
    }
}

async fn require(stage: Stage, path: &Path) -> Result<(), StageError> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        Ok(())
    } else {
        Err(StageError::MissingArtifact {
            stage,
            path: path.to_path_buf(),
        })
    }
}

/// Builds the code index for the cloned tree.
pub struct IndexAdapter {
    command: ExternalCommand,
    runner: Arc<dyn ProcessRunner>,
}

impl IndexAdapter {
    pub fn new(command: ExternalCommand, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { command, runner }
    }
}

#[async_trait]
impl StageAdapter for IndexAdapter {
    fn stage(&self) -> Stage {
        Stage::Index
    }

    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let out = &ctx.paths.index_dir;
        tokio::fs::create_dir_all(out)
            .await
            .map_err(|e| StageError::io(out, e))?;

        let command = base_command(&self.command)
            .args(["--repo".to_string(), ctx.paths.repo_dir.display().to_string()])
            .args(["--out".to_string(), out.display().to_string()])
            .timeout(ctx.timeout());
        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(tool_failure(Stage::Index, &output));
        }

        let records = out.join(INDEX_RECORDS_FILE);
        require(Stage::Index, &records).await?;
        Ok(vec![records])
    }
}

/// Renders the findings report from the reports and index directories.
pub struct ReportAdapter {
    command: ExternalCommand,
    runner: Arc<dyn ProcessRunner>,
}

impl ReportAdapter {
    pub fn new(command: ExternalCommand, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { command, runner }
    }
}

#[async_trait]
impl StageAdapter for ReportAdapter {
    fn stage(&self) -> Stage {
        Stage::Report
    }

    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let paths = ctx.paths;
        tokio::fs::create_dir_all(&paths.out_dir)
            .await
            .map_err(|e| StageError::io(&paths.out_dir, e))?;

        let command = base_command(&self.command)
            .args(["--index".to_string(), paths.index_dir.display().to_string()])
            .args(["--reports".to_string(), paths.reports_dir.display().to_string()])
            .args(["--out".to_string(), paths.report_path.display().to_string()])
            .timeout(ctx.timeout());
        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(tool_failure(Stage::Report, &output));
        }

        require(Stage::Report, &paths.report_path).await?;
        Ok(vec![paths.report_path.clone()])
    }
}
