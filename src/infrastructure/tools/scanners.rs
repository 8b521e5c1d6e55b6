//! Best-effort scanner adapters.
//!
//! Scanners commonly exit non-zero when they find something, so an exit code
//! alone never fails the stage. Only spawn errors, timeouts and I/O errors do.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::{Capability, Stage};
use crate::domain::ports::{
    CommandSpec, ProcessOutput, ProcessRunner, StageAdapter, StageContext, StageError,
};

pub const SEMGREP_REPORT: &str = "semgrep.sarif";
pub const GITLEAKS_REPORT: &str = "gitleaks.sarif";
pub const SBOM_FILE: &str = "sbom.json";
pub const GRYPE_REPORT: &str = "grype.sarif";

async fn ensure_dir(dir: &Path) -> Result<(), StageError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StageError::io(dir, e))
}

/// Log a non-zero scanner exit without failing the stage.
fn note_exit(ctx: &StageContext<'_>, tool: &str, output: &ProcessOutput) {
    if !output.success() {
        tracing::warn!(
            job_id = %ctx.job_id,
            tool,
            exit_code = ?output.exit_code,
            "scanner exited non-zero, continuing"
        );
    }
}

/// Keep only the artifacts that actually exist on disk.
async fn existing(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut present = Vec::with_capacity(paths.len());
    for path in paths {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            present.push(path);
        }
    }
    present
}

/// `semgrep scan` with SARIF output.
pub struct SemgrepAdapter {
    program: String,
    config_root: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl SemgrepAdapter {
    pub fn new(
        program: impl Into<String>,
        config_root: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            config_root: config_root.into(),
            runner,
        }
    }
}

#[async_trait]
impl StageAdapter for SemgrepAdapter {
    fn stage(&self) -> Stage {
        Stage::Scan(Capability::StaticAnalysis)
    }

    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let reports = &ctx.paths.reports_dir;
        ensure_dir(reports).await?;

        let out = reports.join(SEMGREP_REPORT);
        let config = self.config_root.join(&ctx.request.static_analysis_config);
        let command = CommandSpec::new(&self.program)
            .arg("scan")
            .args(["--config".to_string(), config.display().to_string()])
            .arg("--sarif")
            .args(["-o".to_string(), out.display().to_string()])
            .current_dir(&ctx.paths.repo_dir)
            .timeout(ctx.timeout());

        let output = self.runner.run(&command).await?;
        note_exit(ctx, "semgrep", &output);
        Ok(existing(vec![out]).await)
    }
}

/// `gitleaks detect` with SARIF output.
pub struct GitleaksAdapter {
    program: String,
    runner: Arc<dyn ProcessRunner>,
}

impl GitleaksAdapter {
    pub fn new(program: impl Into<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }
}

#[async_trait]
impl StageAdapter for GitleaksAdapter {
    fn stage(&self) -> Stage {
        Stage::Scan(Capability::SecretScan)
    }

    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let reports = &ctx.paths.reports_dir;
        ensure_dir(reports).await?;

        let out = reports.join(GITLEAKS_REPORT);
        let command = CommandSpec::new(&self.program)
            .arg("detect")
            .args(["--source".to_string(), ctx.paths.repo_dir.display().to_string()])
            .args(["--report-format", "sarif"])
            .args(["--report-path".to_string(), out.display().to_string()])
            .timeout(ctx.timeout());

        let output = self.runner.run(&command).await?;
        note_exit(ctx, "gitleaks", &output);
        Ok(existing(vec![out]).await)
    }
}

/// SBOM generation with syft followed by vulnerability matching with grype.
///
/// Both tools print their document on stdout; the adapter writes it to the
/// reports directory.
pub struct DependencyScanAdapter {
    syft: String,
    grype: String,
    runner: Arc<dyn ProcessRunner>,
}

impl DependencyScanAdapter {
    pub fn new(
        syft: impl Into<String>,
        grype: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            syft: syft.into(),
            grype: grype.into(),
            runner,
        }
    }
}

#[async_trait]
impl StageAdapter for DependencyScanAdapter {
    fn stage(&self) -> Stage {
        Stage::Scan(Capability::DependencyScan)
    }

    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let reports = &ctx.paths.reports_dir;
        ensure_dir(reports).await?;

        let sbom = reports.join(SBOM_FILE);
        let syft = CommandSpec::new(&self.syft)
            .arg(format!("dir:{}", ctx.paths.repo_dir.display()))
            .args(["-o", "cyclonedx-json"])
            .current_dir(&ctx.paths.repo_dir)
            .timeout(ctx.timeout());
        let output = self.runner.run(&syft).await?;
        note_exit(ctx, "syft", &output);
        tokio::fs::write(&sbom, output.stdout.as_bytes())
            .await
            .map_err(|e| StageError::io(&sbom, e))?;

        let findings = reports.join(GRYPE_REPORT);
        let grype = CommandSpec::new(&self.grype)
            .arg(format!("sbom:{}", sbom.display()))
            .args(["-o", "sarif"])
            .timeout(ctx.timeout());
        let output = self.runner.run(&grype).await?;
        note_exit(ctx, "grype", &output);
        tokio::fs::write(&findings, output.stdout.as_bytes())
            .await
            .map_err(|e| StageError::io(&findings, e))?;

        Ok(vec![sbom, findings])
    }
}
