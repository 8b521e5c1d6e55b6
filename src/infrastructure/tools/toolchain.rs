use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::models::{ExternalCommand, Stage, ToolsConfig};
use crate::domain::ports::{ProcessRunner, StageAdapter};

use super::clone::GitCloneAdapter;
use super::pipeline::{IndexAdapter, ReportAdapter};
use super::scanners::{DependencyScanAdapter, GitleaksAdapter, SemgrepAdapter};

/// The set of stage adapters a job can draw from.
#[derive(Clone, Default)]
pub struct Toolchain {
    adapters: HashMap<Stage, Arc<dyn StageAdapter>>,
}

impl Toolchain {
    /// Build a toolchain from explicit adapters; later entries replace earlier
    /// ones for the same stage.
    pub fn new(adapters: impl IntoIterator<Item = Arc<dyn StageAdapter>>) -> Self {
        let mut toolchain = Self::default();
        for adapter in adapters {
            toolchain = toolchain.with_adapter(adapter);
        }
        toolchain
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn StageAdapter>) -> Self {
        self.adapters.insert(adapter.stage(), adapter);
        self
    }

    /// Wire the production adapters for every stage.
    pub fn from_config(tools: &ToolsConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let indexer = tools
            .indexer
            .clone()
            .unwrap_or_else(|| builtin_command("index"));
        let report = tools
            .report
            .clone()
            .unwrap_or_else(|| builtin_command("report"));

        Self::new([
            Arc::new(GitCloneAdapter::new(&tools.git, Arc::clone(&runner))) as Arc<dyn StageAdapter>,
            Arc::new(SemgrepAdapter::new(
                &tools.semgrep,
                absolute(&tools.config_root),
                Arc::clone(&runner),
            )),
            Arc::new(GitleaksAdapter::new(&tools.gitleaks, Arc::clone(&runner))),
            Arc::new(DependencyScanAdapter::new(
                &tools.syft,
                &tools.grype,
                Arc::clone(&runner),
            )),
            Arc::new(IndexAdapter::new(indexer, Arc::clone(&runner))),
            Arc::new(ReportAdapter::new(report, runner)),
        ])
    }

    pub fn adapter_for(&self, stage: Stage) -> Option<Arc<dyn StageAdapter>> {
        self.adapters.get(&stage).cloned()
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stages: Vec<&str> = self.adapters.keys().map(Stage::name).collect();
        stages.sort_unstable();
        f.debug_struct("Toolchain").field("stages", &stages).finish()
    }
}

/// A subcommand of the running executable.
fn builtin_command(subcommand: &str) -> ExternalCommand {
    let program = std::env::current_exe().map_or_else(
        |_| env!("CARGO_PKG_NAME").to_string(),
        |path| path.display().to_string(),
    );
    ExternalCommand {
        program,
        args: vec![subcommand.to_string()],
    }
}

/// Resolve `path` against the current directory, leaving it as-is on failure.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
