use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::models::{Capability, ToolsConfig};
use crate::domain::ports::{CommandSpec, ProcessRunner};

/// Checks which external tools are invocable without running a job.
pub struct ToolProbe {
    runner: Arc<dyn ProcessRunner>,
    probes: Vec<(&'static str, CommandSpec)>,
}

impl ToolProbe {
    pub fn from_config(tools: &ToolsConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let timeout = Duration::from_secs(tools.probe_timeout_secs);
        let probe = |program: &str, arg: &str| CommandSpec::new(program).arg(arg).timeout(timeout);
        Self {
            runner,
            probes: vec![
                ("git", probe(&tools.git, "--version")),
                ("semgrep", probe(&tools.semgrep, "--version")),
                ("gitleaks", probe(&tools.gitleaks, "version")),
                ("syft", probe(&tools.syft, "version")),
                ("grype", probe(&tools.grype, "version")),
            ],
        }
    }

    /// Run every probe concurrently. A spawn error, timeout or non-zero exit
    /// marks the tool unavailable.
    pub async fn probe(&self) -> BTreeMap<String, bool> {
        let checks = self.probes.iter().map(|(name, command)| async move {
            let available = match self.runner.run(command).await {
                Ok(output) => output.success(),
                Err(e) => {
                    tracing::debug!(tool = *name, error = %e, "tool probe failed");
                    false
                }
            };
            ((*name).to_string(), available)
        });
        join_all(checks).await.into_iter().collect()
    }
}

/// Derive per-capability availability from the raw tool map.
pub fn capability_availability(tools: &BTreeMap<String, bool>) -> BTreeMap<String, bool> {
    let has = |name: &str| tools.get(name).copied().unwrap_or(false);
    Capability::ALL
        .into_iter()
        .map(|capability| {
            let available = match capability {
                Capability::StaticAnalysis => has("semgrep"),
                Capability::SecretScan => has("gitleaks"),
                Capability::DependencyScan => has("syft") && has("grype"),
            };
            (capability.as_str().to_string(), available)
        })
        .collect()
}
