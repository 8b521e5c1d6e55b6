//! Built-in report generator.
//!
//! Summarizes the SARIF findings in a reports directory and the index size
//! into a markdown statement-of-work draft.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::code_index::count_records;

/// Scanner outputs summarized by the report, in section order.
pub const SARIF_SOURCES: [(&str, &str); 4] = [
    ("semgrep.sarif", "SAST (Semgrep)"),
    ("codeql.sarif", "SAST (CodeQL)"),
    ("gitleaks.sarif", "Secrets (Gitleaks)"),
    ("grype.sarif", "Dependencies/Vulns (Grype from Syft SBOM)"),
];

const DEFAULT_ASVS_LEVEL: &str = "L1";

/// Number of results in the first run of a SARIF file.
///
/// Missing, unreadable or malformed files count as zero.
pub fn count_sarif_results(path: &Path) -> usize {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return 0;
    };
    let Ok(doc) = serde_json::from_str::<Value>(&raw) else {
        tracing::debug!(path = %path.display(), "ignoring malformed SARIF");
        return 0;
    };
    doc.get("runs")
        .and_then(|runs| runs.get(0))
        .and_then(|run| run.get("results"))
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn section(title: &str, findings: usize) -> String {
    if findings == 0 {
        format!("### {title}\n- No findings (or report missing).\n")
    } else {
        format!("### {title}\n- Findings: {findings}\n")
    }
}

fn proposed_scopes(asvs_level: &str) -> String {
    format!(
        "## Proposed Scopes
1) **SAST + Secrets Remediation Sprint**
   - **Acceptance**: No Critical findings; Highs <= 3; PR checks enforcing SARIF gates.
   - **Deliverables**: Fixed PRs, rule suppressions with rationale, updated docs.

2) **Supply Chain Hardening**
   - **Acceptance**: Cosign-signed images; SBOM published; SLSA build provenance (Level 1→2).
   - **Deliverables**: CI pipeline, release notes, verification docs.

3) **AuthN/Z Review + Controls**
   - **Acceptance**: ASVS {asvs_level} controls met for session mgmt, SSO, authorization checks.
   - **Deliverables**: Threat model notes, unit/integration tests, enforcement middleware.

4) **Observability MVP**
   - **Acceptance**: OTel traces across request path, p95 latency SLO alarms, error budget policy.
   - **Deliverables**: Dashboards (Grafana), runbook.

5) **Web Quality Gate**
   - **Acceptance**: Lighthouse perf ≥ 0.8; axe critical = 0; Playwright smoke green.

6) **Perf Smoke**
   - **Acceptance**: k6 p95 < 500ms for top 3 endpoints at VU=5 for 1m.
"
    )
}

/// Render the report markdown.
pub fn render_report(index_dir: &Path, reports_dir: &Path, asvs_level: &str) -> String {
    let mut sections = vec![
        "# Production Readiness SoW (Draft)".to_string(),
        format!("_Target ASVS Level: **{asvs_level}**_  "),
        "This draft groups scanner findings by workstream and proposes priceable scopes with acceptance criteria."
            .to_string(),
    ];

    for (file, title) in SARIF_SOURCES {
        sections.push(section(title, count_sarif_results(&reports_dir.join(file))));
    }

    let index_line = match count_records(index_dir) {
        Some(n) => format!("### Code Index\n- Indexed chunks: {n}\n"),
        None => "### Code Index\n- Index missing.\n".to_string(),
    };
    sections.push(index_line);
    sections.push(proposed_scopes(asvs_level));

    sections.join("\n\n")
}

/// Target ASVS level from `ASVS_LEVEL`, defaulting to L1.
pub fn asvs_level_from_env() -> String {
    std::env::var("ASVS_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ASVS_LEVEL.to_string())
}

/// Render and write the report to `out`, creating its parent directory.
pub fn write_report(index_dir: &Path, reports_dir: &Path, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let markdown = render_report(index_dir, reports_dir, &asvs_level_from_env());
    std::fs::write(out, markdown).with_context(|| format!("Failed to write {}", out.display()))?;
    tracing::info!(out = %out.display(), "report written");
    Ok(())
}
