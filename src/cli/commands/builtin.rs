//! Built-in pipeline commands.
//!
//! `analyzer index` and `analyzer report` are the default indexer and report
//! generator the toolchain invokes when no external program is configured.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::{IndexArgs, ReportArgs};
use crate::infrastructure::builtin::code_index::write_index;
use crate::infrastructure::builtin::findings_report::write_report;

#[derive(Debug, Serialize)]
pub struct IndexOutput {
    pub records: usize,
    pub out: String,
}

impl CommandOutput for IndexOutput {
    fn to_human(&self) -> String {
        format!("Indexed {} chunk(s) into {}", self.records, self.out)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ReportOutput {
    pub out: String,
}

impl CommandOutput for ReportOutput {
    fn to_human(&self) -> String {
        format!("Report written to {}", self.out)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn index(args: IndexArgs, json_mode: bool) -> Result<()> {
    let IndexArgs { repo, out } = args;
    let out_display = out.display().to_string();
    let records = tokio::task::spawn_blocking(move || write_index(&repo, &out)).await??;
    output(
        &IndexOutput {
            records,
            out: out_display,
        },
        json_mode,
    );
    Ok(())
}

pub async fn report(args: ReportArgs, json_mode: bool) -> Result<()> {
    let ReportArgs {
        index,
        reports,
        out,
    } = args;
    let out_display = out.display().to_string();
    tokio::task::spawn_blocking(move || write_report(&index, &reports, &out)).await??;
    output(&ReportOutput { out: out_display }, json_mode);
    Ok(())
}
