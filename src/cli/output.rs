//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::services::{CapabilityReport, JobStatusView};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to a maximum number of characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Create a standard list table with the given headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

fn yes_no(available: bool) -> &'static str {
    if available {
        "yes"
    } else {
        "no"
    }
}

impl CommandOutput for JobStatusView {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Job:      {}", self.job_id),
            format!("Repo:     {}", self.repo_url),
            format!("Status:   {}", self.status),
        ];
        if let Some(ref branch) = self.branch {
            lines.push(format!("Branch:   {branch}"));
        }
        if let Some(ref message) = self.message {
            lines.push(format!("Message:  {message}"));
        }
        if self.canceled {
            lines.push("Canceled: yes".to_string());
        }

        let mut table = list_table(&["step", "status", "started", "finished", "message"]);
        for step in &self.steps {
            let message = step
                .message
                .as_deref()
                .and_then(|m| m.lines().next())
                .unwrap_or_default();
            table.add_row(vec![
                step.name.to_string(),
                step.status.as_str().to_string(),
                step.started_at.format("%H:%M:%S").to_string(),
                step.finished_at
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_default(),
                truncate(message, 60),
            ]);
        }
        if !self.steps.is_empty() {
            lines.push(String::new());
            lines.push(table.to_string());
        }

        if !self.artifacts.is_empty() {
            lines.push(String::new());
            lines.push(format!("Artifacts: {}", self.artifacts.join(", ")));
        }
        if self.report_available {
            lines.push("Report:    available".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CommandOutput for CapabilityReport {
    fn to_human(&self) -> String {
        let mut tools = list_table(&["tool", "available"]);
        for (name, available) in &self.tools {
            tools.add_row(vec![name.clone(), yes_no(*available).to_string()]);
        }
        let mut capabilities = list_table(&["capability", "available"]);
        for (name, available) in &self.capabilities {
            capabilities.add_row(vec![name.clone(), yes_no(*available).to_string()]);
        }
        format!("{tools}\n\n{capabilities}")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
