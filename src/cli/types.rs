//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::models::Capability;

#[derive(Parser, Debug)]
#[command(name = "analyzer")]
#[command(about = "Analyzer - repository security assessment service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Run one analysis job in-process and wait for it
    Run(RunArgs),

    /// Show which external tools and capabilities are available
    Tools(ToolsArgs),

    /// Build the code index for a source tree (built-in indexer)
    Index(IndexArgs),

    /// Render the findings report (built-in report generator)
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file (defaults to .analyzer/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind, overrides configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overrides configuration
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Repository URL (http or https)
    pub repo_url: String,

    /// Branch to clone
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Capability to run; repeat for several. All capabilities when omitted
    #[arg(short = 'C', long = "capability", value_parser = parse_capability)]
    pub capabilities: Vec<Capability>,

    /// Per-stage timeout budget in seconds
    #[arg(short, long)]
    pub timeout_secs: Option<u64>,

    /// Static-analysis rule file, relative to the tool config root
    #[arg(long)]
    pub static_analysis_config: Option<String>,

    /// Name of the environment variable holding the repository access token
    #[arg(long)]
    pub token_env: Option<String>,

    /// Configuration file (defaults to .analyzer/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Configuration file (defaults to .analyzer/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Source tree to index
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Output directory for records.json
    #[arg(long, default_value = "data/index")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Index directory
    #[arg(long)]
    pub index: PathBuf,

    /// Directory holding the scanner SARIF files
    #[arg(long, default_value = "reports")]
    pub reports: PathBuf,

    /// Output markdown file
    #[arg(long, default_value = "out/sow.md")]
    pub out: PathBuf,
}

fn parse_capability(s: &str) -> Result<Capability, String> {
    Capability::from_str(s).ok_or_else(|| {
        format!("unknown capability '{s}' (expected static_analysis, secret_scan or dependency_scan)")
    })
}
