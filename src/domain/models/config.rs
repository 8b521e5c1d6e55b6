use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for the analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Job limits and working directories
    #[serde(default)]
    pub jobs: JobsConfig,

    /// External tool locations
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to enable permissive CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: default_true(),
        }
    }
}

/// Job limits and working directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobsConfig {
    /// Root under which every job gets its own directory
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,

    /// Timeout budget used when a submission does not name one
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Smallest accepted timeout budget
    #[serde(default = "default_min_timeout_secs")]
    pub min_timeout_secs: u64,

    /// Largest accepted timeout budget
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// Static-analysis rule file used when a submission does not name one
    #[serde(default = "default_static_analysis_config")]
    pub default_static_analysis_config: String,

    /// Minimum length of an access credential
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

fn default_work_root() -> PathBuf {
    PathBuf::from("jobs")
}

const fn default_timeout_secs() -> u64 {
    900
}

const fn default_min_timeout_secs() -> u64 {
    60
}

const fn default_max_timeout_secs() -> u64 {
    7200
}

fn default_static_analysis_config() -> String {
    "configs/semgrep.yml".to_string()
}

const fn default_min_token_length() -> usize {
    20
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
            default_timeout_secs: default_timeout_secs(),
            min_timeout_secs: default_min_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            default_static_analysis_config: default_static_analysis_config(),
            min_token_length: default_min_token_length(),
        }
    }
}

/// An external command: program plus leading arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolsConfig {
    #[serde(default = "default_git")]
    pub git: String,

    #[serde(default = "default_semgrep")]
    pub semgrep: String,

    #[serde(default = "default_gitleaks")]
    pub gitleaks: String,

    #[serde(default = "default_syft")]
    pub syft: String,

    #[serde(default = "default_grype")]
    pub grype: String,

    /// Indexer command; the built-in `analyzer index` when unset
    #[serde(default)]
    pub indexer: Option<ExternalCommand>,

    /// Report generator command; the built-in `analyzer report` when unset
    #[serde(default)]
    pub report: Option<ExternalCommand>,

    /// Directory the static-analysis config path is resolved against
    #[serde(default = "default_config_root")]
    pub config_root: PathBuf,

    /// Timeout for `--version` style availability probes
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_git() -> String {
    "git".to_string()
}

fn default_semgrep() -> String {
    "semgrep".to_string()
}

fn default_gitleaks() -> String {
    "gitleaks".to_string()
}

fn default_syft() -> String {
    "syft".to_string()
}

fn default_grype() -> String {
    "grype".to_string()
}

fn default_config_root() -> PathBuf {
    PathBuf::from(".")
}

const fn default_probe_timeout_secs() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            semgrep: default_semgrep(),
            gitleaks: default_gitleaks(),
            syft: default_syft(),
            grype: default_grype(),
            indexer: None,
            report: None,
            config_root: default_config_root(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Rotation policy for file logs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output
    #[serde(default = "default_rotation")]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

const fn default_rotation() -> RotationPolicy {
    RotationPolicy::Daily
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
