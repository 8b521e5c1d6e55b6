use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid port: {0}. Must be non-zero")]
    InvalidPort(u16),

    #[error("Work root cannot be empty")]
    EmptyWorkRoot,

    #[error(
        "Invalid timeout range: min {min}s, default {default}s, max {max}s (need 0 < min <= default <= max)"
    )]
    InvalidTimeoutRange { min: u64, default: u64, max: u64 },

    #[error("Invalid probe timeout: {0}. Must be at least 1 second")]
    InvalidProbeTimeout(u64),

    #[error("Tool '{0}' program cannot be empty")]
    EmptyToolProgram(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .analyzer/config.yaml (project config)
    /// 3. .analyzer/local.yaml (local overrides, optional)
    /// 4. Environment variables (ANALYZER_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".analyzer/config.yaml"))
            .merge(Yaml::file(".analyzer/local.yaml"))
            .merge(Env::prefixed("ANALYZER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("ANALYZER_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort(config.server.port));
        }

        if config.jobs.work_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyWorkRoot);
        }

        let jobs = &config.jobs;
        if jobs.min_timeout_secs == 0
            || jobs.min_timeout_secs > jobs.default_timeout_secs
            || jobs.default_timeout_secs > jobs.max_timeout_secs
        {
            return Err(ConfigError::InvalidTimeoutRange {
                min: jobs.min_timeout_secs,
                default: jobs.default_timeout_secs,
                max: jobs.max_timeout_secs,
            });
        }

        if jobs.default_static_analysis_config.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "default_static_analysis_config cannot be empty".to_string(),
            ));
        }

        let tools = &config.tools;
        if tools.probe_timeout_secs == 0 {
            return Err(ConfigError::InvalidProbeTimeout(tools.probe_timeout_secs));
        }

        let programs = [
            ("git", tools.git.as_str()),
            ("semgrep", tools.semgrep.as_str()),
            ("gitleaks", tools.gitleaks.as_str()),
            ("syft", tools.syft.as_str()),
            ("grype", tools.grype.as_str()),
        ];
        for (name, program) in programs {
            if program.trim().is_empty() {
                return Err(ConfigError::EmptyToolProgram(name.to_string()));
            }
        }

        for (name, command) in [("indexer", &tools.indexer), ("report", &tools.report)] {
            if command
                .as_ref()
                .is_some_and(|c| c.program.trim().is_empty())
            {
                return Err(ConfigError::EmptyToolProgram(name.to_string()));
            }
        }

        Ok(())
    }
}
