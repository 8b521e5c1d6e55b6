//! Tokio-backed implementation of the process runner port.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::ports::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
use crate::infrastructure::logging::redact_url;

/// Fixed environment applied to every child so tool output is stable.
const LOCALE_ENV: [(&str, &str); 3] = [
    ("LC_ALL", "C"),
    ("LANG", "C"),
    ("GIT_TERMINAL_PROMPT", "0"),
];

/// Runs commands with `tokio::process`.
///
/// Children are spawned with `kill_on_drop`, so when the timeout elapses and
/// the wait future is dropped the child is killed rather than left behind.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    default_timeout: Option<Duration>,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout applied to commands that do not carry their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        let shown = redact_url(&command.to_string());
        let timeout = command.timeout.or(self.default_timeout);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = command.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in LOCALE_ENV {
            cmd.env(key, value);
        }

        tracing::debug!(command = %shown, cwd = ?command.cwd, "spawning process");
        let started = Instant::now();

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        command = %shown,
                        timeout_secs = limit.as_secs(),
                        "process timed out and was killed"
                    );
                    return Err(ProcessError::Timeout {
                        program: command.program.clone(),
                        timeout: limit,
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| ProcessError::Io {
            program: command.program.clone(),
            source,
        })?;

        let result = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            command = %shown,
            exit_code = ?result.exit_code,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "process finished"
        );

        Ok(result)
    }
}
