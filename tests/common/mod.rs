//! Common test utilities for integration tests
//!
//! Provides a scripted process runner standing in for git, the scanners and
//! the pipeline tools, plus a job service wired on top of it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use analyzer::domain::models::{Config, ExternalCommand};
use analyzer::domain::ports::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
use analyzer::services::JobService;

pub const INDEXER: &str = "fake-indexer";
pub const REPORTER: &str = "fake-report";
pub const REPO_URL: &str = "https://github.com/acme/app";

/// How one fake tool behaves.
#[derive(Debug, Clone)]
pub struct Script {
    pub exit_code: i32,
    pub delay: Duration,
    pub spawn_error: bool,
    pub stdout: String,
    pub stderr: String,
    /// Write the artifact the real tool would produce
    pub writes_artifact: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            exit_code: 0,
            delay: Duration::ZERO,
            spawn_error: false,
            stdout: "{}".to_string(),
            stderr: String::new(),
            writes_artifact: true,
        }
    }
}

impl Script {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self {
            spawn_error: true,
            ..Self::default()
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    pub fn without_artifact(mut self) -> Self {
        self.writes_artifact = false;
        self
    }
}

struct Rule {
    program: String,
    arg: Option<String>,
    script: Script,
}

/// Process runner answering from scripts; unknown programs succeed.
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script every invocation of `program`.
    pub fn on(self, program: &str, script: Script) -> Self {
        self.push(program, None, script)
    }

    /// Script invocations of `program` that carry `arg`. Checked before
    /// program-wide scripts.
    pub fn on_arg(self, program: &str, arg: &str, script: Script) -> Self {
        self.push(program, Some(arg.to_string()), script)
    }

    fn push(self, program: &str, arg: Option<String>, script: Script) -> Self {
        let rule = Rule {
            program: program.to_string(),
            arg,
            script,
        };
        let mut rules = self.rules.lock().unwrap();
        if rule.arg.is_some() {
            rules.insert(0, rule);
        } else {
            rules.push(rule);
        }
        drop(rules);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Programs invoked, in order.
    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    fn script_for(&self, command: &CommandSpec) -> Script {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| {
                rule.program == command.program
                    && rule
                        .arg
                        .as_ref()
                        .map_or(true, |arg| command.args.iter().any(|a| a == arg))
            })
            .map(|rule| rule.script.clone())
            .unwrap_or_default()
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

const SARIF: &str = r#"{"version":"2.1.0","runs":[{"results":[{"ruleId":"demo"}]}]}"#;

/// Leave behind what the real tool would have written.
fn write_artifact(command: &CommandSpec) {
    let args = &command.args;
    match command.program.as_str() {
        "git" => {
            if let Some(dest) = args.last() {
                write_file(&Path::new(dest).join("app.py"), "print('hello')\n");
            }
        }
        "semgrep" => {
            if let Some(out) = value_after(args, "-o") {
                write_file(Path::new(out), SARIF);
            }
        }
        "gitleaks" => {
            if let Some(out) = value_after(args, "--report-path") {
                write_file(Path::new(out), SARIF);
            }
        }
        INDEXER => {
            if let Some(out) = value_after(args, "--out") {
                write_file(&Path::new(out).join("records.json"), "[]");
            }
        }
        REPORTER => {
            if let Some(out) = value_after(args, "--out") {
                write_file(Path::new(out), "# Findings\n");
            }
        }
        _ => {}
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(command.clone());
        let script = self.script_for(command);

        if script.spawn_error {
            return Err(ProcessError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        if !script.delay.is_zero() {
            // a delay past the budget reports the timeout without waiting it out
            if let Some(timeout) = command.timeout.filter(|t| *t < script.delay) {
                return Err(ProcessError::Timeout {
                    program: command.program.clone(),
                    timeout,
                });
            }
            tokio::time::sleep(script.delay).await;
        }

        if script.writes_artifact && script.exit_code == 0 {
            write_artifact(command);
        }

        Ok(ProcessOutput {
            exit_code: Some(script.exit_code),
            stdout: script.stdout,
            stderr: script.stderr,
        })
    }
}

/// Configuration pointing the work root at `work_root` and the pipeline
/// tools at the fake indexer and reporter.
pub fn test_config(work_root: &Path) -> Config {
    let mut config = Config::default();
    config.jobs.work_root = work_root.to_path_buf();
    config.tools.indexer = Some(ExternalCommand {
        program: INDEXER.to_string(),
        args: Vec::new(),
    });
    config.tools.report = Some(ExternalCommand {
        program: REPORTER.to_string(),
        args: Vec::new(),
    });
    config.tools.probe_timeout_secs = 1;
    config
}

/// A job service over `runner` with its own temporary work root.
pub struct Harness {
    pub service: Arc<JobService>,
    pub runner: Arc<FakeRunner>,
    pub work_root: TempDir,
}

impl Harness {
    pub fn new(runner: FakeRunner) -> Self {
        let work_root = tempfile::tempdir().expect("Failed to create temp dir");
        let runner = Arc::new(runner);
        let config = test_config(work_root.path());
        let service = Arc::new(JobService::new(&config, runner.clone()));
        Self {
            service,
            runner,
            work_root,
        }
    }

    pub fn work_root(&self) -> PathBuf {
        self.work_root.path().to_path_buf()
    }
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
