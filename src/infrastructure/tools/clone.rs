use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::Stage;
use crate::domain::ports::{CommandSpec, ProcessRunner, StageAdapter, StageContext, StageError};
use crate::infrastructure::logging::{redact_url, SecretScrubber};

/// Shallow `git clone` of the requested repository into the job's repo dir.
pub struct GitCloneAdapter {
    program: String,
    runner: Arc<dyn ProcessRunner>,
}

impl GitCloneAdapter {
    pub fn new(program: impl Into<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }
}

/// Embed an access token into an https URL as `x-access-token`.
///
/// Plain http URLs and requests without a token are returned unchanged. Any
/// userinfo already present is replaced.
pub fn authenticated_url(repo_url: &str, token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return repo_url.to_string();
    };
    let Some(rest) = repo_url.strip_prefix("https://") else {
        return repo_url.to_string();
    };
    let host_and_path = match rest.split_once('@') {
        Some((userinfo, tail)) if !userinfo.contains('/') => tail,
        _ => rest,
    };
    format!("https://x-access-token:{token}@{host_and_path}")
}

#[async_trait]
impl StageAdapter for GitCloneAdapter {
    fn stage(&self) -> Stage {
        Stage::Clone
    }

    async fn invoke(&self, ctx: &StageContext<'_>) -> Result<Vec<PathBuf>, StageError> {
        let request = ctx.request;
        let dest = &ctx.paths.repo_dir;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StageError::io(parent, e))?;
        }

        let url = authenticated_url(&request.repo_url, request.access_token.as_deref());
        let mut command = CommandSpec::new(&self.program).args(["clone", "--depth", "1"]);
        if let Some(ref branch) = request.branch {
            command = command.args(["--branch", branch.as_str()]);
        }
        let command = command
            .arg(url)
            .arg(dest.display().to_string())
            .timeout(ctx.timeout());

        let output = self.runner.run(&command).await?;
        if !output.success() {
            let scrubber = SecretScrubber::new().with_secret(request.access_token.as_deref());
            let stderr = scrubber.scrub(output.stderr.trim());
            tracing::warn!(
                job_id = %ctx.job_id,
                exit_code = ?output.exit_code,
                repo_url = %redact_url(&request.repo_url),
                "clone exited with failure"
            );
            return Err(StageError::ToolFailed(format!(
                "git clone failed: {}\n{stderr}",
                redact_url(&request.repo_url)
            )));
        }

        Ok(vec![dest.clone()])
    }
}
