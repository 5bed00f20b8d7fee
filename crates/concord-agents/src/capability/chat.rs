use std::time::Duration;

use async_trait::async_trait;
use concord_models::ChatConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CompletionError;

/// Per-request options for a chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub system_prompt: Option<String>,
}

impl ChatOptions {
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
        }
    }
}

/// A text-in, text-out language model. Implementations own their retry policy;
/// the error returned is final.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, options: &ChatOptions) -> Result<String, CompletionError>;
}

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "too many requests", "429", "overloaded"];

fn is_rate_limited(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Chat completion backed by the `claude` CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

impl ClaudeCli {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    async fn invoke_once(&self, prompt: &str, options: &ChatOptions) -> Result<String, CompletionError> {
        debug!(model = %self.model, "Invoking claude CLI");

        let mut command = Command::new("claude");
        command.args(["-p", prompt]);
        if let Some(system_prompt) = &options.system_prompt {
            command.args(["--system-prompt", system_prompt]);
        }
        command.args(["--model", &self.model, "--output-format", "text"]);
        command.kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                CompletionError::Unavailable(format!(
                    "claude timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| CompletionError::Unavailable(format!("Failed to spawn claude: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
            let message = format!("claude exited {}: {}", result.status, stderr.trim());
            return Err(if is_rate_limited(&stderr) {
                CompletionError::RateLimited(message)
            } else {
                CompletionError::Unavailable(message)
            });
        }

        let stdout = String::from_utf8_lossy(&result.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(CompletionError::Unavailable(
                "Claude returned empty response".to_string(),
            ));
        }

        Ok(stdout)
    }
}

#[async_trait]
impl ChatCompletion for ClaudeCli {
    async fn complete(&self, prompt: &str, options: &ChatOptions) -> Result<String, CompletionError> {
        let mut attempt = 0;
        loop {
            match self.invoke_once(prompt, options).await {
                Err(CompletionError::RateLimited(message)) if attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.retry_backoff * attempt;
                    warn!(attempt, backoff_ms = backoff.as_millis(), error = %message, "Rate limited, retrying");
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
