//! Scripted agents and chat models for exercising the registry, orchestrator
//! and built-in agents without real datasets or external services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use concord_models::{Dataset, Direction, Signal};

use crate::agent::Agent;
use crate::capability::{ChatCompletion, ChatOptions};
use crate::error::{AgentError, CompletionError};

#[derive(Debug, Clone)]
enum Script {
    Signal { direction: Direction, confidence: f64 },
    Fail { dependency: bool, message: String },
    Panic,
}

/// An agent that replays a fixed script, optionally after a delay.
pub struct ScriptedAgent {
    name: String,
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    fn with_script(name: &str, script: Script) -> Self {
        Self {
            name: name.to_string(),
            script,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(name: &str, direction: Direction, confidence: f64) -> Self {
        Self::with_script(name, Script::Signal { direction, confidence })
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self::with_script(
            name,
            Script::Fail {
                dependency: false,
                message: message.to_string(),
            },
        )
    }

    pub fn missing_dependency(name: &str, message: &str) -> Self {
        Self::with_script(
            name,
            Script::Fail {
                dependency: true,
                message: message.to_string(),
            },
        )
    }

    /// Returns a confidence outside [0, 1], which the signal constructor rejects.
    pub fn invalid(name: &str) -> Self {
        Self::fixed(name, Direction::Bullish, 1.5)
    }

    pub fn panicking(name: &str) -> Self {
        Self::with_script(name, Script::Panic)
    }

    /// Sleep for `delay` before running the script.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `analyze` has been entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, subject_id: &str, _dataset: &Dataset) -> Result<Signal, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.script {
            Script::Signal { direction, confidence } => Ok(Signal::new(
                *direction,
                *confidence,
                format!("Scripted {} view of {subject_id}", self.name),
            )?),
            Script::Fail { dependency: true, message } => Err(AgentError::Dependency(message.clone())),
            Script::Fail { dependency: false, message } => Err(AgentError::Analysis(message.clone())),
            Script::Panic => panic!("scripted agent {} panicked", self.name),
        }
    }
}

/// A chat completion that always gives the same answer.
pub struct CannedChat {
    reply: Result<String, CompletionError>,
    calls: AtomicUsize,
}

impl CannedChat {
    pub fn reply(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            reply: Err(CompletionError::RateLimited("429 Too Many Requests".to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCompletion for CannedChat {
    async fn complete(&self, _prompt: &str, _options: &ChatOptions) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}
