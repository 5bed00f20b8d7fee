use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

/// Why an agent produced no signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The agent tried to emit a malformed signal.
    Validation,
    /// The agent exceeded its time budget.
    Timeout,
    /// A helper capability was unavailable and the agent had no fallback.
    Dependency,
    /// Agent-specific logic failure, including panics.
    Analysis,
    /// The run was cancelled before the agent finished.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Validation => "validation",
            FailureKind::Timeout => "timeout",
            FailureKind::Dependency => "dependency",
            FailureKind::Analysis => "analysis",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentFailure {
    pub kind: FailureKind,
    pub message: String,
    pub agent_name: String,
}

/// Result of one agent invocation within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Success(Signal),
    Failure(AgentFailure),
}

impl AgentOutcome {
    pub fn failure(kind: FailureKind, agent_name: &str, message: impl Into<String>) -> Self {
        AgentOutcome::Failure(AgentFailure {
            kind,
            message: message.into(),
            agent_name: agent_name.to_string(),
        })
    }

    pub fn signal(&self) -> Option<&Signal> {
        match self {
            AgentOutcome::Success(signal) => Some(signal),
            AgentOutcome::Failure(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            AgentOutcome::Success(_) => None,
            AgentOutcome::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success(_))
    }
}
