use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::outcome::AgentOutcome;
use crate::signal::Direction;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Aggregate opinion over the successful outcomes of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusResult {
    /// Dominant direction.
    pub signal: Direction,
    /// Mean confidence of the agents agreeing with `signal`.
    pub confidence: f64,
    /// Fraction of successful agents matching `signal`, 0.0 to 1.0.
    pub agreement: f64,
    /// Successes per direction. Always lists all three directions.
    pub distribution: BTreeMap<Direction, usize>,
    /// Failed outcomes excluded from the computation.
    pub failed: usize,
}

impl ConsensusResult {
    pub fn successes(&self) -> usize {
        self.distribution.values().sum()
    }
}

/// Per-agent line of a run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentReport {
    pub agent_name: String,
    pub outcome: AgentOutcome,
    pub elapsed_ms: u64,
}

/// Everything a presentation layer needs about one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub schema_version: u32,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub consensus: ConsensusResult,
    pub agents: Vec<AgentReport>,
    pub processing_time_ms: u64,
}
