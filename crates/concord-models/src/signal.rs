use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directional opinion carried by a [`Signal`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Bullish, Direction::Bearish, Direction::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(Direction::Bullish),
            "bearish" => Ok(Direction::Bearish),
            "neutral" => Ok(Direction::Neutral),
            other => Err(SignalError::UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("reasoning must not be empty")]
    EmptyReasoning,

    #[error("unknown direction: {0}")]
    UnknownDirection(String),
}

/// An agent's directional opinion. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawSignal")]
pub struct Signal {
    direction: Direction,
    confidence: f64,
    reasoning: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// Unvalidated wire form, checked on the way into [`Signal`].
#[derive(Deserialize)]
struct RawSignal {
    direction: Direction,
    confidence: f64,
    reasoning: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawSignal> for Signal {
    type Error = SignalError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        validate(raw.confidence, &raw.reasoning)?;
        Ok(Self {
            direction: raw.direction,
            confidence: raw.confidence,
            reasoning: raw.reasoning,
            timestamp: raw.timestamp,
            metadata: raw.metadata,
        })
    }
}

fn validate(confidence: f64, reasoning: &str) -> Result<(), SignalError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(SignalError::ConfidenceOutOfRange(confidence));
    }
    if reasoning.trim().is_empty() {
        return Err(SignalError::EmptyReasoning);
    }
    Ok(())
}

impl Signal {
    /// Build a signal stamped with the current time.
    pub fn new(
        direction: Direction,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Result<Self, SignalError> {
        let reasoning = reasoning.into();
        validate(confidence, &reasoning)?;
        Ok(Self {
            direction,
            confidence,
            reasoning,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        })
    }

    /// Return a copy of this signal carrying an extra metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }
}
