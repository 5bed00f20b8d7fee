use serde::{Deserialize, Serialize};

/// Top-level configuration, passed explicitly into every constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConcordConfig {
    pub cache: CacheConfig,
    pub orchestrator: OrchestratorConfig,
    pub calibration: CalibrationConfig,
    pub sentiment: SentimentConfig,
    pub chat: ChatConfig,
    pub agents: Vec<AgentConfig>,
}

/// Configuration for the dataset cache layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the shared SQLite cache file (written by data pipelines, read here).
    pub sqlite_path: String,
    /// Maximum number of entries in the in-memory moka cache.
    pub memory_max_capacity: u64,
    /// How long a read stays in memory, in seconds.
    pub memory_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/concord_cache.db".to_string(),
            memory_max_capacity: 10_000,
            memory_ttl_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Per-agent time budget in milliseconds.
    pub agent_timeout_ms: u64,
    /// Reject runs that name no agents.
    pub require_agents: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_timeout_ms: 30_000,
            require_agents: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStrategy {
    Distance,
    #[default]
    Enhanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub strategy: CalibrationStrategy,
    /// Ceiling of the distance score, leaving headroom for corroboration.
    pub max_confidence: f64,
    /// Multiplier applied when no expected field is present.
    pub completeness_floor: f64,
    /// Lowest multiplier for a metric far outside plausible bounds.
    pub extremity_floor: f64,
    /// Relative boost when a secondary metric corroborates.
    pub corroboration_boost: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            strategy: CalibrationStrategy::Enhanced,
            max_confidence: 0.9,
            completeness_floor: 0.5,
            extremity_floor: 0.4,
            corroboration_boost: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SentimentStrategy {
    /// Lexicon when available, keyword counting otherwise.
    #[default]
    Auto,
    Lexicon,
    Keyword,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentConfig {
    pub strategy: SentimentStrategy,
    /// Optional VADER-format lexicon file replacing the built-in table.
    pub lexicon_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub timeout_seconds: u64,
    /// Extra attempts after a rate-limited completion.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout_seconds: 45,
            max_retries: 2,
            retry_backoff_ms: 1_000,
        }
    }
}

/// Built-in agent implementations selectable from configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Sentiment,
    Fundamentals,
    Momentum,
    Narrative,
}

/// Configuration for a single registered agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AgentConfig {
    pub fn new(name: &str, kind: AgentKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            enabled: true,
        }
    }

    /// One enabled agent of every built-in kind.
    pub fn defaults() -> Vec<AgentConfig> {
        vec![
            AgentConfig::new("sentiment", AgentKind::Sentiment),
            AgentConfig::new("fundamentals", AgentKind::Fundamentals),
            AgentConfig::new("momentum", AgentKind::Momentum),
            AgentConfig::new("narrative", AgentKind::Narrative),
        ]
    }
}
