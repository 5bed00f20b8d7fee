pub mod cache_schema;
pub mod config;
pub mod dataset;
pub mod outcome;
pub mod report;
pub mod signal;

pub use cache_schema::{CacheCategory, CacheRow};
pub use config::{
    AgentConfig, AgentKind, CacheConfig, CalibrationConfig, CalibrationStrategy, ChatConfig,
    ConcordConfig, OrchestratorConfig, SentimentConfig, SentimentStrategy,
};
pub use dataset::{Dataset, SeriesPoint, TextItem};
pub use outcome::{AgentFailure, AgentOutcome, FailureKind};
pub use report::{AgentReport, ConsensusResult, RunReport, REPORT_SCHEMA_VERSION};
pub use signal::{Direction, Signal, SignalError};
