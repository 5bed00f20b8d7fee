pub mod agent;
pub mod agents;
pub mod capability;
pub mod confidence;
pub mod consensus;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod registry;
pub mod sentiment;

pub mod test_support;

pub use agent::{Agent, LazyCapability};
pub use agents::{build as build_agent, AgentDeps};
pub use confidence::{
    calculator_from_config, CalibrationContext, ConfidenceCalculator, DistanceCalculator,
    EnhancedCalculator, IdealRange,
};
pub use consensus::aggregate;
pub use error::{
    AgentError, CompletionError, OrchestratorError, RegistryError, RetrievalError, SentimentError,
};
pub use orchestrator::{AgentSelection, Orchestrator};
pub use registry::AgentRegistry;
pub use sentiment::{SentimentScore, SentimentScorer};
