use concord_cache::CacheError;
use concord_models::SignalError;
use thiserror::Error;

/// Failure raised by an agent's `analyze`. Contained by the orchestrator.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Dependency unavailable: {0}")]
    Dependency(String),

    #[error("Invalid signal: {0}")]
    Validation(#[from] SignalError),
}

impl AgentError {
    pub fn missing_field(field: &str) -> Self {
        AgentError::Analysis(format!("required dataset field missing: {field}"))
    }
}

/// Registry misuse. Returned straight to the caller, never batched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent already registered: {0}")]
    DuplicateName(String),
}

/// Hard errors from the orchestrator itself.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("No agents requested")]
    EmptyRequest,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] CacheError),
}

/// Final result of a chat completion attempt; retries happen inside the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Chat completion rate limited: {0}")]
    RateLimited(String),

    #[error("Chat completion unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("Retrieval unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("Failed to read lexicon {path}: {source}")]
    LexiconIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Lexicon {0} contains no entries")]
    EmptyLexicon(String),
}
