//! CONCORD - multi-agent research consensus engine
//!
//! Runs independent analysis agents over a subject's dataset, contains their
//! failures, and reduces their signals into a single consensus.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use concord::models::{ConcordConfig, Direction, RunReport};
//! use concord::agents::{AgentRegistry, AgentSelection, Orchestrator};
//! use concord::cache::{CacheReader, DatasetProvider, StaticProvider};
//! ```

pub use concord_agents as agents;
pub use concord_cache as cache;
pub use concord_models as models;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use concord_agents::{
    build_agent, calculator_from_config, AgentDeps, AgentRegistry, AgentSelection, Orchestrator,
    OrchestratorError, SentimentScorer,
};
use concord_cache::{CacheReader, DatasetProvider, SqliteReader};
use concord_models::{AgentConfig, ConcordConfig, RunReport};
use tracing::info;

/// Register the configured agents, or one of each built-in kind when none
/// are configured. Agents marked `enabled = false` are registered disabled.
pub fn build_registry(config: &ConcordConfig) -> Result<AgentRegistry, anyhow::Error> {
    let deps = AgentDeps {
        scorer: Arc::new(
            SentimentScorer::from_config(&config.sentiment)
                .context("Failed to build sentiment scorer")?,
        ),
        calculator: calculator_from_config(&config.calibration),
        chat: config.chat.clone(),
    };

    let agent_configs = if config.agents.is_empty() {
        AgentConfig::defaults()
    } else {
        config.agents.clone()
    };

    let registry = AgentRegistry::new();
    for agent_config in &agent_configs {
        registry
            .register(&agent_config.name, build_agent(agent_config, &deps))
            .with_context(|| format!("Invalid agent configuration: {}", agent_config.name))?;
        if !agent_config.enabled {
            registry.disable(&agent_config.name)?;
        }
    }
    info!(
        agents = registry.len(),
        enabled = registry.enabled_names().len(),
        "Agent registry ready"
    );
    Ok(registry)
}

/// Build an Orchestrator from configuration.
pub fn build_orchestrator(config: &ConcordConfig) -> Result<Orchestrator, anyhow::Error> {
    let registry = build_registry(config)?;
    Ok(Orchestrator::new(
        Arc::new(registry),
        config.orchestrator.clone(),
    ))
}

/// Open the shared dataset cache described by `config`.
pub fn open_cache(config: &ConcordConfig) -> Result<CacheReader, anyhow::Error> {
    let sqlite = SqliteReader::open(&config.cache.sqlite_path)
        .with_context(|| format!("Failed to open cache: {}", config.cache.sqlite_path))?;
    Ok(CacheReader::new(
        sqlite,
        config.cache.memory_max_capacity,
        Duration::from_secs(config.cache.memory_ttl_seconds),
    ))
}

/// Fetch the subject's dataset and run the selected agents over it.
pub async fn analyze(
    orchestrator: &Orchestrator,
    provider: &dyn DatasetProvider,
    subject_id: &str,
    selection: &AgentSelection,
) -> Result<RunReport, OrchestratorError> {
    orchestrator
        .fetch_and_analyze(provider, subject_id, selection)
        .await
}
