//! Built-in agents and the factory that assembles them from configuration.

pub mod fundamentals;
pub mod momentum;
pub mod narrative;
pub mod sentiment;

use std::collections::BTreeMap;
use std::sync::Arc;

use concord_models::{AgentConfig, AgentKind, ChatConfig, Direction};

use crate::agent::{Agent, LazyCapability};
use crate::capability::{ChatCompletion, ClaudeCli};
use crate::confidence::ConfidenceCalculator;
use crate::consensus::TIE_BREAK_ORDER;
use crate::sentiment::SentimentScorer;

pub use fundamentals::FundamentalsAgent;
pub use momentum::MomentumAgent;
pub use narrative::NarrativeAgent;
pub use sentiment::SentimentAgent;

/// Shared collaborators handed to every built-in agent.
#[derive(Clone)]
pub struct AgentDeps {
    pub scorer: Arc<SentimentScorer>,
    pub calculator: Arc<dyn ConfidenceCalculator>,
    pub chat: ChatConfig,
}

/// Build the agent described by `config`.
pub fn build(config: &AgentConfig, deps: &AgentDeps) -> Arc<dyn Agent> {
    match config.kind {
        AgentKind::Sentiment => Arc::new(SentimentAgent::new(
            &config.name,
            Arc::clone(&deps.scorer),
            Arc::clone(&deps.calculator),
        )),
        AgentKind::Fundamentals => Arc::new(FundamentalsAgent::new(
            &config.name,
            Arc::clone(&deps.calculator),
        )),
        AgentKind::Momentum => Arc::new(MomentumAgent::new(
            &config.name,
            Arc::clone(&deps.calculator),
        )),
        AgentKind::Narrative => {
            let chat_config = deps.chat.clone();
            let chat = LazyCapability::new("claude_cli", move || {
                Ok(Arc::new(ClaudeCli::from_config(&chat_config)) as Arc<dyn ChatCompletion>)
            });
            Arc::new(NarrativeAgent::new(
                &config.name,
                chat,
                Arc::clone(&deps.scorer),
                Arc::clone(&deps.calculator),
            ))
        }
    }
}

/// Majority reading of a batch of texts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextVote {
    pub direction: Direction,
    /// Mean scorer confidence of the texts agreeing with `direction`.
    pub confidence: f64,
    pub agreeing: usize,
    pub total: usize,
    /// Mean compound score, when the lexicon path ran.
    pub mean_compound: Option<f64>,
}

impl TextVote {
    pub fn unanimous(&self) -> bool {
        self.agreeing == self.total
    }
}

/// Score every text and take the majority; `None` for no texts.
pub(crate) fn vote<'a>(
    scorer: &SentimentScorer,
    texts: impl IntoIterator<Item = &'a str>,
) -> Option<TextVote> {
    let scores: Vec<_> = texts.into_iter().map(|t| scorer.score(t)).collect();
    if scores.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<Direction, usize> = BTreeMap::new();
    for score in &scores {
        *counts.entry(score.direction).or_default() += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    let direction = TIE_BREAK_ORDER
        .iter()
        .copied()
        .find(|d| counts.get(d).copied() == Some(max))
        .unwrap_or(Direction::Neutral);

    let agreeing: Vec<f64> = scores
        .iter()
        .filter(|s| s.direction == direction)
        .map(|s| s.confidence)
        .collect();
    let compounds: Vec<f64> = scores.iter().filter_map(|s| s.compound).collect();

    Some(TextVote {
        direction,
        confidence: agreeing.iter().sum::<f64>() / agreeing.len() as f64,
        agreeing: agreeing.len(),
        total: scores.len(),
        mean_compound: (!compounds.is_empty())
            .then(|| compounds.iter().sum::<f64>() / compounds.len() as f64),
    })
}
