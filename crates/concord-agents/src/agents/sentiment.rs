use std::sync::Arc;

use async_trait::async_trait;
use concord_models::{Dataset, Signal};
use serde_json::json;

use crate::agent::Agent;
use crate::agents::vote;
use crate::confidence::{CalibrationContext, ConfidenceCalculator};
use crate::error::AgentError;
use crate::sentiment::SentimentScorer;

/// Text items needed for full completeness credit.
const EXPECTED_TEXTS: usize = 3;

/// Reads the dataset's text items and reports the majority sentiment.
pub struct SentimentAgent {
    name: String,
    scorer: Arc<SentimentScorer>,
    calculator: Arc<dyn ConfidenceCalculator>,
}

impl SentimentAgent {
    pub fn new(
        name: &str,
        scorer: Arc<SentimentScorer>,
        calculator: Arc<dyn ConfidenceCalculator>,
    ) -> Self {
        Self {
            name: name.to_string(),
            scorer,
            calculator,
        }
    }
}

#[async_trait]
impl Agent for SentimentAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, subject_id: &str, dataset: &Dataset) -> Result<Signal, AgentError> {
        let vote = vote(&self.scorer, dataset.texts.iter().map(|t| t.text.as_str()))
            .ok_or_else(|| AgentError::missing_field("texts"))?;

        let completeness = (vote.total as f64 / EXPECTED_TEXTS as f64).min(1.0);
        let mut context = CalibrationContext::new().with_completeness(completeness);
        if vote.total > 1 {
            context = context.with_corroboration(vote.unanimous());
        }
        let confidence = self.calculator.calibrate(vote.confidence, &context);

        let reasoning = format!(
            "{}/{} text items about {subject_id} read {} ({} scoring)",
            vote.agreeing,
            vote.total,
            vote.direction,
            self.scorer.strategy_name()
        );

        let mut signal = Signal::new(vote.direction, confidence, reasoning)?
            .with_metadata("strategy", json!(self.scorer.strategy_name()))
            .with_metadata("text_count", json!(vote.total))
            .with_metadata("raw_confidence", json!(vote.confidence));
        if let Some(compound) = vote.mean_compound {
            signal = signal.with_metadata("mean_compound", json!(compound));
        }
        Ok(signal)
    }
}
