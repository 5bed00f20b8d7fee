use std::sync::Arc;

use async_trait::async_trait;
use concord_models::{Dataset, Signal};
use serde_json::json;
use tracing::{debug, warn};

use crate::agent::{Agent, LazyCapability};
use crate::agents::vote;
use crate::capability::{ChatCompletion, ChatOptions, KeywordIndex, Passage, Retriever};
use crate::confidence::{CalibrationContext, ConfidenceCalculator};
use crate::error::AgentError;
use crate::parser::parse_verdict;
use crate::prompts::{narrative_system_prompt, narrative_user_prompt};
use crate::sentiment::{map_compound, SentimentScorer};

/// Passages needed for full completeness credit.
const EXPECTED_PASSAGES: usize = 3;
/// Confidence multiplier when the chat model was unavailable.
const FALLBACK_DISCOUNT: f64 = 0.85;

fn search_query(subject_id: &str) -> String {
    format!("{subject_id} outlook guidance demand earnings revenue growth results")
}

/// Asks a chat model for a verdict on the passages retrieved for a subject.
///
/// Without a configured retriever, the dataset's own text items are indexed
/// per call. When the chat model fails, the passages are sentiment-scored
/// instead.
pub struct NarrativeAgent {
    name: String,
    chat: LazyCapability<dyn ChatCompletion>,
    retriever: Option<LazyCapability<dyn Retriever>>,
    scorer: Arc<SentimentScorer>,
    calculator: Arc<dyn ConfidenceCalculator>,
}

impl NarrativeAgent {
    pub fn new(
        name: &str,
        chat: LazyCapability<dyn ChatCompletion>,
        scorer: Arc<SentimentScorer>,
        calculator: Arc<dyn ConfidenceCalculator>,
    ) -> Self {
        Self {
            name: name.to_string(),
            chat,
            retriever: None,
            scorer,
            calculator,
        }
    }

    pub fn with_retriever(mut self, retriever: LazyCapability<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    async fn passages(&self, subject_id: &str, dataset: &Dataset) -> Vec<Passage> {
        let query = search_query(subject_id);
        if let Some(retriever) = &self.retriever {
            let found = match retriever.get().await {
                Ok(retriever) => retriever
                    .search(&query, subject_id)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match found {
                Ok(passages) if !passages.is_empty() => return passages,
                Ok(_) => debug!(agent = %self.name, "Retriever found no passages, using dataset texts"),
                Err(e) => warn!(agent = %self.name, error = %e, "Retriever unavailable, using dataset texts"),
            }
        }

        let index = KeywordIndex::from_dataset(subject_id, dataset);
        match index.search(&query, subject_id).await {
            Ok(passages) => passages,
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Dataset index search failed");
                Vec::new()
            }
        }
    }

    async fn ask_chat(&self, subject_id: &str, passages: &[Passage]) -> Result<(f64, String), AgentError> {
        let chat = self.chat.get().await?;
        let options = ChatOptions::with_system_prompt(narrative_system_prompt());
        let raw = chat
            .complete(&narrative_user_prompt(subject_id, passages), &options)
            .await
            .map_err(|e| AgentError::Dependency(e.to_string()))?;
        let verdict = parse_verdict(&raw)?;
        Ok((verdict.score, verdict.reasoning))
    }
}

#[async_trait]
impl Agent for NarrativeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, subject_id: &str, dataset: &Dataset) -> Result<Signal, AgentError> {
        let passages = self.passages(subject_id, dataset).await;
        let completeness = (passages.len() as f64 / EXPECTED_PASSAGES as f64).min(1.0);
        let context = CalibrationContext::new().with_completeness(completeness);

        if passages.is_empty() {
            // Nothing to read: only worth reporting which side is missing.
            self.chat.get().await?;
            return Err(AgentError::Analysis(format!(
                "no narrative passages found for {subject_id}"
            )));
        }

        match self.ask_chat(subject_id, &passages).await {
            Ok((score, reasoning)) => {
                let (direction, raw) = map_compound(score);
                let confidence = self.calculator.calibrate(raw, &context);
                Ok(Signal::new(direction, confidence, reasoning)?
                    .with_metadata("method", json!("chat"))
                    .with_metadata("score", json!(score))
                    .with_metadata("passages", json!(passages.len())))
            }
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Chat verdict unavailable, scoring passages directly");
                let vote = vote(&self.scorer, passages.iter().map(|p| p.text.as_str()))
                    .ok_or_else(|| AgentError::Analysis("no passages to score".to_string()))?;
                let confidence = self.calculator.calibrate(vote.confidence, &context) * FALLBACK_DISCOUNT;
                let reasoning = format!(
                    "{}/{} passages about {subject_id} read {} (chat unavailable: {e})",
                    vote.agreeing, vote.total, vote.direction
                );
                Ok(Signal::new(vote.direction, confidence, reasoning)?
                    .with_metadata("method", json!("sentiment_fallback"))
                    .with_metadata("passages", json!(passages.len())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::EnhancedCalculator;
    use crate::test_support::CannedChat;
    use concord_models::Direction;

    fn agent(chat: LazyCapability<dyn ChatCompletion>) -> NarrativeAgent {
        NarrativeAgent::new(
            "narrative",
            chat,
            Arc::new(SentimentScorer::default()),
            Arc::new(EnhancedCalculator::default()),
        )
    }

    fn canned(reply: &str) -> LazyCapability<dyn ChatCompletion> {
        LazyCapability::ready("chat", Arc::new(CannedChat::reply(reply)) as Arc<dyn ChatCompletion>)
    }

    fn dataset() -> Dataset {
        Dataset::new("ACME")
            .with_text("wire", "ACME raised guidance on strong demand")
            .with_text("blog", "ACME earnings beat estimates")
            .with_text("forum", "Unrelated chatter about the weather")
    }

    #[tokio::test]
    async fn chat_verdict_drives_signal() {
        let agent = agent(canned(r#"{"score": -0.6, "reasoning": "Guidance looks fragile"}"#));
        let signal = agent.analyze("ACME", &dataset()).await.unwrap();
        assert_eq!(signal.direction(), Direction::Bearish);
        assert_eq!(signal.reasoning(), "Guidance looks fragile");
        assert_eq!(signal.metadata()["method"], "chat");
        assert_eq!(signal.metadata()["passages"], 2);
    }

    #[tokio::test]
    async fn chat_failure_falls_back_to_sentiment() {
        let agent = agent(LazyCapability::ready(
            "chat",
            Arc::new(CannedChat::rate_limited()) as Arc<dyn ChatCompletion>,
        ));
        let signal = agent.analyze("ACME", &dataset()).await.unwrap();
        assert_eq!(signal.direction(), Direction::Bullish);
        assert_eq!(signal.metadata()["method"], "sentiment_fallback");
    }

    #[tokio::test]
    async fn unparseable_verdict_falls_back() {
        let agent = agent(canned("I think it looks fine."));
        let signal = agent.analyze("ACME", &dataset()).await.unwrap();
        assert_eq!(signal.metadata()["method"], "sentiment_fallback");
    }

    #[tokio::test]
    async fn dataset_texts_are_found_under_the_requested_subject() {
        let agent = agent(canned(r#"{"score": 0.5, "reasoning": "Demand is strong"}"#));
        let signal = agent.analyze("acme", &dataset()).await.unwrap();
        assert_eq!(signal.metadata()["method"], "chat");
        assert_eq!(signal.metadata()["passages"], 2);
    }

    #[tokio::test]
    async fn no_passages_and_no_chat_is_dependency_error() {
        let agent = agent(LazyCapability::unavailable("chat", "claude not installed"));
        let err = agent.analyze("ACME", &Dataset::new("ACME")).await.unwrap_err();
        assert!(matches!(err, AgentError::Dependency(_)));
    }

    #[tokio::test]
    async fn no_passages_with_chat_is_analysis_error() {
        let agent = agent(canned(r#"{"score": 0.1, "reasoning": "meh"}"#));
        let err = agent.analyze("ACME", &Dataset::new("ACME")).await.unwrap_err();
        assert!(matches!(err, AgentError::Analysis(_)));
    }

    #[tokio::test]
    async fn external_retriever_takes_precedence() {
        let index = KeywordIndex::default();
        index.add("ACME", "filing", "ACME guidance withdrawn amid losses");
        let agent = agent(canned(r#"{"score": -0.2, "reasoning": "Filing is negative"}"#))
            .with_retriever(LazyCapability::ready("index", Arc::new(index) as Arc<dyn Retriever>));

        let signal = agent.analyze("ACME", &dataset()).await.unwrap();
        assert_eq!(signal.metadata()["passages"], 1);
    }
}
