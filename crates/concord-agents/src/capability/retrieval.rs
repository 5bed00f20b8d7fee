use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use concord_models::Dataset;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A retrieved piece of text relevant to a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub source: String,
    pub text: String,
    /// Relevance in [0, 1]; share of query terms found in the passage.
    pub score: f64,
}

/// Finds passages about a subject relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, subject_id: &str) -> Result<Vec<Passage>, RetrievalError>;
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with",
];

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
struct Document {
    source: String,
    text: String,
    terms: HashSet<String>,
}

/// In-memory passages per subject, ranked by query term overlap.
#[derive(Debug)]
pub struct KeywordIndex {
    documents: RwLock<HashMap<String, Vec<Document>>>,
    limit: usize,
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KeywordIndex {
    /// `limit` caps the passages returned per search.
    pub fn new(limit: usize) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            limit,
        }
    }

    /// Index every text item of a dataset under `subject_id`.
    pub fn from_dataset(subject_id: &str, dataset: &Dataset) -> Self {
        let index = Self::default();
        for item in &dataset.texts {
            index.add(subject_id, &item.source, &item.text);
        }
        index
    }

    pub fn add(&self, subject_id: &str, source: &str, text: &str) {
        let document = Document {
            source: source.to_string(),
            text: text.to_string(),
            terms: terms(text),
        };
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(subject_id.to_string())
            .or_default()
            .push(document);
    }

    pub fn len(&self, subject_id: &str) -> usize {
        self.documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(subject_id)
            .map_or(0, Vec::len)
    }

    fn rank(&self, query: &str, subject_id: &str) -> Vec<Passage> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        let Some(docs) = documents.get(subject_id) else {
            return Vec::new();
        };

        let mut passages: Vec<Passage> = docs
            .iter()
            .filter_map(|doc| {
                let hits = query_terms.intersection(&doc.terms).count();
                (hits > 0).then(|| Passage {
                    source: doc.source.clone(),
                    text: doc.text.clone(),
                    score: hits as f64 / query_terms.len() as f64,
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        passages.sort_by(|a, b| b.score.total_cmp(&a.score));
        passages.truncate(self.limit);
        passages
    }
}

#[async_trait]
impl Retriever for KeywordIndex {
    async fn search(&self, query: &str, subject_id: &str) -> Result<Vec<Passage>, RetrievalError> {
        Ok(self.rank(query, subject_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> KeywordIndex {
        let index = KeywordIndex::new(2);
        index.add("ACME", "wire", "ACME margins expanded on strong demand");
        index.add("ACME", "blog", "Weather was pleasant at the ACME picnic");
        index.add("ACME", "filing", "Demand softened and margins narrowed");
        index.add("OTHER", "wire", "Margins collapsed at OTHER");
        index
    }

    #[tokio::test]
    async fn ranks_by_term_overlap() {
        let passages = index().search("margins demand outlook", "ACME").await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source, "wire");
        assert_eq!(passages[1].source, "filing");
        assert!((passages[0].score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn scoped_to_subject() {
        let passages = index().search("collapsed", "ACME").await.unwrap();
        assert!(passages.is_empty());
        let passages = index().search("collapsed", "OTHER").await.unwrap();
        assert_eq!(passages.len(), 1);
    }

    #[tokio::test]
    async fn stopword_only_query_returns_nothing() {
        assert!(index().search("the and of", "ACME").await.unwrap().is_empty());
    }

    #[test]
    fn from_dataset_indexes_texts() {
        let dataset = Dataset::new("ACME")
            .with_text("wire", "Record quarter")
            .with_text("blog", "Shares slipped");
        let index = KeywordIndex::from_dataset("ACME", &dataset);
        assert_eq!(index.len("ACME"), 2);
        assert_eq!(index.len("OTHER"), 0);
    }
}
