use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use concord_models::Dataset;

use crate::error::CacheError;

/// Source of read-only datasets for a subject.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    async fn fetch(&self, subject_id: &str) -> Result<Arc<Dataset>, CacheError>;
}

/// Fixed in-memory datasets, for tests and offline runs.
#[derive(Default)]
pub struct StaticProvider {
    datasets: HashMap<String, Arc<Dataset>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.datasets
            .insert(dataset.subject_id.clone(), Arc::new(dataset));
        self
    }
}

#[async_trait]
impl DatasetProvider for StaticProvider {
    async fn fetch(&self, subject_id: &str) -> Result<Arc<Dataset>, CacheError> {
        self.datasets
            .get(subject_id)
            .cloned()
            .ok_or_else(|| CacheError::SubjectNotFound(subject_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_fetches_known_subject() {
        let provider = StaticProvider::new().with_dataset(Dataset::new("ACME"));
        let dataset = provider.fetch("ACME").await.unwrap();
        assert_eq!(dataset.subject_id, "ACME");
    }

    #[tokio::test]
    async fn static_provider_unknown_subject() {
        let provider = StaticProvider::new();
        let result = provider.fetch("NOPE").await;
        assert!(matches!(result, Err(CacheError::SubjectNotFound(s)) if s == "NOPE"));
    }
}
