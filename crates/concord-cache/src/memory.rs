use std::sync::Arc;
use std::time::Duration;

use concord_models::Dataset;
use moka::future::Cache;

/// In-memory hot cache of assembled datasets, keyed by subject.
///
/// Entries are evicted after TTL so a pipeline refresh becomes visible
/// without restarting.
pub struct MemoryCache {
    inner: Cache<String, Arc<Dataset>>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, subject: &str) -> Option<Arc<Dataset>> {
        self.inner.get(subject).await
    }

    pub async fn insert(&self, subject: String, dataset: Arc<Dataset>) {
        self.inner.insert(subject, dataset).await;
    }

    pub async fn invalidate(&self, subject: &str) {
        self.inner.invalidate(subject).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
