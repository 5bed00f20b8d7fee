use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concord_models::cache_schema::{key_patterns, CacheCategory, CacheRow};
use concord_models::{Dataset, SeriesPoint, TextItem};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::memory::MemoryCache;
use crate::provider::DatasetProvider;
use crate::sqlite::SqliteReader;

#[derive(Deserialize)]
struct MetricValue {
    value: f64,
}

#[derive(Deserialize)]
struct TextRow {
    text: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Read-through dataset provider: moka (hot) → SQLite (shared).
///
/// A SQLite hit is assembled into a [`Dataset`] and promoted to moka.
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct CacheReader {
    memory: MemoryCache,
    sqlite: Mutex<SqliteReader>,
}

fn decode<T: DeserializeOwned>(row: &CacheRow) -> Result<T, CacheError> {
    serde_json::from_str(&row.value_json).map_err(|source| CacheError::Json {
        key: row.key.clone(),
        source,
    })
}

fn apply_row(dataset: &mut Dataset, row: &CacheRow) -> Result<(), CacheError> {
    let Some((_, name)) = key_patterns::parse(&row.key) else {
        debug!(key = %row.key, "Skipping row with unrecognized key");
        return Ok(());
    };

    match row.category.as_str() {
        c if c == CacheCategory::Metric.as_str() => {
            let metric: MetricValue = decode(row)?;
            dataset.metrics.insert(name.to_string(), metric.value);
        }
        c if c == CacheCategory::Series.as_str() => {
            let mut points: Vec<SeriesPoint> = decode(row)?;
            points.sort_by_key(|p| p.timestamp);
            dataset.series.insert(name.to_string(), points);
        }
        c if c == CacheCategory::Text.as_str() => {
            let items: Vec<TextRow> = decode(row)?;
            dataset.texts.extend(items.into_iter().map(|item| TextItem {
                source: name.to_string(),
                text: item.text,
                published_at: item.published_at,
            }));
        }
        other => debug!(key = %row.key, category = other, "Skipping unknown category"),
    }
    Ok(())
}

impl CacheReader {
    pub fn new(sqlite: SqliteReader, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            memory: MemoryCache::new(max_capacity, memory_ttl),
            sqlite: Mutex::new(sqlite),
        }
    }

    /// Assemble a dataset for a subject straight from SQLite.
    ///
    /// Rows that fail to decode are skipped with a warning so one bad write
    /// does not hide the rest of the subject's data.
    pub fn build_dataset(&self, subject: &str) -> Result<Dataset, CacheError> {
        let rows = {
            let sqlite = self
                .sqlite
                .lock()
                .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            sqlite.get_by_subject(subject)?
        };

        if rows.is_empty() {
            return Err(CacheError::SubjectNotFound(subject.to_string()));
        }

        let mut dataset = Dataset::new(subject);
        for row in &rows {
            if let Err(e) = apply_row(&mut dataset, row) {
                warn!(key = %row.key, error = %e, "Skipping malformed dataset row");
            }
        }
        Ok(dataset)
    }

    /// Get the number of subjects in the hot moka cache.
    pub fn hot_cache_size(&self) -> u64 {
        self.memory.entry_count()
    }
}

#[async_trait]
impl DatasetProvider for CacheReader {
    async fn fetch(&self, subject_id: &str) -> Result<Arc<Dataset>, CacheError> {
        if let Some(hit) = self.memory.get(subject_id).await {
            return Ok(hit);
        }

        let dataset = Arc::new(self.build_dataset(subject_id)?);
        self.memory
            .insert(subject_id.to_string(), Arc::clone(&dataset))
            .await;
        Ok(dataset)
    }
}
