use serde::{Deserialize, Serialize};

/// Categories for organizing dataset cache rows.
/// Data pipelines use these when writing to the shared SQLite cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Scalar metric: `{"value": f64}`.
    Metric,
    /// Time series: `[{"timestamp": rfc3339, "value": f64}, ...]`.
    Series,
    /// Text items: `[{"text": str, "published_at": rfc3339|null}, ...]`.
    Text,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Metric => "metric",
            CacheCategory::Series => "series",
            CacheCategory::Text => "text",
        }
    }
}

/// The SQLite table external pipelines write to and concord reads from.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS dataset_entries (
///     key         TEXT PRIMARY KEY,
///     category    TEXT NOT NULL,
///     value_json  TEXT NOT NULL,
///     source      TEXT NOT NULL,
///     subject     TEXT NOT NULL,
///     created_at  TEXT NOT NULL,
///     expires_at  TEXT NOT NULL
/// );
/// ```
pub const CACHE_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS dataset_entries (
    key         TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    value_json  TEXT NOT NULL,
    source      TEXT NOT NULL,
    subject     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dataset_subject ON dataset_entries(subject);
CREATE INDEX IF NOT EXISTS idx_dataset_expires ON dataset_entries(expires_at);
";

/// Key conventions for dataset rows.
///
/// - Metrics: `metric:{name}:{subject}` (e.g., `metric:pe_ratio:ACME`)
/// - Series: `series:{name}:{subject}` (e.g., `series:close:ACME`)
/// - Text: `text:{source}:{subject}` (e.g., `text:news:ACME`)
pub mod key_patterns {
    pub fn metric(name: &str, subject: &str) -> String {
        format!("metric:{name}:{subject}")
    }

    pub fn series(name: &str, subject: &str) -> String {
        format!("series:{name}:{subject}")
    }

    pub fn text(source: &str, subject: &str) -> String {
        format!("text:{source}:{subject}")
    }

    /// Split a key into `(category, name)`, dropping the subject suffix.
    pub fn parse(key: &str) -> Option<(&str, &str)> {
        let mut parts = key.splitn(3, ':');
        let category = parts.next()?;
        let name = parts.next()?;
        parts.next()?;
        Some((category, name))
    }
}

/// A raw cache row as read from SQLite.
#[derive(Debug, Clone)]
pub struct CacheRow {
    pub key: String,
    pub category: String,
    pub value_json: String,
    pub source: String,
    pub subject: String,
    pub created_at: String,
    pub expires_at: String,
}
