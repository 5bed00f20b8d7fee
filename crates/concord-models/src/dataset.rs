use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation in a time series (last = most recent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A short text item about the subject (headline, filing excerpt, note).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextItem {
    pub source: String,
    pub text: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Read-only bundle of facts about a subject, shared by every agent in a run.
///
/// Absent fields are absent: accessors return `None` and nothing is
/// defaulted to zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub subject_id: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub series: BTreeMap<String, Vec<SeriesPoint>>,
    #[serde(default)]
    pub texts: Vec<TextItem>,
    pub fetched_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            metrics: BTreeMap::new(),
            series: BTreeMap::new(),
            texts: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_series(mut self, name: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        self.series.insert(name.into(), points);
        self
    }

    pub fn with_text(mut self, source: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.push(TextItem {
            source: source.into(),
            text: text.into(),
            published_at: None,
        });
        self
    }

    /// Non-finite values are reported as missing.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().filter(|v| v.is_finite())
    }

    pub fn series(&self, name: &str) -> Option<&[SeriesPoint]> {
        self.series
            .get(name)
            .map(Vec::as_slice)
            .filter(|points| !points.is_empty())
    }

    /// Series values in chronological order.
    pub fn series_values(&self, name: &str) -> Option<Vec<f64>> {
        self.series(name)
            .map(|points| points.iter().map(|p| p.value).collect())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.metric(name).is_some() || self.series(name).is_some()
    }

    /// Fraction of `expected` field names present as a metric or series.
    /// An empty expectation is trivially complete.
    pub fn completeness(&self, expected: &[&str]) -> f64 {
        if expected.is_empty() {
            return 1.0;
        }
        let present = expected.iter().filter(|f| self.has_field(f)).count();
        present as f64 / expected.len() as f64
    }
}
