//! Storage abstraction for question/answer history.
//!
//! The [`HistoryStore`] trait defines the append-only log the service
//! writes after every answered question, plus the two read paths used by
//! the history and analytics endpoints. Backends are pluggable: the app
//! crate ships a SQLite store and this crate ships [`memory::InMemoryHistory`]
//! for tests and ephemeral runs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NewQaRecord, QaRecord, QaStats};

/// Abstract history backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save`](HistoryStore::save) | Append one record, assigning id and timestamp |
/// | [`recent`](HistoryStore::recent) | Most recent records, newest first |
/// | [`aggregate_stats`](HistoryStore::aggregate_stats) | Count, mean confidence, most frequent questions |
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a record and return it with its generated id and timestamp.
    async fn save(&self, record: &NewQaRecord) -> Result<QaRecord>;

    /// Up to `limit` records ordered by creation time, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<QaRecord>>;

    /// Aggregates over all records. `top_n` bounds the question list,
    /// ordered by frequency descending, then question text ascending.
    async fn aggregate_stats(&self, top_n: usize) -> Result<QaStats>;
}

/// Rank questions by frequency, breaking ties alphabetically.
pub fn top_questions<'a>(questions: impl IntoIterator<Item = &'a str>, top_n: usize) -> Vec<String> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for q in questions {
        *counts.entry(q).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(top_n)
        .map(|(q, _)| q.to_string())
        .collect()
}
