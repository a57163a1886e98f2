//! In-memory [`HistoryStore`] implementation for tests and ephemeral runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion
//! order. Nothing survives the process.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{NewQaRecord, QaRecord, QaStats};

use super::{top_questions, HistoryStore};

pub struct InMemoryHistory {
    records: RwLock<Vec<QaRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn format_ts_iso(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn save(&self, record: &NewQaRecord) -> Result<QaRecord> {
        let saved = QaRecord {
            id: uuid::Uuid::new_v4().to_string(),
            question: record.question.clone(),
            answer: record.answer.clone(),
            relevant_quotes: record.relevant_quotes.clone(),
            confidence: record.confidence,
            created_at: format_ts_iso(chrono::Utc::now()),
        };
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        records.push(saved.clone());
        Ok(saved)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QaRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    async fn aggregate_stats(&self, top_n: usize) -> Result<QaStats> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        let total = records.len();
        let avg_confidence = if total == 0 {
            0.0
        } else {
            records.iter().map(|r| r.confidence).sum::<f64>() / total as f64
        };
        Ok(QaStats {
            total_questions: total as i64,
            avg_confidence,
            top_questions: top_questions(records.iter().map(|r| r.question.as_str()), top_n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, confidence: f64) -> NewQaRecord {
        NewQaRecord {
            question: question.to_string(),
            answer: format!("answer to {}", question),
            relevant_quotes: vec!["quote".to_string()],
            confidence,
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_timestamp() {
        let store = InMemoryHistory::new();
        let saved = store.save(&record("Why?", 0.8)).await.unwrap();
        assert_eq!(saved.id.len(), 36);
        assert!(saved.created_at.ends_with('Z'));
        assert_eq!(saved.relevant_quotes, vec!["quote".to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_newest_first_with_limit() {
        let store = InMemoryHistory::new();
        for q in ["one", "two", "three"] {
            store.save(&record(q, 1.0)).await.unwrap();
        }
        let recent = store.recent(2).await.unwrap();
        let questions: Vec<&str> = recent.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["three", "two"]);
        assert!(store.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_empty() {
        let stats = InMemoryHistory::new().aggregate_stats(5).await.unwrap();
        assert_eq!(stats.total_questions, 0);
        assert_eq!(stats.avg_confidence, 0.0);
        assert!(stats.top_questions.is_empty());
    }

    #[tokio::test]
    async fn test_stats_aggregates() {
        let store = InMemoryHistory::new();
        store.save(&record("sleep?", 1.0)).await.unwrap();
        store.save(&record("work?", 0.0)).await.unwrap();
        store.save(&record("sleep?", 0.8)).await.unwrap();

        let stats = store.aggregate_stats(5).await.unwrap();
        assert_eq!(stats.total_questions, 3);
        assert!((stats.avg_confidence - 0.6).abs() < 1e-9);
        assert_eq!(stats.top_questions, vec!["sleep?", "work?"]);
    }
}
