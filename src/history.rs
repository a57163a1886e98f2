//! SQLite-backed [`HistoryStore`] implementation.
//!
//! Records live in the `qa_history` table created by
//! [`migrate`](crate::migrate). Quotes are stored as a JSON array in a
//! TEXT column and timestamps as Unix seconds.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use transcript_qa_core::history::HistoryStore;
use transcript_qa_core::models::{NewQaRecord, QaRecord, QaStats};

/// SQLite implementation of the [`HistoryStore`] trait.
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> QaRecord {
    let quotes_json: String = row.get("relevant_quotes");
    let created_at: i64 = row.get("created_at");
    let id: String = row.get("id");
    let relevant_quotes = match serde_json::from_str(&quotes_json) {
        Ok(quotes) => quotes,
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "corrupt relevant_quotes in history row; using none");
            Vec::new()
        }
    };
    QaRecord {
        id,
        question: row.get("question"),
        answer: row.get("answer"),
        relevant_quotes,
        confidence: row.get("confidence"),
        created_at: format_ts_iso(created_at),
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn save(&self, record: &NewQaRecord) -> Result<QaRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();
        let quotes_json = serde_json::to_string(&record.relevant_quotes)
            .context("Failed to serialize relevant quotes")?;

        sqlx::query(
            r#"
            INSERT INTO qa_history (id, question, answer, relevant_quotes, confidence, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.question)
        .bind(&record.answer)
        .bind(&quotes_json)
        .bind(record.confidence)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert history record")?;

        Ok(QaRecord {
            id,
            question: record.question.clone(),
            answer: record.answer.clone(),
            relevant_quotes: record.relevant_quotes.clone(),
            confidence: record.confidence,
            created_at: format_ts_iso(created_at),
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QaRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, question, answer, relevant_quotes, confidence, created_at
            FROM qa_history
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn aggregate_stats(&self, top_n: usize) -> Result<QaStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(AVG(confidence), 0.0) AS avg_confidence FROM qa_history",
        )
        .fetch_one(&self.pool)
        .await?;

        let top_rows = sqlx::query(
            r#"
            SELECT question, COUNT(*) AS asked
            FROM qa_history
            GROUP BY question
            ORDER BY asked DESC, question ASC
            LIMIT ?
            "#,
        )
        .bind(top_n as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(QaStats {
            total_questions: row.get("total"),
            avg_confidence: row.get("avg_confidence"),
            top_questions: top_rows.iter().map(|r| r.get("question")).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrate;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteHistory) {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("data").join("tqa.sqlite"))
            .await
            .unwrap();
        migrate::migrate_pool(&pool).await.unwrap();
        (tmp, SqliteHistory::new(pool))
    }

    fn record(question: &str, confidence: f64) -> NewQaRecord {
        NewQaRecord {
            question: question.to_string(),
            answer: format!("About {}", question),
            relevant_quotes: vec!["I can't sleep.".to_string(), "Work is hard.".to_string()],
            confidence,
        }
    }

    #[tokio::test]
    async fn test_save_and_recent_round_trip() {
        let (_tmp, store) = store().await;
        let saved = store.save(&record("sleep?", 0.9)).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent, vec![saved.clone()]);
        assert_eq!(recent[0].relevant_quotes.len(), 2);
        assert!(recent[0].created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_recent_newest_first_and_limited() {
        let (_tmp, store) = store().await;
        for q in ["first", "second", "third"] {
            store.save(&record(q, 1.0)).await.unwrap();
        }
        let recent = store.recent(2).await.unwrap();
        let questions: Vec<&str> = recent.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn test_stats_by_frequency() {
        let (_tmp, store) = store().await;
        store.save(&record("work?", 1.0)).await.unwrap();
        store.save(&record("sleep?", 0.0)).await.unwrap();
        store.save(&record("work?", 0.5)).await.unwrap();
        store.save(&record("anxiety?", 0.5)).await.unwrap();

        let stats = store.aggregate_stats(2).await.unwrap();
        assert_eq!(stats.total_questions, 4);
        assert!((stats.avg_confidence - 0.5).abs() < 1e-9);
        assert_eq!(stats.top_questions, vec!["work?", "anxiety?"]);
    }

    #[tokio::test]
    async fn test_stats_empty_table() {
        let (_tmp, store) = store().await;
        let stats = store.aggregate_stats(5).await.unwrap();
        assert_eq!(stats.total_questions, 0);
        assert_eq!(stats.avg_confidence, 0.0);
        assert!(stats.top_questions.is_empty());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let (_tmp, store) = store().await;
        migrate::migrate_pool(store.pool()).await.unwrap();
        store.save(&record("still works?", 0.7)).await.unwrap();
        assert_eq!(store.recent(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_quotes_read_as_empty() {
        let (_tmp, store) = store().await;
        sqlx::query(
            "INSERT INTO qa_history (id, question, answer, relevant_quotes, confidence, created_at) \
             VALUES ('bad-row', 'q?', 'a', '{not json', 0.8, 1700000000)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let recent = store.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "bad-row");
        assert!(recent[0].relevant_quotes.is_empty());
        assert_eq!(recent[0].created_at, "2023-11-14T22:13:20Z");
    }
}
