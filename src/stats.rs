//! History listing and usage statistics.
//!
//! `tqa history` prints the most recent questions; `tqa stats` prints the
//! aggregate view the `/transcript/stats` endpoint serves, plus the size of
//! the database file.

use anyhow::Result;

use transcript_qa_core::history::HistoryStore;

use crate::config::Config;
use crate::db;
use crate::history::SqliteHistory;
use crate::migrate;

async fn open_history(config: &Config) -> Result<SqliteHistory> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    Ok(SqliteHistory::new(pool))
}

/// Print up to `limit` records, newest first.
pub async fn run_history(config: &Config, limit: Option<usize>) -> Result<()> {
    let history = open_history(config).await?;
    let limit = limit.unwrap_or(config.history.default_limit);
    let records = history.recent(limit).await?;

    if records.is_empty() {
        println!("No questions asked yet.");
    } else {
        println!("{:<16} {:>5}   QUESTION", "ASKED", "CONF");
        println!("  {}", "-".repeat(70));
        for r in &records {
            println!(
                "{:<16} {:>4.0}%   {}",
                format_relative(&r.created_at),
                r.confidence * 100.0,
                r.question
            );
        }
    }

    history.pool().close().await;
    Ok(())
}

/// Run the stats command: aggregate history and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let history = open_history(config).await?;
    let stats = history.aggregate_stats(config.history.top_questions).await?;
    let last = history.recent(1).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Transcript QA Usage Stats");
    println!("=========================");
    println!();
    println!("  Transcript:  {}", config.transcript.path.display());
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Questions:   {}", stats.total_questions);
    println!("  Avg conf.:   {:.0}%", stats.avg_confidence * 100.0);
    if let Some(r) = last.first() {
        println!("  Last asked:  {}", format_relative(&r.created_at));
    }

    if !stats.top_questions.is_empty() {
        println!();
        println!("  Most asked:");
        for (i, q) in stats.top_questions.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, q);
        }
    }

    println!();

    history.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Render an RFC 3339 timestamp relative to now (e.g. "3 hours ago").
fn format_relative(rfc3339: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(rfc3339) {
        Ok(dt) => format_ts_relative(dt.timestamp(), chrono::Utc::now().timestamp()),
        Err(_) => rfc3339.to_string(),
    }
}

fn format_ts_relative(ts: i64, now: i64) -> String {
    let delta = now - ts;

    if delta < 0 {
        return format_ts_short(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_short(ts)
    }
}

fn format_ts_short(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_ts_relative() {
        let now = 1_700_000_000;
        assert_eq!(format_ts_relative(now - 10, now), "just now");
        assert_eq!(format_ts_relative(now - 60, now), "1 min ago");
        assert_eq!(format_ts_relative(now - 7200, now), "2 hours ago");
        assert_eq!(format_ts_relative(now - 86400 * 3, now), "3 days ago");
        assert_eq!(format_ts_relative(now - 86400 * 60, now), "2023-09-15 22:13");
    }

    #[test]
    fn test_format_relative_bad_input_passthrough() {
        assert_eq!(format_relative("yesterday"), "yesterday");
    }
}
