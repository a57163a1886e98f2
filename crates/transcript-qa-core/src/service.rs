//! Service boundary used by the CLI and the HTTP server.
//!
//! [`QaService`] wraps a [`QaSession`] and a [`HistoryStore`]. Every public
//! question path returns a [`QuestionResponse`]: failures inside the session
//! become an apologetic fallback answer with confidence `0.0` instead of an
//! error. Answered questions are appended to history by a detached task, so
//! a slow or failing store never changes or delays the response.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::error::QaError;
use crate::history::HistoryStore;
use crate::models::{NewQaRecord, QaRecord, QuestionResponse, ScoredChunk, SpeakerLabels, Utterance};
use crate::session::{InitSummary, QaSession, SessionPhase};
use crate::transcript::parse;

/// Characters of answer text shown in analytics activity entries.
const ANSWER_PREVIEW_CHARS: usize = 100;

/// One parsed utterance with its display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub success: bool,
    pub transcript_info: TranscriptInfo,
    pub analytics: AnalyticsSummary,
    pub recent_activity: Vec<ActivityEntry>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptInfo {
    pub source: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_questions: i64,
    pub avg_confidence: f64,
    pub most_asked_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub question: String,
    pub confidence: f64,
    pub asked_at: String,
    pub answer_preview: String,
}

/// Apologetic answer returned when a question cannot be answered.
pub fn fallback_answer(question: &str, reason: &str) -> String {
    format!(
        "I apologize, but I encountered an error while processing your question: \"{}\". \
         Please make sure your language model provider is configured and try again. Error: {}",
        question, reason
    )
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

pub struct QaService {
    session: Arc<QaSession>,
    history: Arc<dyn HistoryStore>,
    source: String,
    raw: String,
    utterances: Vec<Utterance>,
    labels: SpeakerLabels,
    pending: Mutex<JoinSet<()>>,
}

impl QaService {
    /// `source` names where `raw` came from (usually a file name).
    pub fn new(
        session: Arc<QaSession>,
        history: Arc<dyn HistoryStore>,
        source: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let raw = raw.into();
        let utterances = parse(&raw);
        let labels = session.settings().labels.clone();
        Self {
            session,
            history,
            source: source.into(),
            raw,
            utterances,
            labels,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.phase().await
    }

    /// Index the transcript. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<InitSummary, QaError> {
        self.session.initialize(&self.raw).await
    }

    /// Parsed utterances with display labels, in transcript order.
    pub fn transcript(&self) -> Vec<TranscriptLine> {
        self.utterances
            .iter()
            .map(|u| TranscriptLine {
                speaker: self.labels.label(u.speaker).to_string(),
                text: u.text.clone(),
            })
            .collect()
    }

    /// Answer `question`, never failing.
    ///
    /// The response is complete before the history write is scheduled.
    pub async fn ask(&self, question: &str) -> QuestionResponse {
        let response = match self.session.answer(question).await {
            Ok(answer) => QuestionResponse {
                question: question.to_string(),
                answer: answer.answer,
                relevant_quotes: answer.relevant_quotes,
                confidence: answer.confidence,
            },
            Err(e) => {
                let stage = if e.is_external() { "provider" } else { "answer" };
                tracing::warn!(question, stage, error = %e, "returning fallback answer");
                QuestionResponse {
                    question: question.to_string(),
                    answer: fallback_answer(question, &e.to_string()),
                    relevant_quotes: Vec::new(),
                    confidence: 0.0,
                }
            }
        };

        self.record(NewQaRecord::from(&response));
        response
    }

    fn record(&self, record: NewQaRecord) {
        let history = self.history.clone();
        let task = async move {
            if let Err(e) = history.save(&record).await {
                tracing::warn!(
                    question = %record.question,
                    stage = "persist",
                    error = %e,
                    "failed to save question history"
                );
            }
        };

        match self.pending.lock() {
            Ok(mut pending) => {
                while pending.try_join_next().is_some() {}
                pending.spawn(task);
            }
            Err(_) => {
                tracing::warn!(stage = "persist", "pending task set poisoned; saving untracked");
                tokio::spawn(task);
            }
        }
    }

    /// Wait for every scheduled history write to finish.
    pub async fn drain_pending(&self) {
        let mut tasks = match self.pending.lock() {
            Ok(mut pending) => std::mem::replace(&mut *pending, JoinSet::new()),
            Err(_) => return,
        };
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(stage = "persist", error = %e, "history task panicked");
            }
        }
    }

    /// Ranked chunks for `question`, for retrieval debugging.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>, QaError> {
        self.session.retrieve(question, k).await
    }

    pub async fn history(&self, limit: usize) -> Result<Vec<QaRecord>> {
        self.history.recent(limit).await
    }

    /// Usage report combining aggregates and the latest activity.
    pub async fn analytics(&self, top_n: usize, recent_n: usize) -> Result<AnalyticsReport> {
        let stats = self.history.aggregate_stats(top_n).await?;
        let recent = self.history.recent(recent_n).await?;

        Ok(AnalyticsReport {
            success: true,
            transcript_info: TranscriptInfo {
                source: self.source.clone(),
                description: format!(
                    "Therapy session transcript between {} and {} ({} utterances)",
                    self.labels.therapist,
                    self.labels.subject,
                    self.utterances.len()
                ),
            },
            analytics: AnalyticsSummary {
                total_questions: stats.total_questions,
                avg_confidence: stats.avg_confidence,
                most_asked_questions: stats.top_questions,
            },
            recent_activity: recent
                .into_iter()
                .map(|r| ActivityEntry {
                    answer_preview: preview(&r.answer, ANSWER_PREVIEW_CHARS),
                    question: r.question,
                    confidence: r.confidence,
                    asked_at: r.created_at,
                })
                .collect(),
            generated_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        })
    }
}
