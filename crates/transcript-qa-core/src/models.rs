//! Core data models shared across the QA pipeline.
//!
//! These types represent the utterances, retrieval units, answers and
//! history records that flow from transcript ingestion to the HTTP API.

use serde::{Deserialize, Serialize};

/// Which party of the session produced an utterance.
///
/// The transcript tags the therapist as `[Speaker:0]`; every other
/// speaker digit is the session subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Therapist,
    Subject,
}

/// Display names for the two parties, used in window units and listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerLabels {
    pub therapist: String,
    pub subject: String,
}

impl SpeakerLabels {
    pub fn new(therapist: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            therapist: therapist.into(),
            subject: subject.into(),
        }
    }

    pub fn label(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Therapist => &self.therapist,
            Speaker::Subject => &self.subject,
        }
    }
}

impl Default for SpeakerLabels {
    fn default() -> Self {
        Self::new("Therapist", "Client")
    }
}

/// One speaker turn, in transcript order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
    /// 0-based position in the parsed sequence.
    pub index: usize,
}

/// Kind of retrieval unit a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Exactly one utterance, verbatim.
    SpeakerTurn,
    /// Several consecutive utterances rendered as `"speaker: text"` lines.
    ConversationWindow,
}

/// Provenance carried by every retrieval unit and every sub-chunk split from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitMetadata {
    pub kind: UnitKind,
    pub source_indices: Vec<usize>,
    pub speakers: Vec<Speaker>,
    /// Character count of the parent unit's content.
    pub length: usize,
}

/// A chunk of transcript text prepared for similarity search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalUnit {
    pub content: String,
    pub metadata: UnitMetadata,
}

impl RetrievalUnit {
    pub fn kind(&self) -> UnitKind {
        self.metadata.kind
    }
}

/// A sub-chunk returned from the embedding index with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub content: String,
    pub metadata: UnitMetadata,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Result of answering one question inside a ready session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub relevant_quotes: Vec<String>,
    pub confidence: f64,
}

/// Response shape returned to callers of the QA service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question: String,
    pub answer: String,
    pub relevant_quotes: Vec<String>,
    pub confidence: f64,
}

/// A question/answer pair to be appended to history.
#[derive(Debug, Clone)]
pub struct NewQaRecord {
    pub question: String,
    pub answer: String,
    pub relevant_quotes: Vec<String>,
    pub confidence: f64,
}

impl From<&QuestionResponse> for NewQaRecord {
    fn from(resp: &QuestionResponse) -> Self {
        Self {
            question: resp.question.clone(),
            answer: resp.answer.clone(),
            relevant_quotes: resp.relevant_quotes.clone(),
            confidence: resp.confidence,
        }
    }
}

/// A persisted question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub relevant_quotes: Vec<String>,
    pub confidence: f64,
    /// RFC 3339 UTC timestamp.
    pub created_at: String,
}

/// Aggregate usage statistics over the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaStats {
    pub total_questions: i64,
    pub avg_confidence: f64,
    pub top_questions: Vec<String>,
}
