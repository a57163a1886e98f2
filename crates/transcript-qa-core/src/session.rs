//! Question-answering session over one transcript.
//!
//! A [`QaSession`] owns the embedding index and moves through a small
//! state machine:
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──ok──▶ Ready
//!                                    │
//!                                    └──err──▶ Failed (terminal)
//! ```
//!
//! Initialization runs at most once. Concurrent callers serialize on an
//! async gate and observe the first caller's outcome. Once `Ready`, the
//! index is shared behind an `Arc` and any number of [`QaSession::answer`]
//! calls may run concurrently.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::confidence::ConfidencePolicy;
use crate::documents::{build_units, DEFAULT_WINDOW_SIZE};
use crate::embedding::Embedder;
use crate::error::QaError;
use crate::index::{EmbeddingIndex, IndexConfig};
use crate::models::{Answer, ScoredChunk, SpeakerLabels, UnitKind};
use crate::synth::AnswerSynthesizer;
use crate::transcript::parse;

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Initializing => "initializing",
            SessionPhase::Ready => "ready",
            SessionPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval and scoring knobs.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub window_size: usize,
    pub labels: SpeakerLabels,
    pub index: IndexConfig,
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Upper bound on quotes returned with an answer.
    pub max_quotes: usize,
    pub confidence: ConfidencePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            labels: SpeakerLabels::default(),
            index: IndexConfig::default(),
            top_k: 4,
            max_quotes: 3,
            confidence: ConfidencePolicy::default(),
        }
    }
}

/// Counts recorded by a successful initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitSummary {
    pub utterances: usize,
    pub units: usize,
    pub chunks: usize,
}

enum State {
    Uninitialized,
    Initializing,
    Ready {
        index: Arc<EmbeddingIndex>,
        summary: InitSummary,
    },
    Failed(String),
}

impl State {
    fn phase(&self) -> SessionPhase {
        match self {
            State::Uninitialized => SessionPhase::Uninitialized,
            State::Initializing => SessionPhase::Initializing,
            State::Ready { .. } => SessionPhase::Ready,
            State::Failed(_) => SessionPhase::Failed,
        }
    }
}

pub struct QaSession {
    embedder: Arc<dyn Embedder>,
    synthesizer: AnswerSynthesizer,
    settings: SessionSettings,
    state: RwLock<State>,
    init_gate: Mutex<()>,
}

impl QaSession {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        synthesizer: AnswerSynthesizer,
        settings: SessionSettings,
    ) -> Self {
        Self {
            embedder,
            synthesizer,
            settings,
            state: RwLock::new(State::Uninitialized),
            init_gate: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase()
    }

    /// Parse `raw`, build retrieval units and embed them.
    ///
    /// Calling this on a `Ready` session is a no-op that returns the
    /// original summary. A `Failed` session stays failed and returns the
    /// original error message again.
    pub async fn initialize(&self, raw: &str) -> Result<InitSummary, QaError> {
        let _gate = self.init_gate.lock().await;

        match &*self.state.read().await {
            State::Ready { summary, .. } => {
                tracing::debug!("session already initialized");
                return Ok(*summary);
            }
            State::Failed(message) => return Err(QaError::InitializationFailed(message.clone())),
            State::Uninitialized | State::Initializing => {}
        }

        *self.state.write().await = State::Initializing;
        tracing::info!(model = self.embedder.model_name(), "initializing session");

        match self.build_index(raw).await {
            Ok((index, summary)) => {
                tracing::info!(
                    utterances = summary.utterances,
                    units = summary.units,
                    chunks = summary.chunks,
                    "session ready"
                );
                *self.state.write().await = State::Ready {
                    index: Arc::new(index),
                    summary,
                };
                Ok(summary)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(stage = "initialize", error = %message, "session initialization failed");
                *self.state.write().await = State::Failed(message.clone());
                Err(QaError::InitializationFailed(message))
            }
        }
    }

    async fn build_index(&self, raw: &str) -> Result<(EmbeddingIndex, InitSummary), QaError> {
        let utterances = parse(raw);
        if utterances.is_empty() {
            tracing::warn!("transcript contains no tagged utterances");
        }
        let units = build_units(&utterances, self.settings.window_size, &self.settings.labels);

        let index = EmbeddingIndex::new(self.embedder.clone(), self.settings.index.clone());
        let chunks = index.build(&units).await?;

        Ok((
            index,
            InitSummary {
                utterances: utterances.len(),
                units: units.len(),
                chunks,
            },
        ))
    }

    async fn ready_index(&self) -> Result<Arc<EmbeddingIndex>, QaError> {
        match &*self.state.read().await {
            State::Ready { index, .. } => Ok(index.clone()),
            other => Err(QaError::NotReady(other.phase())),
        }
    }

    /// Answer `question` from the indexed transcript.
    ///
    /// Retrieves `top_k` chunks, quotes up to `max_quotes` speaker-turn
    /// chunks and scores confidence from the number retrieved.
    pub async fn answer(&self, question: &str) -> Result<Answer, QaError> {
        let index = self.ready_index().await?;
        let chunks = index.search(question, self.settings.top_k).await?;

        let relevant_quotes: Vec<String> = chunks
            .iter()
            .filter(|c| c.metadata.kind == UnitKind::SpeakerTurn)
            .take(self.settings.max_quotes)
            .map(|c| c.content.clone())
            .collect();

        let answer = self.synthesizer.synthesize(question, &chunks).await?;
        let confidence = self.settings.confidence.estimate(chunks.len());

        Ok(Answer {
            answer,
            relevant_quotes,
            confidence,
        })
    }

    /// Ranked chunks for `question`, without synthesis.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>, QaError> {
        let index = self.ready_index().await?;
        index.search(question, k).await
    }
}
