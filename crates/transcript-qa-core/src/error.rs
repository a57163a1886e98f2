//! Error types for the QA core.

use crate::session::SessionPhase;

/// Errors raised by the index, synthesizer and session.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error("embedding index has not been built")]
    NotInitialized,
    #[error("embedding index has already been built")]
    AlreadyBuilt,
    #[error("session is not ready (state: {0})")]
    NotReady(SessionPhase),
    #[error("session initialization failed: {0}")]
    InitializationFailed(String),
    #[error("embedding request failed: {0}")]
    EmbeddingFailed(String),
    #[error("answer synthesis failed: {0}")]
    SynthesisFailed(String),
}

impl QaError {
    /// True when the error came from an external embedding or completion call.
    pub fn is_external(&self) -> bool {
        matches!(self, QaError::EmbeddingFailed(_) | QaError::SynthesisFailed(_))
    }
}
