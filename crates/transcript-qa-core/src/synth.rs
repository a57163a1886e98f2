//! Answer synthesis from retrieved transcript context.
//!
//! Fills a fixed instruction template with the retrieved chunks and the
//! question, then makes exactly one completion call. Completion providers
//! implement [`Completer`]; the concrete HTTP clients live in the app crate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::QaError;
use crate::models::ScoredChunk;

/// Returned in place of a blank completion.
pub const EMPTY_ANSWER: &str = "I was unable to generate an answer.";

/// Instruction template. `{subject}`, `{context}` and `{question}` are
/// substituted before the call.
pub const PROMPT_TEMPLATE: &str = "You are an AI assistant analyzing a therapy session transcript between a therapist and a patient named {subject}.
Use the following context to answer the question accurately and empathetically.

Context:
{context}

Question: {question}

Instructions:
- Answer based only on the provided context
- Be empathetic and professional when discussing mental health topics
- If the context doesn't contain enough information, say so clearly
- Quote relevant parts when appropriate
- Keep your answer concise but thorough

Answer:";

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Trait for text completion providers.
#[async_trait]
pub trait Completer: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Sampling and timeout settings for synthesis.
#[derive(Debug, Clone)]
pub struct SynthSettings {
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout: Duration,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 500,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct AnswerSynthesizer {
    completer: Arc<dyn Completer>,
    settings: SynthSettings,
    subject: String,
}

/// Fill `template` in one left-to-right pass. Substituted values are
/// emitted verbatim and never scanned for placeholders.
fn render(template: &str, subject: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let (value, token_len) = if tail.starts_with("{subject}") {
            (subject, "{subject}".len())
        } else if tail.starts_with("{context}") {
            (context, "{context}".len())
        } else if tail.starts_with("{question}") {
            (question, "{question}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[token_len..];
    }

    out.push_str(rest);
    out
}

impl AnswerSynthesizer {
    pub fn new(completer: Arc<dyn Completer>, settings: SynthSettings, subject: &str) -> Self {
        Self {
            completer,
            settings,
            subject: subject.to_string(),
        }
    }

    /// Render the prompt for `question` over `chunks`, most relevant first.
    pub fn render_prompt(&self, question: &str, chunks: &[ScoredChunk]) -> String {
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        render(PROMPT_TEMPLATE, &self.subject, &context, question)
    }

    /// Generate an answer grounded in `chunks`.
    ///
    /// # Errors
    ///
    /// [`QaError::SynthesisFailed`] when the provider errors or exceeds the
    /// configured timeout. The call is not retried.
    pub async fn synthesize(&self, question: &str, chunks: &[ScoredChunk]) -> Result<String, QaError> {
        let request = CompletionRequest {
            prompt: self.render_prompt(question, chunks),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let output = match tokio::time::timeout(self.settings.timeout, self.completer.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(QaError::SynthesisFailed(format!("{:#}", e))),
            Err(_) => {
                return Err(QaError::SynthesisFailed(format!(
                    "timed out after {}s",
                    self.settings.timeout.as_secs()
                )))
            }
        };

        let trimmed = output.trim();
        if trimmed.is_empty() {
            tracing::warn!(model = self.completer.model_name(), "completion returned no text");
            return Ok(EMPTY_ANSWER.to_string());
        }
        Ok(trimmed.to_string())
    }
}
