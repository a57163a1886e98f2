//! TOML configuration.
//!
//! Every section except `[db]`, `[transcript]` and `[server]` is optional
//! and falls back to the defaults below. [`load_config`] parses and
//! validates in one step so the rest of the app can trust the values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use transcript_qa_core::chunk::SplitterConfig;
use transcript_qa_core::confidence::ConfidencePolicy;
use transcript_qa_core::index::IndexConfig;
use transcript_qa_core::models::SpeakerLabels;
use transcript_qa_core::session::SessionSettings;
use transcript_qa_core::synth::SynthSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptConfig {
    pub path: PathBuf,
    #[serde(default = "default_therapist_label")]
    pub therapist_label: String,
    #[serde(default = "default_subject_label")]
    pub subject_label: String,
}

fn default_therapist_label() -> String {
    "Therapist".to_string()
}
fn default_subject_label() -> String {
    "Client".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            chunk_chars: default_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_window_size() -> usize {
    3
}
fn default_chunk_chars() -> usize {
    500
}
fn default_overlap_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_quotes")]
    pub max_quotes: usize,
    /// Default `k` for the debug retrieval endpoint and `tqa retrieve`.
    #[serde(default = "default_debug_k")]
    pub debug_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_quotes: default_max_quotes(),
            debug_k: default_debug_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}
fn default_max_quotes() -> usize {
    3
}
fn default_debug_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceConfig {
    #[serde(default = "default_confidence_base")]
    pub base: f64,
    #[serde(default = "default_confidence_per_result")]
    pub per_result: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: default_confidence_base(),
            per_result: default_confidence_per_result(),
        }
    }
}

fn default_confidence_base() -> f64 {
    0.7
}
fn default_confidence_per_result() -> f64 {
    0.1
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama host, OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> usize {
    500
}
fn default_completion_timeout_secs() -> u64 {
    60
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_limit")]
    pub default_limit: usize,
    #[serde(default = "default_top_questions")]
    pub top_questions: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
            top_questions: default_top_questions(),
        }
    }
}

fn default_history_limit() -> usize {
    50
}
fn default_top_questions() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Config {
    pub fn labels(&self) -> SpeakerLabels {
        SpeakerLabels::new(
            &self.transcript.therapist_label,
            &self.transcript.subject_label,
        )
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            window_size: self.chunking.window_size,
            labels: self.labels(),
            index: IndexConfig {
                splitter: SplitterConfig {
                    chunk_chars: self.chunking.chunk_chars,
                    overlap_chars: self.chunking.overlap_chars,
                },
                batch_size: self.embedding.batch_size,
                timeout: crate::embedding::retry_budget(&self.embedding),
            },
            top_k: self.retrieval.top_k,
            max_quotes: self.retrieval.max_quotes,
            confidence: ConfidencePolicy::new(self.confidence.base, self.confidence.per_result),
        }
    }

    pub fn synth_settings(&self) -> SynthSettings {
        SynthSettings {
            temperature: self.completion.temperature,
            max_tokens: self.completion.max_tokens,
            timeout: Duration::from_secs(self.completion.timeout_secs),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_chars == 0 {
        anyhow::bail!("chunking.chunk_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.chunk_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.chunk_chars");
    }
    if config.chunking.window_size == 0 {
        anyhow::bail!("chunking.window_size must be >= 1");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate confidence
    if !(0.0..=1.0).contains(&config.confidence.base) {
        anyhow::bail!("confidence.base must be in [0.0, 1.0]");
    }
    if config.confidence.per_result < 0.0 {
        anyhow::bail!("confidence.per_result must be >= 0.0");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // Validate completion
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        anyhow::bail!("completion.temperature must be in [0.0, 2.0]");
    }
    if config.completion.is_enabled() && config.completion.model.is_none() {
        anyhow::bail!(
            "completion.model must be specified when provider is '{}'",
            config.completion.provider
        );
    }

    match config.completion.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown completion provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}
