//! Wires configuration into a ready-to-use [`QaService`].

use std::sync::Arc;

use anyhow::{Context, Result};

use transcript_qa_core::service::QaService;
use transcript_qa_core::session::QaSession;
use transcript_qa_core::synth::AnswerSynthesizer;

use crate::completion::create_completer;
use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::history::SqliteHistory;
use crate::migrate;

/// Read the transcript, open the history database and construct the
/// service. The session is left uninitialized.
pub async fn build_service(config: &Config) -> Result<Arc<QaService>> {
    let raw = std::fs::read_to_string(&config.transcript.path).with_context(|| {
        format!(
            "Failed to read transcript file: {}",
            config.transcript.path.display()
        )
    })?;
    let source = config
        .transcript
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.transcript.path.display().to_string());

    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let history = Arc::new(SqliteHistory::new(pool));

    let embedder = create_embedder(&config.embedding)?;
    let completer = create_completer(&config.completion)?;
    tracing::debug!(
        embedding = embedder.model_name(),
        completion = completer.model_name(),
        "providers configured"
    );

    let synthesizer = AnswerSynthesizer::new(
        completer,
        config.synth_settings(),
        &config.transcript.subject_label,
    );
    let session = Arc::new(QaSession::new(
        embedder,
        synthesizer,
        config.session_settings(),
    ));

    Ok(Arc::new(QaService::new(session, history, source, raw)))
}
