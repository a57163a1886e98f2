//! HTTP API server.
//!
//! Exposes the QA service as a JSON HTTP API for the web client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version and session state) |
//! | `GET`  | `/transcript` | Parsed utterances with speaker labels |
//! | `POST` | `/transcript/question` | Answer a question about the transcript |
//! | `POST` | `/transcript/debug-retrieval` | Ranked chunks for a question, without synthesis |
//! | `GET`  | `/transcript/history` | Recent questions, newest first |
//! | `GET`  | `/transcript/stats` | Usage analytics |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_ready` (503), `internal` (500).
//! Malformed JSON bodies, a missing `Content-Type` and bad query strings
//! are all reported as `bad_request`.
//! `POST /transcript/question` never fails once the body is valid: provider
//! errors come back as a fallback answer with confidence `0`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser client
//! can be served from a different origin.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use transcript_qa_core::error::QaError;
use transcript_qa_core::models::{QaRecord, QuestionResponse, UnitMetadata};
use transcript_qa_core::service::{AnalyticsReport, QaService, TranscriptLine};

use crate::bootstrap::build_service;
use crate::config::Config;

/// Characters of chunk content shown by the debug retrieval endpoint.
const DEBUG_PREVIEW_CHARS: usize = 200;
/// Entries in the analytics `recentActivity` list.
const RECENT_ACTIVITY: usize = 10;

/// Request defaults taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ApiDefaults {
    pub debug_k: usize,
    pub history_limit: usize,
    pub top_questions: usize,
}

impl ApiDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debug_k: config.retrieval.debug_k,
            history_limit: config.history.default_limit,
            top_questions: config.history.top_questions,
        }
    }
}

impl Default for ApiDefaults {
    fn default() -> Self {
        Self {
            debug_k: 5,
            history_limit: 50,
            top_questions: 5,
        }
    }
}

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    service: Arc<QaService>,
    defaults: ApiDefaults,
}

/// Starts the HTTP server.
///
/// Builds the service, indexes the transcript, then binds to `[server].bind`.
/// A failed initialization is logged and the server starts anyway: question
/// requests then receive the fallback answer and `/health` reports
/// `"session": "failed"`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config).await?;

    match service.initialize().await {
        Ok(summary) => tracing::info!(
            utterances = summary.utterances,
            chunks = summary.chunks,
            "transcript indexed"
        ),
        Err(e) => tracing::error!(error = %e, "transcript indexing failed; serving fallback answers"),
    }

    let app = build_router(service.clone(), ApiDefaults::from_config(config));
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "HTTP server listening");
    println!("Transcript QA server listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shutting down; waiting for pending history writes");
    service.drain_pending().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Build the router over an existing service.
pub fn build_router(service: Arc<QaService>, defaults: ApiDefaults) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/transcript", get(handle_transcript))
        .route("/transcript/question", post(handle_question))
        .route("/transcript/debug-retrieval", post(handle_debug_retrieval))
        .route("/transcript/history", get(handle_history))
        .route("/transcript/stats", get(handle_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service, defaults })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        match err {
            QaError::NotReady(_) | QaError::NotInitialized => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "not_ready",
                message: err.to_string(),
            },
            other => internal(other.into()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// Session state: `uninitialized`, `initializing`, `ready` or `failed`.
    session: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session: state.service.phase().await.to_string(),
    })
}

// ============ GET /transcript ============

async fn handle_transcript(State(state): State<AppState>) -> Json<Vec<TranscriptLine>> {
    Json(state.service.transcript())
}

// ============ POST /transcript/question ============

#[derive(Deserialize)]
struct QuestionRequest {
    #[serde(default)]
    question: String,
}

async fn handle_question(
    State(state): State<AppState>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionResponse>, AppError> {
    let Json(req) = body?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    Ok(Json(state.service.ask(question).await))
}

// ============ POST /transcript/debug-retrieval ============

#[derive(Deserialize)]
struct DebugRetrievalRequest {
    #[serde(default)]
    question: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugRetrievalResponse {
    question: String,
    retrieved_documents: Vec<RetrievedDocument>,
}

#[derive(Serialize)]
struct RetrievedDocument {
    content: String,
    metadata: UnitMetadata,
    score: f32,
}

fn debug_preview(content: &str) -> String {
    let cut: String = content.chars().take(DEBUG_PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

async fn handle_debug_retrieval(
    State(state): State<AppState>,
    body: Result<Json<DebugRetrievalRequest>, JsonRejection>,
) -> Result<Json<DebugRetrievalResponse>, AppError> {
    let Json(req) = body?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let k = req.k.unwrap_or(state.defaults.debug_k);

    let chunks = state.service.retrieve(question, k).await?;
    Ok(Json(DebugRetrievalResponse {
        question: question.to_string(),
        retrieved_documents: chunks
            .into_iter()
            .map(|c| RetrievedDocument {
                content: debug_preview(&c.content),
                metadata: c.metadata,
                score: c.score,
            })
            .collect(),
    }))
}

// ============ GET /transcript/history ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn handle_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<QaRecord>>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.defaults.history_limit);
    let records = state.service.history(limit).await.map_err(internal)?;
    Ok(Json(records))
}

// ============ GET /transcript/stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<AnalyticsReport>, AppError> {
    let report = state
        .service
        .analytics(state.defaults.top_questions, RECENT_ACTIVITY)
        .await
        .map_err(internal)?;
    Ok(Json(report))
}
