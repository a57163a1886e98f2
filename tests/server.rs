//! HTTP API tests.
//!
//! Each test builds its own router over an in-memory history store and
//! deterministic fake providers, then drives it with `oneshot`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use transcript_qa::server::{build_router, ApiDefaults};
use transcript_qa_core::embedding::Embedder;
use transcript_qa_core::history::memory::InMemoryHistory;
use transcript_qa_core::models::SpeakerLabels;
use transcript_qa_core::service::QaService;
use transcript_qa_core::session::{QaSession, SessionSettings};
use transcript_qa_core::synth::{AnswerSynthesizer, Completer, CompletionRequest, SynthSettings};

const TRANSCRIPT: &str = "[Speaker:0] How have you been sleeping?
[Speaker:1] Badly. I lie awake thinking about work.
[Speaker:0] What about work keeps you up?
[Speaker:1] My manager criticises everything I do.";

// =============================================================================
// Helpers
// =============================================================================

/// Vectors count a few marker words so rankings are predictable.
struct MarkerEmbedder;

#[async_trait]
impl Embedder for MarkerEmbedder {
    fn model_name(&self) -> &str {
        "marker"
    }
    fn dims(&self) -> usize {
        4
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                vec![
                    t.matches("sleep").count() as f32,
                    t.matches("work").count() as f32,
                    t.matches("manager").count() as f32,
                    0.1,
                ]
            })
            .collect())
    }
}

struct CannedCompleter;

#[async_trait]
impl Completer for CannedCompleter {
    fn model_name(&self) -> &str {
        "canned"
    }
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if request.prompt.contains("Question: fail") {
            anyhow::bail!("upstream 503");
        }
        Ok("Lucy reports trouble sleeping because of work.".to_string())
    }
}

fn make_service() -> Arc<QaService> {
    let settings = SessionSettings {
        labels: SpeakerLabels::new("Therapist", "Lucy"),
        ..SessionSettings::default()
    };
    let synth = AnswerSynthesizer::new(Arc::new(CannedCompleter), SynthSettings::default(), "Lucy");
    let session = Arc::new(QaSession::new(Arc::new(MarkerEmbedder), synth, settings));
    Arc::new(QaService::new(
        session,
        Arc::new(InMemoryHistory::new()),
        "transcript.txt",
        TRANSCRIPT,
    ))
}

async fn ready_app() -> (Arc<QaService>, axum::Router) {
    let service = make_service();
    service.initialize().await.unwrap();
    let app = build_router(service.clone(), ApiDefaults::default());
    (service, app)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_health_reports_session_state() {
    let service = make_service();
    let app = build_router(service.clone(), ApiDefaults::default());

    let resp = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["session"], "uninitialized");

    service.initialize().await.unwrap();
    let json = body_json(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(json["session"], "ready");
}

#[tokio::test]
async fn test_transcript_listing() {
    let (_service, app) = ready_app().await;

    let resp = app.oneshot(get("/transcript")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let lines = json.as_array().unwrap();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["speaker"], "Therapist");
    assert_eq!(lines[1]["speaker"], "Lucy");
    assert_eq!(lines[1]["text"], "Badly. I lie awake thinking about work.");
}

#[tokio::test]
async fn test_question_returns_answer_with_quotes() {
    let (_service, app) = ready_app().await;

    let resp = app
        .oneshot(post_json(
            "/transcript/question",
            r#"{"question": "How is she sleeping?"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["question"], "How is she sleeping?");
    assert_eq!(json["answer"], "Lucy reports trouble sleeping because of work.");
    let quotes = json["relevantQuotes"].as_array().unwrap();
    assert!(!quotes.is_empty() && quotes.len() <= 3);
    assert_eq!(quotes[0], "How have you been sleeping?");
    assert_eq!(json["confidence"], 1.0);
}

#[tokio::test]
async fn test_question_blank_is_bad_request() {
    let (_service, app) = ready_app().await;

    for body in [r#"{"question": "   "}"#, r#"{}"#] {
        let resp = app
            .clone()
            .oneshot(post_json("/transcript/question", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn test_malformed_body_uses_error_contract() {
    let (_service, app) = ready_app().await;

    for uri in ["/transcript/question", "/transcript/debug-retrieval"] {
        let resp = app
            .clone()
            .oneshot(post_json(uri, "{not json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "bad_request");
        assert!(json["error"]["message"].as_str().unwrap().contains("JSON"));
    }
}

#[tokio::test]
async fn test_missing_content_type_uses_error_contract() {
    let (_service, app) = ready_app().await;

    let req = Request::post("/transcript/question")
        .body(Body::from(r#"{"question": "sleep?"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "bad_request");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Content-Type"));
}

#[tokio::test]
async fn test_history_bad_limit_uses_error_contract() {
    let (_service, app) = ready_app().await;

    let resp = app
        .oneshot(get("/transcript/history?limit=many"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_question_provider_failure_is_fallback() {
    let (_service, app) = ready_app().await;

    let resp = app
        .oneshot(post_json("/transcript/question", r#"{"question": "fail"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["confidence"], 0.0);
    let answer = json["answer"].as_str().unwrap();
    assert!(answer.contains("apologize"));
    assert!(answer.contains("\"fail\""));
    assert!(answer.contains("upstream 503"));
}

#[tokio::test]
async fn test_question_before_initialize_is_fallback() {
    let app = build_router(make_service(), ApiDefaults::default());

    let resp = app
        .oneshot(post_json("/transcript/question", r#"{"question": "Too early?"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["confidence"], 0.0);
    assert!(json["answer"].as_str().unwrap().contains("not ready"));
}

#[tokio::test]
async fn test_debug_retrieval() {
    let (_service, app) = ready_app().await;

    let resp = app
        .oneshot(post_json(
            "/transcript/debug-retrieval",
            r#"{"question": "manager", "k": 2}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["question"], "manager");
    let docs = json["retrievedDocuments"].as_array().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["content"], "My manager criticises everything I do....");
    assert_eq!(docs[0]["metadata"]["kind"], "speaker_turn");
    assert!(docs[0]["score"].as_f64().unwrap() >= docs[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn test_debug_retrieval_not_ready() {
    let app = build_router(make_service(), ApiDefaults::default());

    let resp = app
        .oneshot(post_json("/transcript/debug-retrieval", r#"{"question": "sleep"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "not_ready");
}

#[tokio::test]
async fn test_history_newest_first_with_limit() {
    let (service, app) = ready_app().await;

    for q in ["first?", "second?", "third?"] {
        service.ask(q).await;
    }
    service.drain_pending().await;

    let resp = app.oneshot(get("/transcript/history?limit=2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["question"], "third?");
    assert_eq!(records[1]["question"], "second?");
    assert!(records[0]["id"].as_str().is_some());
}

#[tokio::test]
async fn test_stats_report_shape() {
    let (service, app) = ready_app().await;

    service.ask("sleep?").await;
    service.ask("sleep?").await;
    service.ask("fail").await;
    service.drain_pending().await;

    let resp = app.oneshot(get("/transcript/stats")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;

    assert_eq!(json["success"], true);
    assert_eq!(json["transcriptInfo"]["source"], "transcript.txt");
    assert_eq!(json["analytics"]["totalQuestions"], 3);
    let avg = json["analytics"]["avgConfidence"].as_f64().unwrap();
    assert!((avg - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(json["analytics"]["mostAskedQuestions"][0], "sleep?");
    assert_eq!(json["recentActivity"].as_array().unwrap().len(), 3);
    assert!(json["recentActivity"][0]["answerPreview"].is_string());
    assert!(json["generatedAt"].is_string());
}
