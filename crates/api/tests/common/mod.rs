#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use derby_core::RaceStore;
use derby_judge::{JudgeClient, JudgeConfig, JudgeError};
use http_body_util::BodyExt;
use tower::ServiceExt;

use derby_api::config::ServerConfig;
use derby_api::engine::AnswerPipeline;
use derby_api::router::build_app_router;
use derby_api::state::AppState;
use derby_api::ws::BroadcastHub;

// ---------------------------------------------------------------------------
// Judge doubles
// ---------------------------------------------------------------------------

/// Answers every question with a fixed text and a fixed verdict.
pub struct ScriptedJudge {
    pub verdict: bool,
    pub delay: Duration,
    pub generate_calls: AtomicUsize,
    pub evaluate_calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn approving() -> Self {
        Self::with_verdict(true)
    }

    pub fn rejecting() -> Self {
        Self::with_verdict(false)
    }

    pub fn with_verdict(verdict: bool) -> Self {
        Self {
            verdict,
            delay: Duration::ZERO,
            generate_calls: AtomicUsize::new(0),
            evaluate_calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl JudgeClient for ScriptedJudge {
    async fn generate(&self, model: &str, question: &str) -> Result<String, JudgeError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(format!("{model} says: {question}"))
    }

    async fn evaluate(&self, _question: &str, _answer: &str) -> Result<bool, JudgeError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.verdict)
    }
}

/// Fails every call the way an unconfigured backend does.
pub struct FailingJudge;

#[async_trait]
impl JudgeClient for FailingJudge {
    async fn generate(&self, _model: &str, _question: &str) -> Result<String, JudgeError> {
        Err(JudgeError::MissingCredential)
    }

    async fn evaluate(&self, _question: &str, _answer: &str) -> Result<bool, JudgeError> {
        Err(JudgeError::MissingCredential)
    }
}

/// Generates fine but fails to produce a verdict.
pub struct BrokenEvaluator;

#[async_trait]
impl JudgeClient for BrokenEvaluator {
    async fn generate(&self, _model: &str, _question: &str) -> Result<String, JudgeError> {
        Ok("A perfectly good answer".to_string())
    }

    async fn evaluate(&self, _question: &str, _answer: &str) -> Result<bool, JudgeError> {
        Err(JudgeError::MalformedResponse("verdict is not valid JSON".into()))
    }
}

/// The answering model is down; counts how often a verdict is requested.
#[derive(Default)]
pub struct ModelDownJudge {
    pub evaluate_calls: AtomicUsize,
}

#[async_trait]
impl JudgeClient for ModelDownJudge {
    async fn generate(&self, _model: &str, _question: &str) -> Result<String, JudgeError> {
        Err(JudgeError::ApiError {
            status: 503,
            body: "model unavailable".to_string(),
        })
    }

    async fn evaluate(&self, _question: &str, _answer: &str) -> Result<bool, JudgeError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

/// Answers at once but never returns a verdict.
pub struct SilentEvaluator;

#[async_trait]
impl JudgeClient for SilentEvaluator {
    async fn generate(&self, _model: &str, _question: &str) -> Result<String, JudgeError> {
        Ok("An answer nobody will judge".to_string())
    }

    async fn evaluate(&self, _question: &str, _answer: &str) -> Result<bool, JudgeError> {
        std::future::pending().await
    }
}

/// Never answers.
pub struct HangingJudge;

#[async_trait]
impl JudgeClient for HangingJudge {
    async fn generate(&self, _model: &str, _question: &str) -> Result<String, JudgeError> {
        std::future::pending().await
    }

    async fn evaluate(&self, _question: &str, _answer: &str) -> Result<bool, JudgeError> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        judge_timeout_secs: 2,
        judge: JudgeConfig {
            api_url: "http://127.0.0.1:1/unused".to_string(),
            api_key: Some("test-key".to_string()),
            judge_model: "gpt-4o".to_string(),
        },
    }
}

/// Build the shared state around a fresh race and the given judge.
pub fn test_state(judge: Arc<dyn JudgeClient>, judge_timeout: Duration) -> AppState {
    let store = Arc::new(RaceStore::default());
    let hub = Arc::new(BroadcastHub::new());
    let pipeline = AnswerPipeline::new(Arc::clone(&store), judge, Arc::clone(&hub), judge_timeout);

    AppState {
        config: Arc::new(test_config()),
        store,
        hub,
        pipeline,
    }
}

/// Build the full application router with all middleware layers.
///
/// Uses the same builder as `main.rs` so integration tests exercise the
/// production middleware stack. Returns the state too so tests can inspect
/// the store, hub and pipeline directly.
pub fn build_test_app(judge: Arc<dyn JudgeClient>) -> (Router, AppState) {
    let state = test_state(judge, Duration::from_secs(2));
    let app = build_app_router(state.clone(), &test_config());
    (app, state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
