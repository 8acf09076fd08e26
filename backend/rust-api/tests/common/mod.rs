#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use studyhelper_api::config::{Config, StoreBackend};
use studyhelper_api::models::user::ChatMessage;
use studyhelper_api::oracle::{
    AnalyzeResponse, ContentOracle, OracleError, RawQuestion, Resource, RoadmapPayload,
    SubtaskSuggestion,
};
use studyhelper_api::store::MemoryStore;
use studyhelper_api::{create_router, services::AppState};
use tower::ServiceExt;

/// Oracle whose answers are fixed up front. A capability left as `None`
/// fails like an unreachable service.
#[derive(Default)]
pub struct ScriptedOracle {
    pub analyze: Option<AnalyzeResponse>,
    pub subtasks: Option<Vec<SubtaskSuggestion>>,
    pub quiz: Option<Vec<RawQuestion>>,
    pub roadmap: Option<RoadmapPayload>,
    pub tutor: Option<String>,
    pub recommend: Option<Vec<Resource>>,
    pub roadmap_prompts: Mutex<Vec<String>>,
    pub tutor_histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedOracle {
    /// Every capability fails.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn last_roadmap_prompt(&self) -> Option<String> {
        self.roadmap_prompts.lock().unwrap().last().cloned()
    }
}

fn scripted<T: Clone>(value: &Option<T>) -> Result<T, OracleError> {
    value
        .clone()
        .ok_or_else(|| OracleError::Transport("connection refused".to_string()))
}

#[async_trait]
impl ContentOracle for ScriptedOracle {
    async fn analyze(&self, _text: &str) -> Result<AnalyzeResponse, OracleError> {
        scripted(&self.analyze)
    }

    async fn subtasks(&self, _title: &str, _description: &str) -> Result<Vec<SubtaskSuggestion>, OracleError> {
        scripted(&self.subtasks)
    }

    async fn quiz(&self, _topic: &str, _description: &str) -> Result<Vec<RawQuestion>, OracleError> {
        scripted(&self.quiz)
    }

    async fn roadmap(&self, prompt: &str) -> Result<RoadmapPayload, OracleError> {
        self.roadmap_prompts.lock().unwrap().push(prompt.to_string());
        scripted(&self.roadmap)
    }

    async fn tutor(&self, history: &[ChatMessage]) -> Result<String, OracleError> {
        self.tutor_histories.lock().unwrap().push(history.to_vec());
        scripted(&self.tutor)
    }

    async fn recommend(&self, _query: &str) -> Result<Vec<Resource>, OracleError> {
        scripted(&self.recommend)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub oracle: Arc<ScriptedOracle>,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        bcrypt_cost: 4,
        jwt_secret: "integration-test-secret".to_string(),
        metrics_auth: "metrics:secret".to_string(),
        ..Config::default()
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(ScriptedOracle::offline())
}

pub fn create_test_app_with(oracle: ScriptedOracle) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let oracle = Arc::new(oracle);
    let state = Arc::new(AppState::with_backends(
        config.clone(),
        store.clone(),
        oracle.clone(),
    ));

    TestApp {
        router: create_router(state),
        store,
        oracle,
        config,
    }
}

impl TestApp {
    /// Sends a request and returns the status with the parsed JSON body
    /// (`Null` for an empty body).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    /// Registers a fresh user and returns `(token, user_id)`.
    pub async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth",
                None,
                Some(json!({
                    "action": "register",
                    "name": "Test Student",
                    "email": email,
                    "password": "password123"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["userId"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_task(&self, token: &str, title: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/tasks",
                Some(token),
                Some(json!({ "title": title, "description": "integration test" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create task failed: {}", body);
        body
    }
}

pub fn raw_question(question: &str, options: &[&str], correct: &str) -> RawQuestion {
    RawQuestion {
        question: question.to_string(),
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        correct_answer: Some(correct.to_string()),
        answer: None,
    }
}
