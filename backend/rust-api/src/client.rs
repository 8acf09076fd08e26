//! Typed HTTP client for the study API.
//!
//! Authentication state lives in an explicit [`Session`] returned by
//! [`StudyClient::login`] / [`StudyClient::register`] and passed to every call.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::progress::ProgressReport;
use crate::models::quiz::{QuizDetail, QuizHistoryPage, QuizResponse, SubmitResult};
use crate::models::roadmap::RoadmapResponse;
use crate::models::task::TaskResponse;
use crate::models::user::{AuthResponse, UserProfile};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Session {
            token: auth.token,
            user_id: auth.user_id,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct StudyClient {
    base_url: String,
    client: reqwest::Client,
}

impl StudyClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8081`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, session: &Session, path: &str) -> Result<T, ClientError> {
        self.send(self.client.get(self.url(path)).bearer_auth(&session.token))
            .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: Value,
    ) -> Result<T, ClientError> {
        self.send(
            self.client
                .post(self.url(path))
                .bearer_auth(&session.token)
                .json(&body),
        )
        .await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = json!({ "action": "register", "name": name, "email": email, "password": password });
        let auth: AuthResponse = self
            .send(self.client.post(self.url("/auth")).json(&body))
            .await?;
        Ok(auth.into())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = json!({ "action": "login", "email": email, "password": password });
        let auth: AuthResponse = self
            .send(self.client.post(self.url("/auth")).json(&body))
            .await?;
        Ok(auth.into())
    }

    pub async fn me(&self, session: &Session) -> Result<UserProfile, ClientError> {
        self.get(session, "/me").await
    }

    pub async fn list_tasks(&self, session: &Session) -> Result<Vec<TaskResponse>, ClientError> {
        self.get(session, "/tasks").await
    }

    pub async fn create_task(
        &self,
        session: &Session,
        title: &str,
        description: &str,
    ) -> Result<TaskResponse, ClientError> {
        self.post(
            session,
            "/tasks",
            json!({ "title": title, "description": description }),
        )
        .await
    }

    pub async fn generate_quiz(&self, session: &Session, task_id: &str) -> Result<QuizResponse, ClientError> {
        self.post(session, "/quiz", json!({ "action": "generate", "taskId": task_id }))
            .await
    }

    pub async fn retry_quiz(&self, session: &Session, task_id: &str) -> Result<QuizResponse, ClientError> {
        self.post(session, "/quiz", json!({ "action": "retry", "taskId": task_id }))
            .await
    }

    pub async fn submit_quiz(
        &self,
        session: &Session,
        quiz_id: &str,
        answers: &[String],
    ) -> Result<SubmitResult, ClientError> {
        self.post(
            session,
            "/quiz",
            json!({ "action": "submit", "quizId": quiz_id, "answers": answers }),
        )
        .await
    }

    pub async fn quiz(&self, session: &Session, quiz_id: &str) -> Result<QuizDetail, ClientError> {
        self.get(session, &format!("/quiz/{}", quiz_id)).await
    }

    pub async fn quiz_history(
        &self,
        session: &Session,
        page: u32,
        limit: u32,
    ) -> Result<QuizHistoryPage, ClientError> {
        self.get(session, &format!("/quiz/history?page={}&limit={}", page, limit))
            .await
    }

    pub async fn progress(&self, session: &Session) -> Result<ProgressReport, ClientError> {
        self.get(session, "/progress").await
    }

    pub async fn roadmap(&self, session: &Session) -> Result<Vec<String>, ClientError> {
        let response: RoadmapResponse = self.get(session, "/roadmap").await?;
        Ok(response.roadmap)
    }

    pub async fn regenerate_roadmap(
        &self,
        session: &Session,
        prompt: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let response: RoadmapResponse = self
            .post(session, "/roadmap", json!({ "prompt": prompt }))
            .await?;
        Ok(response.roadmap)
    }
}
