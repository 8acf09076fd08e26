use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{AnalyzeResponse, ContentOracle, OracleError, RawQuestion, Resource, RoadmapPayload, SubtaskSuggestion};
use crate::models::user::ChatMessage;

/// Client for the ML service (`/analyze`, `/subtasks`, `/quiz`, `/roadmap`,
/// `/tutor`, `/recommend`).
#[derive(Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to build ML service client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, OracleError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Err(OracleError::Empty);
        }

        // Plain-text answers are kept as a JSON string.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

/// Pulls a list out of `{"<key>": [...]}` or accepts a bare array.
fn list_from<T: DeserializeOwned>(value: Value, keys: &[&str]) -> Result<Vec<T>, OracleError> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(v @ Value::Array(_)) => Some(v),
                _ => None,
            })
            .ok_or_else(|| OracleError::Decode(format!("expected one of {:?}", keys)))?,
        other => return Err(OracleError::Decode(format!("unexpected payload: {}", other))),
    };
    serde_json::from_value(list).map_err(|e| OracleError::Decode(e.to_string()))
}

fn reply_from(value: Value) -> Result<String, OracleError> {
    let reply = match value {
        Value::String(text) => text,
        Value::Object(map) => ["reply", "answer", "text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| OracleError::Decode("missing reply field".to_string()))?,
        other => return Err(OracleError::Decode(format!("unexpected payload: {}", other))),
    };
    let reply = reply.trim().to_string();
    if reply.is_empty() {
        return Err(OracleError::Empty);
    }
    Ok(reply)
}

#[async_trait]
impl ContentOracle for HttpOracle {
    async fn analyze(&self, text: &str) -> Result<AnalyzeResponse, OracleError> {
        let value = self.post("/analyze", json!({ "text": text })).await?;
        serde_json::from_value(value).map_err(|e| OracleError::Decode(e.to_string()))
    }

    async fn subtasks(&self, title: &str, description: &str) -> Result<Vec<SubtaskSuggestion>, OracleError> {
        let value = self
            .post("/subtasks", json!({ "title": title, "description": description }))
            .await?;
        list_from(value, &["subtasks"])
    }

    async fn quiz(&self, topic: &str, description: &str) -> Result<Vec<RawQuestion>, OracleError> {
        let value = self
            .post("/quiz", json!({ "topic": topic, "description": description }))
            .await?;
        list_from(value, &["quiz", "questions"])
    }

    async fn roadmap(&self, prompt: &str) -> Result<RoadmapPayload, OracleError> {
        let value = self.post("/roadmap", json!({ "prompt": prompt })).await?;
        RoadmapPayload::from_value(value).ok_or_else(|| OracleError::Decode("unrecognized roadmap shape".to_string()))
    }

    async fn tutor(&self, history: &[ChatMessage]) -> Result<String, OracleError> {
        let value = self.post("/tutor", json!({ "history": history })).await?;
        reply_from(value)
    }

    async fn recommend(&self, query: &str) -> Result<Vec<Resource>, OracleError> {
        let value = self.post("/recommend", json!({ "query": query })).await?;
        list_from(value, &["resources"])
    }
}
