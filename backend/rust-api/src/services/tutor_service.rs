use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::track_oracle_call;
use crate::models::user::{ChatMessage, IncomingChatMessage};
use crate::oracle::{fallback_resources, ContentOracle, Resource, TUTOR_FALLBACK};
use crate::store::DocumentStore;

pub struct TutorService {
    store: Arc<dyn DocumentStore>,
    oracle: Arc<dyn ContentOracle>,
}

fn coerce(messages: Vec<IncomingChatMessage>) -> Vec<ChatMessage> {
    messages.into_iter().map(ChatMessage::from).collect()
}

impl TutorService {
    pub fn new(store: Arc<dyn DocumentStore>, oracle: Arc<dyn ContentOracle>) -> Self {
        Self { store, oracle }
    }

    pub async fn ask(&self, user_id: &str, history: Vec<IncomingChatMessage>) -> String {
        let history = coerce(history);
        match track_oracle_call("tutor", self.oracle.tutor(&history)).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Tutor reply failed for user {}: {}", user_id, e);
                TUTOR_FALLBACK.to_string()
            }
        }
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        Ok(user.chat_history)
    }

    pub async fn save_history(
        &self,
        user_id: &str,
        messages: Vec<IncomingChatMessage>,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let history = coerce(messages);
        if !self.store.replace_chat_history(user_id, &history).await? {
            return Err(AppError::not_found("User not found"));
        }
        tracing::info!("Saved {} chat messages for user {}", history.len(), user_id);
        Ok(history)
    }

    pub async fn recommend(&self, query: Option<String>) -> Result<Vec<Resource>, AppError> {
        let query = query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::validation("Missing or invalid 'query' field"))?;

        Ok(match track_oracle_call("recommend", self.oracle.recommend(&query)).await {
            Ok(resources) if !resources.is_empty() => resources,
            Ok(_) => fallback_resources(),
            Err(e) => {
                tracing::warn!("Recommendation failed for \"{}\": {}", query, e);
                fallback_resources()
            }
        })
    }
}
