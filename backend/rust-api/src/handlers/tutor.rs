use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::models::user::{
    AuthUser, ChatHistoryUpdate, ChatMessage, RecommendationRequest, TutorRequest, TutorResponse,
};
use crate::oracle::Resource;
use crate::services::tutor_service::TutorService;
use crate::services::AppState;

fn service(state: &AppState) -> TutorService {
    TutorService::new(state.store.clone(), state.oracle.clone())
}

/// POST /api/tutor
pub async fn ask_tutor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<TutorRequest>,
) -> Json<TutorResponse> {
    let answer = service(&state).ask(&user.id, req.history).await;
    Json(TutorResponse { answer })
}

/// GET /api/tutor/history
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    Ok(Json(service(&state).history(&user.id).await?))
}

/// POST /api/tutor/history
pub async fn save_chat_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<ChatHistoryUpdate>,
) -> Result<Json<Value>, AppError> {
    service(&state)
        .save_history(&user.id, req.messages)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/recommendation
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RecommendationRequest>,
) -> Result<Json<Vec<Resource>>, AppError> {
    Ok(Json(service(&state).recommend(req.query).await?))
}
