use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::extractors::{AppJson, AppQuery};
use crate::models::quiz::{HistoryQuery, QuizAction, QuizDetail, QuizHistoryPage, QuizResponse};
use crate::models::user::AuthUser;
use crate::services::quiz_service::QuizService;
use crate::services::AppState;

fn service(state: &AppState) -> QuizService {
    QuizService::new(
        state.store.clone(),
        state.oracle.clone(),
        state.config.history_page_size,
    )
}

/// POST /api/quiz
///
/// `generate` and `retry` answer with the quiz, `submit` with the scored
/// attempt and an improvement roadmap.
pub async fn quiz_action(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(action): AppJson<QuizAction>,
) -> Result<Response, AppError> {
    let service = service(&state);
    let response = match action {
        QuizAction::Generate { task_id } => {
            Json(QuizResponse::from(service.generate(&user.id, &task_id).await?)).into_response()
        }
        QuizAction::Retry { task_id } => {
            Json(QuizResponse::from(service.retry(&user.id, &task_id).await?)).into_response()
        }
        QuizAction::Submit { quiz_id, answers } => {
            Json(service.submit(&user.id, &quiz_id, answers).await?).into_response()
        }
    };
    Ok(response)
}

/// GET /api/quiz/history?page&limit
pub async fn quiz_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<Json<QuizHistoryPage>, AppError> {
    let page = service(&state)
        .history(&user.id, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// GET /api/quiz/{quiz_id}
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(quiz_id): Path<String>,
) -> Result<Json<QuizDetail>, AppError> {
    Ok(Json(service(&state).get_by_id(&user.id, &quiz_id).await?))
}
