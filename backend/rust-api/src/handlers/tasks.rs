use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::models::task::{
    CreateTaskRequest, DeleteTaskResponse, LegacyQuizBatch, LegacyQuizGrade, LegacyQuizReset,
    LegacySubmitRequest, TaskPatch, TaskResponse,
};
use crate::models::user::AuthUser;
use crate::services::task_service::TaskService;
use crate::services::AppState;

fn service(state: &AppState) -> TaskService {
    TaskService::new(state.store.clone(), state.oracle.clone())
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let tasks = service(&state).list(&user.id).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = service(&state)
        .create(&user.id, req.title, req.description)
        .await?;
    Ok(Json(task.into()))
}

/// PATCH /api/tasks
pub async fn patch_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AppJson(patch): AppJson<TaskPatch>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = service(&state).apply_patch(&user.id, patch).await?;
    Ok(Json(task.into()))
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = service(&state).get(&user.id, &task_id).await?;
    Ok(Json(task.into()))
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<DeleteTaskResponse>, AppError> {
    service(&state).delete(&user.id, &task_id).await?;
    Ok(Json(DeleteTaskResponse {
        message: "Task deleted".to_string(),
        task: None,
    }))
}

/// PATCH /api/tasks/{task_id}/subtasks/{subtask_id}
pub async fn toggle_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((task_id, subtask_id)): Path<(String, String)>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = service(&state)
        .toggle_subtask(&user.id, &task_id, &subtask_id)
        .await?;
    Ok(Json(task.into()))
}

/// DELETE /api/tasks/{task_id}/subtasks/{subtask_id}
pub async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((task_id, subtask_id)): Path<(String, String)>,
) -> Result<Json<DeleteTaskResponse>, AppError> {
    let task = service(&state)
        .delete_subtask(&user.id, &task_id, &subtask_id)
        .await?;
    Ok(Json(DeleteTaskResponse {
        message: "Subtask deleted".to_string(),
        task: Some(task.into()),
    }))
}

/// POST /api/tasks/{task_id}/subtasks/generate
pub async fn generate_subtasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = service(&state)
        .generate_more_subtasks(&user.id, &task_id)
        .await?;
    Ok(Json(task.into()))
}

/// POST /api/tasks/{task_id}/quizzes/generate
pub async fn generate_task_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<LegacyQuizBatch>, AppError> {
    let quizzes = service(&state).append_task_quiz(&user.id, &task_id).await?;
    Ok(Json(LegacyQuizBatch { quizzes }))
}

/// POST /api/tasks/{task_id}/quizzes/retry
pub async fn retry_task_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<LegacyQuizReset>, AppError> {
    let task = service(&state).reset_task_quiz(&user.id, &task_id).await?;
    Ok(Json(LegacyQuizReset {
        id: task.id,
        quizzes: task.quizzes,
        quiz_results: Vec::new(),
    }))
}

/// POST /api/tasks/{task_id}/quizzes/submit
pub async fn submit_task_quiz(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
    AppJson(req): AppJson<LegacySubmitRequest>,
) -> Result<Json<LegacyQuizGrade>, AppError> {
    let grade = service(&state)
        .submit_task_quiz(&user.id, &task_id, &req.answers)
        .await?;
    Ok(Json(grade))
}
