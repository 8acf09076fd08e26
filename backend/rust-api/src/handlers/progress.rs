use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::progress::ProgressReport;
use crate::models::user::AuthUser;
use crate::services::progress_service::ProgressService;
use crate::services::AppState;

/// GET /api/progress
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProgressReport>, AppError> {
    let report = ProgressService::new(state.store.clone())
        .report(&user.id)
        .await?;
    Ok(Json(report))
}
