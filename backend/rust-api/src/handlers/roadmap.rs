use axum::{body::Bytes, extract::State, Extension, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::roadmap::{RegenerateRoadmapRequest, RoadmapResponse};
use crate::models::user::AuthUser;
use crate::services::roadmap_service::RoadmapService;
use crate::services::AppState;

/// GET /api/roadmap
pub async fn get_roadmap(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RoadmapResponse>, AppError> {
    let roadmap = RoadmapService::new(state.store.clone(), state.oracle.clone())
        .get(&user.id)
        .await?;
    Ok(Json(RoadmapResponse { roadmap }))
}

/// POST /api/roadmap
///
/// The body is optional; an empty or unparseable body regenerates from the
/// user's tasks.
pub async fn regenerate_roadmap(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<RoadmapResponse>, AppError> {
    let req: RegenerateRoadmapRequest = serde_json::from_slice(&body).unwrap_or_default();
    let roadmap = RoadmapService::new(state.store.clone(), state.oracle.clone())
        .regenerate(&user.id, req.prompt)
        .await?;
    Ok(Json(RoadmapResponse { roadmap }))
}
