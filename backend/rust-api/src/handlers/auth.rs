use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::models::user::{AuthRequest, AuthResponse, AuthUser, UserProfile};
use crate::services::auth_service::AuthService;
use crate::services::AppState;

/// POST /api/auth
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<AuthRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AuthService::new(state.store.clone(), &state.config);
    let response = match req {
        AuthRequest::Register(register) => service.register(register).await?,
        AuthRequest::Login(login) => service.login(login).await?,
    };
    Ok(Json(response))
}

/// GET /api/me
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<UserProfile> {
    Json(UserProfile::from(user))
}
