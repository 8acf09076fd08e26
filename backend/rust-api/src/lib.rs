use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod client;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod oracle;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::AppError;
pub use services::AppState;

/// JSON-only API: nothing may be framed or loaded from responses.
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api", api_routes(app_state.clone()).layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(middlewares::metrics::metrics_middleware))
        .layer(middleware::from_fn(middlewares::trace::trace_context_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new().route("/auth", post(handlers::auth::authenticate));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        // Tasks
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks)
                .post(handlers::tasks::create_task)
                .patch(handlers::tasks::patch_task),
        )
        .route(
            "/tasks/{task_id}",
            get(handlers::tasks::get_task).delete(handlers::tasks::delete_task),
        )
        .route(
            "/tasks/{task_id}/subtasks/generate",
            post(handlers::tasks::generate_subtasks),
        )
        .route(
            "/tasks/{task_id}/subtasks/{subtask_id}",
            patch(handlers::tasks::toggle_subtask).delete(handlers::tasks::delete_subtask),
        )
        .route(
            "/tasks/{task_id}/quizzes/generate",
            post(handlers::tasks::generate_task_quiz),
        )
        .route(
            "/tasks/{task_id}/quizzes/retry",
            post(handlers::tasks::retry_task_quiz),
        )
        .route(
            "/tasks/{task_id}/quizzes/submit",
            post(handlers::tasks::submit_task_quiz),
        )
        // Quizzes
        .route("/quiz", post(handlers::quiz::quiz_action))
        .route("/quiz/history", get(handlers::quiz::quiz_history))
        .route("/quiz/{quiz_id}", get(handlers::quiz::get_quiz))
        // Progress and roadmap
        .route("/progress", get(handlers::progress::get_progress))
        .route(
            "/roadmap",
            get(handlers::roadmap::get_roadmap).post(handlers::roadmap::regenerate_roadmap),
        )
        // Tutor
        .route("/tutor", post(handlers::tutor::ask_tutor))
        .route(
            "/tutor/history",
            get(handlers::tutor::get_chat_history).post(handlers::tutor::save_chat_history),
        )
        .route("/recommendation", post(handlers::tutor::recommend))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}
