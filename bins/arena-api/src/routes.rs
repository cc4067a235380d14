use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/problems", get(handlers::list_problems))
        .route("/problems/:problem_id", get(handlers::get_problem))
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/:session_id/problem", put(handlers::select_problem))
        .route("/sessions/:session_id/language", put(handlers::select_language))
        .route("/sessions/:session_id/code", put(handlers::edit_code))
        .route("/sessions/:session_id/run", post(handlers::run_session))
        .route("/sessions/:session_id/cancel", post(handlers::cancel_run))
}
