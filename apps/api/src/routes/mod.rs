pub mod health;
pub mod resumes;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes/process", post(resumes::handle_process_resume))
        .route(
            "/api/v1/profiles/recommendations",
            post(resumes::handle_recommendations),
        )
        .with_state(state)
}
