pub mod fork_choice;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::SharedState;

/// Builds the HTTP router over `state`.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/fork-choice", post(fork_choice::resolve_fork_choice))
        .with_state(state)
}
