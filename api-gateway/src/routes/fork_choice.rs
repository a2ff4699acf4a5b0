use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use shardchain::{ForkChoiceSnapshot, ShardTip};

use crate::state::SharedState;

/// Request body for `POST /fork-choice`.
///
/// `parallel` overrides the configured scheduling for this request only.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForkChoiceRequest {
    pub snapshot: ForkChoiceSnapshot,
    #[serde(default)]
    pub parallel: Option<bool>,
}

/// Response body for a successful `POST /fork-choice`.
#[derive(Debug, Serialize)]
pub struct ForkChoiceResponse {
    pub tips: Vec<ShardTip>,
}

/// Error body for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

/// `POST /fork-choice`
///
/// Resolves the tip of every shard in the submitted snapshot. Inputs that
/// violate a fork-choice precondition are answered with
/// `422 Unprocessable Entity` and the violated condition.
pub async fn resolve_fork_choice(
    State(state): State<SharedState>,
    Json(req): Json<ForkChoiceRequest>,
) -> Result<Json<ForkChoiceResponse>, ApiError> {
    let mut cfg = state.fork_choice.clone();
    if let Some(parallel) = req.parallel {
        cfg.parallel = parallel;
    }
    let snapshot = req.snapshot;
    let metrics = state.metrics.clone();

    tracing::debug!(
        blocks = snapshot.blocks.len(),
        shards = snapshot.starting_blocks.len(),
        parallel = cfg.parallel,
        "resolving fork choice"
    );

    // Resolution is CPU-bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        snapshot.resolve_tips(&cfg, Some(&metrics.fork_choice))
    })
    .await
    .map_err(|e| {
        tracing::error!("fork-choice task failed: {e}");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "fork-choice task failed".to_string(),
        )
    })?;

    match result {
        Ok(tips) => Ok(Json(ForkChoiceResponse { tips })),
        Err(e) => {
            tracing::info!("rejected fork-choice request: {e}");
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
    }
}
