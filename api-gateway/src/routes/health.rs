use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Liveness document returned by `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`
///
/// The gateway is stateless between requests, so being able to answer is
/// all there is to check.
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
