//! Shared application state.

use std::sync::Arc;

use shardchain::{ForkChoiceConfig, MetricsRegistry};

/// Shared state held by the API handlers.
///
/// Requests carry their own snapshot, so the state only holds what is
/// common to every resolution. It is wrapped in an [`Arc`] and passed to
/// request handlers via Axum's `State` extractor.
pub struct AppState {
    /// Recognized shards and default scheduling.
    pub fork_choice: ForkChoiceConfig,
    /// Metrics registry updated by every resolution.
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
