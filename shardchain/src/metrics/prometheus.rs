//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed fork-choice metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::consensus::FilterReason;

/// Fork-choice Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated by the sharded
/// resolver. Counters are cumulative across resolution sessions.
#[derive(Clone)]
pub struct ForkChoiceMetrics {
    /// Shard resolutions that missed the tips cache and ran a walk.
    pub resolutions_total: IntCounter,
    /// Shard resolutions answered from the tips cache.
    pub cache_hits_total: IntCounter,
    /// Candidate blocks checked against a parent shard's tip.
    pub filter_evaluations_total: IntCounter,
    /// Candidate blocks excluded, labelled by the rule they broke.
    pub blocks_filtered_total: IntCounterVec,
    /// Number of descents per GHOST walk.
    pub walk_steps: Histogram,
    /// Wall time of a full (uncached) shard resolution, in seconds.
    pub resolve_seconds: Histogram,
}

impl ForkChoiceMetrics {
    /// Registers fork-choice metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let resolutions_total = IntCounter::with_opts(Opts::new(
            "fork_choice_resolutions_total",
            "Shard tip resolutions computed (cache misses)",
        ))?;
        registry.register(Box::new(resolutions_total.clone()))?;

        let cache_hits_total = IntCounter::with_opts(Opts::new(
            "fork_choice_cache_hits_total",
            "Shard tip resolutions served from the tips cache",
        ))?;
        registry.register(Box::new(cache_hits_total.clone()))?;

        let filter_evaluations_total = IntCounter::with_opts(Opts::new(
            "fork_choice_filter_evaluations_total",
            "Candidate blocks evaluated by the cross-shard filter",
        ))?;
        registry.register(Box::new(filter_evaluations_total.clone()))?;

        let blocks_filtered_total = IntCounterVec::new(
            Opts::new(
                "fork_choice_blocks_filtered_total",
                "Candidate blocks excluded from a shard's walk, by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(blocks_filtered_total.clone()))?;

        let walk_steps = Histogram::with_opts(
            HistogramOpts::new(
                "fork_choice_walk_steps",
                "Number of child descents taken by one GHOST walk",
            )
            .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0]),
        )?;
        registry.register(Box::new(walk_steps.clone()))?;

        let resolve_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fork_choice_resolve_seconds",
                "Time to resolve one shard's tip (excluding cache hits) in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(resolve_seconds.clone()))?;

        Ok(Self {
            resolutions_total,
            cache_hits_total,
            filter_evaluations_total,
            blocks_filtered_total,
            walk_steps,
            resolve_seconds,
        })
    }

    /// Counts one excluded block under its reason label.
    pub fn record_filtered(&self, reason: FilterReason) {
        self.blocks_filtered_total
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    /// Current count of blocks excluded for `reason`.
    pub fn filtered_count(&self, reason: FilterReason) -> u64 {
        self.blocks_filtered_total
            .with_label_values(&[reason.as_str()])
            .get()
    }
}

/// Wrapper around a Prometheus registry and the fork-choice metrics.
///
/// This is the main handle you pass around in a node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub fork_choice: ForkChoiceMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// (namespace `shardchain`) and registers the fork-choice metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("shardchain".to_string()), None)?;
        let fork_choice = ForkChoiceMetrics::register(&registry)?;
        Ok(Self {
            registry,
            fork_choice,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => Ok(metrics_response(metrics.gather_text())),
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("not found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Ok(resp)
        }
    }
}

fn metrics_response(body: String) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body)));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    resp
}
