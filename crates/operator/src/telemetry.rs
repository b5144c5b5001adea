use std::net::SocketAddr;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use once_cell::sync::Lazy;
use prometheus::{histogram_opts, opts, Encoder, Histogram, IntCounterVec, IntGaugeVec, Registry, TextEncoder};
use serde::Serialize;
use tracing::info;

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static RECONCILE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(opts!("wordpress_reconcile_total", "Reconciliation passes by outcome"), &["outcome"]).unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static RECONCILE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(histogram_opts!(
        "wordpress_reconcile_duration_seconds",
        "Wall time of one reconciliation pass",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ))
    .unwrap();
    REGISTRY.register(Box::new(h.clone())).ok();
    h
});

pub static ENDPOINT_READY: Lazy<IntGaugeVec> = Lazy::new(|| {
    let g = IntGaugeVec::new(opts!("wordpress_endpoint_ready", "1 once the instance reports an endpoint"), &["namespace", "name"]).unwrap();
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome { Success, Error, Deleted }

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Deleted => "deleted",
        }
    }
}

pub fn record_outcome(outcome: Outcome) { RECONCILE_TOTAL.with_label_values(&[outcome.as_str()]).inc(); }

pub fn record_endpoint(namespace: &str, name: &str, endpoint: &str) {
    ENDPOINT_READY.with_label_values(&[namespace, name]).set(i64::from(!endpoint.is_empty()));
}

pub fn forget_instance(namespace: &str, name: &str) { ENDPOINT_READY.remove_label_values(&[namespace, name]).ok(); }

#[derive(Serialize)]
pub struct HealthResponse { pub status: &'static str }

pub async fn health() -> Json<HealthResponse> { Json(HealthResponse { status: "ok" }) }

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&metric_families, &mut buf).is_err() { return StatusCode::INTERNAL_SERVER_ERROR.into_response(); }
    ([("Content-Type", "text/plain; version=0.0.4")], buf).into_response()
}

pub fn router() -> Router {
    // touch the lazies so the families show up before the first pass
    Lazy::force(&RECONCILE_TOTAL);
    Lazy::force(&RECONCILE_DURATION);
    Lazy::force(&ENDPOINT_READY);
    Router::new().route("/health", get(health)).route("/metrics", get(metrics_handler))
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "metrics.listen");
    axum::serve(listener, router()).await?;
    Ok(())
}
