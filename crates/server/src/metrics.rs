//! Prometheus metrics
//!
//! Installs the global `metrics` recorder so counters recorded anywhere in
//! the workspace are rendered at `GET /metrics`.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Install the Prometheus recorder
///
/// Must be called once per process, before the first metric is recorded.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "support_agent_replies_total",
        "Reply evaluations by outcome"
    );
    describe_counter!(
        "support_agent_reranker_fallback_total",
        "Reranker calls that fell back to retrieval order"
    );
    describe_counter!(
        "support_agent_retrieval_channel_failures_total",
        "Semantic or keyword channel failures during retrieval"
    );
    describe_counter!(
        "support_agent_embedding_cache_total",
        "Embedding cache lookups by result"
    );
    describe_counter!(
        "support_agent_intent_tier_total",
        "Intent classifications by deciding tier"
    );
    describe_histogram!(
        "support_agent_hallucination_risk",
        "Hallucination risk score of validated replies"
    );
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics disabled\n".to_string(),
        ),
    }
}
