//! Metrics endpoint handler for Prometheus scraping.
//!
//! `/metrics` is mounted outside the request metrics middleware, so scrapes
//! never show up in the request metrics they return.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, error, instrument};

use crate::registry::EXPOSITION_CONTENT_TYPE;
use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsEndpointError {
    EncodingFailed,
}

impl IntoResponse for MetricsEndpointError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsEndpointError> {
    debug!("Processing /metrics request");

    let body = state.registry.render().map_err(|e| {
        error!("Failed to encode Prometheus metrics: {}", e);
        MetricsEndpointError::EncodingFailed
    })?;

    debug!("Rendered {} bytes of metrics", body.len());
    Ok(([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body))
}
