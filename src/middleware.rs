//! Request metrics middleware.
//!
//! [`track_metrics`] wraps every API request. The measurements are recorded by
//! a drop guard, so a request is counted exactly once whether the handler
//! returns, panics, or the request future is dropped mid-flight. The response
//! (or the panic) passes through untouched.
//!
//! A panicking handler is recorded as `500`. A request whose future is
//! dropped without a response, usually because the client went away, is
//! recorded as `499` so it does not count towards server errors.

use axum::{
    body::HttpBody,
    extract::{MatchedPath, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::metrics::HttpMetrics;
use crate::registry::MetricsError;
use crate::state::SharedState;

/// Status recorded when the handler panicked.
const FAULT_STATUS: u16 = 500;

/// Status recorded when the request future was dropped before a response.
const CLIENT_CLOSED_STATUS: u16 = 499;

/// Axum middleware recording request count, duration and body sizes.
pub async fn track_metrics(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().as_str().to_owned();
    let request_size = body_size(request.headers(), request.body());

    let mut recorder =
        RequestRecorder::start(state.http_metrics.clone(), method, endpoint, request_size);

    let response = next.run(request).await;
    recorder.complete(&response);
    response
}

/// Size of a body: `Content-Length` if present, otherwise the exact size hint.
fn body_size<B: HttpBody>(headers: &HeaderMap, body: &B) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| body.size_hint().exact())
}

/// In-flight measurement of one request. Records on drop.
pub struct RequestRecorder {
    metrics: Arc<HttpMetrics>,
    method: String,
    endpoint: String,
    start: Instant,
    request_size: Option<u64>,
    status: Option<u16>,
    response_size: Option<u64>,
}

impl RequestRecorder {
    pub fn start(
        metrics: Arc<HttpMetrics>,
        method: String,
        endpoint: String,
        request_size: Option<u64>,
    ) -> Self {
        Self {
            metrics,
            method,
            endpoint,
            start: Instant::now(),
            request_size,
            status: None,
            response_size: None,
        }
    }

    /// Captures the outcome of a handler that returned a response.
    pub fn complete(&mut self, response: &Response) {
        self.status = Some(response.status().as_u16());
        self.response_size = body_size(response.headers(), response.body());
    }

    fn record(&self, status: u16) -> Result<(), MetricsError> {
        let duration = self.start.elapsed().as_secs_f64();
        let status = status.to_string();
        let endpoint = [self.endpoint.as_str()];

        self.metrics
            .requests_total
            .increment(&[self.method.as_str(), self.endpoint.as_str(), status.as_str()])?;
        self.metrics
            .request_duration_seconds
            .observe(&endpoint, duration)?;
        if let Some(size) = self.request_size {
            self.metrics
                .request_size_bytes
                .observe(&endpoint, size as f64)?;
        }
        if let Some(size) = self.response_size {
            self.metrics
                .response_size_bytes
                .observe(&endpoint, size as f64)?;
        }

        debug!(
            method = %self.method,
            endpoint = %self.endpoint,
            status = %status,
            duration_ms = duration * 1000.0,
            "request recorded"
        );
        Ok(())
    }
}

impl Drop for RequestRecorder {
    fn drop(&mut self) {
        let status = match self.status {
            Some(status) => status,
            None if std::thread::panicking() => FAULT_STATUS,
            None => CLIENT_CLOSED_STATUS,
        };
        if let Err(e) = self.record(status) {
            error!("Failed to record request metrics: {}", e);
        }
    }
}
