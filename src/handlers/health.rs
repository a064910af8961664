//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! service liveness and a few counters in plain text.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Formats an uptime in the largest sensible unit.
pub fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs());

    let mut out = String::new();
    writeln!(out, "OK").ok();
    writeln!(out).ok();
    writeln!(out, "Uptime:                       {}", uptime_str).ok();
    writeln!(out, "Products stored:              {}", state.store.len()).ok();
    writeln!(
        out,
        "Metrics collection interval:  {}s",
        state.config.collection_interval_secs()
    )
    .ok();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        out,
    )
}
