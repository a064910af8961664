//! Application state management for the service.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and the request metrics middleware.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::HttpMetrics;
use crate::registry::MetricRegistry;
use crate::store::ProductStore;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    /// Registry rendered by `/metrics`.
    pub registry: MetricRegistry,
    /// Request metrics written by the middleware.
    pub http_metrics: Arc<HttpMetrics>,
    pub store: ProductStore,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: MetricRegistry, http_metrics: HttpMetrics, config: Config) -> Self {
        Self {
            registry,
            http_metrics: Arc::new(http_metrics),
            store: ProductStore::new(),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
