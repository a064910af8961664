//! Router assembly and metric bootstrap.
//!
//! API routes are wrapped by [`track_metrics`]; the exposition route is merged
//! in afterwards and is therefore never measured.

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::handlers::{
    create_products, delete_product, get_product, health_handler, list_products, metrics_handler,
    root_handler, update_product,
};
use crate::metrics::{HttpMetrics, ProcessMetrics};
use crate::middleware::track_metrics;
use crate::registry::{MetricRegistry, MetricsError};
use crate::state::{AppState, SharedState};

/// Path of the exposition endpoint.
pub const METRICS_PATH: &str = "/metrics";

/// Builds the registry, defines every metric family and returns the shared
/// state together with the gauges the system sampler writes to.
pub fn init_state(config: Config) -> Result<(SharedState, ProcessMetrics), MetricsError> {
    let registry = MetricRegistry::new();
    let http_metrics =
        HttpMetrics::new(&registry, &config.duration_buckets(), &config.size_buckets())?;
    let process_metrics = ProcessMetrics::new(&registry)?;
    debug!("All metrics registered successfully");

    let state = Arc::new(AppState::new(registry, http_metrics, config));
    Ok((state, process_metrics))
}

/// Product, landing and health routes.
pub fn api_routes(config: &Config) -> Router<SharedState> {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/products", get(list_products).post(create_products))
        .route("/products/", get(list_products).post(create_products))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        );

    if config.enable_health.unwrap_or(true) {
        router = router.route("/health", get(health_handler));
    }
    router
}

/// Wraps `routes` with the request metrics middleware.
pub fn instrumented(routes: Router<SharedState>, state: &SharedState) -> Router<SharedState> {
    routes.layer(middleware::from_fn_with_state(state.clone(), track_metrics))
}

/// Full application router.
pub fn build_router(state: SharedState) -> Router {
    let api = instrumented(api_routes(&state.config), &state);

    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .merge(api)
        .with_state(state)
}
