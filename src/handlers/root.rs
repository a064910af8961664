//! Root endpoint handler.

use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Handler for the root `/` endpoint.
#[instrument]
pub async fn root_handler() -> Json<Value> {
    debug!("Processing / request");
    Json(json!({ "message": "Product Metrics Monitoring Service" }))
}
