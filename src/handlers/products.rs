//! Product CRUD endpoint handlers.
//!
//! These handlers are plain pass-through operations on the in-memory
//! [`ProductStore`](crate::store::ProductStore).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, instrument};

use crate::product::{Product, ProductPayload, ProductUpdate};
use crate::state::SharedState;

/// Error returned by product handlers, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: &'static str,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: "Product not found",
        }
    }

    fn negative_values() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: "Negative values not allowed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// POST /products: create one product or a batch.
///
/// The whole batch is validated before anything is stored.
#[instrument(skip(state, payload))]
pub async fn create_products(
    State(state): State<SharedState>,
    Json(payload): Json<ProductPayload>,
) -> Result<Response, ApiError> {
    let single = matches!(payload, ProductPayload::Single(_));
    let items = payload.into_items();
    debug!("Creating {} product(s)", items.len());

    if items.iter().any(|p| !p.is_valid()) {
        return Err(ApiError::negative_values());
    }

    let mut created: Vec<Product> = items
        .into_iter()
        .map(|item| state.store.create(item))
        .collect();

    let response = if single || created.len() == 1 {
        (StatusCode::CREATED, Json(created.remove(0))).into_response()
    } else {
        (StatusCode::CREATED, Json(created)).into_response()
    };
    Ok(response)
}

/// GET /products
#[instrument(skip(state))]
pub async fn list_products(State(state): State<SharedState>) -> Json<Vec<Product>> {
    debug!("Listing products");
    Json(state.store.list())
}

/// GET /products/{id}
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<Product>, ApiError> {
    state.store.get(id).map(Json).ok_or_else(ApiError::not_found)
}

/// PUT /products/{id}
#[instrument(skip(state, update))]
pub async fn update_product(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    state
        .store
        .update(id, update)
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// DELETE /products/{id}
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}
