//! HTTP endpoint handlers for the service.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/metrics`: Prometheus metrics endpoint
//! - `/health`: Health check endpoint
//! - `/products`: Product CRUD endpoints
//! - `/`: Landing message

pub mod health;
pub mod metrics;
pub mod products;
pub mod root;

// Re-export handlers
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use products::{create_products, delete_product, get_product, list_products, update_product};
pub use root::root_handler;
