//! CLI command implementations for product-metrics-service.
//!
//! - `config`: Configuration file generation

pub mod config;

pub use config::command_config;
