//! Product Metrics Service Library
//!
//! A product CRUD HTTP service instrumented with Prometheus metrics. The
//! interesting part is the instrumentation:
//!
//! - **Registry**: [`registry::MetricRegistry`] holds counters, gauges and
//!   histograms and renders them in the text exposition format.
//! - **Request middleware**: [`middleware::track_metrics`] records count,
//!   duration and body sizes of every API request, including requests whose
//!   handler panics.
//! - **System sampler**: [`sampler::SystemSampler`] periodically publishes the
//!   process's open file descriptors, thread count and CPU utilization.
//! - **Exposition**: `GET /metrics`, mounted outside the middleware.
//!
//! # Usage
//!
//! ```rust,no_run
//! use product_metrics_service::{app, config::Config, sampler::SystemSampler};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let interval = config.collection_interval()?;
//! let (state, process_metrics) = app::init_state(config)?;
//!
//! let sampler = SystemSampler::new(process_metrics, interval)?.spawn();
//! let router = app::build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, router).await?;
//! sampler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod process;
pub mod product;
pub mod registry;
pub mod sampler;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use metrics::{HttpMetrics, ProcessMetrics};
pub use registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricRegistry, MetricsError};
pub use sampler::{SamplerError, SamplerHandle, SystemSampler};
