//! product-metrics-service - version 0.1.0
//!
//! Product CRUD service with Prometheus request and process metrics.
//! This is the main entry point that initializes the server and handles subcommands.

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, Level};

use product_metrics_service::app::{build_router, init_state, METRICS_PATH};
use product_metrics_service::cli::{Args, Commands, LogLevel};
use product_metrics_service::commands::command_config;
use product_metrics_service::config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use product_metrics_service::sampler::SystemSampler;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let log_level = match level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", level);
}

/// Resolves and validates configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), *format, *commented);
    }

    if args.show_config || args.check_config {
        let config = load_validated_config(&args)?;
        if args.check_config {
            println!("✅ Configuration is valid");
            return Ok(());
        }
        return show_config(&config, args.config_format);
    }

    let config = load_validated_config(&args)?;

    setup_logging(config.effective_log_level()?);

    info!("Starting product-metrics-service");

    let bind_ip_str = config.bind.clone().unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;
    let interval = config.collection_interval()?;
    let enable_tls = config.enable_tls.unwrap_or(false);
    let tls_paths = (config.tls_cert_path.clone(), config.tls_key_path.clone());

    let (state, process_metrics) = init_state(config)?;

    // The sampler's CPU-count precondition is the one fatal startup error.
    let sampler = match SystemSampler::new(process_metrics, interval) {
        Ok(sampler) => sampler.spawn(),
        Err(e) => {
            error!("❌ Failed to start system sampler: {}", e);
            return Err(e.into());
        }
    };

    let app = build_router(state);

    let served = if enable_tls {
        // Both paths are present: validate_effective_config() checked them.
        let (Some(cert_path), Some(key_path)) = tls_paths else {
            return Err("TLS enabled without certificate and key paths".into());
        };

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!(
            "product-metrics-service listening on https://{} (metrics at {})",
            addr, METRICS_PATH
        );

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());
        tokio::select! {
            result = server => result.map_err(Box::<dyn std::error::Error>::from),
            _ = shutdown_signal() => Ok(()),
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "product-metrics-service listening on http://{} (metrics at {})",
            addr, METRICS_PATH
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(Box::<dyn std::error::Error>::from)
    };

    sampler.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("product-metrics-service stopped gracefully");
    Ok(())
}
