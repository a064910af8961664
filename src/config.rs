//! Configuration management for product-metrics-service.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use clap::ValueEnum;
use crate::registry::check_buckets;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_METRICS_COLLECTION_INTERVAL: f64 = 5.0;
pub const DEFAULT_HISTOGRAM_BUCKETS: [f64; 7] = [0.1, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0];
pub const DEFAULT_SIZE_HISTOGRAM_BUCKETS: [f64; 5] =
    [100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0];

/// Service configuration. Every field is optional so partial files merge
/// cleanly over the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Metrics collection
    /// Seconds between system sampler readings.
    #[serde(alias = "metrics-collection-interval")]
    pub metrics_collection_interval: Option<f64>,
    /// Bucket bounds (seconds) for request durations.
    #[serde(alias = "histogram-buckets")]
    pub histogram_buckets: Option<Vec<f64>>,
    /// Bucket bounds (bytes) for request and response body sizes.
    #[serde(alias = "size-histogram-buckets")]
    pub size_histogram_buckets: Option<Vec<f64>>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            metrics_collection_interval: Some(DEFAULT_METRICS_COLLECTION_INTERVAL),
            histogram_buckets: Some(DEFAULT_HISTOGRAM_BUCKETS.to_vec()),
            size_histogram_buckets: Some(DEFAULT_SIZE_HISTOGRAM_BUCKETS.to_vec()),
            enable_health: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Effective sampler interval in seconds.
    pub fn collection_interval_secs(&self) -> f64 {
        self.metrics_collection_interval
            .unwrap_or(DEFAULT_METRICS_COLLECTION_INTERVAL)
    }

    /// Effective sampler interval. Fails unless the configured seconds map to
    /// a non-zero `Duration`.
    pub fn collection_interval(&self) -> Result<Duration, String> {
        let secs = self.collection_interval_secs();
        match Duration::try_from_secs_f64(secs) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(format!(
                "metrics_collection_interval must be a positive number of seconds, got {}",
                secs
            )),
        }
    }

    /// Effective log level; unset means `info`.
    pub fn effective_log_level(&self) -> Result<LogLevel, String> {
        match self.log_level.as_deref() {
            None => Ok(LogLevel::Info),
            Some(level) => LogLevel::from_str(level, true)
                .map_err(|_| format!("Invalid log_level '{}'", level)),
        }
    }

    pub fn duration_buckets(&self) -> Vec<f64> {
        self.histogram_buckets
            .clone()
            .unwrap_or_else(|| DEFAULT_HISTOGRAM_BUCKETS.to_vec())
    }

    pub fn size_buckets(&self) -> Vec<f64> {
        self.size_histogram_buckets
            .clone()
            .unwrap_or_else(|| DEFAULT_SIZE_HISTOGRAM_BUCKETS.to_vec())
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    cfg.collection_interval()?;
    cfg.effective_log_level()?;

    check_buckets(&cfg.duration_buckets())
        .map_err(|e| format!("Invalid histogram_buckets: {}", e))?;
    check_buckets(&cfg.size_buckets())
        .map_err(|e| format!("Invalid size_histogram_buckets: {}", e))?;

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_tls_file(cert, "certificate")?;
                check_tls_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS file exists, is readable and not empty.
fn check_tls_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }
    match fs::metadata(p) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => {
            Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into())
        }
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref().and_then(|p| p.to_str()))?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    if let Some(interval) = args.metrics_interval {
        config.metrics_collection_interval = Some(interval);
    }

    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads a configuration file; missing files yield the defaults.
///
/// Fields absent from the file fall back to their defaults.
pub fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/product-metrics/service.yaml",
            "/etc/product-metrics/service.yml",
            "/etc/product-metrics/service.json",
            "./product-metrics-service.yaml",
            "./product-metrics-service.yml",
            "./product-metrics-service.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""))
    };

    if !path.exists() || path.to_string_lossy().is_empty() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            config
        }
        Some("toml") => {
            let config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            config
        }
        _ => {
            // Default to YAML
            let config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            config
        }
    };

    Ok(merge_defaults(loaded))
}

/// Fills unset fields with their defaults.
fn merge_defaults(loaded: Config) -> Config {
    let d = Config::default();
    Config {
        port: loaded.port.or(d.port),
        bind: loaded.bind.or(d.bind),
        metrics_collection_interval: loaded
            .metrics_collection_interval
            .or(d.metrics_collection_interval),
        histogram_buckets: loaded.histogram_buckets.or(d.histogram_buckets),
        size_histogram_buckets: loaded.size_histogram_buckets.or(d.size_histogram_buckets),
        enable_health: loaded.enable_health.or(d.enable_health),
        log_level: loaded.log_level.or(d.log_level),
        enable_tls: loaded.enable_tls.or(d.enable_tls),
        tls_cert_path: loaded.tls_cert_path.or(d.tls_cert_path),
        tls_key_path: loaded.tls_key_path.or(d.tls_key_path),
    }
}

/// Renders a configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
