//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("product-metrics-service.yaml"),
    };

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Product Metrics Service Configuration
# ======================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"                      # Bind IP (0.0.0.0 = all interfaces)
# port: 8000                           # HTTP port
#
# Metrics Collection
# ------------------
# metrics_collection_interval: 5.0     # Seconds between process samples
# histogram_buckets: [0.1, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0]
#                                      # Request duration buckets (seconds)
# size_histogram_buckets: [100, 1000, 10000, 100000, 1000000]
#                                      # Body size buckets (bytes)
#
# Features
# --------
# enable_health: true                  # Serve /health
# log_level: "info"
#
# TLS/SSL
# -------
# enable_tls: false
# tls_cert_path: "/etc/product-metrics/cert.pem"
# tls_key_path: "/etc/product-metrics/key.pem"

"#;
    format!("{}{}", comments, yaml)
}
