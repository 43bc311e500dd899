//! Tracing Subscriber Initialization
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` driven by
//! `RUST_LOG` and a JSON or human-readable formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "vanish_api=debug,vanish_storage=info,tower_http=debug,info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// `VANISH_LOG_FORMAT`: `json` (default) or `pretty`
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "vanish-api".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("VANISH_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_format: std::env::var("VANISH_LOG_FORMAT")
                .ok()
                .map(|v| parse_log_format(&v))
                .unwrap_or(defaults.log_format),
        }
    }
}

fn parse_log_format(value: &str) -> LogFormat {
    if value.eq_ignore_ascii_case("pretty") {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Initialize the tracing subscriber.
///
/// Must be called once at startup before any tracing occurs; a second call
/// fails.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "vanish-api");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_parse_log_format() {
        assert_eq!(parse_log_format("pretty"), LogFormat::Pretty);
        assert_eq!(parse_log_format("PRETTY"), LogFormat::Pretty);
        assert_eq!(parse_log_format("json"), LogFormat::Json);
        assert_eq!(parse_log_format("anything"), LogFormat::Json);
    }
}
