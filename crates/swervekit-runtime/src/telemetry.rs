//! `tracing` subscriber setup with an optional OpenTelemetry exporter.
//!
//! Call [`init_tracing`] once at process startup and hold the returned guard
//! until exit.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter; overrides [`TelemetryConfig::filter`]. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector URL when no endpoint is configured. |
//!
//! # Example
//!
//! ```rust,no_run
//! use swervekit_runtime::telemetry::{init_tracing, TelemetryConfig};
//!
//! let _guard = init_tracing(&TelemetryConfig::default());
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is absent.
    pub filter: String,
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "swervekit".to_string(),
            log_format: LogFormat::Compact,
            filter: "info".to_string(),
            otlp_endpoint: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global subscriber described by `config`.
///
/// A second call in the same process leaves the first subscriber in place.
/// The returned [`TracerProviderGuard`] flushes exported spans on drop.
pub fn init_tracing(config: &TelemetryConfig) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let endpoint = config
        .otlp_endpoint
        .clone()
        .or_else(|| std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok());
    let provider = endpoint.and_then(|endpoint| build_provider(&config.service_name, endpoint));

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("swervekit")));

    let installed = match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(otel_layer)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(otel_layer)
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("[swervekit] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// Shuts down the OTel [`SdkTracerProvider`] on drop, flushing pending spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[swervekit] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build_provider(service_name: &str, endpoint: String) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[swervekit] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // The control loop is synchronous; a batch exporter would need a
            // background runtime.
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_compact_info() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.filter, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn log_format_uses_lowercase_names() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, LogFormat::Compact);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: TelemetryConfig = serde_json::from_str(r#"{"log_format":"json"}"#).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.service_name, "swervekit");
    }

    #[test]
    fn guard_without_provider_drops_cleanly() {
        let guard = TracerProviderGuard(None);
        assert!(!guard.is_exporting());
        drop(guard);
    }
}
