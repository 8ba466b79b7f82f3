//! Process configuration (env-driven).
//!
//! Only observability wiring and the listen port are configurable; nothing
//! here changes the content of a reply.

use anyhow::{bail, Context, Result};

/// Port the CloudEvents receiver listens on when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Collector address used when `OTLP_TRACE_ENDPOINT` is unset (OTLP/gRPC default).
pub const DEFAULT_OTLP_ENDPOINT: &str = "localhost:4317";

const DEFAULT_OTLP_PORT: u16 = 4317;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Responder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port for the receiver.
    pub port: u16,

    /// OpenTelemetry `service.name` resource attribute (from `HOSTNAME`).
    pub service_name: String,

    /// OTLP/gRPC collector endpoint, always with a scheme.
    pub otlp_endpoint: String,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port: u16 = lookup("PORT")
            .map(|v| v.parse())
            .transpose()
            .context("PORT must be an integer between 0 and 65535.")?
            .unwrap_or(DEFAULT_PORT);

        let service_name = lookup("HOSTNAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "coinflip".to_string());

        let otlp_endpoint = lookup("OTLP_TRACE_ENDPOINT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string());
        let otlp_endpoint = if otlp_endpoint.contains("://") {
            otlp_endpoint
        } else {
            format!("http://{otlp_endpoint}")
        };

        let log_level = lookup("COINFLIP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match lookup("COINFLIP_LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => bail!("COINFLIP_LOG_FORMAT must be 'json' or 'pretty', got '{other}'."),
        };

        Ok(Self {
            port,
            service_name,
            otlp_endpoint,
            log_level,
            log_format,
        })
    }

    /// Returns the `host:port` of the collector, for reachability checks.
    pub fn collector_authority(&self) -> String {
        let without_scheme = self
            .otlp_endpoint
            .split_once("://")
            .map_or(self.otlp_endpoint.as_str(), |(_, rest)| rest);
        let authority = without_scheme.split('/').next().unwrap_or_default();

        let has_port = match authority.rsplit_once(':') {
            // `[::1]` has colons but no port; `[::1]:4317` ends in `]:port`.
            Some((host, port)) => !port.is_empty() && !port.contains(']') && !host.is_empty(),
            None => false,
        };
        if has_port {
            authority.to_string()
        } else {
            format!("{authority}:{DEFAULT_OTLP_PORT}")
        }
    }
}
