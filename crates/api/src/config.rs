//! Application configuration loaded from environment variables.

use saga::Topology;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `pretty` or `json` (default: `pretty`)
/// - `SAGA_HISTORY_LIMIT` — outcome events kept for inspection (default: `1000`)
/// - `BALANCE_EXCHANGE`, `SAGA_EXCHANGE`, `UPDATE_QUEUE`, `COMPENSATION_QUEUE`,
///   `UPDATE_ROUTING_KEY`, `COMPENSATION_ROUTING_KEY` — topology names
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub history_limit: usize,
    pub topology: Topology,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let topology = defaults.topology;

        Self {
            host: string("HOST", defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: string("RUST_LOG", defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            history_limit: lookup("SAGA_HISTORY_LIMIT")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.history_limit),
            topology: Topology {
                balance_exchange: string("BALANCE_EXCHANGE", topology.balance_exchange),
                saga_exchange: string("SAGA_EXCHANGE", topology.saga_exchange),
                update_queue: string("UPDATE_QUEUE", topology.update_queue),
                compensation_queue: string("COMPENSATION_QUEUE", topology.compensation_queue),
                update_routing_key: string("UPDATE_ROUTING_KEY", topology.update_routing_key),
                compensation_routing_key: string(
                    "COMPENSATION_ROUTING_KEY",
                    topology.compensation_routing_key,
                ),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            history_limit: 1000,
            topology: Topology::default(),
        }
    }
}
