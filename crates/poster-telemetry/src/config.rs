//! Telemetry configuration from environment variables.

use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Value of the `service` field on startup lines.
    pub service_name: String,

    /// `EnvFilter` directives, e.g. `info,pc_06_peg=debug`.
    pub log_level: String,

    /// JSON formatted output.
    pub json_logs: bool,

    /// Include the module target in each line.
    pub log_targets: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "poster-chain".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            log_targets: true,
        }
    }
}

impl TelemetryConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to
    /// values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        let defaults = Self::default();

        Self {
            service_name: lookup("PC_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("PC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: lookup("PC_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            log_targets: lookup("PC_LOG_TARGETS")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.log_targets),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
