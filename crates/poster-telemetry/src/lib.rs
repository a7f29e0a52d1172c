//! # Poster Telemetry
//!
//! Logging setup shared by every Poster-Chain binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poster_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     tracing::info!("[node] Starting");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PC_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directives |
//! | `PC_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `PC_LOG_TARGETS` | `true` | Include the module target in each line |
//! | `PC_SERVICE_NAME` | `poster-chain` | Value of the `service` field |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Log with a `subsystem` field.
///
/// ```rust,ignore
/// log_event!(info, "pc-06", "Witnessing stake event", block = 12);
/// ```
#[macro_export]
macro_rules! log_event {
    ($level:ident, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction outcome with its response code and rejection tag.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $subsystem:expr, $msg:expr, $code:expr, $tag:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            code = $code,
            tag = %$tag,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a block lifecycle step with standard fields.
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $subsystem:expr, $msg:expr, $height:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            height = $height,
            $($($field)*,)?
            $msg
        )
    };
}
