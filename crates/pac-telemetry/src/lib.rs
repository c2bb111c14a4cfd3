//! # PAC Telemetry
//!
//! Logging setup shared by the coordinator runtime and its tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pac_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // tracing macros now go to the configured output
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `pac-ledger` | Service name in logs |
//! | `PAC_LOG_LEVEL` / `RUST_LOG` | `info` | Level filter or `EnvFilter` directive |
//! | `PAC_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `PAC_CONSOLE_OUTPUT` | `true` | Console output on/off |
//! | `PAC_COMPONENT_ID` | `00` | Component identifier |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The global subscriber could not be installed (usually: already set).
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    /// The configuration does not parse.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging for the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)?;
    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}
