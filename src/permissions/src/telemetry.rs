//! Logging setup
//!
//! Condition failures and resolution steps are emitted as `tracing` events.
//! Hosts that already install a subscriber get them on their own channel;
//! `init_logging` is for hosts that don't, and writes to stderr.

use crate::config::LoggingSection;
use crate::error::{PermissionsError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global fmt subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingSection) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            format!("{},cretoai_permissions={}", config.level, config.level).into()
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(config.with_target)
                .with_line_number(config.with_line_number),
        )
        .try_init()
        .map_err(|e| PermissionsError::Telemetry(e.to_string()))
}
