//! Plexus Telemetry - logging setup for hosts embedding the resolver runtime.
//!
//! The resolver itself only emits `tracing` events (split namespaces, denied
//! visibility, cache folder conflicts, failed native copies). This crate
//! installs a subscriber that renders them.
//!
//! # Example
//!
//! ```rust,no_run
//! use plexus_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), plexus_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("plexus_resolver=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("resolver runtime starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
