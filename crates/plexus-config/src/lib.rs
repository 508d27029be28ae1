#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the Plexus resolver runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plexus_config::Config;
//!
//! let resolved = Config::load(Some(std::path::Path::new("plexus.toml"))).unwrap();
//! println!("probe root last: {}", resolved.config.resolver.probe_root_last);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **File**: the explicit config file, if one is given
//! 2. **Environment variables** (`PLEXUS_*`): fill fields the file left unset
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependency on the resolver. Conversion into
//! `ResolverSettings` lives in `plexus-resolver` behind its `config` feature.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Layer tracking and TOML deep merge.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load configuration from the embedded defaults, an optional file and
    /// `PLEXUS_*` environment variables.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(path)
    }

    /// Parse and validate a single file on top of the embedded defaults,
    /// ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, malformed or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        let no_env: std::collections::HashMap<String, String> = std::collections::HashMap::new();
        loader::load_with_env(Some(path), &no_env).map(|resolved| resolved.config)
    }
}
