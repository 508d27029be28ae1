//! Layered loading.
//!
//! 1. Parse the embedded `defaults.toml` → base
//! 2. Merge the explicit config file, if one is given
//! 3. Apply `PLEXUS_*` env var fallbacks for fields the file left unset
//! 4. Deserialize the merged tree → [`Config`]
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config files larger than this are rejected.
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Layer that set each leaf field, keyed by dotted path.
    pub field_sources: FieldSources,
    /// Config files that were merged, in order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Layer that set the field at `path` (e.g. `"resolver.probe_root_last"`).
    #[must_use]
    pub fn source_of(&self, path: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(path)
    }
}

/// Load configuration from the embedded defaults, an optional file and the
/// process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file can't be read or parsed, an env var
/// has the wrong type, or the merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(path, &collect_env_vars())
}

/// Like [`load`] but reads env fallbacks from `env_vars` instead of the
/// process environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_defaults(&merged, "", &mut field_sources);

    if let Some(path) = path {
        let overlay = load_file(path)?;
        let layer = ConfigLayer::File(path.display().to_string());
        deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let applied = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars)?;
    if applied > 0 {
        debug!(count = applied, "applied env var fallbacks");
    }

    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: "<merged config>".to_owned(),
        source: e,
    })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Read and parse a TOML file that must exist.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file is missing, unreadable or
/// too large, and [`ConfigError::ParseError`] if it isn't valid TOML.
pub fn load_file(path: &Path) -> ConfigResult<toml::Value> {
    try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
    })
}

/// Read and parse a TOML file, returning `None` if it doesn't exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file exists but can't be read, is larger
/// than 1 MiB, or is malformed.
pub fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "config file exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes ({} bytes)",
                    content.len()
                ),
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Mark every leaf of the defaults tree as coming from [`ConfigLayer::Defaults`].
fn record_defaults(val: &toml::Value, prefix: &str, sources: &mut FieldSources) {
    record_leaves(val, prefix, &ConfigLayer::Defaults, sources);
}
