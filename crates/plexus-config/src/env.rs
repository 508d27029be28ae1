//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Bool,
    Integer,
    String,
    /// Comma-separated list.
    List,
}

/// All supported `PLEXUS_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PLEXUS_PROBE_ROOT_LAST",
        field_path: "resolver.probe_root_last",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "PLEXUS_LOCAL_FAST_PATH",
        field_path: "resolver.local_fast_path",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "PLEXUS_FOREIGN_FAST_PATH",
        field_path: "resolver.foreign_fast_path",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "PLEXUS_PLATFORM_NAMESPACES",
        field_path: "resolver.platform_namespaces",
        kind: FieldKind::List,
    },
    EnvMapping {
        var_name: "PLEXUS_OWNER_WARN_THRESHOLD",
        field_path: "resolver.owner_warn_threshold",
        kind: FieldKind::Integer,
    },
    // Native library cache.
    EnvMapping {
        var_name: "PLEXUS_NATIVE_CACHE",
        field_path: "native_cache.enabled",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "PLEXUS_NATIVE_CACHE_DIR",
        field_path: "native_cache.base_dir",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "PLEXUS_NATIVE_CACHE_FOLDER",
        field_path: "native_cache.folder_name",
        kind: FieldKind::String,
    },
    // Logging.
    EnvMapping {
        var_name: "PLEXUS_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "PLEXUS_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::String,
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// a config file.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a variable can't be converted to its
/// field's type.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if matches!(sources.get(mapping.field_path), Some(ConfigLayer::File(_))) {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        let toml_val = coerce_to_toml_value(mapping, val)?;
        set_field(merged, mapping.field_path, toml_val);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Set the field at dotted `path`, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let Some((parents, leaf)) = path.rsplit_once('.').map_or(Some(("", path)), Some) else {
        return;
    };
    let mut current = root;
    for segment in parents.split('.').filter(|s| !s.is_empty()) {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), val);
    }
}

/// Convert a raw env var value to the TOML type of its field.
fn coerce_to_toml_value(mapping: &EnvMapping, val: &str) -> ConfigResult<toml::Value> {
    let invalid = |expected: &str| ConfigError::EnvError {
        var_name: mapping.var_name.to_owned(),
        message: format!("expected {expected}, got '{val}'"),
    };
    match mapping.kind {
        FieldKind::Bool => val
            .trim()
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|_| invalid("true or false")),
        FieldKind::Integer => val
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| invalid("an integer")),
        FieldKind::String => Ok(toml::Value::String(val.to_owned())),
        FieldKind::List => Ok(toml::Value::Array(
            val.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_owned()))
                .collect(),
        )),
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
