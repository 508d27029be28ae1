//! Configuration validation rules.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_resolver(config)?;
    validate_native_cache(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_resolver(config: &Config) -> ConfigResult<()> {
    let r = &config.resolver;

    if let Some(bad) = r
        .platform_namespaces
        .iter()
        .find(|ns| ns.trim().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "resolver.platform_namespaces".to_owned(),
            message: format!("namespace prefix must not be blank (got '{bad}')"),
        });
    }

    if r.metadata_suffix.contains('.') {
        return Err(ConfigError::ValidationError {
            field: "resolver.metadata_suffix".to_owned(),
            message: "metadata suffix must not contain '.'".to_owned(),
        });
    }

    if r.class_entry_suffix.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "resolver.class_entry_suffix".to_owned(),
            message: "class entry suffix must not be empty".to_owned(),
        });
    }

    if r.owner_warn_threshold == 0 {
        return Err(ConfigError::ValidationError {
            field: "resolver.owner_warn_threshold".to_owned(),
            message: "owner_warn_threshold must be greater than 0".to_owned(),
        });
    }

    Ok(())
}

fn validate_native_cache(config: &Config) -> ConfigResult<()> {
    let n = &config.native_cache;

    if n.lock_file_name.is_empty() || n.lock_file_name.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError {
            field: "native_cache.lock_file_name".to_owned(),
            message: format!(
                "lock file name must be a non-empty plain file name (got '{}')",
                n.lock_file_name
            ),
        });
    }

    if let Some(name) = &n.folder_name
        && (name.is_empty() || name.contains(['/', '\\']) || name == "." || name == "..")
    {
        return Err(ConfigError::ValidationError {
            field: "native_cache.folder_name".to_owned(),
            message: format!("folder name must be a plain directory name (got '{name}')"),
        });
    }

    if n.folder_name.is_none() && n.folder_suffix.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError {
            field: "native_cache.folder_suffix".to_owned(),
            message: "folder suffix must not contain path separators".to_owned(),
        });
    }

    if n.base_dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "native_cache.base_dir".to_owned(),
            message: "base_dir must not be blank; omit it to use the temp directory".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}
