//! Configuration types for the Plexus resolver runtime.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header in TOML produces a working
//! configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Class resolution behaviour.
    pub resolver: ResolverSection,
    /// Native library cache placement.
    pub native_cache: NativeCacheSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ResolverSection
// ---------------------------------------------------------------------------

/// Switches for the class resolution algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    /// Walk the plugin graph before asking the host's own loader.
    pub probe_root_last: bool,
    /// Try a plugin's own libraries first for namespaces it already
    /// provided.
    pub local_fast_path: bool,
    /// Consult the namespace owner cache during graph walks.
    pub foreign_fast_path: bool,
    /// Namespace prefixes owned by the host platform.
    pub platform_namespaces: Vec<String>,
    /// Exact names under a platform namespace that are not handed to the
    /// root resolver.
    pub platform_exceptions: Vec<String>,
    /// Suffix of adapter metadata class names.
    pub metadata_suffix: String,
    /// Suffix of class entries inside code libraries.
    pub class_entry_suffix: String,
    /// Owner count past which a split namespace is reported.
    pub owner_warn_threshold: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            probe_root_last: false,
            local_fast_path: true,
            foreign_fast_path: true,
            platform_namespaces: vec!["java".to_owned()],
            platform_exceptions: vec!["java.lang.ObjectBeanInfo".to_owned()],
            metadata_suffix: "BeanInfo".to_owned(),
            class_entry_suffix: ".class".to_owned(),
            owner_warn_threshold: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// NativeCacheSection
// ---------------------------------------------------------------------------

/// Where remote native libraries are copied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeCacheSection {
    /// Copy remote native libraries at all.
    pub enabled: bool,
    /// Parent directory of the cache folder (default: the OS temp dir).
    pub base_dir: Option<String>,
    /// Suffix of the timestamp-qualified folder name.
    pub folder_suffix: String,
    /// Fixed folder name instead of `{unix_millis}{folder_suffix}`.
    pub folder_name: Option<String>,
    /// Sentinel lock file name inside the folder.
    pub lock_file_name: String,
}

impl Default for NativeCacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: None,
            folder_suffix: ".plexus-lib-cache".to_owned(),
            folder_name: None,
            lock_file_name: "lock".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["plexus_resolver=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
