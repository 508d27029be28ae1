//! Resolution error types.

use std::path::PathBuf;

use crate::descriptor::PluginId;

/// Errors from class, resource and native library resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The lookup name is structurally illegal (no namespace, or a bare
    /// metadata-suffixed name).
    #[error("illegal name not supported: {0}")]
    InvalidName(String),

    /// The plugin owning the walk is neither activated nor activating.
    #[error("can't load {name}, plugin {plugin_id} is not activated yet")]
    NotActivated {
        /// Name that was being resolved.
        name: String,
        /// The inactive plugin.
        plugin_id: PluginId,
    },

    /// The exporting library's filter denies the name to the requestor.
    #[error("{name} is not visible for plugin {requestor}")]
    NotVisible {
        /// Name that was denied.
        name: String,
        /// The plugin that asked for it.
        requestor: PluginId,
    },

    /// The artifact came from a library without a visibility filter.
    #[error("{name} is not visible for plugin {requestor}, no filter found for library {library}")]
    MissingFilter {
        /// Name that was denied.
        name: String,
        /// The plugin that asked for it.
        requestor: PluginId,
        /// Base location of the library the artifact came from.
        library: String,
    },

    /// Every resolution path was exhausted.
    #[error("{name} not found from {plugin_id}")]
    NotFound {
        /// Name that was being resolved.
        name: String,
        /// The requesting plugin.
        plugin_id: PluginId,
    },

    /// The registry has no descriptor for this plugin.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(PluginId),

    /// The plugin ID is malformed.
    #[error("invalid plugin id: {0}")]
    InvalidId(String),

    /// Copying a native library into the cache failed.
    #[error("can't cache library {library} from {source_url}: {source}")]
    CacheIo {
        /// Platform file name of the library.
        library: String,
        /// Where the library was streamed from.
        source_url: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The cache folder could not be prepared.
    #[error("can't initialize libraries cache folder {path}: {source}")]
    CacheRoot {
        /// The cache folder.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The cache folder is owned by another process.
    #[error("libraries cache folder {0} is owned by another process")]
    CacheFolderConflict(PathBuf),
}

impl ResolveError {
    /// Whether this error is a visibility denial (filter refused or missing).
    #[must_use]
    pub fn is_visibility(&self) -> bool {
        matches!(self, Self::NotVisible { .. } | Self::MissingFilter { .. })
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_errors_are_grouped() {
        let denied = ResolveError::NotVisible {
            name: "com.c.Helper".into(),
            requestor: PluginId::from_static("a"),
        };
        let missing = ResolveError::MissingFilter {
            name: "com.c.Helper".into(),
            requestor: PluginId::from_static("a"),
            library: "file:///lib/c/".into(),
        };
        assert!(denied.is_visibility());
        assert!(missing.is_visibility());
        assert!(!ResolveError::InvalidName("Foo".into()).is_visibility());
    }

    #[test]
    fn not_found_names_requestor() {
        let err = ResolveError::NotFound {
            name: "com.x.Y".into(),
            plugin_id: PluginId::from_static("org.sample.a"),
        };
        assert_eq!(err.to_string(), "com.x.Y not found from org.sample.a");
    }
}
