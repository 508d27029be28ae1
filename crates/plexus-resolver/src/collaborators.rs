//! Contracts the resolver consumes from its host.
//!
//! The host owns plugin descriptors, activation state, path resolution and
//! its own module loading. The resolver only talks to them through these
//! traits, bundled into [`Collaborators`] and shared by every plugin's
//! resolver in a runtime.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::artifact::Artifact;
use crate::descriptor::{Library, PluginDescriptor, PluginId, Prerequisite};
use crate::location::Location;
use crate::source::{DefaultOpener, FsLibraryReader};

/// Source of plugin descriptors and dependency matching.
pub trait Registry: Send + Sync {
    /// Descriptor for `id`, if the plugin is known.
    fn descriptor(&self, id: &PluginId) -> Option<Arc<PluginDescriptor>>;

    /// Whether `prerequisite` is satisfied (target present, version and
    /// optionality compatible).
    fn matches(&self, prerequisite: &Prerequisite) -> bool;
}

/// Answers questions about plugin activation state.
pub trait ActivationOracle: Send + Sync {
    /// Whether the plugin finished activating.
    fn is_activated(&self, id: &PluginId) -> bool;

    /// Whether the plugin is currently activating.
    fn is_activating(&self, id: &PluginId) -> bool;
}

/// Maps a library-relative path to a concrete location.
pub trait PathResolver: Send + Sync {
    /// Resolve `relative_path` inside `library` of `plugin`.
    ///
    /// Returns `None` when the path cannot be expressed as a location; the
    /// library is then skipped.
    fn resolve(
        &self,
        plugin: &PluginDescriptor,
        library: &Library,
        relative_path: &str,
    ) -> Option<Location>;
}

/// The host application's own module loader, used as the final fallback.
pub trait RootResolver: Send + Sync {
    /// Resolve a class the host itself provides.
    fn resolve_class(&self, name: &str) -> Option<Arc<Artifact>>;
}

/// Reads entries out of a resolved code or resource library.
pub trait LibraryReader: Send + Sync {
    /// Contents of `entry` inside `library`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the entry exists but can't be read.
    fn read_entry(&self, library: &Location, entry: &str) -> std::io::Result<Option<Vec<u8>>>;

    /// Location of `entry` inside `library`, if it exists.
    fn find_entry(&self, library: &Location, entry: &str) -> Option<Location>;
}

/// Opens a byte stream for a remote location.
pub trait SourceOpener: Send + Sync {
    /// Open `location` for reading.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source can't be reached.
    fn open(&self, location: &Location) -> std::io::Result<Box<dyn Read + Send>>;
}

/// Secondary, plugin-owned source of runtime-generated artifacts.
///
/// Consulted before the graph walk; its hits are trusted and bypass
/// visibility filtering.
pub trait DynamicResolver: Send + Sync {
    /// Find a generated artifact by name.
    fn find_class(&self, name: &str) -> Option<Arc<Artifact>>;
}

/// A root resolver that provides nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRootResolver;

impl RootResolver for NoRootResolver {
    fn resolve_class(&self, _name: &str) -> Option<Arc<Artifact>> {
        None
    }
}

/// Everything a runtime needs from its host.
#[derive(Clone)]
pub struct Collaborators {
    /// Plugin descriptors and prerequisite matching.
    pub registry: Arc<dyn Registry>,
    /// Activation state.
    pub activation: Arc<dyn ActivationOracle>,
    /// Library path resolution.
    pub paths: Arc<dyn PathResolver>,
    /// Host module loader.
    pub root: Arc<dyn RootResolver>,
    /// Library entry access.
    pub reader: Arc<dyn LibraryReader>,
    /// Remote stream access for native libraries.
    pub opener: Arc<dyn SourceOpener>,
}

impl Collaborators {
    /// Bundle the host contracts, reading libraries from the local
    /// filesystem and streaming through [`DefaultOpener`].
    #[must_use]
    pub fn new(
        registry: Arc<dyn Registry>,
        activation: Arc<dyn ActivationOracle>,
        paths: Arc<dyn PathResolver>,
        root: Arc<dyn RootResolver>,
    ) -> Self {
        Self {
            registry,
            activation,
            paths,
            root,
            reader: Arc::new(FsLibraryReader),
            opener: Arc::new(DefaultOpener),
        }
    }

    /// Replace the library reader.
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn LibraryReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Replace the stream opener.
    #[must_use]
    pub fn with_opener(mut self, opener: Arc<dyn SourceOpener>) -> Self {
        self.opener = opener;
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
