//! A resolver runtime wired to the in-memory mocks.

use std::path::PathBuf;
use std::sync::Arc;

use plexus_resolver::{
    Collaborators, Location, PluginDescriptor, PluginId, Resolver, ResolverRuntime,
    ResolverSettings, namespace::class_entry_path,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::fixtures::test_plugin_id;
use crate::mocks::{
    CountingOpener, MapPathResolver, MemoryLibraryReader, MemoryRegistry, MockRootResolver,
    StaticActivation,
};

/// Base location every test plugin lives under.
pub const TEST_BASE: &str = "https://plugins.test/";

/// Install a test-writer subscriber with the given filter, once.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// A runtime over mock collaborators, with handles to each of them.
///
/// Plugins live at `https://plugins.test/{id}/`, so every library is remote
/// and native libraries go through the copy cache. The cache folder is
/// created in a private temp directory that lives as long as the harness.
#[derive(Debug)]
pub struct TestRuntime {
    /// The runtime under test.
    pub runtime: ResolverRuntime,
    /// Descriptor registry.
    pub registry: MemoryRegistry,
    /// Activation states.
    pub activation: StaticActivation,
    /// Plugin home locations.
    pub paths: MapPathResolver,
    /// Class and resource entries.
    pub reader: MemoryLibraryReader,
    /// Remote streams for native libraries.
    pub opener: CountingOpener,
    /// Platform artifacts.
    pub root: MockRootResolver,
    /// Parent of the native cache folder.
    pub cache_dir: TempDir,
}

impl TestRuntime {
    /// Runtime with default settings over `plugins`.
    #[must_use]
    pub fn new(plugins: impl IntoIterator<Item = PluginDescriptor>) -> Self {
        Self::with_settings(plugins, ResolverSettings::default())
    }

    /// Runtime with custom settings over `plugins`.
    ///
    /// The native cache base directory is always redirected to a temp dir.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory can't be created.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_settings(
        plugins: impl IntoIterator<Item = PluginDescriptor>,
        mut settings: ResolverSettings,
    ) -> Self {
        let cache_dir = TempDir::new().expect("Failed to create temp directory");
        settings.native_cache.base_dir = Some(cache_dir.path().to_path_buf());

        let registry = MemoryRegistry::with_plugins(plugins);
        let activation = StaticActivation::all_activated();
        let paths = MapPathResolver::under(test_base());
        let reader = MemoryLibraryReader::new();
        let opener = CountingOpener::new();
        let root = MockRootResolver::new();

        let collaborators = Collaborators::new(
            Arc::new(registry.clone()),
            Arc::new(activation.clone()),
            Arc::new(paths.clone()),
            Arc::new(root.clone()),
        )
        .with_reader(Arc::new(reader.clone()))
        .with_opener(Arc::new(opener.clone()));

        Self {
            runtime: ResolverRuntime::new(settings, collaborators),
            registry,
            activation,
            paths,
            reader,
            opener,
            root,
            cache_dir,
        }
    }

    /// Resolver of plugin `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not registered.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn resolver(&self, id: &str) -> Resolver {
        self.runtime
            .resolver(&test_plugin_id(id))
            .expect("plugin must be registered")
    }

    /// Base location of the library at `library_path` of plugin `id`.
    ///
    /// # Panics
    ///
    /// Panics if the location can't be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn library(&self, id: &str, library_path: &str) -> Location {
        self.paths
            .home(&test_plugin_id(id))
            .and_then(|home| home.join(library_path))
            .expect("library location must be valid")
    }

    /// Put class `name` into the library at `library_path` of plugin `id`.
    pub fn add_class(&self, id: &str, library_path: &str, name: &str, bytes: &[u8]) {
        let entry = class_entry_path(name, &self.runtime.settings().class_entry_suffix);
        self.reader
            .add(&self.library(id, library_path), &entry, bytes.to_vec());
    }

    /// Put resource `path` into the library at `library_path` of plugin `id`.
    pub fn add_resource(&self, id: &str, library_path: &str, path: &str, bytes: &[u8]) {
        self.reader
            .add(&self.library(id, library_path), path, bytes.to_vec());
    }

    /// Serve native library `file_name` from the library at `library_path`
    /// of plugin `id`, returning its remote location.
    ///
    /// # Panics
    ///
    /// Panics if the location can't be built.
    #[allow(clippy::expect_used)]
    pub fn serve_native(&self, id: &str, library_path: &str, file_name: &str, bytes: &[u8]) -> Location {
        let location = self
            .library(id, library_path)
            .join(file_name)
            .expect("native location must be valid");
        self.opener.serve(&location, bytes.to_vec());
        location
    }

    /// The native cache folder, if it was created.
    #[must_use]
    pub fn cache_root(&self) -> Option<PathBuf> {
        self.runtime.cache_root()
    }

    /// Plugin ID helper.
    #[must_use]
    pub fn id(&self, id: &str) -> PluginId {
        test_plugin_id(id)
    }
}

#[allow(clippy::expect_used)]
fn test_base() -> Location {
    Location::parse(TEST_BASE).expect("test base must be a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ABC_GRAPH, graph_from_toml};

    #[test]
    fn library_locations_are_per_plugin() {
        let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
        assert_eq!(
            env.library("org.c", "classes/").as_str(),
            "https://plugins.test/org.c/classes/"
        );
    }

    #[test]
    fn classes_are_stored_by_entry_url() {
        let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
        env.add_class("org.c", "classes/", "com.c.api.Widget", b"w");
        let widget = env.resolver("org.c").resolve("com.c.api.Widget").unwrap();
        assert_eq!(widget.bytes(), b"w");
        assert_eq!(
            env.reader.read_log(),
            vec!["https://plugins.test/org.c/classes/com/c/api/Widget.class"]
        );
    }
}
