//! In-memory host collaborators.
//!
//! Every mock is `Clone` and shares its state through `Arc`, so a test can
//! keep a handle for assertions after giving a clone to the runtime.

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use plexus_resolver::{
    ActivationOracle, Artifact, DynamicResolver, Library, LibraryReader, Location,
    PathResolver, PluginDescriptor, PluginId, Prerequisite, Registry, RootResolver,
    SourceOpener,
};

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry backed by a map of descriptors.
///
/// A prerequisite matches when its target is registered and, if it carries
/// a version requirement, the registered version satisfies it.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    plugins: Arc<RwLock<HashMap<PluginId, Arc<PluginDescriptor>>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `plugins`.
    #[must_use]
    pub fn with_plugins(plugins: impl IntoIterator<Item = PluginDescriptor>) -> Self {
        let registry = Self::new();
        for plugin in plugins {
            registry.insert(plugin);
        }
        registry
    }

    /// Register or replace a descriptor.
    pub fn insert(&self, descriptor: PluginDescriptor) {
        write(&self.plugins).insert(descriptor.id.clone(), Arc::new(descriptor));
    }

    /// Unregister a plugin.
    pub fn remove(&self, id: &PluginId) -> Option<Arc<PluginDescriptor>> {
        write(&self.plugins).remove(id)
    }

    /// Replace a plugin's descriptor in place.
    pub fn update(&self, id: &PluginId, f: impl FnOnce(&mut PluginDescriptor)) {
        let mut plugins = write(&self.plugins);
        if let Some(existing) = plugins.get_mut(id) {
            f(Arc::make_mut(existing));
        }
    }
}

impl Registry for MemoryRegistry {
    fn descriptor(&self, id: &PluginId) -> Option<Arc<PluginDescriptor>> {
        read(&self.plugins).get(id).cloned()
    }

    fn matches(&self, prerequisite: &Prerequisite) -> bool {
        let plugins = read(&self.plugins);
        let Some(target) = plugins.get(&prerequisite.plugin_id) else {
            return false;
        };
        prerequisite
            .version
            .as_ref()
            .is_none_or(|req| req.matches(&target.version))
    }
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// Activation oracle where every plugin is activated unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct StaticActivation {
    inactive: Arc<RwLock<HashSet<PluginId>>>,
    activating: Arc<RwLock<HashSet<PluginId>>>,
}

impl StaticActivation {
    /// Every plugin activated.
    #[must_use]
    pub fn all_activated() -> Self {
        Self::default()
    }

    /// Mark `id` as neither activated nor activating.
    pub fn deactivate(&self, id: &PluginId) {
        write(&self.inactive).insert(id.clone());
        write(&self.activating).remove(id);
    }

    /// Mark `id` as being activated right now.
    pub fn set_activating(&self, id: &PluginId) {
        write(&self.inactive).insert(id.clone());
        write(&self.activating).insert(id.clone());
    }

    /// Mark `id` as activated.
    pub fn activate(&self, id: &PluginId) {
        write(&self.inactive).remove(id);
        write(&self.activating).remove(id);
    }
}

impl ActivationOracle for StaticActivation {
    fn is_activated(&self, id: &PluginId) -> bool {
        !read(&self.inactive).contains(id)
    }

    fn is_activating(&self, id: &PluginId) -> bool {
        read(&self.activating).contains(id)
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Maps each plugin to `{base}{plugin id}/` and resolves library paths
/// relative to that, unless a plugin has an explicit home.
#[derive(Debug, Clone)]
pub struct MapPathResolver {
    base: Location,
    homes: Arc<RwLock<HashMap<PluginId, Location>>>,
}

impl MapPathResolver {
    /// Resolve every plugin under `base` (which should end with `/`).
    #[must_use]
    pub fn under(base: Location) -> Self {
        Self {
            base,
            homes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Give `id` its own home location (should end with `/`).
    pub fn set_home(&self, id: &PluginId, home: Location) {
        write(&self.homes).insert(id.clone(), home);
    }

    /// Home location of `id`.
    #[must_use]
    pub fn home(&self, id: &PluginId) -> Option<Location> {
        if let Some(home) = read(&self.homes).get(id) {
            return Some(home.clone());
        }
        self.base.join(&format!("{id}/"))
    }
}

impl PathResolver for MapPathResolver {
    fn resolve(
        &self,
        plugin: &PluginDescriptor,
        _library: &Library,
        relative_path: &str,
    ) -> Option<Location> {
        self.home(&plugin.id)?.join(relative_path)
    }
}

// ---------------------------------------------------------------------------
// Library entries
// ---------------------------------------------------------------------------

/// Library reader over a map of entry URLs to bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibraryReader {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    reads: Arc<AtomicUsize>,
    read_log: Arc<RwLock<Vec<String>>>,
}

impl MemoryLibraryReader {
    /// Create an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `entry` inside the library at `library`.
    pub fn add(&self, library: &Location, entry: &str, bytes: impl Into<Vec<u8>>) {
        if let Some(location) = library.join(entry) {
            write(&self.entries).insert(location.as_str().to_owned(), bytes.into());
        }
    }

    /// Number of `read_entry` calls that returned bytes.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Entry URLs that were read, in order.
    #[must_use]
    pub fn read_log(&self) -> Vec<String> {
        read(&self.read_log).clone()
    }
}

impl LibraryReader for MemoryLibraryReader {
    fn read_entry(&self, library: &Location, entry: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(location) = library.join(entry) else {
            return Ok(None);
        };
        let found = read(&self.entries).get(location.as_str()).cloned();
        if found.is_some() {
            self.reads.fetch_add(1, Ordering::SeqCst);
            write(&self.read_log).push(location.as_str().to_owned());
        }
        Ok(found)
    }

    fn find_entry(&self, library: &Location, entry: &str) -> Option<Location> {
        let location = library.join(entry.trim_start_matches('/'))?;
        read(&self.entries)
            .contains_key(location.as_str())
            .then_some(location)
    }
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// Source opener serving in-memory bytes and counting opens per URL.
#[derive(Debug, Clone, Default)]
pub struct CountingOpener {
    sources: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    opens: Arc<RwLock<HashMap<String, usize>>>,
}

impl CountingOpener {
    /// Create an opener with no sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` at `location`.
    pub fn serve(&self, location: &Location, bytes: impl Into<Vec<u8>>) {
        write(&self.sources).insert(location.as_str().to_owned(), bytes.into());
    }

    /// Make every open of `location` fail.
    pub fn fail(&self, location: &Location) {
        write(&self.failing).insert(location.as_str().to_owned());
    }

    /// How many times `location` was opened.
    #[must_use]
    pub fn opens(&self, location: &Location) -> usize {
        read(&self.opens).get(location.as_str()).copied().unwrap_or(0)
    }

    /// Total opens across all locations.
    #[must_use]
    pub fn total_opens(&self) -> usize {
        read(&self.opens).values().sum()
    }
}

impl SourceOpener for CountingOpener {
    fn open(&self, location: &Location) -> io::Result<Box<dyn Read + Send>> {
        {
            let mut opens = write(&self.opens);
            let count = opens.entry(location.as_str().to_owned()).or_insert(0);
            *count = count.saturating_add(1);
        }
        if read(&self.failing).contains(location.as_str()) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "source unavailable"));
        }
        match read(&self.sources).get(location.as_str()) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(io::Error::new(io::ErrorKind::NotFound, location.as_str().to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Root and dynamic resolvers
// ---------------------------------------------------------------------------

/// Root resolver with a fixed set of platform artifacts.
#[derive(Debug, Clone, Default)]
pub struct MockRootResolver {
    artifacts: Arc<RwLock<HashMap<String, Arc<Artifact>>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockRootResolver {
    /// Create a root resolver that knows nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` resolvable as a platform artifact.
    pub fn provide(&self, name: &str, bytes: &[u8]) {
        write(&self.artifacts).insert(
            name.to_owned(),
            Arc::new(Artifact::platform(name, bytes.to_vec())),
        );
    }

    /// Names asked for, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        read(&self.calls).clone()
    }
}

impl RootResolver for MockRootResolver {
    fn resolve_class(&self, name: &str) -> Option<Arc<Artifact>> {
        write(&self.calls).push(name.to_owned());
        read(&self.artifacts).get(name).cloned()
    }
}

/// Dynamic resolver producing generated artifacts for registered names.
#[derive(Debug, Clone)]
pub struct MockDynamicResolver {
    owner: PluginId,
    artifacts: Arc<RwLock<HashMap<String, Arc<Artifact>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockDynamicResolver {
    /// Create a dynamic resolver generating artifacts owned by `owner`.
    #[must_use]
    pub fn new(owner: PluginId) -> Self {
        Self {
            owner,
            artifacts: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Generate `name` on request.
    pub fn generate(&self, name: &str, bytes: &[u8]) {
        write(&self.artifacts).insert(
            name.to_owned(),
            Arc::new(Artifact::generated(name, self.owner.clone(), bytes.to_vec())),
        );
    }

    /// Number of lookups so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DynamicResolver for MockDynamicResolver {
    fn find_class(&self, name: &str) -> Option<Arc<Artifact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        read(&self.artifacts).get(name).cloned()
    }
}
