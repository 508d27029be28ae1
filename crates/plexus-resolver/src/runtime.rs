//! The shared resolution context and per-plugin handles.
//!
//! A [`ResolverRuntime`] owns what every plugin's resolver shares: the host
//! collaborators, the settings, the namespace owner cache and the native
//! library cache folder. [`Resolver`] handles are cheap to clone and all
//! point back into the same runtime.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::artifact::{Artifact, Resource};
use crate::cache_root::CacheRootCell;
use crate::collaborators::{Collaborators, DynamicResolver};
use crate::descriptor::PluginId;
use crate::error::ResolveResult;
use crate::imports::ImportSnapshot;
use crate::locality::NamespaceOwners;
use crate::native::NativeContext;
use crate::resolver::PluginLoader;
use crate::settings::ResolverSettings;

/// State shared by every loader of a runtime.
pub(crate) struct RuntimeShared {
    pub(crate) settings: ResolverSettings,
    pub(crate) collab: Collaborators,
    pub(crate) owners: NamespaceOwners,
    cache_root: CacheRootCell,
    loaders: DashMap<PluginId, Arc<PluginLoader>>,
    generation: AtomicU64,
}

impl RuntimeShared {
    /// The loader of `id`, created from the registry on first use.
    pub(crate) fn loader(&self, id: &PluginId) -> ResolveResult<Arc<PluginLoader>> {
        if let Some(loader) = self.loaders.get(id).map(|l| Arc::clone(l.value())) {
            return Ok(loader);
        }
        let created = Arc::new(PluginLoader::new(self, id)?);
        let entry = self.loaders.entry(id.clone()).or_insert(created);
        Ok(Arc::clone(entry.value()))
    }

    /// Allocate the next dependency generation number.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn cache_root(&self) -> Option<&Path> {
        self.cache_root.get()
    }

    fn dispose(&self, id: &PluginId) {
        if let Some((_, loader)) = self.loaders.remove(id) {
            loader.dispose(self);
        }
    }
}

/// Resolution context shared by the resolvers of one plugin runtime.
///
/// Dropping the last handle (including every [`Resolver`] obtained from it)
/// removes the native library cache folder this runtime created.
#[derive(Clone)]
pub struct ResolverRuntime {
    shared: Arc<RuntimeShared>,
}

impl ResolverRuntime {
    /// Create a runtime over the given host collaborators.
    #[must_use]
    pub fn new(settings: ResolverSettings, collaborators: Collaborators) -> Self {
        let shared = RuntimeShared {
            owners: NamespaceOwners::new(settings.owner_warn_threshold),
            cache_root: CacheRootCell::new(settings.native_cache.clone()),
            settings,
            collab: collaborators,
            loaders: DashMap::new(),
            generation: AtomicU64::new(0),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// The resolver of plugin `id`, created on first request.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownPlugin`](crate::ResolveError::UnknownPlugin)
    /// if the registry has no descriptor for `id`.
    pub fn resolver(&self, id: &PluginId) -> ResolveResult<Resolver> {
        let loader = self.shared.loader(id)?;
        Ok(Resolver {
            shared: Arc::clone(&self.shared),
            loader,
        })
    }

    /// Notify the runtime that the prerequisites of `id` changed.
    ///
    /// Does nothing if no resolver was created for `id` yet.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownPlugin`](crate::ResolveError::UnknownPlugin)
    /// if the registry no longer describes `id`.
    pub fn on_dependency_set_changed(&self, id: &PluginId) -> ResolveResult<()> {
        let loader = self.shared.loaders.get(id).map(|l| Arc::clone(l.value()));
        match loader {
            Some(loader) => loader.dependency_set_changed(&self.shared),
            None => Ok(()),
        }
    }

    /// Notify the runtime that `id` was unloaded.
    pub fn on_dispose(&self, id: &PluginId) {
        self.shared.dispose(id);
    }

    /// The native library cache folder, creating it if needed. `None` when
    /// caching is disabled or the folder belongs to another process.
    #[must_use]
    pub fn cache_root(&self) -> Option<PathBuf> {
        self.shared.cache_root().map(Path::to_path_buf)
    }

    /// Runtime-wide namespace owner cache.
    #[must_use]
    pub fn namespace_owners(&self) -> &NamespaceOwners {
        &self.shared.owners
    }

    /// Settings the runtime was created with.
    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.shared.settings
    }

    /// Plugins that currently have a resolver.
    #[must_use]
    pub fn loaded_plugins(&self) -> Vec<PluginId> {
        self.shared.loaders.iter().map(|l| l.key().clone()).collect()
    }
}

impl fmt::Debug for ResolverRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRuntime")
            .field("settings", &self.shared.settings)
            .field("plugins", &self.shared.loaders.len())
            .field("namespaces", &self.shared.owners.len())
            .finish_non_exhaustive()
    }
}

/// Resolver of a single plugin.
#[derive(Clone)]
pub struct Resolver {
    shared: Arc<RuntimeShared>,
    loader: Arc<PluginLoader>,
}

impl Resolver {
    /// The plugin this resolver belongs to.
    #[must_use]
    pub fn plugin_id(&self) -> &PluginId {
        self.loader.id()
    }

    /// Resolve a class by fully qualified name.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidName`](crate::ResolveError::InvalidName) for
    ///   names that can't be resolved through plugins
    /// - a visibility error if an exporting library denies the name
    /// - [`ResolveError::NotFound`](crate::ResolveError::NotFound) once every
    ///   source has been tried
    pub fn resolve(&self, name: &str) -> ResolveResult<Arc<Artifact>> {
        self.loader.resolve(&self.shared, name)
    }

    /// Walk this plugin and its imports for `name` on behalf of `requestor`,
    /// without the root resolver or the dynamic resolver.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotActivated`](crate::ResolveError::NotActivated) if
    ///   `requestor` is another plugin and this one is neither activated nor
    ///   activating
    /// - a visibility error if an exporting library denies the name
    pub fn resolve_for(&self, name: &str, requestor: &PluginId) -> ResolveResult<Option<Arc<Artifact>>> {
        let mut visited = HashSet::new();
        self.loader
            .load_across_graph(&self.shared, name, requestor, true, &mut visited)
    }

    /// First visible resource named `name`.
    #[must_use]
    pub fn find_one(&self, name: &str) -> Option<Resource> {
        let mut visited = HashSet::new();
        self.loader
            .find_resource(&self.shared, name, self.loader.id(), &mut visited)
    }

    /// Every visible resource named `name`, own libraries first.
    #[must_use]
    pub fn find_all(&self, name: &str) -> Vec<Resource> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        self.loader
            .find_resources(&self.shared, name, self.loader.id(), &mut visited, &mut found);
        found
    }

    /// Local path of native library `name` (`"foo"` for `libfoo.so`),
    /// copying it into the cache folder if it is remote.
    #[must_use]
    pub fn locate_native(&self, name: &str) -> Option<PathBuf> {
        let state = self.loader.state();
        let cache_root = || self.shared.cache_root().map(Path::to_path_buf);
        let ctx = NativeContext {
            paths: self.shared.collab.paths.as_ref(),
            opener: self.shared.collab.opener.as_ref(),
            cache_root: &cache_root,
        };
        self.loader.native().locate(&ctx, &state.descriptor, name)
    }

    /// Plugins this plugin may see, for the current dependency generation.
    #[must_use]
    pub fn accessible_imports(&self) -> Arc<ImportSnapshot> {
        self.loader.imports()
    }

    /// Attach or detach the plugin's dynamic resolver.
    pub fn set_dynamic_resolver(&self, resolver: Option<Arc<dyn DynamicResolver>>) {
        debug!(plugin_id = %self.plugin_id(), attached = resolver.is_some(), "dynamic resolver changed");
        self.loader.set_dynamic_resolver(resolver);
    }

    /// Whether `name`'s namespace is known to come from this plugin.
    #[must_use]
    pub fn is_local_namespace(&self, name: &str) -> bool {
        self.loader.local_namespaces().contains_name(name)
    }

    /// See [`ResolverRuntime::on_dependency_set_changed`].
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownPlugin`](crate::ResolveError::UnknownPlugin)
    /// if the registry no longer describes this plugin.
    pub fn on_dependency_set_changed(&self) -> ResolveResult<()> {
        self.loader.dependency_set_changed(&self.shared)
    }

    /// Dispose of this plugin's resolution state and detach it from the
    /// runtime.
    pub fn on_dispose(&self) {
        self.shared
            .loaders
            .remove_if(self.loader.id(), |_, l| Arc::ptr_eq(l, &self.loader));
        self.loader.dispose(&self.shared);
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
