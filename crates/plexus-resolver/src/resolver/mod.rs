//! Per-plugin resolution state.
//!
//! A [`PluginLoader`] owns everything scoped to one plugin: the snapshot of
//! its libraries, filters and accessible imports, the table of artifacts it
//! defined, its local namespaces, its optional dynamic resolver and its
//! native library copies. The algorithms live in [`class`] and
//! [`resource`]; they receive the runtime by reference so loaders never
//! hold on to it.

mod class;
mod resource;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::collaborators::DynamicResolver;
use crate::descriptor::{PluginDescriptor, PluginId};
use crate::error::{ResolveError, ResolveResult};
use crate::imports::ImportSnapshot;
use crate::locality::LocalNamespaces;
use crate::location::Location;
use crate::native::NativeLibraryCache;
use crate::runtime::RuntimeShared;
use crate::visibility::VisibilityFilter;

/// Library layout and imports of one dependency generation.
#[derive(Debug)]
pub(crate) struct LoaderState {
    pub(crate) descriptor: Arc<PluginDescriptor>,
    /// Code library bases. Only ever grows across generations.
    pub(crate) code: Vec<Location>,
    /// Resource library bases of the current descriptor.
    pub(crate) resources: Vec<Location>,
    /// Filters keyed by library base.
    pub(crate) filters: HashMap<Location, VisibilityFilter>,
    pub(crate) imports: Arc<ImportSnapshot>,
}

impl LoaderState {
    fn build(rt: &RuntimeShared, descriptor: Arc<PluginDescriptor>, previous_code: &[Location]) -> Self {
        let mut code = previous_code.to_vec();
        let mut resources = Vec::new();
        let mut filters = HashMap::new();
        for lib in &descriptor.libraries {
            let Some(base) = rt.collab.paths.resolve(&descriptor, lib, &lib.path) else {
                warn!(
                    plugin_id = %descriptor.id,
                    library = %lib.id,
                    path = %lib.path,
                    "can't resolve library path, skipping library"
                );
                continue;
            };
            filters.insert(base.clone(), VisibilityFilter::new(lib));
            if !lib.is_code() {
                resources.push(base);
            } else if !code.contains(&base) {
                debug!(plugin_id = %descriptor.id, location = %base, "code location added");
                code.push(base);
            }
        }
        let imports = ImportSnapshot::compute(
            rt.collab.registry.as_ref(),
            &descriptor,
            rt.next_generation(),
        );
        Self {
            descriptor,
            code,
            resources,
            filters,
            imports,
        }
    }

    fn disposed(descriptor: Arc<PluginDescriptor>, generation: u64) -> Self {
        Self {
            descriptor,
            code: Vec::new(),
            resources: Vec::new(),
            filters: HashMap::new(),
            imports: ImportSnapshot::empty(generation),
        }
    }
}

/// Resolution context of one plugin.
pub(crate) struct PluginLoader {
    id: PluginId,
    state: RwLock<Arc<LoaderState>>,
    classes: RwLock<HashMap<String, Arc<Artifact>>>,
    define_lock: Mutex<()>,
    local_namespaces: LocalNamespaces,
    dynamic: RwLock<Option<Arc<dyn DynamicResolver>>>,
    native: NativeLibraryCache,
}

impl PluginLoader {
    /// Create the loader of `id` from its registry descriptor.
    pub(crate) fn new(rt: &RuntimeShared, id: &PluginId) -> ResolveResult<Self> {
        let descriptor = rt
            .collab
            .registry
            .descriptor(id)
            .ok_or_else(|| ResolveError::UnknownPlugin(id.clone()))?;
        let state = LoaderState::build(rt, descriptor, &[]);
        debug!(
            plugin_id = %id,
            code_locations = state.code.len(),
            imports = state.imports.len(),
            "plugin resolver created"
        );
        Ok(Self {
            id: id.clone(),
            state: RwLock::new(Arc::new(state)),
            classes: RwLock::new(HashMap::new()),
            define_lock: Mutex::new(()),
            local_namespaces: LocalNamespaces::default(),
            dynamic: RwLock::new(None),
            native: NativeLibraryCache::default(),
        })
    }

    pub(crate) fn id(&self) -> &PluginId {
        &self.id
    }

    /// Current generation snapshot.
    pub(crate) fn state(&self) -> Arc<LoaderState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn imports(&self) -> Arc<ImportSnapshot> {
        Arc::clone(&self.state().imports)
    }

    pub(crate) fn dynamic_resolver(&self) -> Option<Arc<dyn DynamicResolver>> {
        self.dynamic
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_dynamic_resolver(&self, resolver: Option<Arc<dyn DynamicResolver>>) {
        *self.dynamic.write().unwrap_or_else(PoisonError::into_inner) = resolver;
    }

    pub(crate) fn local_namespaces(&self) -> &LocalNamespaces {
        &self.local_namespaces
    }

    pub(crate) fn native(&self) -> &NativeLibraryCache {
        &self.native
    }

    /// Start a new dependency generation.
    ///
    /// Newly declared code locations are appended, filters and imports are
    /// rebuilt from the current descriptor, failed and vanished native
    /// copies are dropped and local namespaces are forgotten. Artifacts
    /// already defined stay in the local table.
    pub(crate) fn dependency_set_changed(&self, rt: &RuntimeShared) -> ResolveResult<()> {
        let descriptor = rt
            .collab
            .registry
            .descriptor(&self.id)
            .ok_or_else(|| ResolveError::UnknownPlugin(self.id.clone()))?;
        let previous = self.state();
        let next = LoaderState::build(rt, descriptor, &previous.code);
        debug!(
            plugin_id = %self.id,
            generation = next.imports.generation(),
            added_code_locations = next.code.len().saturating_sub(previous.code.len()),
            imports = next.imports.len(),
            "dependency set changed"
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        self.native.prune();
        self.local_namespaces.clear();
        Ok(())
    }

    /// Release everything this plugin holds.
    pub(crate) fn dispose(&self, rt: &RuntimeShared) {
        self.native.dispose();
        let descriptor = Arc::clone(&self.state().descriptor);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(LoaderState::disposed(descriptor, rt.next_generation()));
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.local_namespaces.clear();
        self.set_dynamic_resolver(None);
        debug!(plugin_id = %self.id, "plugin resolver disposed");
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("id", &self.id)
            .field("local_namespaces", &self.local_namespaces.len())
            .field("native_entries", &self.native.len())
            .finish_non_exhaustive()
    }
}
