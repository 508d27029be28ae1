//! Class resolution: local definition, graph walk and visibility checks.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError};

use tracing::{debug, warn};

use super::PluginLoader;
use crate::artifact::Artifact;
use crate::descriptor::PluginId;
use crate::error::{ResolveError, ResolveResult};
use crate::imports::ImportSnapshot;
use crate::namespace::class_entry_path;
use crate::runtime::RuntimeShared;

impl PluginLoader {
    /// Resolve `name` on behalf of this plugin.
    pub(crate) fn resolve(&self, rt: &RuntimeShared, name: &str) -> ResolveResult<Arc<Artifact>> {
        let settings = &rt.settings;
        if settings.is_illegal_name(name) {
            debug!(plugin_id = %self.id(), name, "illegal class name");
            if settings.is_platform_name(name)
                && let Some(artifact) = rt.collab.root.resolve_class(name)
            {
                return Ok(artifact);
            }
            return Err(ResolveError::InvalidName(name.to_owned()));
        }

        let mut try_local = true;
        if settings.local_fast_path && self.local_namespaces().contains_name(name) {
            debug!(plugin_id = %self.id(), name, "trying local class guess");
            if let Some(artifact) = self.load_local(rt, name) {
                debug!(plugin_id = %self.id(), name, "local class guess succeeded");
                return Ok(artifact);
            }
            try_local = false;
        }

        if let Some(dynamic) = self.dynamic_resolver()
            && let Some(artifact) = dynamic.find_class(name)
        {
            return Ok(artifact);
        }

        let mut visited = HashSet::new();
        let found = if settings.probe_root_last {
            match self.load_across_graph(rt, name, self.id(), try_local, &mut visited) {
                Ok(Some(artifact)) => Some(artifact),
                Ok(None) => rt.collab.root.resolve_class(name),
                Err(e) => {
                    debug!(plugin_id = %self.id(), name, error = %e, "graph walk failed, trying root resolver");
                    return rt.collab.root.resolve_class(name).ok_or(e);
                },
            }
        } else {
            match rt.collab.root.resolve_class(name) {
                Some(artifact) => Some(artifact),
                None => self.load_across_graph(rt, name, self.id(), try_local, &mut visited)?,
            }
        };
        found.ok_or_else(|| ResolveError::NotFound {
            name: name.to_owned(),
            plugin_id: self.id().clone(),
        })
    }

    /// Resolve `name` from this plugin's own libraries only.
    ///
    /// A successful definition is recorded in the local table, in the
    /// runtime's namespace owners and in this plugin's local namespaces.
    pub(crate) fn load_local(&self, rt: &RuntimeShared, name: &str) -> Option<Arc<Artifact>> {
        if let Some(dynamic) = self.dynamic_resolver()
            && let Some(artifact) = dynamic.find_class(name)
        {
            rt.owners.promote(name, self.id());
            return Some(artifact);
        }
        if let Some(artifact) = self.defined(name) {
            debug!(plugin_id = %self.id(), name, "found already defined class");
            self.record_locality(rt, name);
            return Some(artifact);
        }

        let artifact = {
            let _define = self.define_lock.lock().unwrap_or_else(PoisonError::into_inner);
            match self.defined(name) {
                Some(artifact) => artifact,
                None => {
                    let artifact = self.define(rt, name)?;
                    self.classes
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(name.to_owned(), Arc::clone(&artifact));
                    debug!(plugin_id = %self.id(), name, "class defined");
                    artifact
                },
            }
        };
        self.record_locality(rt, name);
        Some(artifact)
    }

    /// Note that `name`'s namespace is served by this plugin. Local
    /// namespaces are cleared on a dependency change, so this also runs for
    /// classes that were defined in an earlier generation.
    fn record_locality(&self, rt: &RuntimeShared, name: &str) {
        rt.owners.promote(name, self.id());
        if rt.settings.local_fast_path {
            self.local_namespaces().record(name);
        }
    }

    fn defined(&self, name: &str) -> Option<Arc<Artifact>> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn define(&self, rt: &RuntimeShared, name: &str) -> Option<Arc<Artifact>> {
        let state = self.state();
        let entry = class_entry_path(name, &rt.settings.class_entry_suffix);
        for library in &state.code {
            match rt.collab.reader.read_entry(library, &entry) {
                Ok(Some(bytes)) => {
                    return Some(Arc::new(Artifact::defined(
                        name,
                        self.id().clone(),
                        library.clone(),
                        bytes,
                    )));
                },
                Ok(None) => {},
                Err(e) => {
                    debug!(plugin_id = %self.id(), name, library = %library, error = %e, "can't read class entry");
                },
            }
        }
        debug!(plugin_id = %self.id(), name, "class not found in own libraries");
        None
    }

    /// Walk this plugin and its accessible imports for `name` on behalf of
    /// `requestor`.
    ///
    /// Returns `Ok(None)` when nothing was found or this plugin was already
    /// visited by the current request. A visibility denial ends the walk.
    pub(crate) fn load_across_graph(
        &self,
        rt: &RuntimeShared,
        name: &str,
        requestor: &PluginId,
        try_local: bool,
        visited: &mut HashSet<PluginId>,
    ) -> ResolveResult<Option<Arc<Artifact>>> {
        if !visited.insert(self.id().clone()) {
            return Ok(None);
        }
        if requestor != self.id()
            && !rt.collab.activation.is_activated(self.id())
            && !rt.collab.activation.is_activating(self.id())
        {
            warn!(plugin_id = %self.id(), name, requestor = %requestor, "can't load class, plugin is not activated yet");
            return Err(ResolveError::NotActivated {
                name: name.to_owned(),
                plugin_id: self.id().clone(),
            });
        }

        let imports = self.imports();
        if rt.settings.foreign_fast_path {
            let guesses = rt.owners.guesses(name);
            if !guesses.is_empty() {
                debug!(plugin_id = %self.id(), name, guesses = ?guesses, "trying plugin guess");
            }
            if let Some(artifact) = self.delegate(rt, name, requestor, guesses, &imports, visited)? {
                return Ok(Some(artifact));
            }
        }

        if try_local && let Some(artifact) = self.load_local(rt, name) {
            self.check_visibility(rt, &artifact, requestor)?;
            return Ok(Some(artifact));
        }
        debug!(plugin_id = %self.id(), name, requestor = %requestor, "local class not found");

        if rt.settings.foreign_fast_path {
            let guesses = rt.owners.ancestor_guesses(name);
            if let Some(artifact) = self.delegate(rt, name, requestor, guesses, &imports, visited)? {
                return Ok(Some(artifact));
            }
        }

        let remaining: Vec<PluginId> = imports.iter().cloned().collect();
        self.delegate(rt, name, requestor, remaining, &imports, visited)
    }

    /// Ask each accessible, unvisited candidate to resolve `name` locally.
    fn delegate(
        &self,
        rt: &RuntimeShared,
        name: &str,
        requestor: &PluginId,
        candidates: Vec<PluginId>,
        imports: &ImportSnapshot,
        visited: &mut HashSet<PluginId>,
    ) -> ResolveResult<Option<Arc<Artifact>>> {
        for candidate in candidates {
            if !imports.contains(&candidate) || visited.contains(&candidate) {
                continue;
            }
            visited.insert(candidate.clone());
            let peer = match rt.loader(&candidate) {
                Ok(peer) => peer,
                Err(e) => {
                    warn!(plugin_id = %self.id(), candidate = %candidate, error = %e, "can't reach imported plugin");
                    rt.owners.forget(&candidate);
                    continue;
                },
            };
            if let Some(artifact) = peer.load_local(rt, name) {
                peer.check_visibility(rt, &artifact, requestor)?;
                debug!(plugin_id = %self.id(), name, owner = %candidate, requestor = %requestor, "class found in imported plugin");
                return Ok(Some(artifact));
            }
        }
        Ok(None)
    }

    /// Decide whether `requestor` may use `artifact`.
    ///
    /// The plugin that defined the artifact decides, using the filter of
    /// the library it came from.
    pub(crate) fn check_visibility(
        &self,
        rt: &RuntimeShared,
        artifact: &Artifact,
        requestor: &PluginId,
    ) -> ResolveResult<()> {
        if requestor == self.id() {
            return Ok(());
        }
        // Platform or generated artifact.
        let Some(library) = artifact.library() else {
            return Ok(());
        };
        let Some(owner) = artifact.owner() else {
            return Ok(());
        };
        if owner != self.id() {
            return rt.loader(owner)?.check_visibility(rt, artifact, requestor);
        }
        let state = self.state();
        let Some(filter) = state.filters.get(library) else {
            warn!(
                plugin_id = %self.id(),
                name = artifact.name(),
                library = %library,
                requestor = %requestor,
                "class not visible, no class filter found"
            );
            return Err(ResolveError::MissingFilter {
                name: artifact.name().to_owned(),
                requestor: requestor.clone(),
                library: library.to_string(),
            });
        };
        if !filter.is_class_visible(artifact.name()) {
            warn!(
                plugin_id = %self.id(),
                name = artifact.name(),
                library = %library,
                requestor = %requestor,
                "class not visible"
            );
            return Err(ResolveError::NotVisible {
                name: artifact.name().to_owned(),
                requestor: requestor.clone(),
            });
        }
        Ok(())
    }
}
