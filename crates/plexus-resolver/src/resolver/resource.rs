//! Resource lookup across a plugin and its accessible imports.
//!
//! Resources never trigger activation checks and never use the namespace
//! owner cache. A filtered-out resource is simply skipped. Like the class
//! walk, the search is bounded by the requesting plugin's import snapshot.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::{LoaderState, PluginLoader};
use crate::artifact::Resource;
use crate::descriptor::PluginId;
use crate::location::Location;
use crate::runtime::RuntimeShared;

impl PluginLoader {
    /// First visible resource named `name`, searching this plugin before
    /// its accessible imports.
    ///
    /// Only plugins in this plugin's import snapshot are searched, so a
    /// private import of an import stays out of reach.
    pub(crate) fn find_resource(
        &self,
        rt: &RuntimeShared,
        name: &str,
        requestor: &PluginId,
        visited: &mut HashSet<PluginId>,
    ) -> Option<Resource> {
        if !visited.insert(self.id().clone()) {
            return None;
        }
        if let Some(found) = self.find_local_resource(rt, name, requestor) {
            return Some(found);
        }
        debug!(plugin_id = %self.id(), name, requestor = %requestor, "resource not found locally");

        let imports = self.imports();
        for import in imports.iter() {
            if !visited.insert(import.clone()) {
                continue;
            }
            let Some(peer) = import_loader(rt, self.id(), import) else {
                continue;
            };
            if let Some(found) = peer.find_local_resource(rt, name, requestor) {
                return Some(found);
            }
        }
        None
    }

    /// Append every visible resource named `name` from this plugin and its
    /// accessible imports to `out`.
    pub(crate) fn find_resources(
        &self,
        rt: &RuntimeShared,
        name: &str,
        requestor: &PluginId,
        visited: &mut HashSet<PluginId>,
        out: &mut Vec<Resource>,
    ) {
        if !visited.insert(self.id().clone()) {
            return;
        }
        self.find_local_resources(rt, name, requestor, out);

        let imports = self.imports();
        for import in imports.iter() {
            if !visited.insert(import.clone()) {
                continue;
            }
            if let Some(peer) = import_loader(rt, self.id(), import) {
                peer.find_local_resources(rt, name, requestor, out);
            }
        }
    }

    /// Search this plugin's code libraries, then its resource libraries.
    /// The first hit decides, even if it is filtered out.
    fn find_local_resource(&self, rt: &RuntimeShared, name: &str, requestor: &PluginId) -> Option<Resource> {
        let state = self.state();
        let found = [&state.code, &state.resources]
            .into_iter()
            .find_map(|libraries| self.find_in(rt, libraries, name).next())?;
        debug!(plugin_id = %self.id(), name, location = %found.location, requestor = %requestor, "resource found");
        self.is_resource_visible(&state, &found, requestor)
            .then_some(found)
    }

    fn find_local_resources(
        &self,
        rt: &RuntimeShared,
        name: &str,
        requestor: &PluginId,
        out: &mut Vec<Resource>,
    ) {
        let state = self.state();
        for libraries in [&state.code, &state.resources] {
            out.extend(
                self.find_in(rt, libraries, name)
                    .filter(|found| self.is_resource_visible(&state, found, requestor)),
            );
        }
    }

    fn find_in<'a>(
        &'a self,
        rt: &'a RuntimeShared,
        libraries: &'a [Location],
        name: &'a str,
    ) -> impl Iterator<Item = Resource> + 'a {
        libraries.iter().filter_map(move |library| {
            let location = rt.collab.reader.find_entry(library, name)?;
            Some(Resource {
                name: name.to_owned(),
                location,
                library: library.clone(),
                owner: self.id().clone(),
            })
        })
    }

    fn is_resource_visible(&self, state: &LoaderState, found: &Resource, requestor: &PluginId) -> bool {
        if requestor == self.id() {
            return true;
        }
        let Some(filter) = state.filters.get(&found.library) else {
            warn!(
                plugin_id = %self.id(),
                name = %found.name,
                library = %found.library,
                requestor = %requestor,
                "no resource filter found for library"
            );
            return false;
        };
        if !filter.is_resource_visible(&found.name) {
            warn!(
                plugin_id = %self.id(),
                name = %found.name,
                location = %found.location,
                requestor = %requestor,
                "resource not visible"
            );
            return false;
        }
        true
    }
}

fn import_loader(rt: &RuntimeShared, from: &PluginId, id: &PluginId) -> Option<std::sync::Arc<PluginLoader>> {
    match rt.loader(id) {
        Ok(peer) => Some(peer),
        Err(e) => {
            warn!(plugin_id = %from, candidate = %id, error = %e, "can't reach imported plugin");
            None
        },
    }
}
