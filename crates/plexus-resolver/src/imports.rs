//! Transitive import computation under re-export semantics.
//!
//! A plugin sees its direct prerequisites regardless of their export flag,
//! and sees further plugins only through chains where every hop after the
//! first is an exported prerequisite.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::collaborators::Registry;
use crate::descriptor::{PluginDescriptor, PluginId};

/// Plugins whose artifacts `root` may attempt to see.
///
/// Never contains `root` itself, even through a cycle. Iteration order of
/// the returned set is unspecified.
#[must_use]
pub fn accessible_imports(registry: &dyn Registry, root: &PluginDescriptor) -> HashSet<PluginId> {
    let mut imports = HashSet::new();
    collect(registry, root, &root.id, true, &mut imports);
    imports
}

fn collect(
    registry: &dyn Registry,
    descriptor: &PluginDescriptor,
    root: &PluginId,
    include_private: bool,
    imports: &mut HashSet<PluginId>,
) {
    for pre in &descriptor.prerequisites {
        if !registry.matches(pre) {
            continue;
        }
        if !(pre.exported || include_private) {
            continue;
        }
        if &pre.plugin_id == root || imports.contains(&pre.plugin_id) {
            continue;
        }
        let Some(target) = registry.descriptor(&pre.plugin_id) else {
            warn!(
                plugin_id = %descriptor.id,
                prerequisite = %pre.plugin_id,
                "matched prerequisite has no descriptor"
            );
            continue;
        };
        imports.insert(pre.plugin_id.clone());
        collect(registry, &target, root, false, imports);
    }
}

/// Immutable accessible-import set for one dependency generation.
///
/// A new generation replaces the whole snapshot; walks that started on the
/// previous one keep reading it until they finish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSnapshot {
    generation: u64,
    plugins: HashSet<PluginId>,
}

impl ImportSnapshot {
    /// Compute the snapshot of `descriptor` for `generation`.
    #[must_use]
    pub fn compute(registry: &dyn Registry, descriptor: &PluginDescriptor, generation: u64) -> Arc<Self> {
        let plugins = accessible_imports(registry, descriptor);
        debug!(
            plugin_id = %descriptor.id,
            generation,
            imports = plugins.len(),
            "collected accessible imports"
        );
        Arc::new(Self {
            generation,
            plugins,
        })
    }

    /// An empty snapshot, used once a plugin is disposed.
    #[must_use]
    pub fn empty(generation: u64) -> Arc<Self> {
        Arc::new(Self {
            generation,
            plugins: HashSet::new(),
        })
    }

    /// Dependency generation this snapshot belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `id` is accessible.
    #[must_use]
    pub fn contains(&self, id: &PluginId) -> bool {
        self.plugins.contains(id)
    }

    /// Accessible plugins, in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginId> {
        self.plugins.iter()
    }

    /// Number of accessible plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether nothing is accessible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// The accessible set itself.
    #[must_use]
    pub fn plugins(&self) -> &HashSet<PluginId> {
        &self.plugins
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use semver::Version;

    use super::*;
    use crate::descriptor::Prerequisite;

    struct Graph(HashMap<PluginId, Arc<PluginDescriptor>>);

    impl Registry for Graph {
        fn descriptor(&self, id: &PluginId) -> Option<Arc<PluginDescriptor>> {
            self.0.get(id).cloned()
        }

        fn matches(&self, pre: &Prerequisite) -> bool {
            self.0.contains_key(&pre.plugin_id)
        }
    }

    fn id(s: &str) -> PluginId {
        PluginId::from_static(s)
    }

    fn plugin(name: &str, deps: &[(&str, bool)]) -> PluginDescriptor {
        deps.iter().fold(
            PluginDescriptor::new(id(name), Version::new(1, 0, 0)),
            |d, (dep, exported)| {
                let pre = Prerequisite::new(id(dep));
                d.with_prerequisite(if *exported { pre.exported() } else { pre })
            },
        )
    }

    fn graph(plugins: Vec<PluginDescriptor>) -> Graph {
        Graph(plugins.into_iter().map(|d| (d.id.clone(), Arc::new(d))).collect())
    }

    fn set(ids: &[&str]) -> HashSet<PluginId> {
        ids.iter().map(|s| id(s)).collect()
    }

    #[test]
    fn private_import_with_exported_chain() {
        let g = graph(vec![
            plugin("a", &[("b", false)]),
            plugin("b", &[("c", true)]),
            plugin("c", &[]),
        ]);
        let a = g.descriptor(&id("a")).unwrap();
        let b = g.descriptor(&id("b")).unwrap();
        assert_eq!(accessible_imports(&g, &a), set(&["b", "c"]));
        assert_eq!(accessible_imports(&g, &b), set(&["c"]));
    }

    #[test]
    fn private_reexport_boundary_holds() {
        // b privately imports c, so only b sees c.
        let g = graph(vec![
            plugin("a", &[("b", true)]),
            plugin("b", &[("c", false)]),
            plugin("c", &[]),
        ]);
        let a = g.descriptor(&id("a")).unwrap();
        let b = g.descriptor(&id("b")).unwrap();
        assert_eq!(accessible_imports(&g, &a), set(&["b"]));
        assert_eq!(accessible_imports(&g, &b), set(&["c"]));
    }

    #[test]
    fn cycles_terminate_and_exclude_self() {
        let g = graph(vec![
            plugin("a", &[("b", true)]),
            plugin("b", &[("c", true)]),
            plugin("c", &[("a", true)]),
        ]);
        for name in ["a", "b", "c"] {
            let d = g.descriptor(&id(name)).unwrap();
            let imports = accessible_imports(&g, &d);
            assert!(!imports.contains(&id(name)), "{name} imports itself");
            assert_eq!(imports.len(), 2);
        }
    }

    #[test]
    fn self_dependency_is_ignored() {
        let g = graph(vec![plugin("a", &[("a", false)])]);
        let a = g.descriptor(&id("a")).unwrap();
        assert!(accessible_imports(&g, &a).is_empty());
    }

    #[test]
    fn unmatched_prerequisites_are_skipped() {
        let g = graph(vec![plugin("a", &[("missing", false), ("b", false)]), plugin("b", &[])]);
        let a = g.descriptor(&id("a")).unwrap();
        assert_eq!(accessible_imports(&g, &a), set(&["b"]));
    }

    #[test]
    fn snapshot_carries_generation() {
        let g = graph(vec![plugin("a", &[("b", false)]), plugin("b", &[])]);
        let a = g.descriptor(&id("a")).unwrap();
        let snap = ImportSnapshot::compute(&g, &a, 7);
        assert_eq!(snap.generation(), 7);
        assert!(snap.contains(&id("b")));
        assert!(ImportSnapshot::empty(8).is_empty());
    }
}
