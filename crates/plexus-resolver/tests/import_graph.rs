//! Accessible imports and dependency generations.

use std::collections::HashSet;

use plexus_resolver::{Library, PluginId, Registry, accessible_imports};
use plexus_test::{
    ABC_GRAPH, MemoryRegistry, TestRuntime, graph_from_toml, test_plugin, test_plugin_id,
    test_prerequisite,
};
use semver::VersionReq;

fn ids(names: &[&str]) -> HashSet<PluginId> {
    names.iter().map(|n| test_plugin_id(n)).collect()
}

#[test]
fn reexports_extend_private_imports() {
    let registry = MemoryRegistry::with_plugins(graph_from_toml(ABC_GRAPH));
    let a = registry.descriptor(&test_plugin_id("org.a")).unwrap();
    let b = registry.descriptor(&test_plugin_id("org.b")).unwrap();
    let c = registry.descriptor(&test_plugin_id("org.c")).unwrap();

    assert_eq!(accessible_imports(&registry, &a), ids(&["org.b", "org.c"]));
    assert_eq!(accessible_imports(&registry, &b), ids(&["org.c"]));
    assert!(accessible_imports(&registry, &c).is_empty());
}

#[test]
fn version_mismatch_is_not_imported() {
    let registry = MemoryRegistry::with_plugins([
        test_plugin("org.lib"),
        test_plugin("org.app").with_prerequisite(
            test_prerequisite("org.lib", false).with_version(VersionReq::parse("^2").unwrap()),
        ),
    ]);
    let app = registry.descriptor(&test_plugin_id("org.app")).unwrap();
    assert!(accessible_imports(&registry, &app).is_empty());
}

#[test]
fn missing_prerequisite_is_not_imported() {
    let registry = MemoryRegistry::with_plugins([
        test_plugin("org.app").with_prerequisite(test_prerequisite("org.gone", true).optional()),
    ]);
    let app = registry.descriptor(&test_plugin_id("org.app")).unwrap();
    assert!(accessible_imports(&registry, &app).is_empty());
}

#[test]
fn resolver_snapshot_is_stable_until_dependency_change() {
    let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
    let b = env.resolver("org.b");

    let before = b.accessible_imports();
    assert_eq!(before.plugins(), &ids(&["org.c"]));
    assert!(std::sync::Arc::ptr_eq(&before, &b.accessible_imports()));

    env.registry.insert(test_plugin("org.d"));
    env.registry.update(&env.id("org.b"), |desc| {
        desc.prerequisites.push(test_prerequisite("org.d", false));
    });
    // Not visible until the host says so.
    assert_eq!(b.accessible_imports().plugins(), &ids(&["org.c"]));

    env.runtime.on_dependency_set_changed(&env.id("org.b")).unwrap();

    let after = b.accessible_imports();
    assert_eq!(after.plugins(), &ids(&["org.c", "org.d"]));
    assert!(after.generation() > before.generation());
}

#[test]
fn new_import_becomes_resolvable_after_change() {
    let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
    env.registry
        .insert(test_plugin("org.d").with_library(Library::code("classes", "classes/").with_export("*")));
    env.add_class("org.d", "classes/", "com.d.Tool", b"tool");
    let c = env.resolver("org.c");

    assert!(c.resolve("com.d.Tool").is_err());

    env.registry.update(&env.id("org.c"), |desc| {
        desc.prerequisites.push(test_prerequisite("org.d", false));
    });
    c.on_dependency_set_changed().unwrap();

    let tool = c.resolve("com.d.Tool").unwrap();
    assert_eq!(tool.owner(), Some(&env.id("org.d")));
}

#[test]
fn added_code_library_is_searched_and_old_ones_kept() {
    let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
    env.add_class("org.c", "classes/", "com.c.api.Widget", b"widget");
    env.add_class("org.c", "extra/", "com.c.api.Gadget", b"gadget");
    let c = env.resolver("org.c");

    let widget = c.resolve("com.c.api.Widget").unwrap();
    assert!(c.resolve("com.c.api.Gadget").is_err());

    env.registry.update(&env.id("org.c"), |desc| {
        desc.libraries.retain(|lib| lib.id != "classes");
        desc.libraries
            .push(Library::code("extra", "extra/").with_export("com.c.api.*"));
    });
    c.on_dependency_set_changed().unwrap();

    assert!(c.resolve("com.c.api.Gadget").is_ok());
    // Defined before the change and still served from the local table.
    assert!(std::sync::Arc::ptr_eq(&widget, &c.resolve("com.c.api.Widget").unwrap()));
}

#[test]
fn change_for_unloaded_plugin_is_ignored() {
    let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
    assert!(env.runtime.on_dependency_set_changed(&env.id("org.a")).is_ok());
    assert!(env.runtime.loaded_plugins().is_empty());
}

#[test]
fn unregistered_plugin_fails_dependency_change() {
    let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
    let b = env.resolver("org.b");
    env.registry.remove(&env.id("org.b"));

    assert!(b.on_dependency_set_changed().is_err());
}

#[test]
fn dispose_detaches_the_resolver() {
    let env = TestRuntime::new(graph_from_toml(ABC_GRAPH));
    let a = env.resolver("org.a");
    assert_eq!(env.runtime.loaded_plugins(), vec![env.id("org.a")]);

    env.runtime.on_dispose(&env.id("org.a"));

    assert!(env.runtime.loaded_plugins().is_empty());
    assert!(a.accessible_imports().is_empty());
    // A fresh resolver is built on demand.
    assert_eq!(env.resolver("org.a").accessible_imports().len(), 2);
}
