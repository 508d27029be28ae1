//! Resource lookup across the A → B → C plugin graph.

use std::collections::HashSet;

use plexus_test::{
    ABC_GRAPH, TestRuntime, graph_from_toml, setup_test_logging, test_plugin_with_classes,
    test_prerequisite,
};

fn abc() -> TestRuntime {
    setup_test_logging("debug");
    TestRuntime::new(graph_from_toml(ABC_GRAPH))
}

#[test]
fn finds_exported_resource_of_transitive_import() {
    let env = abc();
    env.add_resource("org.c", "native/", "icons/logo.png", b"png");

    let found = env.resolver("org.a").find_one("icons/logo.png").unwrap();

    assert_eq!(found.owner, env.id("org.c"));
    assert_eq!(found.library, env.library("org.c", "native/"));
    assert_eq!(
        found.location.as_str(),
        "https://plugins.test/org.c/native/icons/logo.png"
    );
}

#[test]
fn own_resources_come_first() {
    let env = abc();
    env.add_resource("org.a", "classes/", "config.properties", b"a");
    env.add_resource("org.c", "native/", "config.properties", b"c");

    let found = env.resolver("org.a").find_one("config.properties").unwrap();
    assert_eq!(found.owner, env.id("org.a"));
}

#[test]
fn filtered_resource_is_skipped() {
    let env = abc();
    env.add_resource("org.c", "classes/", "com/c/impl/secret.txt", b"secret");

    assert!(env.resolver("org.a").find_one("com/c/impl/secret.txt").is_none());
    assert!(env.resolver("org.c").find_one("com/c/impl/secret.txt").is_some());
}

#[test]
fn exported_namespace_covers_resources() {
    let env = abc();
    // Paths are matched in dotted form, so an extension becomes part of
    // the namespace.
    env.add_resource("org.c", "classes/", "com/c/api/messages", b"hello");
    env.add_resource("org.c", "classes/", "com/c/api/messages.txt", b"hello");

    let a = env.resolver("org.a");
    assert!(a.find_one("com/c/api/messages").is_some());
    assert!(a.find_one("com/c/api/messages.txt").is_none());
}

#[test]
fn first_local_hit_decides_even_when_hidden() {
    let env = abc();
    // Hidden in the code library, public in the resource library.
    env.add_resource("org.c", "classes/", "shared/data.bin", b"hidden");
    env.add_resource("org.c", "native/", "shared/data.bin", b"public");

    let a = env.resolver("org.a");
    assert!(a.find_one("shared/data.bin").is_none());

    let all = a.find_all("shared/data.bin");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].library, env.library("org.c", "native/"));
}

#[test]
fn find_all_collects_from_every_plugin_once() {
    let env = abc();
    env.add_resource("org.a", "classes/", "plugin.xml", b"a");
    env.add_resource("org.b", "classes/", "plugin.xml", b"b");
    env.add_resource("org.c", "native/", "plugin.xml", b"c");

    let all = env.resolver("org.a").find_all("plugin.xml");

    assert_eq!(all.len(), 3);
    assert_eq!(all[0].owner, env.id("org.a"));
    let owners: HashSet<_> = all.iter().map(|r| r.owner.as_str().to_owned()).collect();
    assert_eq!(
        owners,
        ["org.a", "org.b", "org.c"].into_iter().map(str::to_owned).collect()
    );
}

#[test]
fn resources_ignore_activation() {
    let env = abc();
    env.add_resource("org.c", "native/", "icons/logo.png", b"png");
    env.activation.deactivate(&env.id("org.c"));

    assert!(env.resolver("org.a").find_one("icons/logo.png").is_some());
}

#[test]
fn private_imports_of_imports_are_not_searched() {
    setup_test_logging("debug");
    // org.a privately imports org.b, which privately imports org.d.
    let env = TestRuntime::new([
        test_plugin_with_classes("org.a", &["*"]).with_prerequisite(test_prerequisite("org.b", false)),
        test_plugin_with_classes("org.b", &["*"]).with_prerequisite(test_prerequisite("org.d", false)),
        test_plugin_with_classes("org.d", &["*"]),
    ]);
    env.add_resource("org.d", "classes/", "secret/d.txt", b"d");

    let a = env.resolver("org.a");
    assert_eq!(a.accessible_imports().plugins(), &HashSet::from([env.id("org.b")]));
    assert!(a.find_one("secret/d.txt").is_none());
    assert!(a.find_all("secret/d.txt").is_empty());

    // The direct importer still sees it.
    let found = env.resolver("org.b").find_one("secret/d.txt").unwrap();
    assert_eq!(found.owner, env.id("org.d"));
    assert_eq!(env.resolver("org.b").find_all("secret/d.txt").len(), 1);
}

#[test]
fn reexported_imports_of_imports_are_searched() {
    let env = abc();
    env.add_resource("org.c", "native/", "icons/logo.png", b"png");

    assert!(env.resolver("org.b").find_one("icons/logo.png").is_some());
    assert!(env.resolver("org.c").find_one("missing.txt").is_none());
}
