//! Test fixtures for descriptors and plugin graphs.

use plexus_resolver::{Library, PluginDescriptor, PluginId, Prerequisite};
use semver::Version;
use serde::Deserialize;

/// Create a plugin ID without validation.
#[must_use]
pub fn test_plugin_id(id: &str) -> PluginId {
    PluginId::from_static(id)
}

/// A `1.0.0` descriptor with no libraries or prerequisites.
#[must_use]
pub fn test_plugin(id: &str) -> PluginDescriptor {
    PluginDescriptor::new(test_plugin_id(id), Version::new(1, 0, 0))
}

/// A descriptor with one code library at `classes/` exporting `exports`.
#[must_use]
pub fn test_plugin_with_classes(id: &str, exports: &[&str]) -> PluginDescriptor {
    let library = exports
        .iter()
        .fold(Library::code("classes", "classes/"), |lib, rule| {
            lib.with_export(*rule)
        });
    test_plugin(id).with_library(library)
}

/// A prerequisite on `id`, re-exported when `exported` is set.
#[must_use]
pub fn test_prerequisite(id: &str, exported: bool) -> Prerequisite {
    let prerequisite = Prerequisite::new(test_plugin_id(id));
    if exported {
        prerequisite.exported()
    } else {
        prerequisite
    }
}

#[derive(Deserialize)]
struct GraphFile {
    #[serde(default, rename = "plugin")]
    plugins: Vec<PluginDescriptor>,
}

/// Parse a plugin graph written as `[[plugin]]` tables.
///
/// ```toml
/// [[plugin]]
/// id = "org.a"
/// version = "1.0.0"
///
/// [[plugin.library]]
/// id = "classes"
/// path = "classes/"
/// exports = ["*"]
///
/// [[plugin.requires]]
/// plugin_id = "org.b"
/// exported = true
/// ```
///
/// # Panics
///
/// Panics if the graph is not valid TOML or a descriptor is malformed.
#[must_use]
#[allow(clippy::expect_used)]
pub fn graph_from_toml(graph: &str) -> Vec<PluginDescriptor> {
    toml::from_str::<GraphFile>(graph)
        .expect("test graph must be valid")
        .plugins
}

/// The three-plugin graph used across resolver tests.
///
/// `org.a` privately imports `org.b`, which re-exports `org.c`. `org.c`
/// exports only `com.c.api.*` from its classes.
pub const ABC_GRAPH: &str = r#"
[[plugin]]
id = "org.a"
version = "1.0.0"

[[plugin.library]]
id = "classes"
path = "classes/"
exports = ["*"]

[[plugin.requires]]
plugin_id = "org.b"

[[plugin]]
id = "org.b"
version = "1.0.0"

[[plugin.library]]
id = "classes"
path = "classes/"
exports = ["*"]

[[plugin.requires]]
plugin_id = "org.c"
exported = true

[[plugin]]
id = "org.c"
version = "1.0.0"

[[plugin.library]]
id = "classes"
path = "classes/"
exports = ["com.c.api.*"]

[[plugin.library]]
id = "native"
path = "native/"
kind = "resources"
exports = ["*"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abc_graph_parses() {
        let graph = graph_from_toml(ABC_GRAPH);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph[0].id.as_str(), "org.a");
        assert!(!graph[0].prerequisites[0].exported);
        assert!(graph[1].prerequisites[0].exported);
        assert_eq!(graph[2].resource_libraries().count(), 1);
    }

    #[test]
    fn builders() {
        let plugin = test_plugin_with_classes("org.x", &["com.x.*"])
            .with_prerequisite(test_prerequisite("org.y", true));
        assert_eq!(plugin.libraries[0].exports, vec!["com.x.*"]);
        assert!(plugin.prerequisites[0].exported);
    }
}
