//! Per-library export filters.
//!
//! A library's `exports` compile into a [`VisibilityFilter`] that decides
//! which concrete class and resource names other plugins may resolve from
//! it. Classes and resources share one grammar: resource paths are turned
//! into dotted names before matching.

use std::collections::HashSet;

use crate::descriptor::Library;
use crate::namespace::{SEPARATOR, parent_namespace, resource_to_dotted};

/// Export rule that makes every name visible.
pub const PUBLIC_EXPORT: &str = "*";

/// Compiled export rules of one library. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityFilter {
    is_public: bool,
    entries: HashSet<String>,
}

impl VisibilityFilter {
    /// Compile the export rules of `library`.
    ///
    /// A `"*"` rule makes the filter public and discards every other entry.
    /// Rules of resource libraries are written as paths, so they are
    /// normalised to the dotted grammar first.
    #[must_use]
    pub fn new(library: &Library) -> Self {
        let mut entries = HashSet::new();
        for rule in &library.exports {
            if rule == PUBLIC_EXPORT {
                return Self {
                    is_public: true,
                    entries: HashSet::new(),
                };
            }
            if library.is_code() {
                entries.insert(rule.clone());
            } else {
                let dotted = rule.replace(['\\', '/'], ".");
                let dotted = dotted.strip_prefix(SEPARATOR).unwrap_or(&dotted);
                entries.insert(dotted.to_string());
            }
        }
        Self {
            is_public: false,
            entries,
        }
    }

    /// Whether the filter lets every name through.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Number of concrete rules (always zero for a public filter).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no concrete rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `full_name` is exported, exactly or through `namespace.*`.
    #[must_use]
    pub fn is_class_visible(&self, full_name: &str) -> bool {
        if self.is_public {
            return true;
        }
        if self.entries.is_empty() {
            return false;
        }
        if self.entries.contains(full_name) {
            return true;
        }
        parent_namespace(full_name)
            .is_some_and(|ns| self.entries.contains(&format!("{ns}{SEPARATOR}*")))
    }

    /// Whether the resource at `path` is exported.
    #[must_use]
    pub fn is_resource_visible(&self, path: &str) -> bool {
        if self.is_public {
            return true;
        }
        if self.entries.is_empty() {
            return false;
        }
        self.is_class_visible(&resource_to_dotted(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_lib(exports: &[&str]) -> Library {
        exports
            .iter()
            .fold(Library::code("classes", "classes/"), |lib, e| lib.with_export(*e))
    }

    #[test]
    fn star_is_public_and_clears_entries() {
        let filter = VisibilityFilter::new(&code_lib(&["com.a.Widget", "*", "com.b.*"]));
        assert!(filter.is_public());
        assert!(filter.is_empty());
        assert!(filter.is_class_visible("totally.unrelated.Name"));
        assert!(filter.is_resource_visible("x/y/z.png"));
        assert!(filter.is_class_visible("NoNamespace"));
    }

    #[test]
    fn no_exports_hides_everything() {
        let filter = VisibilityFilter::new(&code_lib(&[]));
        assert!(!filter.is_class_visible("com.a.Widget"));
        assert!(!filter.is_resource_visible("com/a/Widget.class"));
    }

    #[test]
    fn exact_entry() {
        let filter = VisibilityFilter::new(&code_lib(&["com.c.Widget"]));
        assert!(filter.is_class_visible("com.c.Widget"));
        assert!(!filter.is_class_visible("com.c.Helper"));
    }

    #[test]
    fn wildcard_matches_direct_children_only() {
        let filter = VisibilityFilter::new(&code_lib(&["com.c.*"]));
        assert!(filter.is_class_visible("com.c.Helper"));
        assert!(!filter.is_class_visible("com.c.impl.Helper"));
        assert!(!filter.is_class_visible("com.cx.Helper"));
        assert!(!filter.is_class_visible("Helper"));
    }

    #[test]
    fn resource_and_class_names_are_equivalent() {
        let filter = VisibilityFilter::new(&code_lib(&["a.b.*"]));
        for (path, dotted) in [
            ("a/b/c.txt", "a.b.c.txt"),
            ("a/b/c", "a.b.c"),
            ("a/b/c/d", "a.b.c.d"),
        ] {
            assert_eq!(
                filter.is_resource_visible(path),
                filter.is_class_visible(dotted),
                "{path} vs {dotted}"
            );
        }
        assert!(filter.is_resource_visible("a/b/c"));
        assert!(filter.is_resource_visible("/a/b/c/"));
        assert!(filter.is_resource_visible("a\\b\\c"));
        assert!(!filter.is_resource_visible("a/b/c/d"));
    }

    #[test]
    fn file_extension_counts_as_a_segment() {
        let filter = VisibilityFilter::new(&code_lib(&["a.b.*"]));
        assert!(!filter.is_resource_visible("a/b/c.txt"));

        let filter = VisibilityFilter::new(&code_lib(&["a.b.c.txt"]));
        assert!(filter.is_resource_visible("a/b/c.txt"));
    }

    #[test]
    fn resource_library_rules_are_normalised() {
        let lib = Library::resources("res", "res/").with_export("/a/b/*");
        let filter = VisibilityFilter::new(&lib);
        assert!(filter.is_resource_visible("a/b/icon"));
        assert!(filter.is_class_visible("a.b.icon"));
        assert!(!filter.is_resource_visible("a/icon"));
    }
}
