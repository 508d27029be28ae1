//! Name and namespace helpers shared by filters and resolvers.

/// Namespace separator for class-style names.
pub const SEPARATOR: char = '.';

/// The namespace of a dotted name, or `None` if it has no qualifier.
///
/// `"com.acme.Widget"` → `Some("com.acme")`.
#[must_use]
pub fn parent_namespace(name: &str) -> Option<&str> {
    name.rsplit_once(SEPARATOR).map(|(ns, _)| ns)
}

/// Namespaces strictly above the namespace of `name`, nearest first.
///
/// `"a.b.c.D"` yields `"a.b"` then `"a"`.
pub fn ancestor_namespaces(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_namespace(name), |ns| parent_namespace(*ns)).skip(1)
}

/// Translate a resource path into the dotted grammar used by filters.
///
/// Both `/` and `\` become `.`, then one leading and one trailing `.` are
/// stripped: `"/a/b/c.txt"` → `"a.b.c.txt"`.
#[must_use]
pub fn resource_to_dotted(path: &str) -> String {
    let dotted = path.replace(['\\', '/'], ".");
    let trimmed = dotted.strip_prefix(SEPARATOR).unwrap_or(&dotted);
    let trimmed = trimmed.strip_suffix(SEPARATOR).unwrap_or(trimmed);
    trimmed.to_string()
}

/// Entry path of a class inside a code library: `a.b.C` → `a/b/C{suffix}`.
#[must_use]
pub fn class_entry_path(name: &str, suffix: &str) -> String {
    format!("{}{suffix}", name.replace(SEPARATOR, "/"))
}
