//! Plugin descriptor types.
//!
//! Descriptors are owned by the host's registry; the resolver only reads
//! them. They derive `Deserialize` so hosts and test fixtures can describe
//! a plugin graph in TOML.

use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// Unique, stable plugin identifier.
///
/// Plugin IDs are dotted strings like `"org.sample.core"`. They must be
/// non-empty, contain only ASCII alphanumerics, `.`, `-` and `_`, and must
/// not start or end with a separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PluginId(String);

impl<'de> Deserialize<'de> for PluginId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl PluginId {
    /// Create a new `PluginId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidId`] if the ID is empty or malformed.
    pub fn new(id: impl Into<String>) -> ResolveResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a `PluginId` without validation (for tests and internal use).
    #[must_use]
    pub fn from_static(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> ResolveResult<()> {
        if id.is_empty() {
            return Err(ResolveError::InvalidId("plugin id must not be empty".into()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(ResolveError::InvalidId(format!(
                "plugin id must contain only alphanumerics, '.', '-' and '_', got: {id}"
            )));
        }
        let is_separator = |c: char| matches!(c, '.' | '-' | '_');
        if id.starts_with(is_separator) || id.ends_with(is_separator) {
            return Err(ResolveError::InvalidId(format!(
                "plugin id must not start or end with a separator, got: {id}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What a library contributes to its plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// Code artifacts (classes), searched by the resolver.
    #[default]
    Code,
    /// Resources and native libraries only.
    Resources,
}

/// A library declared by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Library id, unique within its plugin.
    pub id: String,
    /// Library-relative path, resolved through the host's `PathResolver`.
    pub path: String,
    /// Code or resource library.
    #[serde(default)]
    pub kind: LibraryKind,
    /// Export rules: `"*"`, an exact dotted name, or a `prefix.*` wildcard.
    #[serde(default)]
    pub exports: Vec<String>,
}

impl Library {
    /// A code library with no exports.
    #[must_use]
    pub fn code(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            kind: LibraryKind::Code,
            exports: Vec::new(),
        }
    }

    /// A resource library with no exports.
    #[must_use]
    pub fn resources(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            kind: LibraryKind::Resources,
            exports: Vec::new(),
        }
    }

    /// Add an export rule.
    #[must_use]
    pub fn with_export(mut self, rule: impl Into<String>) -> Self {
        self.exports.push(rule.into());
        self
    }

    /// Whether this is a code library.
    #[must_use]
    pub fn is_code(&self) -> bool {
        self.kind == LibraryKind::Code
    }
}

/// A dependency of one plugin on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    /// Target plugin.
    pub plugin_id: PluginId,
    /// Whether importers of the owning plugin also see the target.
    #[serde(default)]
    pub exported: bool,
    /// Whether a missing target is tolerated.
    #[serde(default)]
    pub optional: bool,
    /// Accepted target versions; `None` accepts any.
    #[serde(default)]
    pub version: Option<VersionReq>,
}

impl Prerequisite {
    /// A private, mandatory dependency on any version of `plugin_id`.
    #[must_use]
    pub fn new(plugin_id: PluginId) -> Self {
        Self {
            plugin_id,
            exported: false,
            optional: false,
            version: None,
        }
    }

    /// Re-export the target to importers of the owning plugin.
    #[must_use]
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    /// Mark the dependency optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Restrict accepted target versions.
    #[must_use]
    pub fn with_version(mut self, req: VersionReq) -> Self {
        self.version = Some(req);
        self
    }
}

/// Everything the resolver needs to know about one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin identity.
    pub id: PluginId,
    /// Plugin version.
    pub version: Version,
    /// Declared libraries, in declaration order.
    #[serde(default, rename = "library")]
    pub libraries: Vec<Library>,
    /// Declared dependencies.
    #[serde(default, rename = "requires")]
    pub prerequisites: Vec<Prerequisite>,
}

impl PluginDescriptor {
    /// A descriptor with no libraries and no dependencies.
    #[must_use]
    pub fn new(id: PluginId, version: Version) -> Self {
        Self {
            id,
            version,
            libraries: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    /// Add a library.
    #[must_use]
    pub fn with_library(mut self, library: Library) -> Self {
        self.libraries.push(library);
        self
    }

    /// Add a dependency.
    #[must_use]
    pub fn with_prerequisite(mut self, prerequisite: Prerequisite) -> Self {
        self.prerequisites.push(prerequisite);
        self
    }

    /// Identity qualified by version: `{id}@{version}`.
    ///
    /// Used to name per-plugin folders in the native library cache.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    /// Code libraries, in declaration order.
    pub fn code_libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries.iter().filter(|lib| lib.is_code())
    }

    /// Resource libraries, in declaration order.
    pub fn resource_libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries.iter().filter(|lib| !lib.is_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        assert!(PluginId::new("org.sample.core").is_ok());
        assert!(PluginId::new("my-plugin_2").is_ok());
    }

    #[test]
    fn invalid_ids() {
        assert!(PluginId::new("").is_err());
        assert!(PluginId::new(".leading").is_err());
        assert!(PluginId::new("trailing-").is_err());
        assert!(PluginId::new("has space").is_err());
        assert!(PluginId::new("../etc").is_err());
    }

    #[test]
    fn unique_id_includes_version() {
        let d = PluginDescriptor::new(
            PluginId::from_static("org.sample.core"),
            Version::new(1, 2, 3),
        );
        assert_eq!(d.unique_id(), "org.sample.core@1.2.3");
    }

    #[test]
    fn library_partitions() {
        let d = PluginDescriptor::new(PluginId::from_static("p"), Version::new(1, 0, 0))
            .with_library(Library::code("classes", "classes/"))
            .with_library(Library::resources("native", "native/"))
            .with_library(Library::code("extra", "extra.jar"));

        let code: Vec<_> = d.code_libraries().map(|l| l.id.as_str()).collect();
        let res: Vec<_> = d.resource_libraries().map(|l| l.id.as_str()).collect();
        assert_eq!(code, vec!["classes", "extra"]);
        assert_eq!(res, vec!["native"]);
    }

    #[test]
    fn descriptor_from_toml() {
        let d: PluginDescriptor = toml::from_str(
            r#"
id = "org.sample.a"
version = "1.0.0"

[[library]]
id = "classes"
path = "classes/"
exports = ["com.a.*"]

[[library]]
id = "native"
path = "native/"
kind = "resources"

[[requires]]
plugin_id = "org.sample.b"
exported = true
version = "^2"
"#,
        )
        .unwrap();

        assert_eq!(d.libraries.len(), 2);
        assert!(d.libraries[0].is_code());
        assert!(!d.libraries[1].is_code());
        assert!(d.prerequisites[0].exported);
        assert!(!d.prerequisites[0].optional);
        assert!(
            d.prerequisites[0]
                .version
                .as_ref()
                .unwrap()
                .matches(&Version::new(2, 1, 0))
        );
    }

    #[test]
    fn descriptor_rejects_bad_id() {
        let res: Result<PluginDescriptor, _> = toml::from_str(
            r#"
id = "../escape"
version = "1.0.0"
"#,
        );
        assert!(res.is_err());
    }
}
