//! Resolved artifacts and resources.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::PluginId;
use crate::location::Location;

/// A resolved code artifact: a byte stream identified by a name.
///
/// Artifacts defined from a plugin's code library carry the owning plugin
/// and the base location of that library; visibility filtering keys on the
/// latter. Artifacts without an origin library come from the host platform
/// and are always visible.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    name: String,
    owner: Option<PluginId>,
    library: Option<Location>,
    bytes: Arc<[u8]>,
}

impl Artifact {
    /// A platform artifact with no owning plugin or library.
    #[must_use]
    pub fn platform(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            library: None,
            bytes: bytes.into(),
        }
    }

    /// An artifact defined by `owner` from the library at `library`.
    #[must_use]
    pub fn defined(
        name: impl Into<String>,
        owner: PluginId,
        library: Location,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: Some(owner),
            library: Some(library),
            bytes: bytes.into(),
        }
    }

    /// An artifact produced at runtime for `owner` (no origin library).
    #[must_use]
    pub fn generated(
        name: impl Into<String>,
        owner: PluginId,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: Some(owner),
            library: None,
            bytes: bytes.into(),
        }
    }

    /// Fully qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin that defined the artifact.
    #[must_use]
    pub fn owner(&self) -> Option<&PluginId> {
        self.owner.as_ref()
    }

    /// Base location of the library the artifact came from.
    #[must_use]
    pub fn library(&self) -> Option<&Location> {
        self.library.as_ref()
    }

    /// Artifact contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("library", &self.library.as_ref().map(Location::as_str))
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A resource found in a plugin library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Resource path as requested.
    pub name: String,
    /// Full location of the resource.
    pub location: Location,
    /// Base location of the library containing it.
    pub library: Location,
    /// Plugin owning the library.
    pub owner: PluginId,
}
