//! Concrete locations of libraries and artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Where a library, artifact or resource lives.
///
/// `file:` locations are local files or directories; every other scheme is
/// a remote source that must be streamed (see [`SourceOpener`](crate::SourceOpener)).
/// The URL string doubles as the key for visibility filters and for the
/// native library cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(Url);

impl Location {
    /// Wrap a URL.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    /// Parse a URL string.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `s` is not an absolute URL.
    pub fn parse(s: &str) -> Result<Self, url::ParseError> {
        Url::parse(s).map(Self)
    }

    /// Location of a local file. `None` if `path` is not absolute.
    #[must_use]
    pub fn from_file(path: &Path) -> Option<Self> {
        Url::from_file_path(path).ok().map(Self)
    }

    /// Location of a local directory (with a trailing slash, so entries can
    /// be joined onto it). `None` if `path` is not absolute.
    #[must_use]
    pub fn from_dir(path: &Path) -> Option<Self> {
        Url::from_directory_path(path).ok().map(Self)
    }

    /// The local file this location refers to, if it is a `file:` URL.
    #[must_use]
    pub fn as_local_file(&self) -> Option<PathBuf> {
        if self.0.scheme() == "file" {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }

    /// Resolve `entry` relative to this location.
    #[must_use]
    pub fn join(&self, entry: &str) -> Option<Self> {
        self.0.join(entry).ok().map(Self)
    }

    /// The underlying URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// External form, used as a map key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Self(url)
    }
}
