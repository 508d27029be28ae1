//! Default library reader and stream opener.

use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::collaborators::{LibraryReader, SourceOpener};
use crate::location::Location;

/// Lexically resolve `entry` under `base`, refusing anything that would
/// escape it (`..` above the base, absolute paths, prefixes).
fn entry_path(base: &Path, entry: &str) -> Option<PathBuf> {
    let mut resolved = base.to_path_buf();
    for component in Path::new(entry.trim_start_matches('/')).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::CurDir => {},
            Component::ParentDir => {
                if resolved == base {
                    return None;
                }
                resolved.pop();
            },
            Component::Normal(p) => resolved.push(p),
        }
    }
    Some(resolved)
}

/// Reads entries from libraries that are local directories (`file:` URLs).
///
/// Archive libraries and remote code locations are left to host-provided
/// readers; for them this reader reports every entry as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLibraryReader;

impl FsLibraryReader {
    fn local_entry(library: &Location, entry: &str) -> Option<PathBuf> {
        let base = library.as_local_file()?;
        if !base.is_dir() {
            return None;
        }
        entry_path(&base, entry)
    }
}

impl LibraryReader for FsLibraryReader {
    fn read_entry(&self, library: &Location, entry: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(path) = Self::local_entry(library, entry) else {
            return Ok(None);
        };
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_entry(&self, library: &Location, entry: &str) -> Option<Location> {
        let path = Self::local_entry(library, entry)?;
        if path.is_file() {
            Location::from_file(&path)
        } else {
            None
        }
    }
}

/// Opens `file:` locations directly and, with the `http` feature,
/// `http`/`https` locations through a blocking HTTP client.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOpener;

impl SourceOpener for DefaultOpener {
    fn open(&self, location: &Location) -> io::Result<Box<dyn Read + Send>> {
        if let Some(path) = location.as_local_file() {
            return Ok(Box::new(std::fs::File::open(path)?));
        }
        match location.url().scheme() {
            #[cfg(feature = "http")]
            "http" | "https" => open_http(location),
            scheme => {
                debug!(location = %location, scheme, "no stream handler for scheme");
                Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported location scheme: {scheme}"),
                ))
            },
        }
    }
}

#[cfg(feature = "http")]
fn open_http(location: &Location) -> io::Result<Box<dyn Read + Send>> {
    let response = reqwest::blocking::get(location.url().clone())
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(io::Error::other)?;
    Ok(Box::new(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_entries_from_directory_library() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("com/acme")).unwrap();
        std::fs::write(dir.path().join("com/acme/Widget.class"), b"widget").unwrap();

        let lib = Location::from_dir(dir.path()).unwrap();
        let reader = FsLibraryReader;
        assert_eq!(
            reader.read_entry(&lib, "com/acme/Widget.class").unwrap(),
            Some(b"widget".to_vec())
        );
        assert_eq!(reader.read_entry(&lib, "com/acme/Missing.class").unwrap(), None);
        assert!(reader.find_entry(&lib, "com/acme/Widget.class").is_some());
        assert!(reader.find_entry(&lib, "com/acme").is_none());
    }

    #[test]
    fn traversal_outside_library_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("lib");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();

        let lib = Location::from_dir(&inner).unwrap();
        assert_eq!(FsLibraryReader.read_entry(&lib, "../secret.txt").unwrap(), None);
        assert!(FsLibraryReader.find_entry(&lib, "../secret.txt").is_none());
    }

    #[test]
    fn opens_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("libfoo.so");
        std::fs::write(&file, b"elf").unwrap();

        let mut buf = Vec::new();
        DefaultOpener
            .open(&Location::from_file(&file).unwrap())
            .unwrap()
            .read_to_end(&mut buf)
            .unwrap();
        assert_eq!(buf, b"elf");
    }

    #[test]
    fn unknown_scheme_is_unsupported() {
        let loc = Location::parse("jar:file:/plugins/a.jar!/libfoo.so").unwrap();
        let err = DefaultOpener.open(&loc).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
