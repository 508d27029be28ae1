//! Per-plugin native library lookup and copy cache.
//!
//! Native libraries declared in a plugin's non-code libraries are returned
//! as-is when they resolve to local files. Anything else is streamed into
//! `{cache_root}/{plugin unique id}/{platform file name}` once and reused.
//! A failed copy leaves a tombstone so the same source is not retried.

use std::collections::HashMap;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error};

use crate::collaborators::{PathResolver, SourceOpener};
use crate::descriptor::PluginDescriptor;
use crate::error::{ResolveError, ResolveResult};
use crate::location::Location;

/// Host file name of native library `name`: `libfoo.so`, `libfoo.dylib`
/// or `foo.dll`.
#[must_use]
pub fn platform_library_name(name: &str) -> String {
    format!(
        "{}{name}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedFile {
    Copied(PathBuf),
    Tombstone,
}

/// What a native lookup needs from its runtime.
pub(crate) struct NativeContext<'a> {
    pub(crate) paths: &'a dyn PathResolver,
    pub(crate) opener: &'a dyn SourceOpener,
    pub(crate) cache_root: &'a dyn Fn() -> Option<PathBuf>,
}

/// Source URL to local copy map of one plugin.
#[derive(Debug, Default)]
pub(crate) struct NativeLibraryCache {
    entries: Mutex<HashMap<String, CachedFile>>,
}

impl NativeLibraryCache {
    /// Find native library `name` for `plugin`, copying it locally if
    /// needed.
    pub(crate) fn locate(
        &self,
        ctx: &NativeContext<'_>,
        plugin: &PluginDescriptor,
        name: &str,
    ) -> Option<PathBuf> {
        if name.trim().is_empty() {
            return None;
        }
        let libname = platform_library_name(name);
        // One critical section per lookup keeps concurrent callers from
        // copying the same source twice.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut result = None;
        for lib in plugin.resource_libraries() {
            let relative = format!("{}{libname}", lib.path);
            let Some(location) = ctx.paths.resolve(plugin, lib, &relative) else {
                continue;
            };
            debug!(plugin_id = %plugin.id, location = %location, "trying native library location");
            if let Some(file) = location.as_local_file() {
                if file.is_file() {
                    result = Some(file);
                    break;
                }
                continue;
            }

            let key = location.as_str().to_owned();
            match entries.get(&key) {
                Some(CachedFile::Copied(file)) if file.is_file() => {
                    result = Some(file.clone());
                    break;
                },
                Some(CachedFile::Copied(_)) => {
                    entries.remove(&key);
                },
                // Already tried and failed.
                Some(CachedFile::Tombstone) => break,
                None => {},
            }

            let copied = match (ctx.cache_root)() {
                Some(root) => copy_library(ctx.opener, &root, plugin, &location, &libname),
                None => Err(ResolveError::CacheIo {
                    library: libname.clone(),
                    source_url: key.clone(),
                    source: io::Error::other("libraries cache folder is not available"),
                }),
            };
            match copied {
                Ok(file) => {
                    entries.insert(key, CachedFile::Copied(file.clone()));
                    result = Some(file);
                    break;
                },
                Err(e) => {
                    error!(plugin_id = %plugin.id, error = %e, "can't cache native library");
                    entries.insert(key, CachedFile::Tombstone);
                },
            }
        }
        debug!(plugin_id = %plugin.id, name, libname = %libname, result = ?result, "native library lookup");
        result
    }

    /// Drop tombstones and entries whose copy no longer exists.
    pub(crate) fn prune(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, cached| matches!(cached, CachedFile::Copied(file) if file.is_file()));
    }

    /// Delete every copied file and forget all entries.
    pub(crate) fn dispose(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (source, cached) in entries.drain() {
            let CachedFile::Copied(file) = cached else {
                continue;
            };
            if let Err(e) = std::fs::remove_file(&file) {
                debug!(source = %source, file = %file.display(), error = %e, "can't delete cached native library");
            }
            if let Some(folder) = file.parent() {
                // Only succeeds once the plugin folder is empty.
                let _ = std::fs::remove_dir(folder);
            }
        }
    }

    /// Number of live copies and tombstones.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn copy_library(
    opener: &dyn SourceOpener,
    root: &Path,
    plugin: &PluginDescriptor,
    source: &Location,
    libname: &str,
) -> ResolveResult<PathBuf> {
    let cache_err = |e: io::Error| ResolveError::CacheIo {
        library: libname.to_owned(),
        source_url: source.to_string(),
        source: e,
    };
    let folder = root.join(plugin.unique_id());
    std::fs::create_dir_all(&folder).map_err(cache_err)?;
    let target = folder.join(libname);

    let copy = || -> io::Result<()> {
        let mut input = opener.open(source)?;
        let mut out = BufWriter::new(std::fs::File::create(&target)?);
        io::copy(&mut input, &mut out)?;
        out.flush()
    };
    if let Err(e) = copy() {
        let _ = std::fs::remove_file(&target);
        return Err(cache_err(e));
    }
    debug!(
        plugin_id = %plugin.id,
        library = libname,
        source = %source,
        file = %target.display(),
        "native library cached"
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use semver::Version;

    use super::*;
    use crate::descriptor::{Library, PluginId};

    struct Remote(String);

    impl PathResolver for Remote {
        fn resolve(&self, _: &PluginDescriptor, _: &Library, rel: &str) -> Option<Location> {
            Location::parse(&format!("{}{rel}", self.0)).ok()
        }
    }

    #[derive(Default)]
    struct Opener {
        opens: AtomicUsize,
        fail: bool,
    }

    impl SourceOpener for Opener {
        fn open(&self, _: &Location) -> io::Result<Box<dyn Read + Send>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(io::Error::other("unreachable host"));
            }
            Ok(Box::new(io::Cursor::new(b"native".to_vec())))
        }
    }

    fn plugin() -> PluginDescriptor {
        PluginDescriptor::new(PluginId::from_static("org.sample.a"), Version::new(1, 2, 0))
            .with_library(Library::resources("native", "native/"))
    }

    fn run(cache: &NativeLibraryCache, opener: &Opener, root: Option<PathBuf>) -> Option<PathBuf> {
        let paths = Remote("https://repo.example.com/".into());
        let root_fn = move || root.clone();
        let ctx = NativeContext {
            paths: &paths,
            opener,
            cache_root: &root_fn,
        };
        cache.locate(&ctx, &plugin(), "foo")
    }

    #[test]
    fn platform_names() {
        let name = platform_library_name("foo");
        if cfg!(target_os = "windows") {
            assert_eq!(name, "foo.dll");
        } else if cfg!(target_os = "macos") {
            assert_eq!(name, "libfoo.dylib");
        } else {
            assert_eq!(name, "libfoo.so");
        }
    }

    #[test]
    fn remote_library_is_copied_once() {
        let root = tempfile::tempdir().unwrap();
        let cache = NativeLibraryCache::default();
        let opener = Opener::default();

        let first = run(&cache, &opener, Some(root.path().to_path_buf())).unwrap();
        let second = run(&cache, &opener, Some(root.path().to_path_buf())).unwrap();
        assert_eq!(first, second);
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);
        assert_eq!(
            first,
            root.path().join("org.sample.a@1.2.0").join(platform_library_name("foo"))
        );
        assert_eq!(std::fs::read(&first).unwrap(), b"native");
    }

    #[test]
    fn failed_copy_is_not_retried() {
        let root = tempfile::tempdir().unwrap();
        let cache = NativeLibraryCache::default();
        let opener = Opener {
            fail: true,
            ..Opener::default()
        };
        assert!(run(&cache, &opener, Some(root.path().to_path_buf())).is_none());
        assert!(run(&cache, &opener, Some(root.path().to_path_buf())).is_none());
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);

        cache.prune();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn vanished_copy_is_recopied() {
        let root = tempfile::tempdir().unwrap();
        let cache = NativeLibraryCache::default();
        let opener = Opener::default();
        let file = run(&cache, &opener, Some(root.path().to_path_buf())).unwrap();
        std::fs::remove_file(&file).unwrap();
        assert_eq!(run(&cache, &opener, Some(root.path().to_path_buf())), Some(file));
        assert_eq!(opener.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_root_leaves_tombstone() {
        let cache = NativeLibraryCache::default();
        let opener = Opener::default();
        assert!(run(&cache, &opener, None).is_none());
        assert_eq!(opener.opens.load(Ordering::SeqCst), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn local_files_are_returned_directly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("native")).unwrap();
        let lib = dir.path().join("native").join(platform_library_name("foo"));
        std::fs::write(&lib, b"elf").unwrap();

        let base = Location::from_dir(dir.path()).unwrap();
        let paths = Remote(base.to_string());
        let opener = Opener::default();
        let no_root = || None;
        let ctx = NativeContext {
            paths: &paths,
            opener: &opener,
            cache_root: &no_root,
        };
        let cache = NativeLibraryCache::default();
        assert_eq!(cache.locate(&ctx, &plugin(), "foo"), Some(lib));
        assert!(cache.locate(&ctx, &plugin(), "bar").is_none());
        assert!(cache.locate(&ctx, &plugin(), "  ").is_none());
        assert_eq!(opener.opens.load(Ordering::SeqCst), 0);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn dispose_deletes_copies() {
        let root = tempfile::tempdir().unwrap();
        let cache = NativeLibraryCache::default();
        let opener = Opener::default();
        let file = run(&cache, &opener, Some(root.path().to_path_buf())).unwrap();
        cache.dispose();
        assert!(!file.exists());
        assert_eq!(cache.len(), 0);
    }
}
