//! The runtime-wide native library cache folder.
//!
//! The folder is created on first use and guarded by a sentinel lock file.
//! A second process that finds the sentinel already present treats the
//! folder as foreign and disables native caching for good.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fs2::FileExt;
use tracing::{debug, error};

use crate::error::{ResolveError, ResolveResult};
use crate::settings::NativeCacheSettings;

/// An owned cache folder. Removed, lock file included, on drop.
#[derive(Debug)]
pub(crate) struct CacheRoot {
    dir: PathBuf,
    lock_path: PathBuf,
    lock: File,
}

impl CacheRoot {
    /// Take ownership of `dir`, creating it (or emptying an unlocked
    /// leftover) and placing the sentinel `lock_name` inside.
    pub(crate) fn acquire(dir: PathBuf, lock_name: &str) -> ResolveResult<Self> {
        let lock_path = dir.join(lock_name);
        if lock_path.exists() {
            return Err(ResolveError::CacheFolderConflict(dir));
        }
        let io_err = |source: io::Error| ResolveError::CacheRoot {
            path: dir.clone(),
            source,
        };
        if dir.exists() {
            empty_dir(&dir).map_err(io_err)?;
        } else {
            std::fs::create_dir_all(&dir).map_err(io_err)?;
        }

        let lock = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ResolveError::CacheFolderConflict(dir));
            },
            Err(e) => return Err(io_err(e)),
        };
        if lock.try_lock_exclusive().is_err() {
            return Err(ResolveError::CacheFolderConflict(dir));
        }
        debug!(path = %dir.display(), "libraries cache folder created");
        Ok(Self {
            dir,
            lock_path,
            lock,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for CacheRoot {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock);
        let _ = std::fs::remove_file(&self.lock_path);
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            debug!(path = %self.dir.display(), error = %e, "can't remove libraries cache folder");
        }
    }
}

fn empty_dir(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Lazily initialised cache folder slot.
///
/// The first caller creates the folder while concurrent callers wait; every
/// later call reads the stored outcome. A failed initialisation is stored as
/// "disabled" and never retried.
#[derive(Debug)]
pub(crate) struct CacheRootCell {
    settings: NativeCacheSettings,
    root: OnceLock<Option<CacheRoot>>,
}

impl CacheRootCell {
    pub(crate) fn new(settings: NativeCacheSettings) -> Self {
        Self {
            settings,
            root: OnceLock::new(),
        }
    }

    /// The cache folder, or `None` when caching is disabled.
    pub(crate) fn get(&self) -> Option<&Path> {
        self.root
            .get_or_init(|| self.init())
            .as_ref()
            .map(CacheRoot::path)
    }

    fn init(&self) -> Option<CacheRoot> {
        if !self.settings.enabled {
            debug!("native library caching is disabled");
            return None;
        }
        let dir = self.settings.base_dir().join(self.settings.folder_name());
        match CacheRoot::acquire(dir, &self.settings.lock_file_name) {
            Ok(root) => Some(root),
            Err(e @ ResolveError::CacheFolderConflict(_)) => {
                error!(error = %e, "native library caching disabled for this process");
                None
            },
            Err(e) => {
                error!(error = %e, "native library caching disabled");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &Path, name: &str) -> NativeCacheSettings {
        NativeCacheSettings {
            base_dir: Some(base.to_path_buf()),
            folder_name: Some(name.to_owned()),
            ..NativeCacheSettings::default()
        }
    }

    #[test]
    fn creates_folder_and_lock() {
        let base = tempfile::tempdir().unwrap();
        let cell = CacheRootCell::new(settings(base.path(), "libs"));
        let root = cell.get().unwrap().to_path_buf();
        assert_eq!(root, base.path().join("libs"));
        assert!(root.join("lock").is_file());
        assert_eq!(cell.get().unwrap(), root);
    }

    #[test]
    fn existing_lock_means_conflict() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("libs");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("lock"), b"").unwrap();
        std::fs::write(dir.join("keep.so"), b"theirs").unwrap();

        let cell = CacheRootCell::new(settings(base.path(), "libs"));
        assert!(cell.get().is_none());
        assert!(cell.get().is_none());
        // A foreign folder is left alone.
        drop(cell);
        assert!(dir.join("keep.so").is_file());
        assert!(dir.join("lock").is_file());
    }

    #[test]
    fn unlocked_leftover_is_emptied() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("libs");
        std::fs::create_dir_all(dir.join("old@1.0.0")).unwrap();
        std::fs::write(dir.join("old@1.0.0/libstale.so"), b"stale").unwrap();

        let cell = CacheRootCell::new(settings(base.path(), "libs"));
        let root = cell.get().unwrap();
        assert!(!root.join("old@1.0.0").exists());
        assert!(root.join("lock").is_file());
    }

    #[test]
    fn dropping_removes_owned_folder() {
        let base = tempfile::tempdir().unwrap();
        let cell = CacheRootCell::new(settings(base.path(), "libs"));
        let root = cell.get().unwrap().to_path_buf();
        drop(cell);
        assert!(!root.exists());
    }

    #[test]
    fn disabled_never_creates() {
        let base = tempfile::tempdir().unwrap();
        let cell = CacheRootCell::new(NativeCacheSettings {
            enabled: false,
            ..settings(base.path(), "libs")
        });
        assert!(cell.get().is_none());
        assert!(!base.path().join("libs").exists());
    }
}
