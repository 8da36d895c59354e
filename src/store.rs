//! Filesystem operations needed to publish bundle sources.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{ResolveError, Result};

/// Minimal filesystem surface used by the publisher.
pub trait FileStore {
  /// Returns `true` when something exists at `path`, following symlinks.
  fn exists(&self, path: &Path) -> bool;

  /// Last modification time of `path`.
  fn modified(&self, path: &Path) -> Result<SystemTime>;

  /// Create `path` and every missing parent.
  fn create_dir_all(&self, path: &Path) -> Result<()>;

  /// Create a directory symlink at `link` pointing to `target`.
  fn symlink_dir(&self, target: &Path, link: &Path) -> Result<()>;
}

/// [`FileStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileStore;

impl FileStore for OsFileStore {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn modified(&self, path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
      .and_then(|metadata| metadata.modified())
      .map_err(|err| ResolveError::io("failed to stat", path, err))
  }

  fn create_dir_all(&self, path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| ResolveError::io("failed to create", path, err))
  }

  fn symlink_dir(&self, target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let linked = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let linked = std::os::windows::fs::symlink_dir(target, link);

    linked.map_err(|err| ResolveError::io("failed to link", link, err))
  }
}

impl<T: FileStore + ?Sized> FileStore for &T {
  fn exists(&self, path: &Path) -> bool {
    (**self).exists(path)
  }

  fn modified(&self, path: &Path) -> Result<SystemTime> {
    (**self).modified(path)
  }

  fn create_dir_all(&self, path: &Path) -> Result<()> {
    (**self).create_dir_all(path)
  }

  fn symlink_dir(&self, target: &Path, link: &Path) -> Result<()> {
    (**self).symlink_dir(target, link)
  }
}
