//! Publishing bundle sources into the public root via directory symlinks.
//!
//! A published bundle lives at `{basePath}/{publishPath}/{basename}` where the basename is either
//! the descriptor's `name` or a hash of the source path and its modification time. Anything that
//! already exists at that path is treated as published; contents are never compared.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use xxhash_rust::xxh3::xxh3_64;

use crate::alias::PathAliaser;
use crate::config::ResolverConfig;
use crate::descriptor::BundleDescriptor;
use crate::error::Result;
use crate::models::BundleLocation;
use crate::store::FileStore;

/// Custom basename function receiving the aliased source directory.
pub type PathHasher = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Default basename: xxh3 of the path followed by its mtime in milliseconds, as hex.
pub fn mtime_hash(path: &str, modified: SystemTime) -> String {
  let millis = modified
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_millis())
    .unwrap_or_default();
  format!("{:x}", xxh3_64(format!("{path}{millis}").as_bytes()))
}

/// Publishes bundle sources using the configured roots.
pub struct Publisher<'a, F: FileStore> {
  config: &'a ResolverConfig,
  aliaser: &'a dyn PathAliaser,
  store: &'a F,
  hasher: Option<&'a PathHasher>,
}

impl<F: FileStore> fmt::Debug for Publisher<'_, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Publisher")
      .field("publish_path", &self.config.publish_path)
      .field("custom_hasher", &self.hasher.is_some())
      .finish()
  }
}

impl<'a, F: FileStore> Publisher<'a, F> {
  /// Create a publisher over the given collaborators.
  pub fn new(
    config: &'a ResolverConfig,
    aliaser: &'a dyn PathAliaser,
    store: &'a F,
    hasher: Option<&'a PathHasher>,
  ) -> Self {
    Self {
      config,
      aliaser,
      store,
      hasher,
    }
  }

  /// Basename for an aliased source directory.
  pub fn hash(&self, source: &str) -> Result<String> {
    if let Some(hasher) = self.hasher {
      return Ok((**hasher)(source));
    }

    let modified = self.store.modified(Path::new(source))?;
    Ok(mtime_hash(source, modified))
  }

  /// Link the descriptor's source directory into the public root.
  ///
  /// Returns `None` when the descriptor has nothing to publish.
  pub fn publish(&self, descriptor: &BundleDescriptor) -> Result<Option<BundleLocation>> {
    let Some(source_path) = descriptor.source_path.as_deref() else {
      return Ok(None);
    };

    let source = self.aliaser.alias(source_path)?;
    let basename = match descriptor.name.as_deref() {
      Some(name) => name.to_string(),
      None => self.hash(&source)?,
    };

    let location = BundleLocation {
      base_path: self.aliaser.alias(&format!(
        "{}/{}/{}",
        self.config.base_path, self.config.publish_path, basename
      ))?,
      base_url: self.aliaser.alias(&format!(
        "{}/{}/{}",
        self.config.base_url, self.config.publish_path, basename
      ))?,
    };

    let target = Path::new(&location.base_path);
    if self.store.exists(target) {
      tracing::debug!("{} already published at {}", source, target.display());
      return Ok(Some(location));
    }

    if let Some(parent) = target.parent()
      && !self.store.exists(parent)
    {
      self.store.create_dir_all(parent)?;
    }

    self.store.symlink_dir(Path::new(&source), target)?;
    tracing::info!("published {} to {}", source, target.display());

    Ok(Some(location))
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::cell::RefCell;
  use std::collections::{BTreeMap, BTreeSet};
  use std::path::PathBuf;
  use std::time::Duration;

  use super::*;
  use crate::alias::AliasMap;

  /// In-memory store recording every mutation.
  #[derive(Debug, Default)]
  pub(crate) struct RecordingStore {
    pub(crate) existing: RefCell<BTreeSet<PathBuf>>,
    pub(crate) mtimes: BTreeMap<PathBuf, SystemTime>,
    pub(crate) mutations: RefCell<Vec<String>>,
  }

  impl RecordingStore {
    pub(crate) fn with_source(path: &str, modified: SystemTime) -> Self {
      let store = Self::default();
      store.existing.borrow_mut().insert(PathBuf::from(path));
      Self {
        mtimes: BTreeMap::from([(PathBuf::from(path), modified)]),
        ..store
      }
    }

    pub(crate) fn links(&self) -> usize {
      self
        .mutations
        .borrow()
        .iter()
        .filter(|entry| entry.starts_with("link "))
        .count()
    }
  }

  impl FileStore for RecordingStore {
    fn exists(&self, path: &Path) -> bool {
      self.existing.borrow().contains(path)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
      self.mtimes.get(path).copied().ok_or_else(|| {
        crate::error::ResolveError::io(
          "failed to stat",
          path,
          std::io::ErrorKind::NotFound.into(),
        )
      })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
      self.existing.borrow_mut().insert(path.to_path_buf());
      self
        .mutations
        .borrow_mut()
        .push(format!("mkdir {}", path.display()));
      Ok(())
    }

    fn symlink_dir(&self, target: &Path, link: &Path) -> Result<()> {
      self.existing.borrow_mut().insert(link.to_path_buf());
      self
        .mutations
        .borrow_mut()
        .push(format!("link {} -> {}", link.display(), target.display()));
      Ok(())
    }
  }

  pub(crate) fn aliases() -> AliasMap {
    AliasMap::new()
      .with("@app", "/srv/app")
      .and_then(|map| map.with("@static", "@app/public"))
      .and_then(|map| map.with("@web", "/"))
      .expect("aliases should register")
  }

  fn descriptor(source: &str) -> BundleDescriptor {
    BundleDescriptor {
      source_path: Some(source.into()),
      ..Default::default()
    }
  }

  #[test]
  fn mtime_hash_is_deterministic_and_tracks_mtime() {
    let first = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let second = first + Duration::from_secs(1);

    assert_eq!(mtime_hash("/srv/src", first), mtime_hash("/srv/src", first));
    assert_ne!(mtime_hash("/srv/src", first), mtime_hash("/srv/src", second));
    assert_ne!(mtime_hash("/srv/src", first), mtime_hash("/srv/other", first));
  }

  #[test]
  fn skips_descriptors_without_source() {
    let config = ResolverConfig::default();
    let aliases = aliases();
    let store = RecordingStore::default();
    let publisher = Publisher::new(&config, &aliases, &store, None);

    assert_eq!(publisher.publish(&BundleDescriptor::default()).unwrap(), None);
    assert!(store.mutations.borrow().is_empty());
  }

  #[test]
  fn publishing_twice_links_once() {
    let config = ResolverConfig::default();
    let aliases = aliases();
    let modified = UNIX_EPOCH + Duration::from_secs(42);
    let store = RecordingStore::with_source("/srv/app/src/site", modified);
    let publisher = Publisher::new(&config, &aliases, &store, None);

    let descriptor = descriptor("@app/src/site");
    let first = publisher.publish(&descriptor).unwrap().unwrap();
    let second = publisher.publish(&descriptor).unwrap().unwrap();

    let basename = mtime_hash("/srv/app/src/site", modified);
    assert_eq!(first, second);
    assert_eq!(first.base_path, format!("/srv/app/public/assets/{basename}"));
    assert_eq!(first.base_url, format!("/assets/{basename}"));
    assert_eq!(store.links(), 1);
    assert_eq!(store.mutations.borrow().len(), 2);
  }

  #[test]
  fn uses_descriptor_name_and_custom_hasher() {
    let config = ResolverConfig::default();
    let aliases = aliases();
    let store = RecordingStore::default();
    let hasher: PathHasher = Arc::new(|path: &str| format!("h{}", path.len()));
    let publisher = Publisher::new(&config, &aliases, &store, Some(&hasher));

    let named = BundleDescriptor {
      name: Some("jquery".into()),
      ..descriptor("@app/vendor/jquery")
    };
    let location = publisher.publish(&named).unwrap().unwrap();
    assert_eq!(location.base_url, "/assets/jquery");

    let hashed = publisher.publish(&descriptor("/x/y")).unwrap().unwrap();
    assert_eq!(hashed.base_url, "/assets/h4");
  }

  #[test]
  fn existing_parent_is_not_recreated() {
    let config = ResolverConfig::default();
    let aliases = aliases();
    let store = RecordingStore::with_source("/srv/app/src", UNIX_EPOCH);
    store
      .existing
      .borrow_mut()
      .insert(PathBuf::from("/srv/app/public/assets"));
    let publisher = Publisher::new(&config, &aliases, &store, None);

    publisher.publish(&descriptor("@app/src")).unwrap();
    assert_eq!(store.mutations.borrow().len(), 1);
    assert_eq!(store.links(), 1);
  }

  #[test]
  fn missing_source_fails_hashing() {
    let config = ResolverConfig::default();
    let aliases = aliases();
    let store = RecordingStore::default();
    let publisher = Publisher::new(&config, &aliases, &store, None);

    assert!(publisher.publish(&descriptor("@app/missing")).is_err());
  }

  #[cfg(unix)]
  #[test]
  fn links_real_directories() {
    use crate::store::OsFileStore;
    use tempfile::tempdir;

    let temp = tempdir().expect("failed to create temp dir");
    let source = temp.path().join("src/site");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("site.css"), "body {}").unwrap();

    let aliases = AliasMap::new()
      .with("@app", &temp.path().to_string_lossy())
      .and_then(|map| map.with("@static", "@app/public"))
      .and_then(|map| map.with("@web", "/"))
      .unwrap();
    let config = ResolverConfig::default();
    let publisher = Publisher::new(&config, &aliases, &OsFileStore, None);

    let location = publisher.publish(&descriptor("@app/src/site")).unwrap().unwrap();
    let linked = PathBuf::from(&location.base_path);
    assert!(same_file::is_same_file(&source, &linked).unwrap());
    assert!(linked.join("site.css").is_file());

    // Second publish sees the link and leaves it alone.
    assert_eq!(
      publisher.publish(&descriptor("@app/src/site")).unwrap().unwrap(),
      location
    );
  }
}
