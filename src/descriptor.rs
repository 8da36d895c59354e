//! Bundle descriptors and the loaders that read them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

/// Placeholder substituted with the bundle's extra token inside references.
pub const EXTRA_PLACEHOLDER: &str = "${extra}";

/// Suffixes probed when an identifier does not name a file directly.
const DESCRIPTOR_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Declarative description of a bundle of stylesheets and scripts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleDescriptor {
  /// Bundles whose markup must precede this one, in order.
  pub depends: Vec<String>,
  /// Directory to publish into the public root before rendering.
  pub source_path: Option<String>,
  /// Fixed publish directory name replacing the computed hash.
  pub name: Option<String>,
  /// Filesystem root override for this bundle.
  pub base_path: Option<String>,
  /// URL root override for this bundle.
  pub base_url: Option<String>,
  /// Value substituted for `${extra}` in references.
  pub extra: Option<String>,
  /// Options applied to every stylesheet reference.
  pub css_options: CssOptions,
  /// Options applied to every script reference.
  pub js_options: JsOptions,
  /// Stylesheets relative to the bundle's URL root.
  pub css: Vec<AssetReference>,
  /// Scripts relative to the bundle's URL root.
  pub js: Vec<AssetReference>,
  /// Per-environment overrides keyed by environment name.
  pub environments: BTreeMap<String, EnvironmentOverride>,
}

/// Rendering options for stylesheet references.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CssOptions {
  /// Conditional comment expression, e.g. `lt IE 9`.
  pub condition: Option<String>,
  /// Wrap links in `<noscript>` when no condition applies.
  pub noscript: bool,
}

/// Rendering options for script references.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct JsOptions {
  /// Conditional comment expression, e.g. `lt IE 9`.
  pub condition: Option<String>,
  /// Place scripts before `</head>` instead of before `</body>`.
  pub before_head_end: bool,
}

/// Fields an environment may override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvironmentOverride {
  /// Replacement for the descriptor-level `extra` token.
  pub extra: Option<String>,
}

/// A stylesheet or script entry, optionally carrying its own rendering options.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AssetReference {
  /// Bare path using the bundle-level options.
  Path(String),
  /// Path with per-reference overrides.
  Detailed(DetailedReference),
}

/// Object form of an [`AssetReference`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DetailedReference {
  /// Path relative to the bundle's URL root.
  pub path: String,
  /// Conditional comment expression overriding the bundle-level one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  /// Stylesheets only: `<noscript>` override.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub noscript: Option<bool>,
  /// Scripts only: head placement override.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub before_head_end: Option<bool>,
}

impl AssetReference {
  /// Path relative to the bundle's URL root.
  pub fn path(&self) -> &str {
    match self {
      Self::Path(path) => path,
      Self::Detailed(detail) => &detail.path,
    }
  }

  /// Effective condition given the bundle-level fallback.
  pub fn condition<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
    match self {
      Self::Detailed(DetailedReference {
        condition: Some(condition),
        ..
      }) => Some(condition.as_str()),
      _ => fallback,
    }
  }

  /// Effective `noscript` flag given the bundle-level fallback.
  pub fn noscript(&self, fallback: bool) -> bool {
    match self {
      Self::Detailed(detail) => detail.noscript.unwrap_or(fallback),
      Self::Path(_) => fallback,
    }
  }

  /// Effective head placement given the bundle-level fallback.
  pub fn before_head_end(&self, fallback: bool) -> bool {
    match self {
      Self::Detailed(detail) => detail.before_head_end.unwrap_or(fallback),
      Self::Path(_) => fallback,
    }
  }
}

impl From<&str> for AssetReference {
  fn from(path: &str) -> Self {
    Self::Path(path.to_string())
  }
}

impl BundleDescriptor {
  /// Select the extra token: environment override, then descriptor value, then empty.
  pub fn extra_for(&self, environment: Option<&str>) -> &str {
    environment
      .and_then(|name| self.environments.get(name))
      .and_then(|env| env.extra.as_deref())
      .or(self.extra.as_deref())
      .unwrap_or_default()
  }
}

/// Replace every `${extra}` placeholder in `reference`.
pub fn substitute_extra(reference: &str, extra: &str) -> String {
  reference.replace(EXTRA_PLACEHOLDER, extra)
}

/// Source of bundle descriptors.
pub trait DescriptorLoader {
  /// Load the descriptor at an already aliased `location`.
  ///
  /// `identifier` is the caller-facing name and only used for diagnostics.
  fn load(&self, identifier: &str, location: &str) -> Result<BundleDescriptor>;
}

/// Reads descriptors from JSON or YAML files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDescriptorLoader;

impl FileDescriptorLoader {
  fn locate(location: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(location);
    if direct.is_file() {
      return Some(direct);
    }

    DESCRIPTOR_EXTENSIONS
      .iter()
      .map(|ext| PathBuf::from(format!("{location}.{ext}")))
      .find(|candidate| candidate.is_file())
  }

  /// Parse a descriptor file, choosing the format by extension.
  pub fn parse_file(path: &Path) -> Result<BundleDescriptor> {
    let contents =
      fs::read_to_string(path).map_err(|err| ResolveError::io("failed to read", path, err))?;

    let is_yaml = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let parsed: std::result::Result<BundleDescriptor, String> = if is_yaml {
      serde_yaml::from_str(&contents).map_err(|err| err.to_string())
    } else {
      serde_json::from_str(&contents).map_err(|err| err.to_string())
    };

    parsed.map_err(|message| ResolveError::DescriptorParse {
      path: path.to_path_buf(),
      message,
    })
  }
}

impl DescriptorLoader for FileDescriptorLoader {
  fn load(&self, identifier: &str, location: &str) -> Result<BundleDescriptor> {
    match Self::locate(location) {
      Some(path) => Self::parse_file(&path),
      None => Err(ResolveError::DescriptorNotFound {
        identifier: identifier.to_string(),
        location: location.to_string(),
      }),
    }
  }
}

/// In-memory descriptors keyed by aliased location.
#[derive(Debug, Clone, Default)]
pub struct StaticDescriptors {
  descriptors: BTreeMap<String, BundleDescriptor>,
}

impl StaticDescriptors {
  /// Create an empty set.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace the descriptor stored at `location`.
  pub fn insert(&mut self, location: impl Into<String>, descriptor: BundleDescriptor) {
    self.descriptors.insert(location.into(), descriptor);
  }

  /// Builder-style variant of [`StaticDescriptors::insert`].
  pub fn with(mut self, location: impl Into<String>, descriptor: BundleDescriptor) -> Self {
    self.insert(location, descriptor);
    self
  }
}

impl DescriptorLoader for StaticDescriptors {
  fn load(&self, identifier: &str, location: &str) -> Result<BundleDescriptor> {
    self
      .descriptors
      .get(location)
      .cloned()
      .ok_or_else(|| ResolveError::DescriptorNotFound {
        identifier: identifier.to_string(),
        location: location.to_string(),
      })
  }
}

impl<T: DescriptorLoader + ?Sized> DescriptorLoader for &T {
  fn load(&self, identifier: &str, location: &str) -> Result<BundleDescriptor> {
    (**self).load(identifier, location)
  }
}
