//! Resolver configuration loader describing publish roots and markup templates.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alias::{AliasMap, PathAliaser};
use crate::error::{ResolveError, Result};

const DEFAULT_CONFIG_FILE: &str = "bundle_assets.config.json";

/// Default link template, `${href}` is replaced with the stylesheet URL.
pub const DEFAULT_LINK_TEMPLATE: &str = r#"<link rel="stylesheet" href="${href}">"#;

/// Default script template, `${src}` is replaced with the script URL.
pub const DEFAULT_SCRIPT_TEMPLATE: &str = r#"<script src="${src}"></script>"#;

/// Discoverable resolver configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
  /// Filesystem root that published bundles live under, usually an alias.
  pub base_path: String,
  /// URL root matching `base_path`, usually an alias.
  pub base_url: String,
  /// Subdirectory of the roots holding published bundle links.
  pub publish_path: String,
  /// Reserved for timestamp query strings; currently has no effect.
  pub timestamp: bool,
  /// Stylesheet markup template.
  pub link_template: String,
  /// Script markup template.
  pub script_template: String,
  /// Running environment used to select descriptor overrides.
  pub environment: Option<String>,
  /// Alias name to expansion, values may reference other aliases.
  pub aliases: BTreeMap<String, String>,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      base_path: "@static".into(),
      base_url: "@web".into(),
      publish_path: "assets".into(),
      timestamp: false,
      link_template: DEFAULT_LINK_TEMPLATE.into(),
      script_template: DEFAULT_SCRIPT_TEMPLATE.into(),
      environment: None,
      aliases: BTreeMap::new(),
    }
  }
}

impl ResolverConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing file falls back to the defaults. An unreadable or malformed file is logged and
  /// also falls back, so discovery never blocks startup.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if !candidate.is_file() {
      return Self::default();
    }

    match Self::from_path(&candidate) {
      Ok(config) => config,
      Err(err) => {
        tracing::warn!("ignoring configuration: {}", err);
        Self::default()
      }
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content =
      fs::read_to_string(path).map_err(|err| ResolveError::io("failed to read", path, err))?;
    serde_json::from_str(&content).map_err(|source| ResolveError::ConfigParse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Location `discover` looks at for `dir`.
  pub fn default_path(dir: &Path) -> PathBuf {
    dir.join(DEFAULT_CONFIG_FILE)
  }

  /// Build an alias registry from the configured aliases.
  ///
  /// Aliases whose value references another configured alias are registered after it, so a map
  /// such as `{"@static": "@app/dist", "@app": "/srv"}` resolves regardless of key order.
  pub fn alias_map(&self) -> Result<AliasMap> {
    let mut map = AliasMap::new();
    let mut pending: Vec<(&String, &String)> = self.aliases.iter().collect();

    while !pending.is_empty() {
      let before = pending.len();
      pending.retain(|(name, value)| {
        map.alias(value).is_err() || map.register(name.as_str(), value).is_err()
      });
      if pending.len() == before {
        // Nothing progressed; register the first leftover to surface its error.
        let (name, value) = pending[0];
        map.register(name.as_str(), value)?;
      }
    }

    Ok(map)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn discover_falls_back_to_defaults() {
    let temp = tempdir().expect("failed to create temp dir");
    let config = ResolverConfig::discover(temp.path());
    assert_eq!(config, ResolverConfig::default());
    assert_eq!(config.publish_path, "assets");
    assert_eq!(config.link_template, DEFAULT_LINK_TEMPLATE);
  }

  #[test]
  fn discover_reads_partial_configuration() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(
      ResolverConfig::default_path(temp.path()),
      r#"{"publishPath": "bundles", "environment": "production", "aliases": {"@web": "/"}}"#,
    )
    .unwrap();

    let config = ResolverConfig::discover(temp.path());
    assert_eq!(config.publish_path, "bundles");
    assert_eq!(config.environment.as_deref(), Some("production"));
    assert_eq!(config.base_path, "@static");
  }

  #[test]
  fn from_path_reports_parse_errors() {
    let temp = tempdir().expect("failed to create temp dir");
    let path = ResolverConfig::default_path(temp.path());
    fs::write(&path, r#"{"publishPath": 3}"#).unwrap();

    let err = ResolverConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, ResolveError::ConfigParse { .. }));
    assert!(err.to_string().contains("bundle_assets.config.json"));

    assert!(matches!(
      ResolverConfig::from_path(&temp.path().join("missing.json")),
      Err(ResolveError::Io { .. })
    ));
  }

  #[test]
  fn discover_tolerates_malformed_files() {
    let temp = tempdir().expect("failed to create temp dir");
    fs::write(ResolverConfig::default_path(temp.path()), "{ not json").unwrap();

    assert_eq!(ResolverConfig::discover(temp.path()), ResolverConfig::default());
  }

  #[test]
  fn alias_map_resolves_out_of_order_chains() {
    let mut config = ResolverConfig::default();
    config.aliases.insert("@static".into(), "@app/dist".into());
    config.aliases.insert("@app".into(), "/srv/app".into());

    let map = config.alias_map().unwrap();
    assert_eq!(map.get("@static"), Some("/srv/app/dist"));
  }

  #[test]
  fn alias_map_reports_dangling_aliases() {
    let mut config = ResolverConfig::default();
    config.aliases.insert("@static".into(), "@missing/dist".into());

    assert!(matches!(
      config.alias_map(),
      Err(ResolveError::UnknownAlias { .. })
    ));
  }
}
