//! Symbolic path prefixes such as `@static` or `@web`.
//!
//! Bundle descriptors never hard-code filesystem or URL roots. They name an alias instead and the
//! host registers what each alias points at during startup.

use std::collections::BTreeMap;

use crate::error::{ResolveError, Result};

/// Marker that introduces an alias segment.
pub const ALIAS_MARKER: char = '@';

/// Resolves a string with a symbolic prefix into a concrete filesystem path or URL path.
pub trait PathAliaser {
  /// Expand the leading alias of `path`, returning paths without an alias unchanged.
  fn alias(&self, path: &str) -> Result<String>;
}

/// Registry of aliases backed by an ordered map.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
  entries: BTreeMap<String, String>,
}

impl AliasMap {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `name` so that it expands to `value`.
  ///
  /// The value is aliased itself before it is stored, so `@static` can be declared in terms of an
  /// earlier `@app`. Re-registering a name replaces the previous value.
  pub fn register(&mut self, name: impl Into<String>, value: &str) -> Result<&mut Self> {
    let name = name.into();
    if !name.starts_with(ALIAS_MARKER) || name.len() < 2 || name.contains('/') {
      return Err(ResolveError::InvalidAliasName(name));
    }

    let expanded = self.alias(value)?;
    self.entries.insert(name, expanded);
    Ok(self)
  }

  /// Builder-style variant of [`AliasMap::register`].
  pub fn with(mut self, name: impl Into<String>, value: &str) -> Result<Self> {
    self.register(name, value)?;
    Ok(self)
  }

  /// Current expansion for an alias name, if registered.
  pub fn get(&self, name: &str) -> Option<&str> {
    self.entries.get(name).map(String::as_str)
  }

  /// Iterate registered aliases in name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(name, value)| (name.as_str(), value.as_str()))
  }
}

impl PathAliaser for AliasMap {
  fn alias(&self, path: &str) -> Result<String> {
    if !path.starts_with(ALIAS_MARKER) {
      return Ok(path.to_string());
    }

    let (name, rest) = match path.find('/') {
      Some(index) => path.split_at(index),
      None => (path, ""),
    };

    let Some(root) = self.entries.get(name) else {
      return Err(ResolveError::UnknownAlias {
        alias: name.to_string(),
        path: path.to_string(),
      });
    };

    Ok(join_alias(root, rest))
  }
}

/// Join an alias expansion with the remainder of the path, keeping exactly one separator.
fn join_alias(root: &str, rest: &str) -> String {
  let rest = rest.trim_start_matches('/');
  if rest.is_empty() {
    return root.to_string();
  }

  let root = root.trim_end_matches('/');
  format!("{root}/{rest}")
}
