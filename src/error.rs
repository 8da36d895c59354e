//! Error type shared by every resolution step.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Failures raised while resolving, publishing or injecting bundles.
///
/// All of these describe startup-time misconfiguration. Callers are expected to surface them and
/// stop rather than retry.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// A path started with an alias marker that was never registered.
  #[error("unknown alias `{alias}` in `{path}`")]
  UnknownAlias {
    /// Alias segment that failed to resolve.
    alias: String,
    /// Full path that was being aliased.
    path: String,
  },

  /// Alias names must start with `@`.
  #[error("invalid alias name `{0}`: aliases must start with `@`")]
  InvalidAliasName(String),

  /// No descriptor could be found for the bundle identifier.
  #[error("bundle descriptor not found for `{identifier}` (looked in {location})")]
  DescriptorNotFound {
    /// Identifier requested by the caller.
    identifier: String,
    /// Aliased location that was probed.
    location: String,
  },

  /// The descriptor exists but does not match the expected schema.
  #[error("failed to parse bundle descriptor {}: {message}", .path.display())]
  DescriptorParse {
    /// File that failed to parse.
    path: PathBuf,
    /// Parser diagnostic.
    message: String,
  },

  /// The resolver configuration file is not valid JSON for [`crate::ResolverConfig`].
  #[error("failed to parse configuration {}: {source}", .path.display())]
  ConfigParse {
    /// Configuration file that failed to parse.
    path: PathBuf,
    /// Parser diagnostic.
    #[source]
    source: serde_json::Error,
  },

  /// A bundle depends on itself, directly or through other bundles.
  #[error("circular bundle dependency: {}", .chain.join(" -> "))]
  CircularDependency {
    /// Identifiers from the first occurrence of the repeated bundle back to itself.
    chain: Vec<String>,
  },

  /// Filesystem access failed.
  #[error("{action} {}: {source}", .path.display())]
  Io {
    /// Short description of the attempted operation.
    action: &'static str,
    /// Path involved in the failed operation.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },

  /// An HTML page lacks the tag markup should be inserted before.
  #[error("page has no `{0}` tag to inject markup before")]
  MissingTag(&'static str),
}

impl ResolveError {
  pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      action,
      path: path.into(),
      source,
    }
  }
}
