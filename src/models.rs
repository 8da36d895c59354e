//! Data structures produced while resolving bundles.

use serde::{Deserialize, Serialize};

/// Markup computed for a bundle, including everything its dependencies contribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBundle {
  /// This bundle's own stylesheet markup.
  pub css_before_head_end: String,
  /// This bundle's own scripts placed in the head.
  pub js_before_head_end: String,
  /// This bundle's own scripts placed at the end of the body.
  pub js_before_body_end: String,
  /// Ancestor stylesheets, ancestor head scripts, own stylesheets, own head scripts.
  pub head: String,
  /// Ancestor body scripts followed by own body scripts.
  pub body: String,
}

/// Filesystem and URL roots a bundle's references are rendered against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleLocation {
  /// Aliased filesystem directory.
  pub base_path: String,
  /// Aliased URL prefix.
  pub base_url: String,
}

impl BundleLocation {
  /// URL-side join of a reference onto the location's base URL, before aliasing.
  pub fn url_for(&self, reference: &str) -> String {
    format!(
      "{}/{}",
      self.base_url.trim_end_matches('/'),
      reference.trim_start_matches('/')
    )
  }
}
