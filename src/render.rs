//! Markup rendering for stylesheet and script references.

use std::sync::OnceLock;

use regex::Regex;

/// Placeholder replaced with the stylesheet URL in link templates.
pub const HREF_PLACEHOLDER: &str = "${href}";

/// Placeholder replaced with the script URL in script templates.
pub const SRC_PLACEHOLDER: &str = "${src}";

fn not_ie_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)!ie").expect("invalid !ie regex"))
}

/// Render a script reference with the configured template.
///
/// Only the first `${src}` in the template is filled in.
pub fn render_js(template: &str, src: &str, condition: Option<&str>) -> String {
  let script = template.replacen(SRC_PLACEHOLDER, src, 1);
  match condition.filter(|value| !value.is_empty()) {
    Some(condition) => wrap_in_condition(&script, condition),
    None => script,
  }
}

/// Render a stylesheet reference with the configured template.
///
/// Only the first `${href}` is filled in. A conditional comment takes precedence over the
/// `noscript` wrapper.
pub fn render_css(template: &str, href: &str, condition: Option<&str>, noscript: bool) -> String {
  let link = template.replacen(HREF_PLACEHOLDER, href, 1);
  if let Some(condition) = condition.filter(|value| !value.is_empty()) {
    wrap_in_condition(&link, condition)
  } else if noscript {
    format!("<noscript>{link}</noscript>")
  } else {
    link
  }
}

/// Wrap `content` in a legacy Internet Explorer conditional comment.
///
/// Expressions that exclude IE use the "downlevel-revealed" form so that every other browser
/// still parses the content.
pub fn wrap_in_condition(content: &str, condition: &str) -> String {
  if not_ie_pattern().is_match(condition) {
    format!("<!--[if {condition}]><!-->{content}<!--<![endif]-->")
  } else {
    format!("<!--[if {condition}]>{content}<![endif]-->")
  }
}
