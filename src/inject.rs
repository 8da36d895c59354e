//! Splicing resolved markup into an HTML page.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ResolveError, Result};
use crate::models::ResolvedBundle;

fn head_end_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)</head\s*>").expect("invalid head regex"))
}

fn body_end_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("invalid body regex"))
}

/// Insert `bundle.head` before the first `</head>` and `bundle.body` before the last `</body>`.
pub fn inject_markup(html: &str, bundle: &ResolvedBundle) -> Result<String> {
  let head_end = head_end_pattern()
    .find(html)
    .ok_or(ResolveError::MissingTag("</head>"))?;
  let body_end = body_end_pattern()
    .find_iter(html)
    .last()
    .filter(|body_end| body_end.start() >= head_end.end())
    .ok_or(ResolveError::MissingTag("</body>"))?;

  let mut output = String::with_capacity(html.len() + bundle.head.len() + bundle.body.len());
  output.push_str(&html[..head_end.start()]);
  output.push_str(&bundle.head);
  output.push_str(&html[head_end.start()..body_end.start()]);
  output.push_str(&bundle.body);
  output.push_str(&html[body_end.start()..]);
  Ok(output)
}

/// Rewrite an HTML file in place with the bundle's markup.
pub fn inject_file(path: &Path, bundle: &ResolvedBundle) -> Result<()> {
  let html =
    fs::read_to_string(path).map_err(|err| ResolveError::io("failed to read", path, err))?;
  let updated = inject_markup(&html, bundle)?;
  fs::write(path, updated).map_err(|err| ResolveError::io("failed to write", path, err))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn bundle() -> ResolvedBundle {
    ResolvedBundle {
      head: "<link rel=\"stylesheet\" href=\"/a.css\">".into(),
      body: "<script src=\"/a.js\"></script>".into(),
      ..Default::default()
    }
  }

  #[test]
  fn inserts_before_closing_tags() {
    let html = "<html><head><title>t</title></HEAD><body><p>hi</p></body></html>";
    let updated = inject_markup(html, &bundle()).unwrap();
    assert_eq!(
      updated,
      "<html><head><title>t</title><link rel=\"stylesheet\" href=\"/a.css\"></HEAD>\
       <body><p>hi</p><script src=\"/a.js\"></script></body></html>"
    );
  }

  #[test]
  fn uses_last_body_close() {
    let html = "<head></head><body><pre>&lt;/body&gt;</pre><template></body></template></body>";
    let updated = inject_markup(html, &bundle()).unwrap();
    assert!(updated.ends_with("<script src=\"/a.js\"></script></body>"));
  }

  #[test]
  fn rejects_pages_without_head() {
    let err = inject_markup("<body></body>", &bundle()).unwrap_err();
    assert!(matches!(err, ResolveError::MissingTag("</head>")));
  }

  #[test]
  fn rejects_pages_without_body_close() {
    let err = inject_markup("<head></head><body>", &bundle()).unwrap_err();
    assert!(matches!(err, ResolveError::MissingTag("</body>")));
  }

  #[test]
  fn rejects_body_close_before_head_close() {
    let err = inject_markup("<body></body><head></head>", &bundle()).unwrap_err();
    assert!(matches!(err, ResolveError::MissingTag("</body>")));
  }

  #[test]
  fn rewrites_files() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("index.html");
    fs::write(&page, "<head></head><body></body>").unwrap();

    inject_file(&page, &bundle()).unwrap();
    let content = fs::read_to_string(&page).unwrap();
    assert!(content.contains("href=\"/a.css\"></head>"));
    assert!(content.contains("</script></body>"));
  }
}
