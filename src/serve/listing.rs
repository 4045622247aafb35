//! Directory listing HTML for directory paths with no index or bootstrap
//! match.
//!
//! The listing is computed from an index snapshot, never from a fresh disk
//! walk: entries at the request depth are files, deeper entries contribute
//! their first-level directory name.

use std::collections::BTreeSet;

/// Render the listing for `url_path` (always ends with `/`).
pub fn render_listing(snapshot: &[String], url_path: &str) -> String {
    let depth = url_path.split('/').count();
    let mut files = BTreeSet::new();
    let mut directories = BTreeSet::new();

    for indexed in snapshot {
        if !indexed.starts_with(url_path) {
            continue;
        }
        let indexed_depth = indexed.split('/').count();
        let segment = indexed.split('/').nth(depth - 1).unwrap_or("");
        if segment.is_empty() {
            continue;
        }
        if indexed_depth == depth {
            files.insert(segment.to_string());
        } else {
            directories.insert(format!("{segment}/"));
        }
    }

    let mut html = format!("<h1>Directory listing for: {url_path}</h1>\n<nav><ul>\n");
    if url_path != "/" {
        html.push_str("<li>🔙<a href=\"..\">[parent directory]</a></li>\n");
    }
    for dir in &directories {
        html.push_str(&format!("<li>📁<a href=\"{url_path}{dir}\">{dir}</a></li>\n"));
    }
    for file in &files {
        html.push_str(&format!(
            "<li>🗒️<a href=\"{url_path}{file}\">{file}</a></li>\n"
        ));
    }
    html.push_str("</ul></nav>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Vec<String> {
        vec![
            "/readme.md".to_string(),
            "/site/index.html".to_string(),
            "/site/app.js".to_string(),
            "/site/assets/logo.png".to_string(),
        ]
    }

    #[test]
    fn test_root_listing() {
        let html = render_listing(&snapshot(), "/");
        assert!(html.contains("Directory listing for: /"));
        assert!(html.contains(r#"<a href="/readme.md">readme.md</a>"#));
        assert!(html.contains(r#"<a href="/site/">site/</a>"#));
        // no parent link at the root
        assert!(!html.contains("[parent directory]"));
    }

    #[test]
    fn test_subdirectory_listing() {
        let html = render_listing(&snapshot(), "/site/");
        assert!(html.contains(r#"<a href="/site/index.html">index.html</a>"#));
        assert!(html.contains(r#"<a href="/site/assets/">assets/</a>"#));
        assert!(html.contains("[parent directory]"));
        // entries from other directories never leak in
        assert!(!html.contains("readme.md"));
    }

    #[test]
    fn test_empty_directory_listing() {
        let html = render_listing(&snapshot(), "/nothing/");
        assert!(html.contains("Directory listing for: /nothing/"));
        assert!(!html.contains("🗒️"));
        assert!(!html.contains("📁"));
    }
}
