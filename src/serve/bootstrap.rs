//! Bootstrap resolver: decides whether a directory request is answered by a
//! synthesized HTML wrapper instead of a literal file.
//!
//! The resolution order is a priority chain, not a merge. The first match
//! wins and produces a complete response:
//!
//! 1. `index.html` in the index (unless index serving is disabled)
//! 2. default rule: `index.js` / `index.mjs` present
//! 3. custom mapping for this exact path
//! 4. no substitution

use crate::config::BootstrapSpec;
use crate::index::FileIndex;

/// Result of running the bootstrap chain for a directory-style request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The directory's real index.html wins
    ServeIndexHtml(String),
    /// Synthesize an HTML wrapper loading this script
    Synthesize { src: String, module: bool },
    /// Normal resolution continues (listing or 404)
    Pass,
}

/// Run the priority chain for `dir_path` (always ends with `/`).
pub fn resolve(
    spec: &BootstrapSpec,
    ignore_index: bool,
    index: &FileIndex,
    dir_path: &str,
) -> BootstrapOutcome {
    if !ignore_index {
        let index_html = format!("{dir_path}index.html");
        if index.contains(&index_html) {
            return BootstrapOutcome::ServeIndexHtml(index_html);
        }
    }

    if spec.default_enabled {
        let plain = format!("{dir_path}index.js");
        if index.contains(&plain) {
            return BootstrapOutcome::Synthesize {
                src: plain,
                module: spec.force_module,
            };
        }
        let module = format!("{dir_path}index.mjs");
        if index.contains(&module) {
            return BootstrapOutcome::Synthesize {
                src: module,
                module: true,
            };
        }
    }

    if let Some(target) = spec.custom.get(dir_path) {
        return BootstrapOutcome::Synthesize {
            src: target.src.clone(),
            module: target.module,
        };
    }

    BootstrapOutcome::Pass
}

/// Render the minimal HTML document containing one script tag.
pub fn render_html(src: &str, module: bool) -> String {
    let type_attr = if module { " type=\"module\"" } else { "" };
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n\
         <script{type_attr} src=\"{src}\"></script>\n</body>\n</html>\n"
    )
}
