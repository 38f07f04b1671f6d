//! Script transform: every file under `scripts/` lowered, minified, ordered
//! and concatenated into one bundle.

use crate::build::assets::{list_files, write_output};
use crate::build::{BuildContext, BuildError, TransformError};
use crate::js;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Script subdirectory, relative to the source root.
pub const SCRIPTS_DIR: &str = "scripts";

/// Bundle written under the output root.
pub const SCRIPTS_OUTPUT: &str = "scripts.min.js";

/// A transformed script, keyed by its path relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    /// Path relative to the source root, `/`-separated
    pub rel_path: String,
    /// Lowered and minified code
    pub code: String,
}

/// Transform every script and write `scripts.min.js`.
///
/// If any file fails to compile, nothing is written.
pub fn compile_scripts(ctx: &BuildContext) -> Result<Vec<PathBuf>, BuildError> {
    let src = ctx.src_dir();
    let files = list_files(&src.join(SCRIPTS_DIR))?;

    let mut compiled = Vec::with_capacity(files.len());
    for file in &files {
        let bytes = fs::read(file).map_err(|e| BuildError::io(file, e))?;
        let source = String::from_utf8(bytes)
            .map_err(|_| TransformError::new(file.clone(), "file is not valid UTF-8"))?;
        let code = js::transpile_and_minify(&source).map_err(|e| {
            TransformError::with_location(file.clone(), e.line, e.column, e.message)
        })?;
        compiled.push(CompiledScript { rel_path: relative_slash_path(&src, file), code });
    }

    let ordered = order_by_priority(compiled, &ctx.config().scripts.order);
    debug!(
        order = ?ordered.iter().map(|s| s.rel_path.as_str()).collect::<Vec<_>>(),
        "script bundle order"
    );

    let out = ctx.out_dir().join(SCRIPTS_OUTPUT);
    write_output(&out, &concat_scripts(&ordered))?;
    Ok(vec![out])
}

/// `path` relative to `root`, with `/` separators on every platform.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}

/// Stable-sort scripts by the first pattern their path matches.
///
/// Scripts matching no pattern keep their relative order after all others.
/// `*` does not cross directory separators.
pub fn order_by_priority(mut scripts: Vec<CompiledScript>, patterns: &[String]) -> Vec<CompiledScript> {
    let options = MatchOptions { require_literal_separator: true, ..MatchOptions::default() };
    let compiled: Vec<Pattern> = patterns.iter().filter_map(|p| Pattern::new(p).ok()).collect();

    scripts.sort_by_cached_key(|script| {
        compiled
            .iter()
            .position(|p| p.matches_with(&script.rel_path, options))
            .unwrap_or(compiled.len())
    });
    scripts
}

/// Join scripts into one bundle; each chunk is terminated with `;`.
pub fn concat_scripts(scripts: &[CompiledScript]) -> String {
    let mut chunks = Vec::with_capacity(scripts.len());
    for script in scripts {
        let code = script.code.trim();
        if code.is_empty() {
            continue;
        }
        if code.ends_with(';') {
            chunks.push(code.to_string());
        } else {
            chunks.push(format!("{};", code));
        }
    }
    chunks.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(rel_path: &str) -> CompiledScript {
        CompiledScript { rel_path: rel_path.to_string(), code: format!("/*{}*/", rel_path) }
    }

    fn default_order() -> Vec<String> {
        vec!["scripts/data/*.js".to_string(), "scripts/*.js".to_string()]
    }

    #[test]
    fn test_data_scripts_first() {
        let input = vec![
            script("scripts/app.js"),
            script("scripts/data/zebra.js"),
            script("scripts/menu.js"),
            script("scripts/data/alpha.js"),
        ];
        let ordered: Vec<String> =
            order_by_priority(input, &default_order()).into_iter().map(|s| s.rel_path).collect();
        assert_eq!(
            ordered,
            vec![
                "scripts/data/zebra.js",
                "scripts/data/alpha.js",
                "scripts/app.js",
                "scripts/menu.js",
            ]
        );
    }

    #[test]
    fn test_unmatched_scripts_go_last() {
        let input = vec![
            script("scripts/lib/vendor.js"),
            script("scripts/main.js"),
            script("scripts/readme.txt"),
        ];
        let ordered: Vec<String> =
            order_by_priority(input, &default_order()).into_iter().map(|s| s.rel_path).collect();
        assert_eq!(ordered, vec!["scripts/main.js", "scripts/lib/vendor.js", "scripts/readme.txt"]);
    }

    #[test]
    fn test_invalid_patterns_ignored() {
        let input = vec![script("scripts/b.js"), script("scripts/a.js")];
        let patterns = vec!["scripts/[".to_string(), "scripts/a.js".to_string()];
        let ordered: Vec<String> =
            order_by_priority(input, &patterns).into_iter().map(|s| s.rel_path).collect();
        assert_eq!(ordered, vec!["scripts/a.js", "scripts/b.js"]);
    }

    #[test]
    fn test_concat_scripts_terminates_chunks() {
        let scripts = vec![
            CompiledScript { rel_path: "a".into(), code: "var a=1".into() },
            CompiledScript { rel_path: "b".into(), code: "".into() },
            CompiledScript { rel_path: "c".into(), code: "(function(){})();".into() },
        ];
        assert_eq!(concat_scripts(&scripts), "var a=1;\n(function(){})();");
    }

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/site/src");
        let path = Path::new("/site/src/scripts/data/items.js");
        assert_eq!(relative_slash_path(root, path), "scripts/data/items.js");
    }
}
