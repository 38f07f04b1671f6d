//! Style transform: SCSS entry to one minified stylesheet.

use crate::build::assets::write_output;
use crate::build::{BuildContext, BuildError, TransformError};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use std::path::{Path, PathBuf};

/// Entry stylesheet, relative to the source root.
pub const STYLES_ENTRY: &str = "styles/app.scss";

/// Stylesheet written under the output root.
pub const STYLES_OUTPUT: &str = "styles.min.css";

/// Compile the entry stylesheet and write `styles.min.css`.
///
/// A compile error leaves any previous output in place.
pub fn compile_styles(ctx: &BuildContext) -> Result<Vec<PathBuf>, BuildError> {
    let entry = ctx.src_dir().join(STYLES_ENTRY);
    let css = build_stylesheet(&entry)?;

    let out = ctx.out_dir().join(STYLES_OUTPUT);
    write_output(&out, &css)?;
    Ok(vec![out])
}

/// Compile and minify one SCSS entry file. Imports resolve relative to it.
pub fn build_stylesheet(entry: &Path) -> Result<String, TransformError> {
    let css = compile_scss(entry)?;
    minify_css(&css).map_err(|message| TransformError::new(entry, message))
}

/// Run the Sass compiler on an entry file.
pub fn compile_scss(entry: &Path) -> Result<String, TransformError> {
    grass::from_path(entry, &grass::Options::default())
        .map_err(|e| TransformError::new(entry, e.to_string()))
}

/// Minify plain CSS.
pub fn minify_css(css: &str) -> Result<String, String> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
    sheet.minify(MinifyOptions::default()).map_err(|e| e.to_string())?;
    let printed = sheet
        .to_css(PrinterOptions { minify: true, ..PrinterOptions::default() })
        .map_err(|e| e.to_string())?;
    Ok(printed.code)
}
