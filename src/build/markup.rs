//! Markup transform: render the entry view to `index.html`.
//!
//! The entry is `views/index.pug`. It sees two locals, `baseurl` and
//! `version`, taken from [`RenderContext`]. `include` paths starting with
//! `/` resolve from the project root.

use crate::build::assets::write_output;
use crate::build::{BuildContext, BuildError, RenderContext, TransformError};
use crate::pug::{self, PugError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// View subdirectory, relative to the source root.
pub const VIEWS_DIR: &str = "views";

/// Entry view, relative to the views directory.
pub const MARKUP_ENTRY: &str = "index.pug";

/// Page written under the output root.
pub const MARKUP_OUTPUT: &str = "index.html";

/// Render the entry view and write `index.html`.
pub fn compile_markup(ctx: &BuildContext) -> Result<Vec<PathBuf>, BuildError> {
    let entry = ctx.src_dir().join(VIEWS_DIR).join(MARKUP_ENTRY);
    let render = ctx.render_context();
    debug!(baseurl = %render.baseurl, version = %render.version, "rendering markup");

    let html = render_entry(&entry, ctx.project_root(), &render)?;

    let out = ctx.out_dir().join(MARKUP_OUTPUT);
    write_output(&out, &html)?;
    Ok(vec![out])
}

/// Render the view at `entry`, with rooted includes resolved from `basedir`.
pub fn render_entry(
    entry: &Path,
    basedir: &Path,
    render: &RenderContext,
) -> Result<String, TransformError> {
    pug::render_file(entry, basedir, &render.locals()).map_err(|e| match e {
        PugError::Syntax { file, line, column, message } => {
            TransformError::with_location(file, line, column, message)
        }
        other => TransformError::new(entry, other.to_string()),
    })
}
