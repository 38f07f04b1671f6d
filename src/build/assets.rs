//! Output directory housekeeping: clean, verbatim copies, and file writes.

use crate::build::{BuildContext, BuildError};
use glob::glob;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Image subdirectory, same name under source and output roots.
pub const IMAGES_DIR: &str = "images";

/// Font subdirectory, same name under source and output roots.
pub const FONTS_DIR: &str = "fonts";

/// Delete the output directory tree. A missing directory is fine.
pub fn clean(ctx: &BuildContext) -> Result<(), BuildError> {
    let out = ctx.out_dir();
    match fs::remove_dir_all(&out) {
        Ok(()) => {
            debug!(path = %out.display(), "removed output directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(&out, e)),
    }
}

/// Copy `<src>/images/**` to `<out>/images/`.
pub fn copy_images(ctx: &BuildContext) -> Result<Vec<PathBuf>, BuildError> {
    copy_tree(&ctx.src_dir().join(IMAGES_DIR), &ctx.out_dir().join(IMAGES_DIR))
}

/// Copy `<src>/fonts/**` to `<out>/fonts/`.
pub fn copy_fonts(ctx: &BuildContext) -> Result<Vec<PathBuf>, BuildError> {
    copy_tree(&ctx.src_dir().join(FONTS_DIR), &ctx.out_dir().join(FONTS_DIR))
}

/// Recursively copy every file under `from` into `to`, keeping relative paths.
///
/// Returns the destination paths. A missing `from` copies nothing.
pub fn copy_tree(from: &Path, to: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut copied = Vec::new();
    for source in list_files(from)? {
        let rel = source.strip_prefix(from).unwrap_or(&source);
        let dest = to.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::copy(&source, &dest).map_err(|e| BuildError::io(&source, e))?;
        copied.push(dest);
    }
    debug!(from = %from.display(), count = copied.len(), "copied files");
    Ok(copied)
}

/// All regular files under `dir`, in glob (alphabetical) order.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.display().to_string()));
    let entries = glob(&pattern).map_err(|e| {
        BuildError::io(dir, std::io::Error::new(ErrorKind::InvalidInput, e.msg))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Write a finished asset, creating parent directories as needed.
pub fn write_output(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| BuildError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildMode;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> BuildContext {
        BuildContext::new(default_config(), temp.path().to_path_buf(), BuildMode::Development)
    }

    #[test]
    fn test_clean_removes_output() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        fs::create_dir_all(ctx.out_dir().join("images/old")).unwrap();
        fs::write(ctx.out_dir().join("stale.js"), "x").unwrap();

        clean(&ctx).unwrap();
        assert!(!ctx.out_dir().exists());
    }

    #[test]
    fn test_clean_missing_output_is_ok() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        assert!(clean(&ctx).is_ok());
    }

    #[test]
    fn test_copy_tree_preserves_bytes_and_paths() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("from");
        fs::create_dir_all(from.join("icons/small")).unwrap();
        let png = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 255];
        fs::write(from.join("icons/small/dot.png"), png).unwrap();
        fs::write(from.join("logo.svg"), "<svg/>").unwrap();

        let to = temp.path().join("to");
        let copied = copy_tree(&from, &to).unwrap();

        assert_eq!(copied.len(), 2);
        assert_eq!(fs::read(to.join("icons/small/dot.png")).unwrap(), png);
        assert_eq!(fs::read_to_string(to.join("logo.svg")).unwrap(), "<svg/>");
    }

    #[test]
    fn test_copy_missing_source_copies_nothing() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        assert!(copy_fonts(&ctx).unwrap().is_empty());
        assert!(!ctx.out_dir().join(FONTS_DIR).exists());
    }

    #[test]
    fn test_write_output_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/c.txt");
        write_output(&path, "hi").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hi");
    }
}
