//! Pipeline integration tests
//!
//! End-to-end runs over a small site in a temporary directory:
//!
//! - Full builds (clean, copies, transforms)
//! - Compile failures keeping previous output
//! - Undecodable sources failing only their own step
//! - Script bundle ordering
//! - Development and production markup
//! - Watch-mode partial rebuilds

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use sitepipe::build::{BuildContext, BuildMode, BuildPipeline, BuildPlan, Step, StepKind};
use sitepipe::config::{default_config, SiteConfig};
use sitepipe::server::LiveReload;
use sitepipe::watch::{run_rebuild, RebuildRequest};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content.
fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut file = File::create(&path).unwrap();
    file.write_all(content).unwrap();
    path
}

/// Lay out a small site under `<root>/src`.
fn create_site(root: &Path) {
    let src = root.join("src");
    create_test_file(&src, "images/logo.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 255]);
    create_test_file(&src, "images/icons/menu.svg", b"<svg></svg>");
    create_test_file(&src, "fonts/body.woff2", &[0, 159, 146, 150]);
    create_test_file(&src, "styles/_colors.scss", b"$accent: #336699;\n");
    create_test_file(
        &src,
        "styles/app.scss",
        b"@import 'colors';\n\nbody {\n  margin: 0;\n  a { color: $accent; }\n}\n",
    );
    create_test_file(&src, "scripts/app.js", b"// boot\nrender(`${items.length} items`);\n");
    create_test_file(&src, "scripts/data/items.js", b"var items = [\n  'a',\n  'b',\n];\n");
    create_test_file(
        &src,
        "views/index.pug",
        b"html\n  head\n    link(href=baseurl + \"styles.min.css\" + version)\n  \
          body\n    script(src=`${baseurl}scripts.min.js${version}`)\n",
    );
}

fn create_pipeline(config: SiteConfig, mode: BuildMode) -> (TempDir, BuildPipeline) {
    let temp = TempDir::new().unwrap();
    create_site(temp.path());
    let ctx = BuildContext::new(config, temp.path().to_path_buf(), mode);
    (temp, BuildPipeline::new(ctx))
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(path).unwrap()
}

// ============================================================================
// Full Build
// ============================================================================

#[test]
fn test_full_build_layout() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    let result = pipeline.full_build().unwrap();

    assert!(result.is_success(), "{}", result.summary());
    let out = temp.path().join("public");
    for rel in [
        "images/logo.png",
        "images/icons/menu.svg",
        "fonts/body.woff2",
        "styles.min.css",
        "scripts.min.js",
        "index.html",
    ] {
        assert!(out.join(rel).is_file(), "missing {}", rel);
    }
}

#[test]
fn test_clean_removes_stale_output() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    let stale = create_test_file(&temp.path().join("public"), "old/stale.txt", b"stale");

    pipeline.full_build().unwrap();

    assert!(!stale.exists());
    assert!(!temp.path().join("public/old").exists());
}

#[test]
fn test_copies_are_byte_identical() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();

    for rel in ["images/logo.png", "images/icons/menu.svg", "fonts/body.woff2"] {
        let source = fs::read(temp.path().join("src").join(rel)).unwrap();
        let copied = fs::read(temp.path().join("public").join(rel)).unwrap();
        assert_eq!(source, copied, "{} differs", rel);
    }
}

#[test]
fn test_styles_compiled_and_minified() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();

    let css = read(temp.path().join("public/styles.min.css"));
    assert_eq!(css, "body{margin:0}body a{color:#369}");
}

#[test]
fn test_scss_error_keeps_previous_output() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();
    let before = read(temp.path().join("public/styles.min.css"));

    create_test_file(&temp.path().join("src"), "styles/app.scss", b"body { color: ; ");
    let plan = BuildPlan::new().with_step(Step::new(StepKind::Styles));
    let result = pipeline.run(&plan).unwrap();

    assert_eq!(result.failed_count(), 1);
    assert_eq!(read(temp.path().join("public/styles.min.css")), before);
}

// ============================================================================
// Scripts
// ============================================================================

#[test]
fn test_data_scripts_bundled_first() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    // Sorts before `data/` by name.
    create_test_file(&temp.path().join("src"), "scripts/aaa.js", b"first();\n");
    pipeline.full_build().unwrap();

    let bundle = read(temp.path().join("public/scripts.min.js"));
    assert_eq!(
        bundle,
        "var items=['a','b',];\nfirst();\nrender(\"\".concat(items.length,\" items\"));"
    );
}

#[test]
fn test_script_error_writes_nothing() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    create_test_file(&temp.path().join("src"), "scripts/broken.js", b"function f( {\n");

    let result = pipeline.full_build().unwrap();

    let scripts = result.step(StepKind::Scripts).unwrap();
    assert!(!scripts.is_success());
    assert!(!temp.path().join("public/scripts.min.js").exists());
    assert!(temp.path().join("public/index.html").exists());
}

#[test]
fn test_non_utf8_script_fails_scripts_step_only() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    create_test_file(&temp.path().join("src"), "scripts/bad.js", &[0xff, 0xfe, b'a']);

    let result = pipeline.full_build().unwrap();

    assert_eq!(result.failed_count(), 1);
    assert!(!result.step(StepKind::Scripts).unwrap().is_success());
    assert!(result.step(StepKind::Styles).unwrap().is_success());
    assert!(result.step(StepKind::Markup).unwrap().is_success());
    assert!(temp.path().join("public/index.html").is_file());
}

#[test]
fn test_script_error_keeps_previous_output() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();
    let before = read(temp.path().join("public/scripts.min.js"));

    create_test_file(&temp.path().join("src"), "scripts/app.js", b"render(`open\n");
    let plan = BuildPlan::new().with_step(Step::new(StepKind::Scripts));
    let result = pipeline.run(&plan).unwrap();

    assert_eq!(result.failed_count(), 1);
    assert_eq!(read(temp.path().join("public/scripts.min.js")), before);
}

#[test]
fn test_custom_script_order() {
    let mut config = default_config();
    config.scripts.order = vec!["scripts/app.js".to_string(), "scripts/data/*.js".to_string()];
    let (temp, pipeline) = create_pipeline(config, BuildMode::Development);
    pipeline.full_build().unwrap();

    let bundle = read(temp.path().join("public/scripts.min.js"));
    assert!(bundle.starts_with("render("));
}

// ============================================================================
// Markup
// ============================================================================

#[test]
fn test_development_markup() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();

    let html = read(temp.path().join("public/index.html"));
    assert_eq!(
        html,
        "<html><head><link href=\"http://localhost:9000/styles.min.css\"></head>\
         <body><script src=\"http://localhost:9000/scripts.min.js\"></script></body></html>"
    );
}

#[test]
fn test_view_error_keeps_previous_output() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();
    let before = read(temp.path().join("public/index.html"));

    create_test_file(&temp.path().join("src"), "views/index.pug", b"html\n  body(\n");
    let plan = BuildPlan::new().with_step(Step::new(StepKind::Markup));
    let result = pipeline.run(&plan).unwrap();

    assert_eq!(result.failed_count(), 1);
    assert_eq!(read(temp.path().join("public/index.html")), before);
}

#[test]
#[serial]
fn test_production_markup_uses_baseurl_and_fresh_version() {
    std::env::set_var("BASEURL", "https://example.com/");
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Production);
    std::env::remove_var("BASEURL");

    let markup = BuildPlan::new().with_step(Step::new(StepKind::Markup));
    pipeline.run(&markup).unwrap();
    let first = read(temp.path().join("public/index.html"));
    pipeline.run(&markup).unwrap();
    let second = read(temp.path().join("public/index.html"));

    assert!(first.contains("href=\"https://example.com/styles.min.css?v="));
    assert!(!first.contains("localhost"));
    assert_ne!(first, second);
}

#[test]
#[serial]
fn test_production_default_baseurl() {
    std::env::remove_var("BASEURL");
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Production);
    pipeline.full_build().unwrap();

    let html = read(temp.path().join("public/index.html"));
    assert!(html.contains("href=\"/styles.min.css?v="));
}

// ============================================================================
// Watch Rebuilds
// ============================================================================

#[test]
fn test_fonts_only_change_runs_font_copy() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();
    let css_modified = fs::metadata(temp.path().join("public/styles.min.css"))
        .unwrap()
        .modified()
        .unwrap();

    let changed = create_test_file(&temp.path().join("src"), "fonts/title.woff", b"new font");
    let request = RebuildRequest::from_paths(&temp.path().join("src"), [changed.as_path()]);
    let reload = LiveReload::new();
    let mut rx = reload.subscribe();

    let result = run_rebuild(&pipeline, &reload, request).unwrap();

    assert_eq!(result.kinds(), vec![StepKind::CopyFonts]);
    assert!(temp.path().join("public/fonts/title.woff").is_file());
    assert_eq!(rx.try_recv().unwrap(), 1);
    let css_after = fs::metadata(temp.path().join("public/styles.min.css"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(css_modified, css_after);
}

#[test]
fn test_view_change_recompiles_without_clean() {
    let (temp, pipeline) = create_pipeline(default_config(), BuildMode::Development);
    pipeline.full_build().unwrap();

    let changed = create_test_file(&temp.path().join("src"), "views/index.pug", b"p v2\n");
    let request = RebuildRequest::from_paths(&temp.path().join("src"), [changed.as_path()]);
    let result = run_rebuild(&pipeline, &LiveReload::new(), request).unwrap();

    assert_eq!(result.kinds(), vec![StepKind::Styles, StepKind::Scripts, StepKind::Markup]);
    assert_eq!(read(temp.path().join("public/index.html")), "<p>v2</p>");
    assert!(temp.path().join("public/images/logo.png").is_file());
}
