//! Pug views rendered to HTML.
//!
//! Covers the part of pug a site entry view uses:
//!
//! - `doctype`, tags with `#id`/`.class` shorthand and `(name=expr, ...)`
//!   attributes, `tag/` self-closing, `a: b` block expansion
//! - inline text, `| piped` text, `tag.` text blocks and `<html>` lines
//! - `#{expr}` and `!{expr}` interpolation, `= expr` and `!= expr` output
//! - `//` comments (written) and `//-` comments (dropped)
//! - `include`, relative to the including file or to `basedir` for `/paths`
//!
//! Expressions are literals, template strings, names from [`Locals`],
//! parentheses and `+`. Output is compact, with no whitespace between tags.

mod expr;
mod parse;
mod render;

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

pub use render::render_file;

/// Variables visible to a view.
pub type Locals = BTreeMap<String, String>;

/// Error while rendering a view.
#[derive(Debug, Error)]
pub enum PugError {
    /// Malformed view source
    #[error("{}:{line}:{column}: {message}", file.display())]
    Syntax {
        file: PathBuf,
        /// 1-indexed line
        line: usize,
        /// 1-indexed column
        column: usize,
        message: String,
    },
    /// View or included file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A view includes itself, directly or through others
    #[error("circular include of {}", .0.display())]
    CircularInclude(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn views_with(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = temp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        temp
    }

    fn locals() -> Locals {
        Locals::from([
            ("baseurl".to_string(), "http://localhost:9000/".to_string()),
            ("version".to_string(), String::new()),
        ])
    }

    fn render(source: &str) -> String {
        let temp = views_with(&[("index.pug", source)]);
        render_file(&temp.path().join("index.pug"), temp.path(), &locals()).unwrap()
    }

    fn render_err(source: &str) -> PugError {
        let temp = views_with(&[("index.pug", source)]);
        render_file(&temp.path().join("index.pug"), temp.path(), &locals()).unwrap_err()
    }

    #[test]
    fn test_document_with_asset_links() {
        let source = "\
doctype html
html(lang=\"en\")
  head
    meta(charset=\"utf-8\")
    title My site
    link(rel=\"stylesheet\", href=baseurl + \"styles.min.css\" + version)
  body
    h1.title#main Hello
    script(src=`${baseurl}scripts.min.js${version}`)
";
        assert_eq!(
            render(source),
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>My site</title>\
             <link rel=\"stylesheet\" href=\"http://localhost:9000/styles.min.css\"></head>\
             <body><h1 class=\"title\" id=\"main\">Hello</h1>\
             <script src=\"http://localhost:9000/scripts.min.js\"></script></body></html>"
        );
    }

    #[test]
    fn test_text_interpolation() {
        assert_eq!(render("p Served from #{baseurl}"), "<p>Served from http://localhost:9000/</p>");
        assert_eq!(render("p \\#{baseurl}"), "<p>#{baseurl}</p>");
        assert_eq!(render("p #{'<b>'} !{'<i>'}"), "<p>&lt;b&gt; <i></p>");
        assert_eq!(render("p= baseurl + 'x'"), "<p>http://localhost:9000/x</p>");
    }

    #[test]
    fn test_shorthand_and_attribute_classes_merge() {
        assert_eq!(render(".a.b(class=\"c\")"), "<div class=\"a b c\"></div>");
        assert_eq!(
            render("a(href=\"/\" data-x='1' hidden) x"),
            "<a href=\"/\" data-x=\"1\" hidden>x</a>"
        );
        assert_eq!(render("input(disabled=false, value=missing)"), "<input>");
    }

    #[test]
    fn test_piped_text_and_text_blocks() {
        assert_eq!(render("p\n  | one\n  | two"), "<p>one\ntwo</p>");
        assert_eq!(
            render("script.\n  var a = 1;\n\n  go(a);\nfooter"),
            "<script>var a = 1;\n\ngo(a);</script><footer></footer>"
        );
    }

    #[test]
    fn test_comments_expansion_and_self_closing() {
        assert_eq!(render("// note\n//- hidden\n  still hidden\nbr"), "<!-- note--><br>");
        assert_eq!(render("ul\n  li: a(href=\"/\") Home"), "<ul><li><a href=\"/\">Home</a></li></ul>");
        assert_eq!(render("foo/"), "<foo/>");
        assert_eq!(render("<!-- raw -->\np"), "<!-- raw --><p></p>");
    }

    #[test]
    fn test_includes() {
        let temp = views_with(&[
            ("views/index.pug", "body\n  include partials/nav\n  include /shared/footer.html"),
            ("views/partials/nav.pug", "nav\n  a(href=baseurl) home"),
            ("shared/footer.html", "<footer></footer>"),
        ]);
        let html =
            render_file(&temp.path().join("views/index.pug"), temp.path(), &locals()).unwrap();
        assert_eq!(
            html,
            "<body><nav><a href=\"http://localhost:9000/\">home</a></nav><footer></footer></body>"
        );
    }

    #[test]
    fn test_circular_include() {
        let temp = views_with(&[("a.pug", "include b"), ("b.pug", "include a")]);
        let err = render_file(&temp.path().join("a.pug"), temp.path(), &locals()).unwrap_err();
        assert!(matches!(err, PugError::CircularInclude(_)), "{}", err);
    }

    #[test]
    fn test_syntax_errors_carry_location() {
        let PugError::Syntax { line, column, message, .. } = render_err("div\n  p(href=)") else {
            panic!("expected a syntax error");
        };
        assert_eq!((line, column), (2, 10));
        assert_eq!(message, "expected an expression");

        let PugError::Syntax { line, message, .. } = render_err("div\n    p\n  span") else {
            panic!("expected a syntax error");
        };
        assert_eq!(line, 3);
        assert_eq!(message, "inconsistent indentation");

        assert!(matches!(render_err("- var x = 1"), PugError::Syntax { .. }));
        assert!(matches!(render_err("include missing"), PugError::Syntax { .. }));
    }

    #[test]
    fn test_missing_entry() {
        let err = render_file(Path::new("/no/such/index.pug"), Path::new("/"), &locals());
        assert!(matches!(err, Err(PugError::Read { .. })));
    }
}
