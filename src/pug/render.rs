//! Node tree to compact HTML, following includes.

use super::expr::Value;
use super::parse::{parse, Element, Node, Segment};
use super::{Locals, PugError};
use std::fs;
use std::path::{Path, PathBuf};

/// Elements written without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Render the view at `entry`.
///
/// `include` paths are relative to the including file; paths starting with
/// `/` are relative to `basedir`.
pub fn render_file(entry: &Path, basedir: &Path, locals: &Locals) -> Result<String, PugError> {
    let mut renderer = Renderer { basedir, locals, stack: Vec::new() };
    let mut html = String::new();
    renderer.render_path(entry, &mut html)?;
    Ok(html)
}

struct Renderer<'a> {
    basedir: &'a Path,
    locals: &'a Locals,
    /// Files being rendered, outermost first
    stack: Vec<PathBuf>,
}

impl Renderer<'_> {
    fn render_path(&mut self, path: &Path, out: &mut String) -> Result<(), PugError> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.stack.contains(&key) {
            return Err(PugError::CircularInclude(path.to_path_buf()));
        }

        let source = fs::read_to_string(path)
            .map_err(|source| PugError::Read { path: path.to_path_buf(), source })?;
        let nodes = parse(&source, path)?;

        self.stack.push(key);
        let rendered = self.render_nodes(&nodes, path, out);
        self.stack.pop();
        rendered
    }

    fn render_nodes(
        &mut self,
        nodes: &[Node],
        file: &Path,
        out: &mut String,
    ) -> Result<(), PugError> {
        let mut after_text = false;
        for node in nodes {
            let is_text = matches!(node, Node::Text(_));
            if is_text && after_text {
                out.push('\n');
            }
            after_text = is_text;

            match node {
                Node::Doctype(kind) if kind == "html" => out.push_str("<!DOCTYPE html>"),
                Node::Doctype(kind) => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(kind);
                    out.push('>');
                }
                Node::Element(element) => self.render_element(element, file, out)?,
                Node::Text(segments) => self.render_segments(segments, out),
                Node::Code { expr, escape } => {
                    let text = expr.eval(self.locals).to_text();
                    out.push_str(&if *escape { escape_html(&text) } else { text });
                }
                Node::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
                Node::Include { path, line, column } => {
                    self.render_include(path, file, (*line, *column), out)?
                }
            }
        }
        Ok(())
    }

    fn render_element(
        &mut self,
        element: &Element,
        file: &Path,
        out: &mut String,
    ) -> Result<(), PugError> {
        out.push('<');
        out.push_str(&element.tag);
        self.render_attrs(element, out);

        if element.self_closing {
            out.push_str("/>");
            return Ok(());
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&element.tag.as_str()) && element.children.is_empty() {
            return Ok(());
        }

        self.render_nodes(&element.children, file, out)?;
        out.push_str("</");
        out.push_str(&element.tag);
        out.push('>');
        Ok(())
    }

    /// Attributes in source order, with every `class` merged at the first.
    fn render_attrs(&self, element: &Element, out: &mut String) {
        let classes: Vec<String> = element
            .attrs
            .iter()
            .filter(|a| a.name == "class")
            .filter_map(|a| a.value.as_ref().map(|v| v.eval(self.locals)))
            .filter(|v| !v.is_absent())
            .map(|v| v.to_js_string())
            .filter(|v| !v.is_empty())
            .collect();
        let mut classes_written = false;

        for attr in &element.attrs {
            if attr.name == "class" {
                if !classes_written && !classes.is_empty() {
                    push_attr(out, "class", &escape_html(&classes.join(" ")));
                }
                classes_written = true;
                continue;
            }

            let value = match &attr.value {
                None => Value::Bool(true),
                Some(expr) => expr.eval(self.locals),
            };
            match value {
                v if v.is_absent() => {}
                Value::Bool(true) => {
                    out.push(' ');
                    out.push_str(&attr.name);
                }
                v => {
                    let text = v.to_js_string();
                    let text = if attr.escape { escape_html(&text) } else { text };
                    push_attr(out, &attr.name, &text);
                }
            }
        }
    }

    fn render_segments(&self, segments: &[Segment], out: &mut String) {
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Interpolation { expr, escape } => {
                    let text = expr.eval(self.locals).to_text();
                    out.push_str(&if *escape { escape_html(&text) } else { text });
                }
            }
        }
    }

    fn render_include(
        &mut self,
        target: &str,
        from: &Path,
        (line, column): (usize, usize),
        out: &mut String,
    ) -> Result<(), PugError> {
        let mut path = match target.strip_prefix('/') {
            Some(rooted) => self.basedir.join(rooted),
            None => from.parent().unwrap_or(Path::new("")).join(target),
        };
        if path.extension().is_none() {
            path.set_extension("pug");
        }
        if !path.is_file() {
            return Err(PugError::Syntax {
                file: from.to_path_buf(),
                line,
                column,
                message: format!("included file not found: {}", path.display()),
            });
        }

        if path.extension().is_some_and(|ext| ext == "pug") {
            self.render_path(&path, out)
        } else {
            let text = fs::read_to_string(&path)
                .map_err(|source| PugError::Read { path: path.clone(), source })?;
            out.push_str(&text);
            Ok(())
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(value);
    out.push('"');
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
