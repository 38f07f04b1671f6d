//! Indentation-based parse of a view into a node tree.

use super::expr::{parse_expr, Expr, ExprError, Value};
use super::PugError;
use std::path::Path;

/// A node of the view tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `doctype html`
    Doctype(String),
    Element(Element),
    /// Inline, piped or block text
    Text(Vec<Segment>),
    /// `= expr` or `!= expr`
    Code { expr: Expr, escape: bool },
    /// `// comment`, written to the page
    Comment(String),
    /// `include path`
    Include { path: String, line: usize, column: usize },
}

/// A tag with its attributes and nested content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    /// In source order; `#id` and `.class` shorthands included
    pub attrs: Vec<Attr>,
    /// `tag/`
    pub self_closing: bool,
    pub children: Vec<Node>,
}

/// `name`, `name=expr` or `name!=expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    /// `None` for a bare boolean attribute
    pub value: Option<Expr>,
    pub escape: bool,
}

/// A run of text: literal, or a `#{}`/`!{}` interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Interpolation { expr: Expr, escape: bool },
}

/// What follows the tag head on its line.
enum Tail {
    None,
    Text(usize),
    Code { at: usize, escape: bool },
    TextBlock,
    Expansion(usize),
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    raw: &'a str,
}

impl<'a> Line<'a> {
    fn new(number: usize, raw: &'a str) -> Self {
        let indent = raw.len() - raw.trim_start_matches([' ', '\t']).len();
        Self { number, indent, raw }
    }

    fn content(&self) -> &'a str {
        self.raw[self.indent..].trim_end()
    }

    fn is_blank(&self) -> bool {
        self.content().is_empty()
    }
}

/// Parse a whole view.
pub fn parse(source: &str, file: &Path) -> Result<Vec<Node>, PugError> {
    let lines = source.lines().enumerate().map(|(i, raw)| Line::new(i + 1, raw)).collect();
    let mut parser = Parser { lines, next: 0, file };
    parser.parse_block(None)
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    next: usize,
    file: &'a Path,
}

impl<'a> Parser<'a> {
    fn error(&self, line: Line<'_>, offset: usize, message: impl Into<String>) -> PugError {
        PugError::Syntax {
            file: self.file.to_path_buf(),
            line: line.number,
            column: line.indent + offset + 1,
            message: message.into(),
        }
    }

    fn expr_error(&self, line: Line<'_>, offset: usize, err: ExprError) -> PugError {
        self.error(line, offset + err.offset, err.message)
    }

    /// Parse sibling lines indented deeper than `parent`.
    fn parse_block(&mut self, parent: Option<usize>) -> Result<Vec<Node>, PugError> {
        let mut nodes = Vec::new();
        let mut block_indent: Option<usize> = None;

        while let Some(&line) = self.lines.get(self.next) {
            if line.is_blank() {
                self.next += 1;
                continue;
            }
            if parent.is_some_and(|p| line.indent <= p) {
                break;
            }
            match block_indent {
                None => block_indent = Some(line.indent),
                Some(indent) if line.indent > indent => {
                    return Err(self.error(line, 0, "unexpected indentation"))
                }
                Some(indent) if line.indent < indent => {
                    return Err(self.error(line, 0, "inconsistent indentation"))
                }
                Some(_) => {}
            }
            self.next += 1;
            self.parse_line(line, &mut nodes)?;
        }

        Ok(nodes)
    }

    fn parse_line(&mut self, line: Line<'a>, nodes: &mut Vec<Node>) -> Result<(), PugError> {
        let content = line.content();

        if content.starts_with("//-") {
            self.raw_block(line.indent);
        } else if let Some(text) = content.strip_prefix("//") {
            let mut comment = text.to_string();
            for nested in self.raw_block(line.indent) {
                comment.push('\n');
                comment.push_str(&nested);
            }
            nodes.push(Node::Comment(comment));
        } else if let Some(rest) = content.strip_prefix('|') {
            let text = rest.strip_prefix(' ').unwrap_or(rest);
            let offset = content.len() - text.len();
            nodes.push(Node::Text(self.parse_text(line, offset, text)?));
        } else if content.starts_with('<') {
            nodes.push(Node::Text(self.parse_text(line, 0, content)?));
        } else if let Some(rest) = keyword(content, "doctype") {
            let value = rest.trim();
            nodes.push(Node::Doctype(if value.is_empty() { "html" } else { value }.to_string()));
        } else if let Some(rest) = keyword(content, "include") {
            let path = rest.trim();
            if path.is_empty() {
                return Err(self.error(line, 0, "include needs a path"));
            }
            let column = line.indent + content.len() - rest.trim_start().len() + 1;
            nodes.push(Node::Include { path: path.to_string(), line: line.number, column });
        } else if content.starts_with("!=") || content.starts_with('=') {
            let escape = content.starts_with('=');
            let at = if escape { 1 } else { 2 };
            nodes.push(self.parse_code(line, at, escape)?);
        } else if content.starts_with('-') {
            return Err(self.error(line, 0, "inline code is not supported"));
        } else {
            nodes.push(self.parse_element(line, 0)?);
        }
        Ok(())
    }

    fn parse_code(&self, line: Line<'_>, at: usize, escape: bool) -> Result<Node, PugError> {
        let source = &line.content()[at..];
        let expr = parse_expr(source).map_err(|e| self.expr_error(line, at, e))?;
        Ok(Node::Code { expr, escape })
    }

    /// Parse a tag starting at byte `start` of the line's content, and
    /// everything nested under it.
    fn parse_element(&mut self, line: Line<'a>, start: usize) -> Result<Node, PugError> {
        let content = line.content();
        let (mut element, tail) = self.parse_tag_head(line, start)?;

        match tail {
            Tail::None => element.children = self.parse_block(Some(line.indent))?,
            Tail::Text(at) => {
                element.children.push(Node::Text(self.parse_text(line, at, &content[at..])?));
                element.children.extend(self.parse_block(Some(line.indent))?);
            }
            Tail::Code { at, escape } => {
                element.children.push(self.parse_code(line, at, escape)?);
                element.children.extend(self.parse_block(Some(line.indent))?);
            }
            Tail::TextBlock => {
                let text = self.raw_block(line.indent).join("\n");
                if !text.is_empty() {
                    element.children.push(Node::Text(self.parse_text(line, 0, &text)?));
                }
            }
            Tail::Expansion(at) => element.children.push(self.parse_element(line, at)?),
        }

        if element.self_closing && !element.children.is_empty() {
            return Err(self.error(line, start, "self-closing element cannot have content"));
        }
        Ok(Node::Element(element))
    }

    fn parse_tag_head(&self, line: Line<'_>, start: usize) -> Result<(Element, Tail), PugError> {
        let content = line.content();
        let bytes = content.as_bytes();
        let mut i = start;

        while i < bytes.len() && is_tag_char(bytes, i) {
            i += 1;
        }
        let mut element = Element { tag: content[start..i].to_string(), ..Element::default() };
        if element.tag.is_empty() {
            let shorthand = matches!(bytes.get(i), Some(b'#' | b'.'))
                && bytes.get(i + 1).is_some_and(|&b| is_name_byte(b));
            if !shorthand {
                let found = content[i..].chars().next().unwrap_or(' ');
                return Err(self.error(line, i, format!("unexpected '{}'", found)));
            }
            element.tag = "div".to_string();
        } else if !bytes[start].is_ascii_alphabetic() {
            return Err(self.error(line, start, "tag names start with a letter"));
        }

        loop {
            match bytes.get(i) {
                Some(&b @ (b'#' | b'.')) if bytes.get(i + 1).is_some_and(|&n| is_name_byte(n)) => {
                    let name_start = i + 1;
                    i = name_start;
                    while i < bytes.len() && is_name_byte(bytes[i]) {
                        i += 1;
                    }
                    let name = if b == b'#' { "id" } else { "class" };
                    element.attrs.push(Attr {
                        name: name.to_string(),
                        value: Some(Expr::Literal(Value::Str(content[name_start..i].to_string()))),
                        escape: true,
                    });
                }
                Some(b'(') => {
                    let close = find_close(content, i)
                        .ok_or_else(|| self.error(line, i, "unclosed '('"))?;
                    element.attrs.extend(self.parse_attrs(line, i + 1, close)?);
                    i = close + 1;
                }
                _ => break,
            }
        }

        let rest = &content[i..];
        let tail = if rest.is_empty() {
            Tail::None
        } else if rest == "/" {
            element.self_closing = true;
            Tail::None
        } else if rest == "." {
            Tail::TextBlock
        } else if let Some(expanded) = rest.strip_prefix(": ") {
            Tail::Expansion(i + rest.len() - expanded.trim_start().len())
        } else if rest.starts_with("!=") {
            Tail::Code { at: i + 2, escape: false }
        } else if rest.starts_with('=') {
            Tail::Code { at: i + 1, escape: true }
        } else if rest.starts_with(' ') {
            Tail::Text(i + 1)
        } else {
            let found = rest.chars().next().unwrap_or(' ');
            return Err(self.error(line, i, format!("unexpected '{}'", found)));
        };

        Ok((element, tail))
    }

    /// Attributes between byte offsets `start` and `end` of the content.
    fn parse_attrs(
        &self,
        line: Line<'_>,
        start: usize,
        end: usize,
    ) -> Result<Vec<Attr>, PugError> {
        let content = line.content();
        let bytes = content.as_bytes();
        let mut attrs = Vec::new();
        let mut i = start;

        loop {
            while i < end && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
                i += 1;
            }
            if i >= end {
                return Ok(attrs);
            }

            let name_start = i;
            while i < end && !matches!(bytes[i], b'=' | b'!' | b',' | b' ' | b'\t') {
                i += 1;
            }
            if i == name_start {
                return Err(self.error(line, i, "expected an attribute name"));
            }
            let name = content[name_start..i].to_string();

            let mut j = i;
            while j < end && bytes[j] == b' ' {
                j += 1;
            }
            let (escape, value_start) = if content[j..end].starts_with("!=") {
                (false, j + 2)
            } else if content[j..end].starts_with('=') {
                (true, j + 1)
            } else {
                attrs.push(Attr { name, value: None, escape: true });
                continue;
            };

            let value_end = attr_value_end(&content[..end], value_start);
            let expr = parse_expr(&content[value_start..value_end])
                .map_err(|e| self.expr_error(line, value_start, e))?;
            attrs.push(Attr { name, value: Some(expr), escape });
            i = value_end;
        }
    }

    /// Split text into literal runs and interpolations.
    fn parse_text(
        &self,
        line: Line<'_>,
        offset: usize,
        text: &str,
    ) -> Result<Vec<Segment>, PugError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];
            if rest.starts_with("\\#{") || rest.starts_with("\\!{") {
                literal.push_str(&rest[1..3]);
                i += 3;
                continue;
            }
            if rest.starts_with("#{") || rest.starts_with("!{") {
                let close = find_close(text, i + 1)
                    .ok_or_else(|| self.error(line, offset + i, "unclosed interpolation"))?;
                let expr = parse_expr(&text[i + 2..close])
                    .map_err(|e| self.expr_error(line, offset + i + 2, e))?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Interpolation { expr, escape: rest.starts_with('#') });
                i = close + 1;
                continue;
            }
            let c = rest.chars().next().unwrap_or_default();
            literal.push(c);
            i += c.len_utf8();
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    /// Take every following line indented deeper than `parent`, with the
    /// common indentation removed.
    fn raw_block(&mut self, parent: usize) -> Vec<String> {
        let start = self.next;
        while let Some(line) = self.lines.get(self.next) {
            if !line.is_blank() && line.indent <= parent {
                break;
            }
            self.next += 1;
        }

        let block = &self.lines[start..self.next];
        let base = block.iter().filter(|l| !l.is_blank()).map(|l| l.indent).min().unwrap_or(0);
        let mut out: Vec<String> = block
            .iter()
            .map(|l| if l.is_blank() { String::new() } else { l.raw[base..].trim_end().to_string() })
            .collect();
        while out.last().is_some_and(|l| l.is_empty()) {
            out.pop();
        }
        out
    }
}

/// `word` alone, or followed by a space.
fn keyword<'s>(content: &'s str, word: &str) -> Option<&'s str> {
    let rest = content.strip_prefix(word)?;
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest)
    } else {
        None
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Tag names allow `:` only between name characters, so `a: b` stays an expansion.
fn is_tag_char(bytes: &[u8], i: usize) -> bool {
    is_name_byte(bytes[i])
        || (bytes[i] == b':' && bytes.get(i + 1).is_some_and(|&b| is_name_byte(b)))
}

/// Index of the bracket closing the one at byte `open`, skipping quoted text.
fn find_close(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// End of an attribute value: a top-level comma, or whitespace that is not
/// next to an operator.
fn attr_value_end(s: &str, start: usize) -> usize {
    const OPERATORS: &[u8] = b"+-*/%?:|&<>=!";
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;

    while i < bytes.len() && bytes[i] == b' ' {
        i += 1;
    }
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => return i,
            b' ' | b'\t' if depth == 0 => {
                let before = s[..i].trim_end().bytes().last();
                let after = s[i..].trim_start().bytes().next();
                let joined = before.is_some_and(|c| OPERATORS.contains(&c))
                    || after.is_some_and(|c| OPERATORS.contains(&c));
                if !joined {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len().min(i)
}
