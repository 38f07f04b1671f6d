//! Whitespace and comment removal over a token stream.
//!
//! A newline is kept wherever automatic semicolon insertion could depend on
//! it; a single space is kept only where two tokens would otherwise fuse.

use super::lexer::{Token, TokenKind};

/// Keywords whose statement ends at a line break.
const RESTRICTED: &[&str] = &["return", "break", "continue", "throw", "yield"];

/// Punctuators that can never begin a statement.
const NO_STATEMENT_START: &[&str] = &[
    ")", "]", "}", ",", ";", ".", "?.", "?", ":", "=", "==", "===", "!=", "!==", ">", ">=", "<",
    "<=", "*", "/", "%", "**", "&", "|", "^", "&&", "||", "??", "+=", "-=", "*=", "/=", "%=",
    "**=", "<<", ">>", ">>>", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=", "||=", "??=", "=>",
];

/// Emit tokens with minimal separation.
pub fn minify_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    let mut saw_newline = false;

    for token in tokens {
        if token.is_trivia() {
            saw_newline |= token.has_newline();
            continue;
        }

        if let Some(p) = prev {
            if saw_newline && newline_matters(p, token) {
                out.push('\n');
            } else if needs_space(p, token) {
                out.push(' ');
            }
        }

        out.push_str(&token.text);
        prev = Some(token);
        saw_newline = false;
    }

    out
}

/// Whether a line break between these tokens could end a statement.
pub(super) fn newline_matters(prev: &Token, next: &Token) -> bool {
    if prev.kind == TokenKind::Ident && RESTRICTED.contains(&prev.text.as_str()) {
        return !(next.is_punct(";") || next.is_punct("}"));
    }
    if prev.kind == TokenKind::Punct && !matches!(prev.text.as_str(), "++" | "--" | ")" | "]" | "}")
    {
        return false;
    }
    if next.kind == TokenKind::Punct && NO_STATEMENT_START.contains(&next.text.as_str()) {
        return false;
    }
    true
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\\' || !c.is_ascii()
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    let (Some(a), Some(b)) = (prev.text.chars().last(), next.text.chars().next()) else {
        return false;
    };

    if is_word_char(a) && is_word_char(b) {
        return true;
    }
    // `/x/ in y`: a word right after a regex would read as flags
    if prev.kind == TokenKind::Regex && is_word_char(b) {
        return true;
    }
    // `a + +b`, `a - -b`, `a / /re/`
    if (a == '+' || a == '-') && a == b {
        return true;
    }
    if a == '/' && (b == '/' || b == '*') {
        return true;
    }
    // `1 .toString()`
    if prev.kind == TokenKind::Number && b == '.' && prev.text.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    // `<!--` opens an HTML-like comment
    if a == '<' && next.text.starts_with('!') {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::lexer::lex;

    fn minified(source: &str) -> String {
        minify_tokens(&lex(source).unwrap())
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(minified("function foo ( x ) { return x + 1 ; }"), "function foo(x){return x+1;}");
    }

    #[test]
    fn test_strips_comments_keeps_strings() {
        let source = "/* header */\nvar x = \"/* not a comment */\"; // trailing\nvar y = 'a  b';";
        assert_eq!(minified(source), "var x=\"/* not a comment */\";var y='a  b';");
    }

    #[test]
    fn test_keeps_newline_for_asi() {
        assert_eq!(minified("var a = 1\nvar b = 2\n"), "var a=1\nvar b=2");
        assert_eq!(minified("a = b\n(c || d).e()"), "a=b\n(c||d).e()");
        assert_eq!(minified("a++\nb"), "a++\nb");
    }

    #[test]
    fn test_drops_newline_where_asi_cannot_apply() {
        assert_eq!(minified("var a = {\n  b: 1,\n  c: 2\n};"), "var a={b:1,c:2};");
        assert_eq!(minified("x = y\n  .filter(f)\n  .map(g);"), "x=y.filter(f).map(g);");
    }

    #[test]
    fn test_restricted_productions() {
        assert_eq!(minified("function f() {\n  return\n  42\n}"), "function f(){return\n42}");
        assert_eq!(minified("function f() {\n  return;\n}"), "function f(){return;}");
    }

    #[test]
    fn test_operator_fusion_guarded() {
        assert_eq!(minified("a + +b - -c"), "a+ +b- -c");
        assert_eq!(minified("a + ++b"), "a+ ++b");
        assert_eq!(minified("x = a / /re/.exec(s).length"), "x=a/ /re/.exec(s).length");
        assert_eq!(minified("1 .toString()"), "1 .toString()");
        assert_eq!(minified("1.5 .toFixed()"), "1.5.toFixed()");
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(minified("typeof x === 'string'"), "typeof x==='string'");
        assert_eq!(minified("return /x/g in y"), "return/x/g in y");
        assert_eq!(minified("a instanceof B"), "a instanceof B");
    }

    #[test]
    fn test_regex_followed_by_keyword() {
        assert_eq!(minified("var ok = /x/ in y;"), "var ok=/x/ in y;");
        assert_eq!(minified("if (/a/ instanceof RegExp) {}"), "if(/a/ instanceof RegExp){}");

        let out = minified("var ok = /x/ in y;");
        let regexes: Vec<String> = lex(&out)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TokenKind::Regex)
            .map(|t| t.text)
            .collect();
        assert_eq!(regexes, vec!["/x/".to_string()]);
    }
}
