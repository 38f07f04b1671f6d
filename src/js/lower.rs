//! Token-level lowering of newer syntax to ES5.
//!
//! Rewrites done here: untagged template literals, trailing call/parameter
//! commas, numeric separators, binary/octal literals and optional catch
//! bindings. Arrow functions and function-scoped `let`/`const` follow in
//! their own passes.

use super::arrows::lower_arrows;
use super::declarations::lower_declarations;
use super::lexer::{is_expression_keyword, Template, Token, TokenKind};

/// Binding name introduced for `catch {` blocks.
pub const CATCH_BINDING: &str = "_unused";

/// Lower a token stream. Trivia is kept so the result still renders readably.
pub fn lower(tokens: Vec<Token>) -> Vec<Token> {
    lower_declarations(lower_arrows(lower_literals(tokens)))
}

fn lower_literals(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Template(template) => {
                if is_tagged(last_significant(&out)) {
                    out.push(token.clone());
                } else {
                    out.extend(lower_template(template, token.pos));
                }
            }
            TokenKind::Number => out.push(lower_number(token)),
            TokenKind::Punct if token.text == "," => {
                let next = next_significant(&tokens, i + 1);
                if !next.is_some_and(|t| t.is_punct(")")) {
                    out.push(token.clone());
                }
            }
            TokenKind::Ident if token.text == "catch" => {
                out.push(token.clone());
                let prev = last_significant(&out[..out.len() - 1]);
                let is_member = prev.is_some_and(|t| t.is_punct(".") || t.is_punct("?."));
                let next = next_significant(&tokens, i + 1);
                if !is_member && next.is_some_and(|t| t.is_punct("{")) {
                    out.push(Token::synthetic(TokenKind::Punct, "(", token.pos));
                    out.push(Token::synthetic(TokenKind::Ident, CATCH_BINDING, token.pos));
                    out.push(Token::synthetic(TokenKind::Punct, ")", token.pos));
                }
            }
            _ => out.push(token.clone()),
        }
    }

    out
}

fn last_significant(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().rev().find(|t| !t.is_trivia())
}

fn next_significant(tokens: &[Token], from: usize) -> Option<&Token> {
    tokens.get(from..)?.iter().find(|t| !t.is_trivia())
}

/// A template directly after an expression is a tagged template.
fn is_tagged(prev: Option<&Token>) -> bool {
    match prev {
        None => false,
        Some(tok) => match &tok.kind {
            TokenKind::Ident => !is_expression_keyword(&tok.text),
            TokenKind::Punct => matches!(tok.text.as_str(), ")" | "]"),
            TokenKind::Template(_) => true,
            _ => false,
        },
    }
}

/// `` `a${x}b` `` becomes `"a".concat(x, "b")`, matching ToString conversion.
fn lower_template(template: &Template, pos: usize) -> Vec<Token> {
    let string = |raw: &str| Token::synthetic(TokenKind::String, quasi_to_string(raw), pos);
    let punct = |text: &str| Token::synthetic(TokenKind::Punct, text, pos);

    let mut out = vec![string(&template.quasis[0])];
    if template.exprs.is_empty() {
        return out;
    }

    out.push(punct("."));
    out.push(Token::synthetic(TokenKind::Ident, "concat", pos));
    out.push(punct("("));

    for (i, expr) in template.exprs.iter().enumerate() {
        if i > 0 {
            out.push(punct(","));
        }

        let lowered = lower(expr.clone());
        if has_top_level_comma(&lowered) {
            out.push(punct("("));
            out.extend(lowered);
            out.push(punct(")"));
        } else {
            out.extend(lowered);
        }

        let quasi = &template.quasis[i + 1];
        if !quasi.is_empty() {
            out.push(punct(","));
            out.push(string(quasi));
        }
    }

    out.push(punct(")"));
    out
}

fn has_top_level_comma(tokens: &[Token]) -> bool {
    let mut depth = 0i32;
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Punct) {
        match token.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            "," if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Convert raw template text to a double-quoted string literal.
pub fn quasi_to_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');

    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('`') => out.push('`'),
                Some('$') => out.push('$'),
                Some('{') => out.push('{'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                    if next == '\r' && chars.peek() == Some(&'\n') {
                        out.push('\n');
                        chars.next();
                    }
                }
                None => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }

    out.push('"');
    out
}

/// Strip numeric separators and turn `0b`/`0o` literals into decimal.
fn lower_number(token: &Token) -> Token {
    let text = token.text.replace('_', "");
    let lowered = if text.ends_with('n') {
        text
    } else {
        let radix = match text.get(..2) {
            Some("0b") | Some("0B") => Some(2),
            Some("0o") | Some("0O") => Some(8),
            _ => None,
        };
        match radix.and_then(|r| u128::from_str_radix(&text[2..], r).ok()) {
            Some(value) => value.to_string(),
            None => text,
        }
    };
    Token { kind: TokenKind::Number, text: lowered, pos: token.pos }
}
