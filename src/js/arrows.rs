//! Arrow functions to function expressions.
//!
//! `(a, b) => a + b` becomes `function(a, b){return a + b;}` and a block
//! body is kept as the function body. A body that reads `this` gets
//! `.bind(this)`; one that reads `arguments` is left as an arrow, since a
//! plain function would see its own `arguments`. `async` arrows are left too.

use super::lexer::{is_expression_keyword, Token, TokenKind};
use super::minify::newline_matters;

/// Rewrite every arrow function in a token stream, innermost bodies included.
pub fn lower_arrows(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        if token.is_punct("=>") {
            if let Some(lowered) = lower_arrow(&tokens, i, &mut out) {
                i = lowered;
                continue;
            }
        }
        out.push(token.clone());
        i += 1;
    }

    out
}

/// Lower the arrow whose `=>` is at `tokens[arrow]`, with its parameters
/// already in `out`. Returns the index just past the body.
fn lower_arrow(tokens: &[Token], arrow: usize, out: &mut Vec<Token>) -> Option<usize> {
    let params_at = params_start(out)?;
    let body_start = (arrow + 1..tokens.len()).find(|&j| !tokens[j].is_trivia())?;
    let block = tokens[body_start].is_punct("{");
    let body_end = if block {
        matching_close(tokens, body_start)? + 1
    } else {
        concise_body_end(tokens, body_start)
    };
    let body = &tokens[body_start..body_end];
    if body.is_empty() || mentions(body, "arguments") {
        return None;
    }

    let pos = tokens[arrow].pos;
    let punct = |text: &str| Token::synthetic(TokenKind::Punct, text, pos);
    let ident = |text: &str| Token::synthetic(TokenKind::Ident, text, pos);

    let params: Vec<Token> = out.drain(params_at..).collect();
    let params = match params.iter().position(|t| !t.is_trivia()) {
        Some(first) if params[first].is_punct("(") => params,
        _ => {
            let mut wrapped = vec![punct("(")];
            wrapped.extend(params.into_iter().filter(|t| !t.is_trivia()));
            wrapped.push(punct(")"));
            wrapped
        }
    };
    let parenthesize = !in_expression_position(last_significant(out));

    if parenthesize {
        out.push(punct("("));
    }
    out.push(ident("function"));
    out.extend(params);
    if block {
        out.extend(lower_arrows(body.to_vec()));
    } else {
        let mut statement =
            vec![ident("return"), Token::synthetic(TokenKind::Whitespace, " ", pos)];
        statement.extend_from_slice(body);
        out.push(punct("{"));
        out.extend(lower_arrows(statement));
        out.push(punct(";"));
        out.push(punct("}"));
    }
    if parenthesize {
        out.push(punct(")"));
    }
    if mentions(body, "this") {
        out.push(punct("."));
        out.push(ident("bind"));
        out.push(punct("("));
        out.push(ident("this"));
        out.push(punct(")"));
    }

    Some(body_end)
}

/// Index in `out` where the arrow's parameter list begins.
fn params_start(out: &[Token]) -> Option<usize> {
    let last = last_significant_index(out)?;
    let start = match &out[last].kind {
        TokenKind::Ident => last,
        TokenKind::Punct if out[last].text == ")" => matching_open(out, last)?,
        _ => return None,
    };
    match last_significant(&out[..start]) {
        Some(prev) if prev.is_ident("async") => None,
        _ => Some(start),
    }
}

/// End of an expression body: a comma, semicolon, closing bracket or `:`
/// of an enclosing conditional at depth zero, or a line break where a
/// statement could end.
fn concise_body_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    let mut conditionals = 0usize;
    let mut last: Option<usize> = None;
    let mut newline = false;

    for (i, token) in tokens.iter().enumerate().skip(start) {
        if token.is_trivia() {
            newline |= token.has_newline();
            continue;
        }
        let end = last.map_or(start, |l| l + 1);

        if depth == 0 {
            if newline && last.is_some_and(|l| newline_matters(&tokens[l], token)) {
                return end;
            }
            if token.kind == TokenKind::Punct {
                match token.text.as_str() {
                    "," | ";" | ")" | "]" | "}" => return end,
                    ":" if conditionals == 0 => return end,
                    ":" => conditionals -= 1,
                    "?" => conditionals += 1,
                    _ => {}
                }
            }
        }
        if token.kind == TokenKind::Punct {
            match token.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        last = Some(i);
        newline = false;
    }

    last.map_or(start, |l| l + 1)
}

/// Whether a function expression here would parse as a declaration instead.
fn in_expression_position(prev: Option<&Token>) -> bool {
    match prev {
        Some(tok) if tok.kind == TokenKind::Punct => {
            !matches!(tok.text.as_str(), ";" | "{" | "}" | ")" | "]")
        }
        Some(tok) if tok.kind == TokenKind::Ident => {
            is_expression_keyword(&tok.text) && !matches!(tok.text.as_str(), "do" | "else")
        }
        _ => false,
    }
}

/// Whether `name` is read anywhere in `tokens`, template substitutions included.
fn mentions(tokens: &[Token], name: &str) -> bool {
    tokens.iter().any(|t| match &t.kind {
        TokenKind::Ident => t.text == name,
        TokenKind::Template(template) => template.exprs.iter().any(|e| mentions(e, name)),
        _ => false,
    })
}

fn last_significant_index(tokens: &[Token]) -> Option<usize> {
    tokens.iter().rposition(|t| !t.is_trivia())
}

fn last_significant(tokens: &[Token]) -> Option<&Token> {
    last_significant_index(tokens).map(|i| &tokens[i])
}

fn bracket_delta(token: &Token) -> i32 {
    if token.kind != TokenKind::Punct {
        return 0;
    }
    match token.text.as_str() {
        "(" | "[" | "{" => 1,
        ")" | "]" | "}" => -1,
        _ => 0,
    }
}

/// Index of the bracket closing the one opened at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        depth += bracket_delta(token);
        if depth == 0 {
            return Some(i);
        }
    }
    None
}

/// Index of the bracket opening the one closed at `close`.
fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0i32;
    for i in (0..=close).rev() {
        depth += bracket_delta(&tokens[i]);
        if depth == 0 {
            return Some(i);
        }
    }
    None
}
