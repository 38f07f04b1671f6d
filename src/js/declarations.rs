//! `let` and `const` to `var` where the scope does not change.
//!
//! A declaration directly in the program or in a function body has the same
//! scope as a `var`. Declarations in nested blocks and loop heads keep
//! their block scoping and are left alone.

use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    FunctionBody,
    Block,
    Group,
}

/// Rewrite function-scoped `let`/`const` declarations to `var`.
pub fn lower_declarations(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut frames: Vec<Frame> = Vec::new();
    // `(` frames opened after a control keyword
    let mut heads: Vec<bool> = Vec::new();
    let mut closed_head = false;
    let mut prev: Option<usize> = None;

    for (i, token) in tokens.iter().enumerate() {
        if token.is_trivia() {
            out.push(token.clone());
            continue;
        }
        let prev_token = prev.map(|p| &tokens[p]);

        let function_scope = matches!(frames.last(), None | Some(Frame::FunctionBody));
        if function_scope && is_declaration(prev_token, token, next_significant(&tokens, i + 1)) {
            out.push(Token { kind: TokenKind::Ident, text: "var".to_string(), pos: token.pos });
            prev = Some(i);
            continue;
        }

        if token.kind == TokenKind::Punct {
            match token.text.as_str() {
                "{" => {
                    let body = prev_token.is_some_and(|p| {
                        (p.is_punct(")") && !closed_head) || p.is_punct("=>")
                    });
                    frames.push(if body { Frame::FunctionBody } else { Frame::Block });
                }
                "(" => {
                    frames.push(Frame::Group);
                    heads.push(prev_token.is_some_and(is_control_keyword));
                }
                "[" => frames.push(Frame::Group),
                ")" => {
                    frames.pop();
                    closed_head = heads.pop().unwrap_or(false);
                }
                "]" | "}" => {
                    frames.pop();
                }
                _ => {}
            }
        }

        out.push(token.clone());
        prev = Some(i);
    }

    out
}

fn is_control_keyword(token: &Token) -> bool {
    token.kind == TokenKind::Ident
        && matches!(token.text.as_str(), "if" | "for" | "while" | "with" | "switch" | "catch")
}

/// `let`/`const` starting a declaration rather than naming something.
fn is_declaration(prev: Option<&Token>, token: &Token, next: Option<&Token>) -> bool {
    if token.kind != TokenKind::Ident || !matches!(token.text.as_str(), "let" | "const") {
        return false;
    }
    if prev.is_some_and(|p| p.is_punct(".") || p.is_punct("?.")) {
        return false;
    }
    match next {
        Some(n) if n.kind == TokenKind::Ident => !matches!(n.text.as_str(), "in" | "instanceof"),
        Some(n) => n.is_punct("[") || n.is_punct("{"),
        None => false,
    }
}

fn next_significant(tokens: &[Token], from: usize) -> Option<&Token> {
    tokens.get(from..)?.iter().find(|t| !t.is_trivia())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::lexer::lex;

    fn lowered(source: &str) -> String {
        lower_declarations(lex(source).unwrap()).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_program_level_declarations() {
        assert_eq!(lowered("const a = 1;\nlet b = 2, c;"), "var a = 1;\nvar b = 2, c;");
        assert_eq!(lowered("const { x, y } = point;"), "var { x, y } = point;");
        assert_eq!(lowered("let [first] = list;"), "var [first] = list;");
    }

    #[test]
    fn test_function_body_declarations() {
        assert_eq!(
            lowered("function f(a) { const b = a; return b; }"),
            "function f(a) { var b = a; return b; }"
        );
        assert_eq!(lowered("var o = { m() { let x = 1; } };"), "var o = { m() { var x = 1; } };");
    }

    #[test]
    fn test_block_scoped_declarations_kept() {
        assert_eq!(lowered("if (a) { let x = 1; }"), "if (a) { let x = 1; }");
        assert_eq!(lowered("for (let i = 0; i < n; i++) {}"), "for (let i = 0; i < n; i++) {}");
        assert_eq!(
            lowered("function f() { while (x) { const y = g(); } }"),
            "function f() { while (x) { const y = g(); } }"
        );
        assert_eq!(lowered("try {} catch (e) { let z; }"), "try {} catch (e) { let z; }");
    }

    #[test]
    fn test_let_as_identifier() {
        assert_eq!(lowered("obj.let = 1; let in o;"), "obj.let = 1; let in o;");
    }
}
