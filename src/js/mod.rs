//! Script transform for the asset pipeline.
//!
//! Pure Rust, no shell-out to `node`. A source file goes through three
//! stages:
//!
//! 1. **lex**: tokens, with syntax checks for unterminated literals and
//!    unbalanced brackets
//! 2. **lower**: token-level rewrites of ES2015+ syntax to ES5, arrow
//!    functions and function-scoped `let`/`const` included
//! 3. **minify**: drop comments and redundant whitespace
//!
//! Syntax that needs a full parse to lower (classes, block-scoped
//! declarations in nested blocks, tagged templates) is passed through as is.
//!
//! ```ignore
//! let out = sitepipe::js::transpile_and_minify("const greet = `hi ${name}`;")?;
//! assert_eq!(out, "var greet=\"hi \".concat(name);");
//! ```

pub mod arrows;
pub mod declarations;
pub mod lexer;
pub mod lower;
pub mod minify;

use thiserror::Error;

pub use lexer::{lex, Token, TokenKind};

/// A syntax error found while lexing a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ScriptError {
    /// 1-indexed line
    pub line: usize,
    /// 1-indexed column
    pub column: usize,
    /// What went wrong
    pub message: String,
}

/// Lower a script to ES5 and minify it.
pub fn transpile_and_minify(source: &str) -> Result<String, ScriptError> {
    let tokens = lower::lower(lex(source)?);
    Ok(minify::minify_tokens(&tokens))
}
