//! JavaScript tokenizer.
//!
//! Splits source into tokens while keeping every byte, so that rendering the
//! token texts back in order reproduces the input. Template literals are
//! parsed into their quasis and lexed substitutions.

use super::ScriptError;

/// Kind of a lexed token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Spaces, tabs and line terminators
    Whitespace,
    /// `// ...` (also `#!` on the first line)
    LineComment,
    /// `/* ... */`
    BlockComment,
    /// Identifier, keyword or `#private` name
    Ident,
    /// Numeric literal
    Number,
    /// Single or double quoted string, quotes included
    String,
    /// Template literal
    Template(Template),
    /// Regular expression literal with flags
    Regex,
    /// Operator or punctuation
    Punct,
}

/// A template literal split at its `${ ... }` substitutions.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Raw text between delimiters; always one more than `exprs`
    pub quasis: Vec<String>,
    /// Tokens of each substitution
    pub exprs: Vec<Vec<Token>>,
}

/// A lexed token with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// Exact source text
    pub text: String,
    /// Character offset into the source
    pub pos: usize,
}

impl Token {
    /// Create a token not backed by source text.
    pub fn synthetic(kind: TokenKind, text: impl Into<String>, pos: usize) -> Self {
        Self { kind, text: text.into(), pos }
    }

    /// Whitespace or comment.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Punctuator with exactly this text.
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    /// Identifier with exactly this text.
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }

    /// Whether the token text contains a line terminator.
    pub fn has_newline(&self) -> bool {
        self.text.chars().any(is_line_terminator)
    }
}

/// Keywords after which an expression (and so a regex) may start.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Punctuators, longest first.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

/// Whether `word` is a keyword that can precede an expression.
pub fn is_expression_keyword(word: &str) -> bool {
    EXPRESSION_KEYWORDS.contains(&word)
}

pub(crate) fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '\\' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Statement keywords whose parenthesized head is followed by a statement.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

/// Whether a regex literal may start after this token.
fn regex_allowed(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(tok) => match &tok.kind {
            TokenKind::Punct => !matches!(tok.text.as_str(), ")" | "]" | "}"),
            TokenKind::Ident => is_expression_keyword(&tok.text),
            _ => false,
        },
    }
}

/// Tokenize a complete script.
pub fn lex(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut lexer = Lexer { chars: source.chars().collect(), pos: 0 };
    lexer.lex_tokens(false)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

/// An open bracket awaiting its match.
struct Bracket {
    open: char,
    pos: usize,
    /// `(` of an `if`/`while`/`for`/`with` head
    control: bool,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn error(&self, at: usize, message: impl Into<String>) -> ScriptError {
        let mut line = 1;
        let mut column = 1;
        let mut prev = '\0';
        for &c in &self.chars[..at.min(self.chars.len())] {
            if c == '\n' && prev == '\r' {
                prev = c;
                continue;
            }
            if is_line_terminator(c) {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
            prev = c;
        }
        ScriptError { line, column, message: message.into() }
    }

    /// Lex until end of input, or until the `}` closing a template substitution.
    fn lex_tokens(&mut self, in_substitution: bool) -> Result<Vec<Token>, ScriptError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut brackets: Vec<Bracket> = Vec::new();
        let mut last_significant: Option<usize> = None;
        // `)` ending a control head; a statement, so possibly a regex, follows
        let mut control_close: Option<usize> = None;

        loop {
            let Some(c) = self.peek(0) else {
                if in_substitution {
                    return Err(self.error(self.pos, "unterminated template literal"));
                }
                if let Some(bracket) = brackets.last() {
                    return Err(self.error(bracket.pos, format!("unclosed '{}'", bracket.open)));
                }
                return Ok(tokens);
            };

            if in_substitution && c == '}' && brackets.is_empty() {
                self.pos += 1;
                return Ok(tokens);
            }

            let prev = last_significant.map(|i| &tokens[i]);
            let after_control = control_close.is_some() && control_close == last_significant;
            let regex_ok = after_control || regex_allowed(prev);
            let token = self.next_token(c, regex_ok)?;

            if token.kind == TokenKind::Punct {
                match token.text.as_str() {
                    "(" | "[" | "{" => {
                        let control = token.text == "("
                            && prev.is_some_and(|p| {
                                p.kind == TokenKind::Ident
                                    && CONTROL_KEYWORDS.contains(&p.text.as_str())
                            });
                        let open = token.text.chars().next().unwrap_or('(');
                        brackets.push(Bracket { open, pos: token.pos, control });
                    }
                    ")" | "]" | "}" => {
                        let expected = match token.text.as_str() {
                            ")" => '(',
                            "]" => '[',
                            _ => '{',
                        };
                        match brackets.pop() {
                            Some(bracket) if bracket.open == expected => {
                                if bracket.control {
                                    control_close = Some(tokens.len());
                                }
                            }
                            _ => {
                                return Err(self.error(
                                    token.pos,
                                    format!("unexpected '{}'", token.text),
                                ))
                            }
                        }
                    }
                    _ => {}
                }
            }

            if !token.is_trivia() {
                last_significant = Some(tokens.len());
            }
            tokens.push(token);
        }
    }

    fn next_token(&mut self, c: char, regex_ok: bool) -> Result<Token, ScriptError> {
        let start = self.pos;

        let kind = if c.is_whitespace() || c == '\u{feff}' {
            while self.peek(0).is_some_and(|c| c.is_whitespace() || c == '\u{feff}') {
                self.pos += 1;
            }
            TokenKind::Whitespace
        } else if c == '#' && start == 0 && self.peek(1) == Some('!') {
            self.skip_line();
            TokenKind::LineComment
        } else if c == '/' && self.peek(1) == Some('/') {
            self.skip_line();
            TokenKind::LineComment
        } else if c == '/' && self.peek(1) == Some('*') {
            self.lex_block_comment(start)?;
            TokenKind::BlockComment
        } else if c == '/' && regex_ok {
            self.lex_regex(start)?;
            TokenKind::Regex
        } else if c == '"' || c == '\'' {
            self.lex_string(start, c)?;
            TokenKind::String
        } else if c == '`' {
            TokenKind::Template(self.lex_template(start)?)
        } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit()))
        {
            self.lex_number();
            TokenKind::Number
        } else if is_ident_start(c) || (c == '#' && self.peek(1).is_some_and(is_ident_start)) {
            self.pos += 1;
            self.lex_ident_rest();
            TokenKind::Ident
        } else {
            self.lex_punct(start)?;
            TokenKind::Punct
        };

        Ok(Token { kind, text: self.text(start), pos: start })
    }

    fn skip_line(&mut self) {
        while self.peek(0).is_some_and(|c| !is_line_terminator(c)) {
            self.pos += 1;
        }
    }

    fn lex_block_comment(&mut self, start: usize) -> Result<(), ScriptError> {
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => return Err(self.error(start, "unterminated comment")),
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_regex(&mut self, start: usize) -> Result<(), ScriptError> {
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None => return Err(self.error(start, "unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error(start, "unterminated regular expression"))
                }
                Some('\\') => {
                    self.pos += 1;
                    if self.peek(0).is_some_and(|c| !is_line_terminator(c)) {
                        self.pos += 1;
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
        Ok(())
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<(), ScriptError> {
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(self.error(start, "unterminated string literal")),
                Some('\\') => {
                    self.pos += 1;
                    // \r\n line continuation
                    if self.peek(0) == Some('\r') && self.peek(1) == Some('\n') {
                        self.pos += 1;
                    }
                    if self.peek(0).is_some() {
                        self.pos += 1;
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some('\n') | Some('\r') => {
                    return Err(self.error(start, "unterminated string literal"))
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_template(&mut self, start: usize) -> Result<Template, ScriptError> {
        self.pos += 1;
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut quasi_start = self.pos;

        loop {
            match self.peek(0) {
                None => return Err(self.error(start, "unterminated template literal")),
                Some('\\') => {
                    self.pos += 1;
                    if self.peek(0).is_some() {
                        self.pos += 1;
                    }
                }
                Some('`') => {
                    quasis.push(self.text(quasi_start));
                    self.pos += 1;
                    return Ok(Template { quasis, exprs });
                }
                Some('$') if self.peek(1) == Some('{') => {
                    quasis.push(self.text(quasi_start));
                    self.pos += 2;
                    exprs.push(self.lex_tokens(true)?);
                    quasi_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_number(&mut self) {
        let radix_prefix = self.peek(0) == Some('0')
            && self.peek(1).is_some_and(|c| matches!(c, 'x' | 'X' | 'b' | 'B' | 'o' | 'O'));

        if radix_prefix {
            self.pos += 2;
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.pos += 1;
            }
        } else {
            self.eat_digits();
            if self.peek(0) == Some('.') {
                self.pos += 1;
                self.eat_digits();
            }
            if self.peek(0).is_some_and(|c| c == 'e' || c == 'E') {
                let sign = usize::from(self.peek(1).is_some_and(|c| c == '+' || c == '-'));
                if self.peek(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1 + sign;
                    self.eat_digits();
                }
            }
        }

        if self.peek(0) == Some('n') {
            self.pos += 1;
        }
    }

    fn eat_digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.pos += 1;
        }
    }

    fn lex_ident_rest(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\\' {
                self.pos += 1;
                if self.peek(0).is_some() {
                    self.pos += 1;
                }
            } else if is_ident_part(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn lex_punct(&mut self, start: usize) -> Result<(), ScriptError> {
        for punct in PUNCTUATORS {
            let len = punct.chars().count();
            let matches = punct.chars().enumerate().all(|(i, p)| self.peek(i) == Some(p));
            if !matches {
                continue;
            }
            // `a?.5:b` is a conditional, not optional chaining
            if *punct == "?." && self.peek(2).is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            self.pos += len;
            return Ok(());
        }
        let c = self.peek(0).unwrap_or('\0');
        Err(self.error(start, format!("unexpected character '{}'", c)))
    }
}
