//! Attribute and interpolation expressions.
//!
//! String, number and boolean literals, template strings, local names,
//! parentheses and `+`, evaluated with JavaScript's `+` rules.

use super::Locals;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Add(Box<Expr>, Box<Expr>),
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Undefined,
}

/// Parse failure, with a byte offset into the expression source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub offset: usize,
    pub message: String,
}

impl Expr {
    /// Evaluate against the page locals; unknown names are `undefined`.
    pub fn eval(&self, locals: &Locals) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Var(name) => match locals.get(name) {
                Some(value) => Value::Str(value.clone()),
                None => Value::Undefined,
            },
            Expr::Add(lhs, rhs) => lhs.eval(locals).add(rhs.eval(locals)),
        }
    }
}

impl Value {
    /// JavaScript `ToString`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Undefined => "undefined".to_string(),
        }
    }

    /// Text written into the page: `null` and `undefined` render as nothing.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null | Value::Undefined => String::new(),
            other => other.to_js_string(),
        }
    }

    /// `false`, `null` and `undefined` drop an attribute.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Bool(false) | Value::Null | Value::Undefined)
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Null => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Undefined => f64::NAN,
        }
    }

    fn add(self, other: Value) -> Value {
        match (&self, &other) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Value::Str(self.to_js_string() + &other.to_js_string())
            }
            _ => Value::Num(self.to_number() + other.to_number()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        String::from(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Parse a complete expression.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let mut parser = ExprParser { src: source, pos: 0 };
    let expr = parser.sum()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(expr),
        Some(c) => Err(parser.error(format!("unexpected '{}'", c))),
    }
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError { offset: self.pos, message: message.into() }
    }

    fn sum(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            self.skip_ws();
            if !self.eat('+') {
                return Ok(expr);
            }
            let rhs = self.primary()?;
            expr = Expr::Add(Box::new(expr), Box::new(rhs));
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("expected an expression")),
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                Ok(Expr::Literal(Value::Str(self.string(quote)?)))
            }
            Some('`') => {
                self.bump();
                self.template()
            }
            Some('(') => {
                self.bump();
                let expr = self.sum()?;
                self.skip_ws();
                if !self.eat(')') {
                    return Err(self.error("expected ')'"));
                }
                Ok(expr)
            }
            Some(c) if c.is_ascii_digit() => Ok(Expr::Literal(Value::Num(self.number()))),
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => Ok(self.word()),
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ExprError> {
        let start = self.pos;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                Some('\\') => out.push(self.escape()),
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> char {
        match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some(c) => c,
            None => '\\',
        }
    }

    /// Template string after the opening backtick, as a string concatenation.
    fn template(&mut self) -> Result<Expr, ExprError> {
        let start = self.pos;
        let mut expr = Expr::Literal(Value::Str(String::new()));
        let mut quasi = String::new();
        loop {
            match self.bump() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated template string"));
                }
                Some('\\') => quasi.push(self.escape()),
                Some('`') => break,
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    let part = std::mem::take(&mut quasi);
                    expr = Expr::Add(Box::new(expr), Box::new(Expr::Literal(Value::Str(part))));
                    let inner = self.sum()?;
                    self.skip_ws();
                    if !self.eat('}') {
                        return Err(self.error("expected '}'"));
                    }
                    expr = Expr::Add(Box::new(expr), Box::new(inner));
                }
                Some(c) => quasi.push(c),
            }
        }
        if quasi.is_empty() {
            Ok(expr)
        } else {
            Ok(Expr::Add(Box::new(expr), Box::new(Expr::Literal(Value::Str(quasi)))))
        }
    }

    fn number(&mut self) -> f64 {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        self.src[start..self.pos].parse().unwrap_or(f64::NAN)
    }

    fn word(&mut self) -> Expr {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            "null" => Expr::Literal(Value::Null),
            "undefined" => Expr::Literal(Value::Undefined),
            name => Expr::Var(name.to_string()),
        }
    }
}
