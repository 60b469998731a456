//! Safe evaluation of the small arithmetic expressions users type into bound
//! fields, such as `-2*pi` or `1.5^2`.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | 'pi' | '(' expr ')'
//! ```
//!
//! Power is right-associative and binds tighter than unary minus on its
//! left, so `-2^2 == -4`. The only identifier is `pi` (also spelled `PI`,
//! `Pi`, `math.pi` or `np.pi`).

use crate::error::{AcorError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Pi,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

/// Evaluates a numeric expression.
///
/// # Errors
///
/// Returns `AcorError::Expression` for an empty string, an unknown
/// identifier, unbalanced parentheses, trailing input or a non-finite result.
///
/// # Example
///
/// ```rust
/// use acor_seir::expr::parse_numeric;
///
/// assert_eq!(parse_numeric("2 * 5").unwrap(), 10.0);
/// assert_eq!(parse_numeric("2^3").unwrap(), 8.0);
/// assert!(parse_numeric("2 * x").is_err());
/// ```
pub fn parse_numeric(expr: &str) -> Result<f64> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(AcorError::Expression("expression is empty".to_string()));
    }

    let tokens = tokenize(trimmed)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        source: trimmed,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    if !value.is_finite() {
        return Err(AcorError::Expression(format!(
            "'{}' does not evaluate to a finite number",
            trimmed
        )));
    }
    Ok(value)
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Scientific notation: 1e-3, 2.5E+4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal.parse::<f64>().map_err(|_| {
                    AcorError::Expression(format!("invalid number '{}' in '{}'", literal, src))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                match ident.as_str() {
                    "pi" | "PI" | "Pi" | "math.pi" | "np.pi" => tokens.push(Token::Pi),
                    _ => {
                        return Err(AcorError::Expression(format!(
                            "unknown identifier '{}' in '{}'",
                            ident, src
                        )))
                    }
                }
            }
            other => {
                return Err(AcorError::Expression(format!(
                    "unexpected character '{}' in '{}'",
                    other, src
                )))
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn error(&self, what: &str) -> AcorError {
        AcorError::Expression(format!("{} at token {} in '{}'", what, self.pos, self.source))
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(self.error("division by zero"));
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.peek().cloned() {
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(value)
            }
            Some(Token::Pi) => {
                self.pos += 1;
                Ok(std::f64::consts::PI)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let value = self.expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            _ => Err(self.error("expected a number")),
        }
    }
}
