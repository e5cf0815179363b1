//! Text to `Expr`.
//!
//! Grammar (lowest to highest binding):
//! `sum := product (('+' | '-') product)*`,
//! `product := unary (('*' | '/') unary)*`,
//! `unary := '-' unary | power`,
//! `power := primary (('^' | '**') unary)?` (right associative),
//! `primary := number | identifier | identifier '(' sum ')' | '(' sum ')'`.
//!
//! `I` is the imaginary unit; `sqrt`, `sin`, `cos`, `tan`, `exp`, `ln`/`log`
//! are functions. Every other identifier becomes a symbol.

use super::expr::{Expr, Function};
use super::rational::Rational;
use crate::error::{PlanarError, Result};

/// Parses a string expression into a canonical `Expr`.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(PlanarError::Parse("Empty expression.".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_sum()?;
    if let Some(token) = parser.peek() {
        return Err(PlanarError::Parse(format!(
            "Unexpected trailing token {:?} in '{}'.",
            token, input
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Rational),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else if (d == 'e' || d == 'E') && !literal.contains(['e', 'E']) {
                    literal.push(d);
                    chars.next();
                    if let Some(&sign) = chars.peek() {
                        if sign == '+' || sign == '-' {
                            literal.push(sign);
                            chars.next();
                        }
                    }
                } else {
                    break;
                }
            }
            let value = Rational::from_decimal_str(&literal).ok_or_else(|| {
                PlanarError::Parse(format!("Invalid or out-of-range number '{}'.", literal))
            })?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            chars.next();
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        Token::Caret
                    } else {
                        Token::Star
                    }
                }
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => {
                    return Err(PlanarError::Parse(format!(
                        "Unexpected character '{}'.",
                        other
                    )))
                }
            };
            tokens.push(token);
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err(PlanarError::Parse("Expected ')'.".to_string())),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr> {
        let mut terms = vec![self.parse_product()?];
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.consume();
                    terms.push(self.parse_product()?);
                }
                Some(Token::Minus) => {
                    self.consume();
                    terms.push(-self.parse_product()?);
                }
                _ => break,
            }
        }
        Ok(Expr::sum(terms))
    }

    fn parse_product(&mut self) -> Result<Expr> {
        let mut factors = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.consume();
                    factors.push(self.parse_unary()?);
                }
                Some(Token::Slash) => {
                    self.consume();
                    factors.push(self.parse_unary()?.recip());
                }
                _ => break,
            }
        }
        Ok(Expr::product(factors))
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            return Ok(-self.parse_unary()?);
        }
        if let Some(Token::Plus) = self.peek() {
            self.consume();
            return self.parse_unary();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::power(base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_sum()?;
                    self.expect_rparen()?;
                    if name == "sqrt" {
                        return Ok(arg.sqrt());
                    }
                    let function = Function::from_name(&name).ok_or_else(|| {
                        PlanarError::Parse(format!("Unknown function '{}'.", name))
                    })?;
                    Ok(Expr::call(function, arg))
                } else if name == "I" {
                    Ok(Expr::ImaginaryUnit)
                } else {
                    Ok(Expr::Symbol(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_sum()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(token) => Err(PlanarError::Parse(format!("Unexpected token {:?}.", token))),
            None => Err(PlanarError::Parse("Unexpected end of expression.".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        // Unary minus binds looser than '^'.
        let e = parse("-x^2").unwrap();
        assert_eq!(e, -Expr::power(Expr::symbol("x"), Expr::integer(2)));
        // '^' is right associative.
        let e = parse("2^3^2").unwrap();
        assert_eq!(e, Expr::integer(512));
        assert_eq!(parse("2**3").unwrap(), Expr::integer(8));
        assert_eq!(parse("1 - 2 - 3").unwrap(), Expr::integer(-4));
        assert_eq!(parse("12 / 4 / 3").unwrap(), Expr::integer(1));
    }

    #[test]
    fn test_exact_decimals() {
        let e = parse("0.1 + 0.2").unwrap();
        assert_eq!(e, Expr::number(Rational::new(3, 10).unwrap()));
        assert_eq!(parse("2.5e-1").unwrap(), Expr::number(Rational::new(1, 4).unwrap()));
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(parse("sqrt(9)").unwrap(), Expr::integer(3));
        assert_eq!(parse("exp(0) + cos(0)").unwrap(), Expr::integer(2));
        assert_eq!(parse("I*I").unwrap(), Expr::integer(-1));
        assert!(matches!(parse("sin(x)").unwrap(), Expr::Call(Function::Sin, _)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse(""), Err(PlanarError::Parse(_))));
        assert!(matches!(parse("x +"), Err(PlanarError::Parse(_))));
        assert!(matches!(parse("(x"), Err(PlanarError::Parse(_))));
        assert!(matches!(parse("x $ y"), Err(PlanarError::Parse(_))));
        assert!(matches!(parse("foo(x)"), Err(PlanarError::Parse(_))));
        assert!(matches!(parse("x y"), Err(PlanarError::Parse(_))));
    }
}
