// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Recursive-descent parser over the token stream from `evaluator::lexer`,
//! implementing the following grammar exactly:
//!
//! ```text
//! expr     := or
//! or       := and ( 'or' and )*
//! and      := not ( 'and' not )*
//! not      := 'not' not | cmp
//! cmp      := primary ( ('=='|'!='|'<'|'<='|'>'|'>='|'is' ['not'] 'None') primary? )?
//! primary  := literal | path | '(' expr ')' | 'len' '(' path ')'
//! path     := root '.' ident ( '.' ident | '[' key ']' )*
//! root     := 'quality' | 'artifacts' | 'context'
//! literal  := string | integer | float | 'True' | 'False' | 'None'
//! ```

use super::ast::{CmpOp, Expr, Literal, Path, Primary};
use super::lexer::{tokenize, Token};
use crate::error::ExpressionError;

const ROOTS: [&str; 3] = ["quality", "artifacts", "context"];

pub fn parse(src: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExpressionError::TrailingInput(
            parser.tokens[parser.pos].describe(),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if s == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ExpressionError> {
        match self.advance() {
            Some(ref t) if t == token => Ok(()),
            Some(t) => Err(ExpressionError::UnexpectedToken(t.describe())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.eat_ident("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_not()?;
        while self.eat_ident("and") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat_ident("not") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.parse_primary()?;

        if matches!(self.peek(), Some(Token::Ident(s)) if s == "is") {
            self.pos += 1;
            let negated = self.eat_ident("not");
            if !self.eat_ident("None") {
                return Err(match self.peek() {
                    Some(t) => ExpressionError::UnexpectedToken(t.describe()),
                    None => ExpressionError::UnexpectedEnd,
                });
            }
            let op = if negated { CmpOp::IsNotNone } else { CmpOp::IsNone };
            return Ok(Expr::Cmp(left, Some((op, None))));
        }

        let op = match self.peek() {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            _ => None,
        };

        match op {
            Some(op) => {
                self.pos += 1;
                let right = self.parse_primary()?;
                Ok(Expr::Cmp(left, Some((op, Some(right)))))
            }
            None => Ok(Expr::Cmp(left, None)),
        }
    }

    fn parse_primary(&mut self) -> Result<Primary, ExpressionError> {
        match self.peek().cloned() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Primary::Paren(Box::new(inner)))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Primary::Literal(Literal::Str(s)))
            }
            Some(Token::Int(n)) => {
                self.pos += 1;
                Ok(Primary::Literal(Literal::Int(n)))
            }
            Some(Token::Float(n)) => {
                self.pos += 1;
                Ok(Primary::Literal(Literal::Float(n)))
            }
            Some(Token::Ident(ref word)) if word == "True" => {
                self.pos += 1;
                Ok(Primary::Literal(Literal::Bool(true)))
            }
            Some(Token::Ident(ref word)) if word == "False" => {
                self.pos += 1;
                Ok(Primary::Literal(Literal::Bool(false)))
            }
            Some(Token::Ident(ref word)) if word == "None" => {
                self.pos += 1;
                Ok(Primary::Literal(Literal::None))
            }
            Some(Token::Ident(ref word)) if word == "len" => {
                self.pos += 1;
                self.expect(&Token::LParen)?;
                let path = self.parse_path()?;
                self.expect(&Token::RParen)?;
                Ok(Primary::Len(path))
            }
            Some(Token::Ident(ref word)) if ROOTS.contains(&word.as_str()) => {
                let path = self.parse_path()?;
                Ok(Primary::Path(path))
            }
            Some(Token::Ident(word)) => Err(ExpressionError::ForbiddenRoot(word)),
            Some(other) => Err(ExpressionError::UnexpectedToken(other.describe())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn parse_path(&mut self) -> Result<Path, ExpressionError> {
        let root = match self.advance() {
            Some(Token::Ident(word)) if ROOTS.contains(&word.as_str()) => word,
            Some(Token::Ident(word)) => return Err(ExpressionError::ForbiddenRoot(word)),
            Some(other) => return Err(ExpressionError::UnexpectedToken(other.describe())),
            None => return Err(ExpressionError::UnexpectedEnd),
        };

        self.expect(&Token::Dot)?;
        let mut keys = vec![self.parse_ident_key()?];

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    keys.push(self.parse_ident_key()?);
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let key = match self.advance() {
                        Some(Token::Str(s)) => s,
                        Some(Token::Int(n)) => n.to_string(),
                        Some(Token::Ident(s)) => s,
                        Some(other) => return Err(ExpressionError::UnexpectedToken(other.describe())),
                        None => return Err(ExpressionError::UnexpectedEnd),
                    };
                    self.expect(&Token::RBracket)?;
                    keys.push(key);
                }
                _ => break,
            }
        }

        Ok(Path { root, keys })
    }

    fn parse_ident_key(&mut self) -> Result<String, ExpressionError> {
        match self.advance() {
            Some(Token::Ident(word)) => Ok(word),
            Some(other) => Err(ExpressionError::UnexpectedToken(other.describe())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_comparison() {
        let expr = parse("quality.attempts < 3").unwrap();
        assert!(matches!(expr, Expr::Cmp(Primary::Path(_), Some((CmpOp::Lt, Some(Primary::Literal(Literal::Int(3))))))));
    }

    #[test]
    fn parses_and_or_not_precedence() {
        // `not` binds tighter than `and`, which binds tighter than `or`.
        let expr = parse("quality.a == 1 or quality.b == 2 and not quality.c == 3").unwrap();
        match expr {
            Expr::Or(_, rhs) => assert!(matches!(*rhs, Expr::And(_, _))),
            _ => panic!("expected top-level or"),
        }
    }

    #[test]
    fn parses_is_none_and_is_not_none() {
        assert!(matches!(
            parse("artifacts.draft is None").unwrap(),
            Expr::Cmp(_, Some((CmpOp::IsNone, None)))
        ));
        assert!(matches!(
            parse("artifacts.draft is not None").unwrap(),
            Expr::Cmp(_, Some((CmpOp::IsNotNone, None)))
        ));
    }

    #[test]
    fn parses_len_and_bracket_paths() {
        let expr = parse("len(artifacts['items']) > 0").unwrap();
        assert!(matches!(expr, Expr::Cmp(Primary::Len(_), Some((CmpOp::Gt, _)))));
    }

    #[test]
    fn forbidden_root_is_an_error() {
        assert!(parse("env.SECRET == 1").is_err());
    }

    #[test]
    fn unbalanced_parens_is_an_error() {
        assert!(parse("(quality.a == 1").is_err());
    }

    #[test]
    fn trailing_input_is_an_error() {
        assert!(parse("quality.a == 1 True").is_err());
    }
}