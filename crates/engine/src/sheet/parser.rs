//! Recursive-descent parser producing the sheet AST.

use rust_decimal::Decimal;

use super::{
    ParseError,
    lexer::{Token, TokenKind, tokenize},
    search::{SearchExpr, parse_search},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Decimal),
    Identifier {
        name: String,
        start: usize,
        end: usize,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Grouping(Box<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
        start: usize,
        end: usize,
    },
    Postings(SearchExpr),
}

/// One parsed sheet line.
#[derive(Clone, Debug, PartialEq)]
pub enum Line {
    Blank,
    Header(String),
    Assignment { name: String, expr: Expr },
    FunctionDefinition {
        name: String,
        params: Vec<String>,
        body: Expr,
    },
    Expression(Expr),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn span(&self) -> (usize, usize) {
        match self.tokens.get(self.pos) {
            Some(token) => (token.start, token.end),
            None => (self.line_len, self.line_len),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let (start, end) = self.span();
        ParseError {
            start,
            end,
            message: message.into(),
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == *kind => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error(format!("Expected {what}"))),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // expr := or
    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek(), Some(TokenKind::Or)) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            expr = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_additive()?;
        while matches!(self.peek(), Some(TokenKind::And)) {
            self.pos += 1;
            let rhs = self.parse_additive()?;
            expr = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_power()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    // Right associative: 2 ^ 3 ^ 2 is 2 ^ (3 ^ 2).
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;
        if matches!(self.peek(), Some(TokenKind::Caret)) {
            self.pos += 1;
            let exponent = self.parse_power()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(TokenKind::Plus) => Some(UnaryOp::Plus),
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = match self.advance() {
            Some(token) => token,
            None => {
                return Err(ParseError {
                    start: self.line_len,
                    end: self.line_len,
                    message: "Unexpected end of line".to_string(),
                });
            }
        };
        match token.kind {
            TokenKind::Number(value) => Ok(Expr::Literal(value)),
            TokenKind::Postings(clause) => {
                let expr = parse_search(&clause, token.start)?;
                Ok(Expr::Postings(expr))
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek(), Some(TokenKind::LParen)) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(TokenKind::RParen)) {
                        loop {
                            args.push(self.parse_expr()?);
                            if matches!(self.peek(), Some(TokenKind::Comma)) {
                                self.pos += 1;
                                continue;
                            }
                            break;
                        }
                    }
                    let close = self.expect(&TokenKind::RParen, ")")?;
                    return Ok(Expr::Call {
                        name,
                        args,
                        start: token.start,
                        end: close.end,
                    });
                }
                Ok(Expr::Identifier {
                    name,
                    start: token.start,
                    end: token.end,
                })
            }
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, ")")?;
                Ok(Expr::Grouping(Box::new(expr)))
            }
            _ => Err(ParseError {
                start: token.start,
                end: token.end,
                message: "Expected expression".to_string(),
            }),
        }
    }
}

/// Detects `id(params...) =` without consuming tokens.
fn is_function_definition(tokens: &[Token]) -> bool {
    let mut pos = 0;
    if !matches!(tokens.first().map(|t| &t.kind), Some(TokenKind::Ident(_))) {
        return false;
    }
    pos += 1;
    if !matches!(tokens.get(pos).map(|t| &t.kind), Some(TokenKind::LParen)) {
        return false;
    }
    pos += 1;
    loop {
        match tokens.get(pos).map(|t| &t.kind) {
            Some(TokenKind::RParen) => {
                pos += 1;
                break;
            }
            Some(TokenKind::Ident(_)) => {
                pos += 1;
                match tokens.get(pos).map(|t| &t.kind) {
                    Some(TokenKind::Comma) => pos += 1,
                    Some(TokenKind::RParen) => {}
                    _ => return false,
                }
            }
            _ => return false,
        }
    }
    matches!(tokens.get(pos).map(|t| &t.kind), Some(TokenKind::Equals))
}

/// Parses one sheet line. Lines starting with `#` are headers; `id = expr`
/// assigns; `id(a, b) = expr` defines a function; anything else must be an
/// expression.
pub fn parse_line(text: &str) -> Result<Line, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Line::Blank);
    }
    if let Some(header) = trimmed.strip_prefix('#') {
        return Ok(Line::Header(header.trim().to_string()));
    }

    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(Line::Blank);
    }

    if is_function_definition(&tokens) {
        let mut parser = Parser {
            tokens,
            pos: 0,
            line_len: text.len(),
        };
        let name = match parser.advance().map(|t| t.kind) {
            Some(TokenKind::Ident(name)) => name,
            _ => return Err(parser.error("Expected function name")),
        };
        parser.expect(&TokenKind::LParen, "(")?;
        let mut params = Vec::new();
        while !matches!(parser.peek(), Some(TokenKind::RParen)) {
            match parser.advance().map(|t| t.kind) {
                Some(TokenKind::Ident(param)) => params.push(param),
                _ => return Err(parser.error("Expected parameter name")),
            }
            if matches!(parser.peek(), Some(TokenKind::Comma)) {
                parser.pos += 1;
            }
        }
        parser.expect(&TokenKind::RParen, ")")?;
        parser.expect(&TokenKind::Equals, "=")?;
        let body = parser.parse_expr()?;
        if !parser.at_end() {
            return Err(parser.error("Unexpected trailing input"));
        }
        return Ok(Line::FunctionDefinition { name, params, body });
    }

    let is_assignment = matches!(tokens.first().map(|t| &t.kind), Some(TokenKind::Ident(_)))
        && matches!(tokens.get(1).map(|t| &t.kind), Some(TokenKind::Equals));

    let mut parser = Parser {
        tokens,
        pos: 0,
        line_len: text.len(),
    };
    if is_assignment {
        let name = match parser.advance().map(|t| t.kind) {
            Some(TokenKind::Ident(name)) => name,
            _ => return Err(parser.error("Expected identifier")),
        };
        parser.pos += 1; // '='
        let expr = parser.parse_expr()?;
        if !parser.at_end() {
            return Err(parser.error("Unexpected trailing input"));
        }
        return Ok(Line::Assignment { name, expr });
    }

    let expr = parser.parse_expr()?;
    if !parser.at_end() {
        return Err(parser.error("Unexpected trailing input"));
    }
    Ok(Line::Expression(expr))
}
