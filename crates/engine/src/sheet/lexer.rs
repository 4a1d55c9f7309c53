//! Line tokenizer for the sheet language.

use rust_decimal::Decimal;

use super::ParseError;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Equals,
    And,
    Or,
    /// Raw clause text captured from a `postings { ... }` block.
    Postings(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Tokenizes one sheet line.
///
/// Numbers allow thousands separators; a trailing `%` divides by 100 at
/// lex time, so `18%` and `0.18` produce the same token.
pub fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        if ch.is_ascii_digit() {
            let mut raw = String::new();
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == ',') {
                if chars[pos] != ',' {
                    raw.push(chars[pos]);
                }
                pos += 1;
            }
            if pos < chars.len() && chars[pos] == '.' {
                raw.push('.');
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    raw.push(chars[pos]);
                    pos += 1;
                }
            }
            let mut number: Decimal = raw.parse().map_err(|_| ParseError {
                start,
                end: pos,
                message: format!("Invalid number {raw}"),
            })?;
            if pos < chars.len() && chars[pos] == '%' {
                number /= Decimal::ONE_HUNDRED;
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number(number),
                start,
                end: pos,
            });
            continue;
        }

        if is_ident_start(ch) {
            let mut name = String::new();
            while pos < chars.len() && is_ident_continue(chars[pos]) {
                name.push(chars[pos]);
                pos += 1;
            }
            let mut lookahead = pos;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }
            let kind = match name.as_str() {
                "AND" => TokenKind::And,
                "OR" => TokenKind::Or,
                "postings" if lookahead < chars.len() && chars[lookahead] == '{' => {
                    let open = lookahead;
                    let mut close = open + 1;
                    while close < chars.len() && chars[close] != '}' {
                        close += 1;
                    }
                    if close >= chars.len() {
                        return Err(ParseError {
                            start,
                            end: chars.len(),
                            message: "Unterminated postings block".to_string(),
                        });
                    }
                    let inner: String = chars[open + 1..close].iter().collect();
                    pos = close + 1;
                    tokens.push(Token {
                        kind: TokenKind::Postings(inner),
                        start,
                        end: pos,
                    });
                    continue;
                }
                _ => TokenKind::Ident(name),
            };
            tokens.push(Token {
                kind,
                start,
                end: pos,
            });
            continue;
        }

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '=' => TokenKind::Equals,
            _ => {
                return Err(ParseError {
                    start,
                    end: pos + 1,
                    message: format!("Unexpected character {ch:?}"),
                });
            }
        };
        pos += 1;
        tokens.push(Token {
            kind,
            start,
            end: pos,
        });
    }

    Ok(tokens)
}
