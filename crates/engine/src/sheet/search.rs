//! The search-query sub-language embedded in `postings { ... }` blocks.
//!
//! Clauses filter on account, payee, commodity, date and amount; `=` on text
//! fields is a glob match with the same `*`/`%` rules the query builder uses.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::ParseError;
use crate::{posting::Posting, query::account_matches};

#[derive(Clone, Debug, PartialEq)]
pub enum SearchField {
    Account,
    Payee,
    Commodity,
    Date,
    Amount,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CompareOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchValue {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchExpr {
    And(Box<SearchExpr>, Box<SearchExpr>),
    Or(Box<SearchExpr>, Box<SearchExpr>),
    Not(Box<SearchExpr>),
    Clause {
        field: SearchField,
        op: CompareOp,
        value: SearchValue,
    },
}

impl SearchExpr {
    pub fn matches(&self, posting: &Posting) -> bool {
        match self {
            SearchExpr::And(lhs, rhs) => lhs.matches(posting) && rhs.matches(posting),
            SearchExpr::Or(lhs, rhs) => lhs.matches(posting) || rhs.matches(posting),
            SearchExpr::Not(inner) => !inner.matches(posting),
            SearchExpr::Clause { field, op, value } => clause_matches(posting, field, op, value),
        }
    }
}

fn clause_matches(
    posting: &Posting,
    field: &SearchField,
    op: &CompareOp,
    value: &SearchValue,
) -> bool {
    match (field, value) {
        (SearchField::Account, SearchValue::Text(pattern)) => {
            matches!(op, CompareOp::Eq) && account_matches(pattern, &posting.account)
        }
        (SearchField::Payee, SearchValue::Text(pattern)) => {
            matches!(op, CompareOp::Eq) && account_matches(pattern, &posting.payee)
        }
        (SearchField::Commodity, SearchValue::Text(pattern)) => {
            matches!(op, CompareOp::Eq) && account_matches(pattern, &posting.commodity)
        }
        (SearchField::Date, SearchValue::Date(date)) => compare(&posting.date, date, op),
        (SearchField::Amount, SearchValue::Number(number)) => {
            compare(&posting.amount, number, op)
        }
        _ => false,
    }
}

fn compare<T: PartialOrd>(lhs: &T, rhs: &T, op: &CompareOp) -> bool {
    match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::Gt => lhs > rhs,
        CompareOp::Ge => lhs >= rhs,
        CompareOp::Lt => lhs < rhs,
        CompareOp::Le => lhs <= rhs,
    }
}

#[derive(Clone, Debug, PartialEq)]
enum SearchToken {
    Word(String),
    Date(NaiveDate),
    Op(CompareOp),
    LParen,
    RParen,
    And,
    Or,
    Not,
}

fn tokenize(input: &str, offset: usize) -> Result<Vec<SearchToken>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        match ch {
            '(' => {
                tokens.push(SearchToken::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(SearchToken::RParen);
                pos += 1;
            }
            '=' => {
                tokens.push(SearchToken::Op(CompareOp::Eq));
                pos += 1;
            }
            '>' | '<' => {
                let strict = ch == '>';
                pos += 1;
                let op = if pos < chars.len() && chars[pos] == '=' {
                    pos += 1;
                    if strict { CompareOp::Ge } else { CompareOp::Le }
                } else if strict {
                    CompareOp::Gt
                } else {
                    CompareOp::Lt
                };
                tokens.push(SearchToken::Op(op));
            }
            '[' => {
                let mut raw = String::new();
                pos += 1;
                while pos < chars.len() && chars[pos] != ']' {
                    raw.push(chars[pos]);
                    pos += 1;
                }
                if pos >= chars.len() {
                    return Err(ParseError {
                        start: offset + start,
                        end: offset + pos,
                        message: "Unterminated date literal".to_string(),
                    });
                }
                pos += 1;
                let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    ParseError {
                        start: offset + start,
                        end: offset + pos,
                        message: format!("Invalid date {raw}"),
                    }
                })?;
                tokens.push(SearchToken::Date(date));
            }
            _ => {
                let mut word = String::new();
                while pos < chars.len()
                    && !chars[pos].is_whitespace()
                    && !matches!(chars[pos], '(' | ')' | '=' | '>' | '<' | '[' | ']')
                {
                    word.push(chars[pos]);
                    pos += 1;
                }
                match word.as_str() {
                    "AND" => tokens.push(SearchToken::And),
                    "OR" => tokens.push(SearchToken::Or),
                    "NOT" => tokens.push(SearchToken::Not),
                    _ => tokens.push(SearchToken::Word(word)),
                }
            }
        }
    }
    Ok(tokens)
}

struct SearchParser {
    tokens: Vec<SearchToken>,
    pos: usize,
    offset: usize,
}

impl SearchParser {
    fn peek(&self) -> Option<&SearchToken> {
        self.tokens.get(self.pos)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            start: self.offset,
            end: self.offset,
            message: message.into(),
        }
    }

    fn parse_or(&mut self) -> Result<SearchExpr, ParseError> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek(), Some(SearchToken::Or)) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            expr = SearchExpr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<SearchExpr, ParseError> {
        let mut expr = self.parse_unary()?;
        while matches!(self.peek(), Some(SearchToken::And)) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            expr = SearchExpr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<SearchExpr, ParseError> {
        if matches!(self.peek(), Some(SearchToken::Not)) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(SearchExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<SearchExpr, ParseError> {
        match self.peek().cloned() {
            Some(SearchToken::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                if !matches!(self.peek(), Some(SearchToken::RParen)) {
                    return Err(self.error("Expected )"));
                }
                self.pos += 1;
                Ok(expr)
            }
            Some(SearchToken::Word(word)) => {
                self.pos += 1;
                let field = match word.as_str() {
                    "account" => SearchField::Account,
                    "payee" => SearchField::Payee,
                    "commodity" => SearchField::Commodity,
                    "date" => SearchField::Date,
                    "amount" => SearchField::Amount,
                    other => return Err(self.error(format!("Unknown field {other}"))),
                };
                let op = match self.peek().cloned() {
                    Some(SearchToken::Op(op)) => {
                        self.pos += 1;
                        op
                    }
                    _ => return Err(self.error(format!("Expected comparison after {word}"))),
                };
                let value = match self.peek().cloned() {
                    Some(SearchToken::Word(text)) => {
                        self.pos += 1;
                        match field {
                            SearchField::Amount => {
                                let number: Decimal = text.replace(',', "").parse().map_err(
                                    |_| self.error(format!("Invalid amount {text}")),
                                )?;
                                SearchValue::Number(number)
                            }
                            _ => SearchValue::Text(text),
                        }
                    }
                    Some(SearchToken::Date(date)) => {
                        self.pos += 1;
                        SearchValue::Date(date)
                    }
                    _ => return Err(self.error(format!("Expected value after {word}"))),
                };
                Ok(SearchExpr::Clause { field, op, value })
            }
            _ => Err(self.error("Expected search clause")),
        }
    }
}

/// Parses the clause text of a `postings { ... }` block. `offset` is the
/// block's position within the line, used for diagnostics.
pub fn parse_search(input: &str, offset: usize) -> Result<SearchExpr, ParseError> {
    let tokens = tokenize(input, offset)?;
    let mut parser = SearchParser {
        tokens,
        pos: 0,
        offset,
    };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("Trailing input in postings block"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use rust_decimal_macros::dec;

    use super::*;
    use crate::posting::Status;

    fn posting(account: &str, payee: &str, on: NaiveDate, amount: Decimal) -> Posting {
        Posting {
            id: 0,
            transaction_id: "t".to_string(),
            date: on,
            payee: payee.to_string(),
            account: account.to_string(),
            commodity: "INR".to_string(),
            quantity: dec!(0),
            amount,
            status: Status::Unmarked,
            tag_recurring: None,
            forecast: false,
            transaction_begin_line: 0,
            transaction_end_line: 0,
            file_name: "main.ledger".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn account_glob_clause() {
        let expr = parse_search("account = Expenses:%", 0).unwrap();
        assert!(expr.matches(&posting("Expenses:Food", "", date(2024, 1, 1), dec!(100))));
        assert!(!expr.matches(&posting("Income:Salary", "", date(2024, 1, 1), dec!(100))));
    }

    #[test]
    fn date_and_amount_comparisons_combine() {
        let expr =
            parse_search("account = Expenses:% AND date >= [2024-02-01] AND amount > 500", 0)
                .unwrap();
        assert!(expr.matches(&posting("Expenses:Food", "", date(2024, 2, 2), dec!(900))));
        assert!(!expr.matches(&posting("Expenses:Food", "", date(2024, 1, 2), dec!(900))));
        assert!(!expr.matches(&posting("Expenses:Food", "", date(2024, 2, 2), dec!(100))));
    }

    #[test]
    fn or_and_not_compose() {
        let expr = parse_search(
            "(account = Expenses:Food) OR (NOT payee = Amazon%)",
            0,
        )
        .unwrap();
        assert!(expr.matches(&posting("Expenses:Rent", "Landlord", date(2024, 1, 1), dec!(1))));
        assert!(!expr.matches(&posting("Expenses:Rent", "Amazon IN", date(2024, 1, 1), dec!(1))));
    }

    #[test]
    fn invalid_field_errors() {
        assert!(parse_search("foo = bar", 0).is_err());
        assert!(parse_search("date > [not-a-date]", 0).is_err());
    }
}
