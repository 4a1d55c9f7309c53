//! The sheet expression language.
//!
//! A sheet is a line-oriented document: headers, assignments, function
//! definitions and expressions. Evaluation is a single pass; an error on a
//! line preserves earlier results and leaves the remaining lines empty.

use serde::Serialize;
use thiserror::Error;

mod env;
mod eval;
mod lexer;
mod parser;
mod search;
mod value;

pub use env::Environment;
pub use eval::{BUILTINS, SheetContext, eval_expr};
pub use parser::{BinaryOp, Expr, Line, UnaryOp, parse_line};
pub use search::{CompareOp, SearchExpr, SearchField, SearchValue};
pub use value::{FunctionValue, QueryValue, Value};

use std::collections::HashSet;
use std::rc::Rc;

use crate::format::format_currency;

/// Sheet evaluation errors; each aborts the line it occurs on.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum SheetError {
    #[error("{0}")]
    Parse(String),
    #[error("Expected {expected}, got {got}")]
    Type {
        expected: &'static str,
        got: &'static str,
    },
    #[error("Undefined variable {0}")]
    Undefined(String),
    #[error("Call stack overflow")]
    StackOverflow,
    #[error("{0}")]
    Eval(String),
}

/// A parse failure with its range within the line.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub start: usize,
    pub end: usize,
    pub message: String,
}

impl From<ParseError> for SheetError {
    fn from(err: ParseError) -> SheetError {
        SheetError::Parse(err.message)
    }
}

/// Editor diagnostic: a range plus a message, without evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: u32,
    pub start: usize,
    pub end: usize,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Blank,
    Header,
    Assignment,
    Function,
    Expression,
    Skipped,
}

/// Result of one sheet line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineResult {
    pub line: u32,
    pub kind: LineKind,
    pub result: String,
    pub error: Option<String>,
}

fn render(value: &Value, ctx: &SheetContext<'_>) -> String {
    match value {
        Value::Number(number) => format_currency(*number, ctx.display_precision, ctx.locale),
        Value::Query(query) => format!("{} postings", query.resolve(ctx.postings).len()),
        Value::Array(postings) => format!("{} postings", postings.len()),
        Value::Function(_) => String::new(),
    }
}

/// Evaluates a sheet top to bottom.
///
/// The first failing line carries its error; lines after it are reported as
/// skipped with empty results.
pub fn evaluate_sheet(text: &str, ctx: &SheetContext<'_>) -> Vec<LineResult> {
    let mut env = Environment::new();
    let mut results = Vec::new();
    let mut failed = false;

    for (index, raw) in text.lines().enumerate() {
        let line = index as u32 + 1;
        if failed {
            results.push(LineResult {
                line,
                kind: LineKind::Skipped,
                result: String::new(),
                error: None,
            });
            continue;
        }

        let parsed = match parse_line(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                failed = true;
                results.push(LineResult {
                    line,
                    kind: LineKind::Expression,
                    result: String::new(),
                    error: Some(SheetError::from(err).to_string()),
                });
                continue;
            }
        };

        let (kind, outcome) = match parsed {
            Line::Blank => (LineKind::Blank, Ok(None)),
            Line::Header(text) => (LineKind::Header, Ok(Some(text))),
            Line::FunctionDefinition { name, params, body } => {
                env.define(
                    name.clone(),
                    Value::Function(Rc::new(FunctionValue {
                        name,
                        params,
                        body,
                    })),
                );
                (LineKind::Function, Ok(None))
            }
            Line::Assignment { name, expr } => match eval_expr(&expr, &env, ctx) {
                Ok(value) => {
                    let rendered = render(&value, ctx);
                    env.define(name, value);
                    (LineKind::Assignment, Ok(Some(rendered)))
                }
                Err(err) => (LineKind::Assignment, Err(err)),
            },
            Line::Expression(expr) => match eval_expr(&expr, &env, ctx) {
                // A bare query materializes into the array of matching
                // postings.
                Ok(Value::Query(query)) => {
                    let resolved = Value::Array(query.resolve(ctx.postings));
                    (LineKind::Expression, Ok(Some(render(&resolved, ctx))))
                }
                Ok(value) => (LineKind::Expression, Ok(Some(render(&value, ctx)))),
                Err(err) => (LineKind::Expression, Err(err)),
            },
        };

        match outcome {
            Ok(result) => results.push(LineResult {
                line,
                kind,
                result: result.unwrap_or_default(),
                error: None,
            }),
            Err(err) => {
                failed = true;
                results.push(LineResult {
                    line,
                    kind,
                    result: String::new(),
                    error: Some(err.to_string()),
                });
            }
        }
    }

    results
}

fn walk(expr: &Expr, scope: &HashSet<String>, line: u32, out: &mut Vec<Diagnostic>) {
    match expr {
        Expr::Literal(_) | Expr::Postings(_) => {}
        Expr::Identifier { name, start, end } => {
            if !scope.contains(name) {
                out.push(Diagnostic {
                    line,
                    start: *start,
                    end: *end,
                    message: format!("Undefined variable {name}"),
                });
            }
        }
        Expr::Unary { expr, .. } | Expr::Grouping(expr) => walk(expr, scope, line, out),
        Expr::Binary { lhs, rhs, .. } => {
            walk(lhs, scope, line, out);
            walk(rhs, scope, line, out);
        }
        Expr::Call {
            name,
            args,
            start,
            end,
        } => {
            if !scope.contains(name) && !BUILTINS.contains(&name.as_str()) {
                out.push(Diagnostic {
                    line,
                    start: *start,
                    end: *end,
                    message: format!("Undefined variable {name}"),
                });
            }
            for arg in args {
                walk(arg, scope, line, out);
            }
        }
    }
}

/// Walks the sheet without evaluating and reports parse errors and unknown
/// identifiers with their ranges. Powers the editor linter.
pub fn validate_sheet(text: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut scope: HashSet<String> = HashSet::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index as u32 + 1;
        match parse_line(raw) {
            Err(err) => diagnostics.push(Diagnostic {
                line,
                start: err.start,
                end: err.end,
                message: err.message,
            }),
            Ok(Line::Blank) | Ok(Line::Header(_)) => {}
            Ok(Line::Assignment { name, expr }) => {
                walk(&expr, &scope, line, &mut diagnostics);
                scope.insert(name);
            }
            Ok(Line::FunctionDefinition { name, params, body }) => {
                // The function may recurse, so its own name is in scope for
                // the body.
                scope.insert(name);
                let mut inner = scope.clone();
                inner.extend(params);
                walk(&body, &inner, line, &mut diagnostics);
            }
            Ok(Line::Expression(expr)) => walk(&expr, &scope, line, &mut diagnostics),
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        classify::Classifier,
        config::Config,
        posting::{Posting, Status},
        price::PriceIndex,
        valuation::Valuer,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(account: &str, amount: rust_decimal::Decimal) -> Posting {
        Posting {
            id: 0,
            transaction_id: "t".to_string(),
            date: date(2024, 1, 15),
            payee: String::new(),
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

    struct Fixture {
        config: Config,
        prices: PriceIndex,
        postings: Vec<Posting>,
    }

    impl Fixture {
        fn new(postings: Vec<Posting>) -> Fixture {
            Fixture {
                config: Config::default(),
                prices: PriceIndex::default(),
                postings,
            }
        }

        fn eval(&self, text: &str) -> Vec<LineResult> {
            let classifier = Classifier::new(&self.config, &self.postings);
            let valuer = Valuer::new(&self.config, &self.prices);
            let ctx = SheetContext {
                postings: &self.postings,
                classifier: &classifier,
                valuer,
                today: date(2024, 6, 1),
                display_precision: 2,
                locale: "en-IN",
            };
            evaluate_sheet(text, &ctx)
        }
    }

    #[test]
    fn assignment_then_use() {
        let results = Fixture::new(Vec::new()).eval("x = 2 + 3\nx * 10");
        assert_eq!(results[0].result, "5.00");
        assert_eq!(results[1].result, "50.00");
        assert!(results[1].error.is_none());
    }

    #[test]
    fn function_definition_and_call() {
        let results = Fixture::new(Vec::new()).eval("f(x) = x * x\nf(12)");
        assert_eq!(results[0].kind, LineKind::Function);
        assert_eq!(results[0].result, "");
        assert_eq!(results[1].result, "144.00");
    }

    #[test]
    fn undefined_function_stops_following_lines() {
        let results = Fixture::new(Vec::new()).eval("f(x) = x * x\nf(g(2))\nf(2)");
        assert_eq!(results[0].result, "");
        assert!(results[0].error.is_none());
        assert_eq!(
            results[1].error.as_deref(),
            Some("Undefined variable g")
        );
        assert_eq!(results[2].kind, LineKind::Skipped);
        assert_eq!(results[2].result, "");
    }

    #[test]
    fn recursion_overflows_at_depth_cap() {
        let results = Fixture::new(Vec::new()).eval("f(x) = f(x + 1)\nf(0)");
        assert_eq!(
            results[1].error.as_deref(),
            Some("Call stack overflow")
        );
    }

    #[test]
    fn operator_type_errors_name_both_types() {
        let results =
            Fixture::new(Vec::new()).eval("q = postings { account = Expenses:% }\nq + 1");
        assert_eq!(
            results[1].error.as_deref(),
            Some("Expected Number, got Query")
        );
    }

    #[test]
    fn queries_compose_and_cost_sums() {
        let fixture = Fixture::new(vec![
            posting("Expenses:Food", dec!(1200)),
            posting("Expenses:Rent", dec!(15000)),
            posting("Income:Salary", dec!(-50000)),
        ]);
        let results = fixture.eval(
            "food = postings { account = Expenses:Food }\n\
             rent = postings { account = Expenses:Rent }\n\
             cost(food OR rent)",
        );
        assert_eq!(results[2].result, "16,200.00");
    }

    #[test]
    fn headers_and_blanks_pass_through() {
        let results = Fixture::new(Vec::new()).eval("# Monthly review\n\n1 + 1");
        assert_eq!(results[0].kind, LineKind::Header);
        assert_eq!(results[0].result, "Monthly review");
        assert_eq!(results[1].kind, LineKind::Blank);
        assert_eq!(results[2].result, "2.00");
    }

    #[test]
    fn percent_and_power() {
        let results = Fixture::new(Vec::new()).eval("100 * 18%\n2 ^ 10");
        assert_eq!(results[0].result, "18.00");
        assert_eq!(results[1].result, "1,024.00");
    }

    #[test]
    fn validate_reports_without_evaluating() {
        let diagnostics = validate_sheet("x = 2 +\ny = z * 2\nf(a) = f(a)\nf(1)");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[1].line, 2);
        assert_eq!(diagnostics[1].message, "Undefined variable z");
    }

    #[test]
    fn division_by_zero_fails_the_line() {
        let results = Fixture::new(Vec::new()).eval("1 / 0");
        assert_eq!(results[0].error.as_deref(), Some("Division by zero"));
    }
}
