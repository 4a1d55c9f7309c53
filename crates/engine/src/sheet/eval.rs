//! Sheet expression evaluator.
//!
//! Type checking happens at operator evaluation; every operator asserts its
//! operand types and fails the line with `Expected <T>, got <T'>`.

use std::rc::Rc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::{
    SheetError,
    env::Environment,
    parser::{BinaryOp, Expr, UnaryOp},
    value::{QueryValue, Value},
};
use crate::{
    classify::Classifier,
    posting::Posting,
    valuation::{Valuer, cost_sum},
};

pub const BUILTINS: &[&str] = &["cost", "market"];

/// Everything an evaluation needs from the engine.
pub struct SheetContext<'a> {
    pub postings: &'a [Posting],
    pub classifier: &'a Classifier<'a>,
    pub valuer: Valuer<'a>,
    pub today: NaiveDate,
    pub display_precision: u32,
    pub locale: &'a str,
}

fn expect_number(value: Value) -> Result<Decimal, SheetError> {
    match value {
        Value::Number(number) => Ok(number),
        other => Err(SheetError::Type {
            expected: "Number",
            got: other.type_name(),
        }),
    }
}

fn expect_query(value: Value) -> Result<QueryValue, SheetError> {
    match value {
        Value::Query(query) => Ok(query),
        other => Err(SheetError::Type {
            expected: "Query",
            got: other.type_name(),
        }),
    }
}

/// Exponentiation: exact for integer exponents, `f64` for fractional ones.
fn pow(base: Decimal, exponent: Decimal) -> Result<Decimal, SheetError> {
    if exponent.fract().is_zero() {
        let n = exponent
            .to_i64()
            .ok_or_else(|| SheetError::Eval("Exponent out of range".to_string()))?;
        let mut result = Decimal::ONE;
        for _ in 0..n.unsigned_abs() {
            result = result
                .checked_mul(base)
                .ok_or_else(|| SheetError::Eval("Overflow".to_string()))?;
        }
        if n < 0 {
            if result.is_zero() {
                return Err(SheetError::Eval("Division by zero".to_string()));
            }
            result = Decimal::ONE / result;
        }
        return Ok(result);
    }
    let value = base
        .to_f64()
        .zip(exponent.to_f64())
        .map(|(b, e)| b.powf(e))
        .unwrap_or(f64::NAN);
    Decimal::from_f64(value).ok_or_else(|| SheetError::Eval("Overflow".to_string()))
}

pub fn eval_expr(
    expr: &Expr,
    env: &Environment,
    ctx: &SheetContext<'_>,
) -> Result<Value, SheetError> {
    match expr {
        Expr::Literal(value) => Ok(Value::Number(*value)),
        Expr::Grouping(inner) => eval_expr(inner, env, ctx),
        Expr::Identifier { name, .. } => match env.get(name) {
            Some(value) => Ok(value.clone()),
            None => Err(SheetError::Undefined(name.clone())),
        },
        Expr::Postings(search) => Ok(Value::Query(QueryValue::new(search.clone()))),
        Expr::Unary { op, expr } => {
            let value = expect_number(eval_expr(expr, env, ctx)?)?;
            Ok(Value::Number(match op {
                UnaryOp::Plus => value,
                UnaryOp::Neg => -value,
            }))
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, env, ctx),
        Expr::Call { name, args, .. } => eval_call(name, args, env, ctx),
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    env: &Environment,
    ctx: &SheetContext<'_>,
) -> Result<Value, SheetError> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let lhs = expect_query(eval_expr(lhs, env, ctx)?)?;
            let rhs = expect_query(eval_expr(rhs, env, ctx)?)?;
            Ok(Value::Query(match op {
                BinaryOp::And => lhs.and(&rhs),
                _ => lhs.or(&rhs),
            }))
        }
        _ => {
            let lhs = expect_number(eval_expr(lhs, env, ctx)?)?;
            let rhs = expect_number(eval_expr(rhs, env, ctx)?)?;
            let result = match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => {
                    if rhs.is_zero() {
                        return Err(SheetError::Eval("Division by zero".to_string()));
                    }
                    lhs / rhs
                }
                BinaryOp::Pow => pow(lhs, rhs)?,
                BinaryOp::And | BinaryOp::Or => unreachable!(),
            };
            Ok(Value::Number(result))
        }
    }
}

fn eval_call(
    name: &str,
    args: &[Expr],
    env: &Environment,
    ctx: &SheetContext<'_>,
) -> Result<Value, SheetError> {
    if let Some(value) = env.get(name) {
        let function = match value {
            Value::Function(function) => Rc::clone(function),
            other => {
                return Err(SheetError::Type {
                    expected: "Function",
                    got: other.type_name(),
                });
            }
        };
        if function.params.len() != args.len() {
            return Err(SheetError::Eval(format!(
                "{} expects {} arguments, got {}",
                function.name,
                function.params.len(),
                args.len()
            )));
        }
        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(eval_expr(arg, env, ctx)?);
        }
        let mut child = env.extend()?;
        for (param, value) in function.params.iter().zip(evaluated) {
            child.define(param.clone(), value);
        }
        return eval_expr(&function.body, &child, ctx);
    }

    match name {
        "cost" | "market" => {
            if args.len() != 1 {
                return Err(SheetError::Eval(format!(
                    "{name} expects 1 argument, got {}",
                    args.len()
                )));
            }
            let query = expect_query(eval_expr(&args[0], env, ctx)?)?;
            let resolved = query.resolve(ctx.postings);
            let value = match name {
                "cost" => cost_sum(&resolved),
                _ => ctx
                    .valuer
                    .current_balance(ctx.classifier, &resolved, ctx.today),
            };
            Ok(Value::Number(value))
        }
        _ => Err(SheetError::Undefined(name.to_string())),
    }
}
