//! Runtime values of the sheet language.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;

use super::{parser::Expr, search::SearchExpr};
use crate::posting::Posting;

/// A named function defined in the sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionValue {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

/// A posting predicate with a memoized resolution.
///
/// Composing with AND/OR produces a new predicate with a fresh memo; the memo
/// is filled on the first [`QueryValue::resolve`] and shared by clones.
#[derive(Clone, Debug)]
pub struct QueryValue {
    pub expr: SearchExpr,
    memo: Rc<RefCell<Option<Rc<Vec<Posting>>>>>,
}

impl QueryValue {
    pub fn new(expr: SearchExpr) -> QueryValue {
        QueryValue {
            expr,
            memo: Rc::new(RefCell::new(None)),
        }
    }

    pub fn and(&self, other: &QueryValue) -> QueryValue {
        QueryValue::new(SearchExpr::And(
            Box::new(self.expr.clone()),
            Box::new(other.expr.clone()),
        ))
    }

    pub fn or(&self, other: &QueryValue) -> QueryValue {
        QueryValue::new(SearchExpr::Or(
            Box::new(self.expr.clone()),
            Box::new(other.expr.clone()),
        ))
    }

    /// Materializes the matching postings, memoized after the first call.
    pub fn resolve(&self, postings: &[Posting]) -> Rc<Vec<Posting>> {
        if let Some(resolved) = self.memo.borrow().as_ref() {
            return Rc::clone(resolved);
        }
        let resolved = Rc::new(
            postings
                .iter()
                .filter(|p| self.expr.matches(p))
                .cloned()
                .collect::<Vec<_>>(),
        );
        *self.memo.borrow_mut() = Some(Rc::clone(&resolved));
        resolved
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Number(Decimal),
    Query(QueryValue),
    Function(Rc<FunctionValue>),
    Array(Rc<Vec<Posting>>),
}

impl Value {
    /// Type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Query(_) => "Query",
            Value::Function(_) => "Function",
            Value::Array(_) => "Array",
        }
    }
}
