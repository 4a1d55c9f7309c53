//! Lexically scoped environments.
//!
//! `extend` copies the bindings (immutable by convention; writes happen only
//! through assignment lines in the root scope) and bumps the depth counter.
//! With copy-on-extend there are no heap cycles, so the depth cap is the only
//! recursion guard needed.

use std::collections::HashMap;

use super::{SheetError, value::Value};

const MAX_DEPTH: usize = 1000;

#[derive(Clone, Debug, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
    depth: usize,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Child scope for a function call. Fails once the call depth passes the
    /// recursion cap.
    pub fn extend(&self) -> Result<Environment, SheetError> {
        if self.depth >= MAX_DEPTH {
            return Err(SheetError::StackOverflow);
        }
        Ok(Environment {
            vars: self.vars.clone(),
            depth: self.depth + 1,
        })
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn extend_copies_and_tracks_depth() {
        let mut env = Environment::new();
        env.define("x", Value::Number(Decimal::ONE));
        let child = env.extend().unwrap();
        assert_eq!(child.depth(), 1);
        assert!(child.get("x").is_some());

        // Writes in the parent after the copy do not leak into the child.
        env.define("y", Value::Number(Decimal::TWO));
        assert!(child.get("y").is_none());
    }

    #[test]
    fn overflow_at_depth_cap() {
        let mut env = Environment::new();
        for _ in 0..1000 {
            env = env.extend().unwrap();
        }
        assert_eq!(env.extend().unwrap_err(), SheetError::StackOverflow);
    }
}
