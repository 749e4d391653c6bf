//! Numeric-or-symbolic cell values

use crate::expr::{Bindings, Expr};
use crate::Result;
use num_complex::Complex64;
use std::collections::BTreeSet;
use std::fmt;

/// A matrix cell or parameter value: either an exact number or a symbolic
/// expression over free variables
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Numeric(Complex64),
    Symbolic(Expr),
}

impl Value {
    /// Build a value from an expression, collapsing closed real numbers
    pub fn from_expr(expr: Expr) -> Self {
        match expr.as_number() {
            Some(v) => Value::Numeric(Complex64::new(v, 0.0)),
            None => Value::Symbolic(expr),
        }
    }

    #[inline]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Value::Symbolic(_))
    }

    /// Whether evaluating this value needs variable bindings
    pub fn has_free_symbols(&self) -> bool {
        match self {
            Value::Numeric(_) => false,
            Value::Symbolic(e) => !e.is_closed(),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        match self {
            Value::Numeric(_) => BTreeSet::new(),
            Value::Symbolic(e) => e.free_symbols(),
        }
    }

    /// The value as an expression (numbers become literals)
    pub fn to_expr(&self) -> Expr {
        match self {
            Value::Numeric(z) if z.im == 0.0 => Expr::Number(z.re),
            Value::Numeric(z) => Expr::add(
                Expr::Number(z.re),
                Expr::mul(Expr::Number(z.im), Expr::i()),
            ),
            Value::Symbolic(e) => e.clone(),
        }
    }

    /// Substitute bound variables
    pub fn subs(&self, bindings: &Bindings) -> Value {
        match self {
            Value::Numeric(_) => self.clone(),
            Value::Symbolic(e) => Value::from_expr(e.subs(bindings)),
        }
    }

    /// Evaluate to a number
    ///
    /// # Errors
    /// Returns an error if a free variable is unbound or the result is not finite
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Complex64> {
        match self {
            Value::Numeric(z) => Ok(*z),
            Value::Symbolic(e) => e.evaluate(bindings),
        }
    }
}

impl From<Complex64> for Value {
    fn from(z: Complex64) -> Self {
        Value::Numeric(z)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Numeric(Complex64::new(v, 0.0))
    }
}

impl From<Expr> for Value {
    fn from(e: Expr) -> Self {
        Value::Symbolic(e)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(z) => write!(f, "{}", z),
            Value::Symbolic(e) => write!(f, "{}", e),
        }
    }
}
