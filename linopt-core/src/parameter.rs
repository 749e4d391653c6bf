//! Component parameter values

use crate::expr::{Bindings, Expr};
use crate::value::Value;
use crate::{OpticsError, Result};
use num_complex::Complex64;
use std::collections::BTreeSet;
use std::fmt;

/// A component parameter: a fixed real value or a symbolic expression
///
/// Symbolic parameters stay unresolved until their free variables are bound,
/// so a circuit can be built, serialized and restored before any value is
/// chosen.
///
/// # Example
/// ```
/// use linopt_core::parameter::Parameter;
/// use linopt_core::expr::Bindings;
///
/// let theta = Parameter::symbol("theta");
/// assert!(theta.is_symbolic());
///
/// let mut b = Bindings::new();
/// b.insert("theta".to_string(), 0.5);
/// assert_eq!(theta.evaluate(&b).unwrap(), 0.5);
///
/// let fixed = Parameter::from(1.25);
/// assert_eq!(fixed.value(), Some(1.25));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Parameter {
    Fixed(f64),
    Symbolic(Expr),
}

impl Parameter {
    /// A free variable parameter
    pub fn symbol(name: impl Into<String>) -> Self {
        Parameter::Symbolic(Expr::symbol(name))
    }

    /// A free variable parameter with a checked name
    ///
    /// # Errors
    /// See [`Expr::try_symbol`]
    pub fn try_symbol(name: impl Into<String>) -> Result<Self> {
        Expr::try_symbol(name).map(Parameter::Symbolic)
    }

    /// Build from an expression, collapsing plain numbers to [`Parameter::Fixed`]
    pub fn from_expr(expr: Expr) -> Self {
        match expr.as_number() {
            Some(v) => Parameter::Fixed(v),
            None => Parameter::Symbolic(expr),
        }
    }

    /// Build from a decoded cell value
    ///
    /// # Errors
    /// Returns [`OpticsError::Range`] if a numeric value has a non-zero
    /// imaginary part
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Numeric(z) if z.im == 0.0 => Ok(Parameter::Fixed(z.re)),
            Value::Numeric(z) => Err(OpticsError::Range(format!(
                "parameter must be real, got {}",
                z
            ))),
            Value::Symbolic(e) => Ok(Parameter::from_expr(e)),
        }
    }

    /// The parameter as a cell value
    pub fn to_value(&self) -> Value {
        match self {
            Parameter::Fixed(v) => Value::Numeric(Complex64::new(*v, 0.0)),
            Parameter::Symbolic(e) => Value::Symbolic(e.clone()),
        }
    }

    #[inline]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Parameter::Symbolic(_))
    }

    /// Fixed value, if any
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            Parameter::Fixed(v) => Some(*v),
            Parameter::Symbolic(_) => None,
        }
    }

    /// The parameter as an expression (fixed values become literals)
    pub fn expr(&self) -> Expr {
        match self {
            Parameter::Fixed(v) => Expr::Number(*v),
            Parameter::Symbolic(e) => e.clone(),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        match self {
            Parameter::Fixed(_) => BTreeSet::new(),
            Parameter::Symbolic(e) => e.free_symbols(),
        }
    }

    /// Bind free variables
    pub fn subs(&self, bindings: &Bindings) -> Parameter {
        match self {
            Parameter::Fixed(_) => self.clone(),
            Parameter::Symbolic(e) => Parameter::from_expr(e.subs(bindings)),
        }
    }

    /// Evaluate to a real number
    ///
    /// # Errors
    /// - [`OpticsError::UnboundSymbol`] if a free variable is not bound
    /// - [`OpticsError::Range`] if the expression evaluates to a complex number
    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64> {
        match self {
            Parameter::Fixed(v) => Ok(*v),
            Parameter::Symbolic(e) => {
                let z = e.evaluate(bindings)?;
                if z.im.abs() > 1e-12 * z.re.abs().max(1.0) {
                    return Err(OpticsError::Range(format!(
                        "parameter '{}' evaluates to complex value {}",
                        e, z
                    )));
                }
                Ok(z.re)
            },
        }
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Parameter::Fixed(v)
    }
}

impl From<Expr> for Parameter {
    fn from(e: Expr) -> Self {
        Parameter::from_expr(e)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Fixed(v) => write!(f, "{}", v),
            Parameter::Symbolic(e) => write!(f, "{}", e),
        }
    }
}
