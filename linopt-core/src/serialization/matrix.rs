//! Matrix and cell serialization types

use crate::expr::Expr;
use crate::matrix::{Matrix, NumericMatrix, SymbolicMatrix};
use crate::parameter::Parameter;
use crate::serialization::EntityKind;
use crate::value::Value;
use crate::{OpticsError, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Serialized matrix cell or parameter value
///
/// A number is written as `[re, im]`; a symbolic value as the text of its
/// expression.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SerializedValue {
    Numeric([f64; 2]),
    Symbolic(String),
}

impl SerializedValue {
    fn numeric(z: Complex64) -> Result<Self> {
        if !z.re.is_finite() || !z.im.is_finite() {
            return Err(OpticsError::NonFinite(format!("cannot encode {}", z)));
        }
        Ok(SerializedValue::Numeric([z.re, z.im]))
    }

    fn symbolic(e: &Expr) -> Result<Self> {
        e.check_symbols()?;
        Ok(SerializedValue::Symbolic(e.to_string()))
    }

    /// Encode a cell value
    ///
    /// # Errors
    /// - [`OpticsError::NonFinite`] for NaN or infinite parts
    /// - [`OpticsError::Parse`] for a free variable whose name would not reparse
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Numeric(z) => Self::numeric(*z),
            Value::Symbolic(e) => Self::symbolic(e),
        }
    }

    /// Encode a component parameter (`[value, 0.0]` or expression text)
    ///
    /// # Errors
    /// - [`OpticsError::NonFinite`] for a NaN or infinite fixed value
    /// - [`OpticsError::Parse`] for a free variable whose name would not reparse
    pub fn from_parameter(param: &Parameter) -> Result<Self> {
        match param {
            Parameter::Fixed(v) => Self::numeric(Complex64::new(*v, 0.0)),
            Parameter::Symbolic(e) => Self::symbolic(e),
        }
    }

    /// Decode to a cell value; expression text goes through the expression parser
    ///
    /// # Errors
    /// Returns [`OpticsError::Parse`] for unparsable expression text
    pub fn to_value(&self) -> Result<Value> {
        match self {
            SerializedValue::Numeric([re, im]) => Ok(Value::Numeric(Complex64::new(*re, *im))),
            SerializedValue::Symbolic(text) => Ok(Value::from_expr(Expr::parse(text)?)),
        }
    }

    /// Decode to a component parameter
    ///
    /// # Errors
    /// - [`OpticsError::Parse`] for unparsable expression text
    /// - [`OpticsError::Range`] for a number with a non-zero imaginary part
    pub fn to_parameter(&self) -> Result<Parameter> {
        Parameter::from_value(self.to_value()?)
    }
}

/// Serialized matrix envelope: shape plus row-major cells
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SerializedMatrix {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<SerializedValue>,
}

impl SerializedMatrix {
    pub fn from_numeric(matrix: &NumericMatrix) -> Self {
        Self {
            kind: EntityKind::Matrix,
            rows: matrix.rows(),
            cols: matrix.cols(),
            cells: matrix
                .data()
                .iter()
                .map(|z| SerializedValue::Numeric([z.re, z.im]))
                .collect(),
        }
    }

    /// # Errors
    /// Returns [`OpticsError::NonFinite`] if a numeric cell is NaN or infinite
    pub fn from_symbolic(matrix: &SymbolicMatrix) -> Result<Self> {
        Ok(Self {
            kind: EntityKind::Matrix,
            rows: matrix.rows(),
            cols: matrix.cols(),
            cells: matrix
                .cells()
                .iter()
                .map(SerializedValue::from_value)
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn from_matrix(matrix: &Matrix) -> Result<Self> {
        match matrix {
            Matrix::Numeric(m) => Ok(Self::from_numeric(m)),
            Matrix::Symbolic(m) => Self::from_symbolic(m),
        }
    }

    /// Rebuild the matrix
    ///
    /// With `collapse`, a matrix whose cells have no free variable decodes to
    /// [`Matrix::Numeric`] even when some cells are expression text.
    ///
    /// # Errors
    /// - [`OpticsError::EnvelopeMismatch`] if the envelope is not a matrix
    /// - [`OpticsError::Shape`] if the declared shape disagrees with the cell count
    /// - [`OpticsError::Parse`] naming the row and column of a bad cell
    pub fn to_matrix(&self, collapse: bool) -> Result<Matrix> {
        if self.kind != EntityKind::Matrix {
            return Err(OpticsError::envelope_mismatch(
                EntityKind::Matrix.wire_name(),
                self.kind.wire_name(),
            ));
        }
        let declared = self.rows.checked_mul(self.cols);
        if self.rows == 0 || self.cols == 0 || declared != Some(self.cells.len()) {
            return Err(OpticsError::Shape(format!(
                "declared {}x{} matrix but found {} cells",
                self.rows,
                self.cols,
                self.cells.len()
            )));
        }
        debug!(rows = self.rows, cols = self.cols, "decoding matrix");

        let mut values = Vec::with_capacity(self.cells.len());
        for (index, cell) in self.cells.iter().enumerate() {
            let (row, col) = (index / self.cols, index % self.cols);
            trace!(row, col, ?cell, "decoding cell");
            let value = cell.to_value().map_err(|err| match err {
                OpticsError::Parse { message, .. } => {
                    OpticsError::parse(format!("matrix cell ({}, {})", row, col), message)
                },
                other => other,
            })?;
            values.push(value);
        }

        let numeric: Option<Vec<Complex64>> = values
            .iter()
            .map(|v| match v {
                Value::Numeric(z) => Some(*z),
                Value::Symbolic(_) => None,
            })
            .collect();
        if let Some(data) = numeric {
            return Ok(Matrix::Numeric(NumericMatrix::new(self.rows, self.cols, data)?));
        }

        let symbolic = SymbolicMatrix::new(self.rows, self.cols, values)?;
        if collapse {
            Ok(Matrix::from(symbolic))
        } else {
            Ok(Matrix::Symbolic(symbolic))
        }
    }

    /// Rebuild a matrix that must be fully numeric
    ///
    /// # Errors
    /// As [`SerializedMatrix::to_matrix`], plus [`OpticsError::Validation`]
    /// if a cell keeps a free variable
    pub fn to_numeric(&self) -> Result<NumericMatrix> {
        match self.to_matrix(true)? {
            Matrix::Numeric(m) => Ok(m),
            Matrix::Symbolic(m) => Err(OpticsError::Validation(format!(
                "matrix has free variables {:?}",
                m.free_symbols()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Bindings;

    #[test]
    fn test_value_wire_forms() {
        let n = SerializedValue::from_value(&Value::from(Complex64::new(0.5, -1.0))).unwrap();
        assert_eq!(serde_json::to_string(&n).unwrap(), "[0.5,-1.0]");

        let s = SerializedValue::from_value(&Value::from(Expr::parse("cos(theta/2)").unwrap()))
            .unwrap();
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"cos(theta/2.0)\"");

        let back: SerializedValue = serde_json::from_str("[1.0,2.0]").unwrap();
        assert_eq!(back, SerializedValue::Numeric([1.0, 2.0]));
    }

    #[test]
    fn test_non_finite_rejected() {
        let v = Value::from(Complex64::new(f64::INFINITY, 0.0));
        assert!(matches!(SerializedValue::from_value(&v), Err(OpticsError::NonFinite(_))));
        assert!(SerializedValue::from_parameter(&Parameter::Fixed(f64::NAN)).is_err());
    }

    #[test]
    fn test_parameter_decode() {
        assert_eq!(
            SerializedValue::Numeric([0.3, 0.0]).to_parameter().unwrap(),
            Parameter::Fixed(0.3)
        );
        assert!(matches!(
            SerializedValue::Numeric([0.3, 0.1]).to_parameter(),
            Err(OpticsError::Range(_))
        ));
        assert_eq!(
            SerializedValue::Symbolic("phi".to_string()).to_parameter().unwrap(),
            Parameter::symbol("phi")
        );
    }

    #[test]
    fn test_shape_checked() {
        let m = SerializedMatrix {
            kind: EntityKind::Matrix,
            rows: 2,
            cols: 2,
            cells: vec![SerializedValue::Numeric([1.0, 0.0]); 3],
        };
        assert!(matches!(m.to_matrix(true), Err(OpticsError::Shape(_))));
    }

    #[test]
    fn test_shape_product_overflow() {
        let m = SerializedMatrix {
            kind: EntityKind::Matrix,
            rows: usize::MAX,
            cols: 2,
            cells: vec![],
        };
        assert!(matches!(m.to_matrix(true), Err(OpticsError::Shape(_))));
    }

    #[test]
    fn test_bad_cell_names_position() {
        let m = SerializedMatrix {
            kind: EntityKind::Matrix,
            rows: 1,
            cols: 2,
            cells: vec![
                SerializedValue::Numeric([1.0, 0.0]),
                SerializedValue::Symbolic("sin(".to_string()),
            ],
        };
        match m.to_matrix(true) {
            Err(OpticsError::Parse { context, .. }) => assert_eq!(context, "matrix cell (0, 1)"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_expressions_collapse() {
        let m = SerializedMatrix {
            kind: EntityKind::Matrix,
            rows: 1,
            cols: 2,
            cells: vec![
                SerializedValue::Symbolic("cos(0)".to_string()),
                SerializedValue::Numeric([0.0, 1.0]),
            ],
        };
        let collapsed = m.to_matrix(true).unwrap();
        let numeric = collapsed.as_numeric().unwrap();
        assert_eq!(numeric.get(0, 0), Complex64::new(1.0, 0.0));

        assert!(m.to_matrix(false).unwrap().is_symbolic());
    }

    #[test]
    fn test_symbolic_kept_until_bound() {
        let m = SerializedMatrix {
            kind: EntityKind::Matrix,
            rows: 1,
            cols: 1,
            cells: vec![SerializedValue::Symbolic("2*x".to_string())],
        };
        let decoded = m.to_matrix(true).unwrap();
        assert!(decoded.is_symbolic());
        assert!(m.to_numeric().is_err());

        let mut b = Bindings::new();
        b.insert("x".to_string(), 0.25);
        assert_eq!(decoded.evaluate(&b).unwrap().get(0, 0), Complex64::new(0.5, 0.0));
    }
}
