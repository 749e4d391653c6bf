//! Numeric and symbolic matrices
//!
//! Matrices are stored row-major. A [`NumericMatrix`] holds finite complex
//! numbers; a [`SymbolicMatrix`] holds [`Value`] cells, each either a number
//! or an expression over free variables. [`Matrix`] is the union of both and
//! is what the matrix codec decodes into.

use crate::expr::Bindings;
use crate::value::Value;
use crate::{OpticsError, Result};
use num_complex::Complex64;
use std::collections::BTreeSet;
use std::fmt;

fn check_shape(rows: usize, cols: usize, len: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(OpticsError::Shape(format!(
            "matrix dimensions must be positive, got {}x{}",
            rows, cols
        )));
    }
    let expected = rows.checked_mul(cols).ok_or_else(|| {
        OpticsError::Shape(format!("{}x{} matrix has too many cells", rows, cols))
    })?;
    if expected != len {
        return Err(OpticsError::Shape(format!(
            "{}x{} matrix needs {} cells, got {}",
            rows, cols, expected, len
        )));
    }
    Ok(())
}

/// Rectangular grid of finite complex numbers
#[derive(Clone, Debug, PartialEq)]
pub struct NumericMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl NumericMatrix {
    /// Create a matrix from row-major data
    ///
    /// # Errors
    /// - [`OpticsError::Shape`] if `data.len() != rows * cols` or a dimension is zero
    /// - [`OpticsError::NonFinite`] if any cell is NaN or infinite
    pub fn new(rows: usize, cols: usize, data: Vec<Complex64>) -> Result<Self> {
        check_shape(rows, cols, data.len())?;
        if let Some(pos) = data.iter().position(|z| !(z.re.is_finite() && z.im.is_finite())) {
            return Err(OpticsError::NonFinite(format!(
                "cell ({}, {}) is {}",
                pos / cols,
                pos % cols,
                data[pos]
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from rows of equal length
    ///
    /// # Example
    /// ```
    /// use linopt_core::NumericMatrix;
    ///
    /// let m = NumericMatrix::from_real_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(m.rows(), 2);
    /// assert_eq!(m.get(1, 0).re, 3.0);
    /// ```
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(OpticsError::Shape(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        Self::new(rows.len(), cols, rows.iter().flatten().copied().collect())
    }

    /// Create a real-valued matrix from rows
    pub fn from_real_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let rows: Vec<Vec<Complex64>> = rows
            .iter()
            .map(|r| r.iter().map(|&x| Complex64::new(x, 0.0)).collect())
            .collect();
        Self::from_rows(&rows)
    }

    /// n×n identity
    ///
    /// # Panics
    /// Panics if `n` is 0
    pub fn identity(n: usize) -> Self {
        assert!(n > 0, "identity matrix must have at least one row");
        let mut data = vec![Complex64::new(0.0, 0.0); n * n];
        for i in 0..n {
            data[i * n + i] = Complex64::new(1.0, 0.0);
        }
        Self { rows: n, cols: n, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Cell at `(row, col)`
    ///
    /// # Panics
    /// Panics if the index is out of bounds
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[row * self.cols + col]
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.cols + col] = value;
    }

    /// Row-major cells
    #[inline]
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Matrix product `self * rhs`
    ///
    /// # Errors
    /// Returns [`OpticsError::Shape`] if inner dimensions differ
    pub fn mul(&self, rhs: &NumericMatrix) -> Result<NumericMatrix> {
        if self.cols != rhs.rows {
            return Err(OpticsError::Shape(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        let mut out = vec![Complex64::new(0.0, 0.0); self.rows * rhs.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                for j in 0..rhs.cols {
                    out[i * rhs.cols + j] += a * rhs.data[k * rhs.cols + j];
                }
            }
        }
        Ok(NumericMatrix {
            rows: self.rows,
            cols: rhs.cols,
            data: out,
        })
    }

    /// Conjugate transpose
    pub fn dagger(&self) -> NumericMatrix {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.data[i * self.cols + j].conj());
            }
        }
        NumericMatrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Elementwise comparison: `|a - b| <= tol * max(1, |a|, |b|)`
    pub fn approx_eq(&self, other: &NumericMatrix, tol: f64) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.data.iter().zip(&other.data).all(|(a, b)| {
                let scale = 1.0_f64.max(a.norm()).max(b.norm());
                (a - b).norm() <= tol * scale
            })
    }

    /// Check `U * U† = I` within `tol`
    pub fn is_unitary(&self, tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        match self.mul(&self.dagger()) {
            Ok(product) => product.approx_eq(&NumericMatrix::identity(self.rows), tol),
            Err(_) => false,
        }
    }

    /// View as a symbolic matrix with numeric cells
    pub fn to_symbolic(&self) -> SymbolicMatrix {
        SymbolicMatrix {
            rows: self.rows,
            cols: self.cols,
            cells: self.data.iter().map(|&z| Value::Numeric(z)).collect(),
        }
    }
}

impl fmt::Display for NumericMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            write!(f, "[")?;
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.get(i, j))?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

/// Rectangular grid of numeric-or-symbolic cells
///
/// The same free-variable name in several cells denotes one parameter:
/// [`SymbolicMatrix::subs`] binds every occurrence at once.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolicMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Value>,
}

impl SymbolicMatrix {
    /// Create a symbolic matrix from row-major cells
    ///
    /// # Errors
    /// Returns [`OpticsError::Shape`] if `cells.len() != rows * cols` or a dimension is zero
    pub fn new(rows: usize, cols: usize, cells: Vec<Value>) -> Result<Self> {
        check_shape(rows, cols, cells.len())?;
        Ok(Self { rows, cols, cells })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at `(row, col)`
    ///
    /// # Panics
    /// Panics if the index is out of bounds
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &Value {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.cells[row * self.cols + col]
    }

    /// Row-major cells
    #[inline]
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.cells.iter().flat_map(Value::free_symbols).collect()
    }

    /// Bind free variables in every cell
    pub fn subs(&self, bindings: &Bindings) -> SymbolicMatrix {
        SymbolicMatrix {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(|c| c.subs(bindings)).collect(),
        }
    }

    /// Evaluate every cell
    ///
    /// # Errors
    /// Returns [`OpticsError::UnboundSymbol`] if a free variable is not bound
    pub fn evaluate(&self, bindings: &Bindings) -> Result<NumericMatrix> {
        let data = self
            .cells
            .iter()
            .map(|c| c.evaluate(bindings))
            .collect::<Result<Vec<_>>>()?;
        NumericMatrix::new(self.rows, self.cols, data)
    }

    /// Collapse to a numeric matrix when no cell has a free variable
    pub fn try_numeric(&self) -> Option<NumericMatrix> {
        if self.cells.iter().any(Value::has_free_symbols) {
            return None;
        }
        self.evaluate(&Bindings::new()).ok()
    }
}

impl fmt::Display for SymbolicMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            write!(f, "[")?;
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.get(i, j))?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

/// A decoded matrix: fully numeric, or symbolic when any cell has a free variable
#[derive(Clone, Debug, PartialEq)]
pub enum Matrix {
    Numeric(NumericMatrix),
    Symbolic(SymbolicMatrix),
}

impl Matrix {
    #[inline]
    pub fn rows(&self) -> usize {
        match self {
            Matrix::Numeric(m) => m.rows(),
            Matrix::Symbolic(m) => m.rows(),
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        match self {
            Matrix::Numeric(m) => m.cols(),
            Matrix::Symbolic(m) => m.cols(),
        }
    }

    #[inline]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Matrix::Symbolic(_))
    }

    pub fn as_numeric(&self) -> Option<&NumericMatrix> {
        match self {
            Matrix::Numeric(m) => Some(m),
            Matrix::Symbolic(_) => None,
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        match self {
            Matrix::Numeric(_) => BTreeSet::new(),
            Matrix::Symbolic(m) => m.free_symbols(),
        }
    }

    /// Bind free variables; the result is numeric once nothing is left unbound
    pub fn subs(&self, bindings: &Bindings) -> Matrix {
        match self {
            Matrix::Numeric(_) => self.clone(),
            Matrix::Symbolic(m) => Matrix::from(m.subs(bindings)),
        }
    }

    /// Evaluate to a numeric matrix
    ///
    /// # Errors
    /// Returns [`OpticsError::UnboundSymbol`] if a free variable is not bound
    pub fn evaluate(&self, bindings: &Bindings) -> Result<NumericMatrix> {
        match self {
            Matrix::Numeric(m) => Ok(m.clone()),
            Matrix::Symbolic(m) => m.evaluate(bindings),
        }
    }
}

impl From<NumericMatrix> for Matrix {
    fn from(m: NumericMatrix) -> Self {
        Matrix::Numeric(m)
    }
}

impl From<SymbolicMatrix> for Matrix {
    /// Collapses to [`Matrix::Numeric`] when no free variable remains
    fn from(m: SymbolicMatrix) -> Self {
        match m.try_numeric() {
            Some(numeric) => Matrix::Numeric(numeric),
            None => Matrix::Symbolic(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_shape_mismatch() {
        let result = NumericMatrix::new(2, 2, vec![c(1.0, 0.0); 3]);
        assert!(matches!(result, Err(OpticsError::Shape(_))));
        assert!(matches!(
            NumericMatrix::new(0, 2, vec![]),
            Err(OpticsError::Shape(_))
        ));
        assert!(matches!(
            NumericMatrix::new(usize::MAX, 2, vec![]),
            Err(OpticsError::Shape(_))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = NumericMatrix::new(1, 2, vec![c(1.0, 0.0), c(f64::NAN, 0.0)]);
        assert!(matches!(result, Err(OpticsError::NonFinite(_))));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = NumericMatrix::from_real_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(OpticsError::Shape(_))));
    }

    #[test]
    fn test_mul_and_dagger() {
        let a = NumericMatrix::from_rows(&[vec![c(0.0, 1.0), c(1.0, 0.0)]]).unwrap();
        let ad = a.dagger();
        assert_eq!(ad.rows(), 2);
        assert_eq!(ad.get(0, 0), c(0.0, -1.0));
        let p = a.mul(&ad).unwrap();
        assert_eq!(p.get(0, 0), c(2.0, 0.0));
        assert!(a.mul(&a).is_err());
    }

    #[test]
    fn test_identity_is_unitary() {
        let id = NumericMatrix::identity(4);
        assert!(id.is_unitary(1e-12));
        let not_unitary = NumericMatrix::from_real_rows(&[vec![1.0, 1.0], vec![0.0, 1.0]]).unwrap();
        assert!(!not_unitary.is_unitary(1e-12));
    }

    #[test]
    fn test_symbolic_subs_binds_every_occurrence() {
        let theta = Expr::symbol("theta");
        let m = SymbolicMatrix::new(
            1,
            2,
            vec![
                Value::Symbolic(Expr::cos(theta.clone())),
                Value::Symbolic(Expr::sin(theta)),
            ],
        )
        .unwrap();
        assert_eq!(m.free_symbols().len(), 1);
        assert!(m.try_numeric().is_none());

        let mut b = Bindings::new();
        b.insert("theta".to_string(), 0.3);
        let bound = Matrix::from(m.subs(&b));
        let numeric = bound.as_numeric().unwrap();
        assert_eq!(numeric.get(0, 0), c(0.3_f64.cos(), 0.0));
        assert_eq!(numeric.get(0, 1), c(0.3_f64.sin(), 0.0));
    }

    #[test]
    fn test_closed_symbolic_collapses() {
        let m = SymbolicMatrix::new(1, 1, vec![Value::Symbolic(Expr::parse("exp(I*pi)").unwrap())])
            .unwrap();
        assert!(!Matrix::from(m).is_symbolic());
    }
}
