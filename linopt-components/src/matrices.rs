//! Constant component matrices
//!
//! Components without parameters have fixed unitaries, stored here as
//! row-major constants.

use linopt_core::{NumericMatrix, Result};
use num_complex::Complex64;

// Compile-time constant helpers
pub(crate) const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub(crate) const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Polarizing beam splitter, basis order `(m0 H, m0 V, m1 H, m1 V)`
///
/// Swaps the horizontal components of the two modes and leaves the vertical
/// ones in place:
/// PBS = [[0, 0, 1, 0],
///        [0, 1, 0, 0],
///        [1, 0, 0, 0],
///        [0, 0, 0, 1]]
pub const PBS: [[Complex64; 4]; 4] = [
    [ZERO, ZERO, ONE, ZERO],
    [ZERO, ONE, ZERO, ZERO],
    [ONE, ZERO, ZERO, ZERO],
    [ZERO, ZERO, ZERO, ONE],
];

/// Convert a constant square matrix to a [`NumericMatrix`]
pub fn to_numeric<const N: usize>(matrix: &[[Complex64; N]; N]) -> Result<NumericMatrix> {
    NumericMatrix::new(N, N, matrix.iter().flatten().copied().collect())
}

/// Permutation matrix: column `i` has its one in row `perm[i]`
///
/// `perm` must be a bijection of `0..perm.len()`; components validate this
/// on construction.
pub fn permutation_matrix(perm: &[usize]) -> Result<NumericMatrix> {
    let n = perm.len();
    let mut data = vec![ZERO; n * n];
    for (input, &output) in perm.iter().enumerate() {
        data[output * n + input] = ONE;
    }
    NumericMatrix::new(n, n, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbs_is_unitary() {
        let pbs = to_numeric(&PBS).unwrap();
        assert!(pbs.is_unitary(1e-15));
        assert_eq!(pbs.rows(), 4);
    }

    #[test]
    fn test_permutation_routes_modes() {
        let m = permutation_matrix(&[2, 0, 1]).unwrap();
        assert_eq!(m.get(2, 0), ONE);
        assert_eq!(m.get(0, 1), ONE);
        assert_eq!(m.get(1, 2), ONE);
        assert_eq!(m.get(0, 0), ZERO);
        assert!(m.is_unitary(1e-15));
    }
}
