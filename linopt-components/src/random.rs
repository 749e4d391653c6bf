//! Random unitary generation
//!
//! Samples Haar-distributed unitaries: a matrix of complex Gaussian entries
//! is orthonormalized column by column (Gram-Schmidt).

use linopt_core::{NumericMatrix, Result};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

/// Standard complex normal sample (Box-Muller)
fn complex_gaussian<R: Rng + ?Sized>(rng: &mut R) -> Complex64 {
    // 1 - u keeps the logarithm argument in (0, 1]
    let u: f64 = 1.0 - rng.gen::<f64>();
    let v: f64 = rng.gen();
    let r = (-u.ln()).sqrt();
    Complex64::from_polar(r, TAU * v)
}

/// Random `n × n` unitary drawn from the Haar measure
///
/// # Panics
/// Panics if `n` is 0
pub fn random_unitary<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<NumericMatrix> {
    assert!(n > 0, "unitary dimension must be at least 1");

    let mut columns: Vec<Vec<Complex64>> = Vec::with_capacity(n);
    while columns.len() < n {
        let mut v: Vec<Complex64> = (0..n).map(|_| complex_gaussian(rng)).collect();
        for q in &columns {
            let overlap: Complex64 = q.iter().zip(&v).map(|(a, b)| a.conj() * b).sum();
            for (x, qi) in v.iter_mut().zip(q) {
                *x -= overlap * qi;
            }
        }
        let norm = v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
        // Resample the (measure-zero) nearly dependent draws
        if norm < 1e-10 {
            continue;
        }
        v.iter_mut().for_each(|x| *x /= norm);
        columns.push(v);
    }

    let mut data = Vec::with_capacity(n * n);
    for i in 0..n {
        data.extend(columns.iter().map(|col| col[i]));
    }
    NumericMatrix::new(n, n, data)
}

/// Reproducible random unitary
pub fn random_unitary_seeded(n: usize, seed: u64) -> Result<NumericMatrix> {
    random_unitary(n, &mut StdRng::seed_from_u64(seed))
}
