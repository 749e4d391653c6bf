//! Unitary action of components and circuits
//!
//! Every parameterized kind builds its unitary as a [`SymbolicMatrix`] of
//! expressions over its parameters, so symbolic components give symbolic
//! matrices and fixed ones evaluate to numbers. Payload kinds (`PERM`, PBS,
//! fixed unitary blocks) are numeric directly.
//!
//! Polarization-aware kinds act on two dimensions per mode, ordered
//! `(m H, m V)`. A circuit containing any of them is composed in that
//! doubled space, other components acting as `U ⊗ I₂`.
//!
//! # Example
//!
//! ```rust
//! use linopt_components::unitary::{circuit_unitary, compute_unitary};
//! use linopt_core::{Bindings, Circuit, Component};
//!
//! let bs = Component::bs(std::f64::consts::FRAC_PI_2);
//! assert!(compute_unitary(&bs).unwrap().is_unitary(1e-12));
//!
//! let mut circuit = Circuit::new(2);
//! circuit.push(bs).unwrap().push(Component::ps(0.3)).unwrap();
//! let u = circuit_unitary(&circuit, &Bindings::new()).unwrap();
//! assert_eq!(u.rows(), 2);
//! ```

use crate::matrices::{permutation_matrix, to_numeric, ONE, PBS, ZERO};
use linopt_core::component::Payload;
use linopt_core::{
    Bindings, Circuit, Component, ComponentKind, Expr, Matrix, NumericMatrix, OpticsError,
    Parameter, Result, SymbolicMatrix, Value,
};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use tracing::trace;

fn param(component: &Component, name: &str) -> Result<Expr> {
    component
        .param(name)
        .map(Parameter::expr)
        .ok_or_else(|| OpticsError::UnknownKind(format!("parameter '{}' of {}", name, component)))
}

fn square(n: usize, cells: Vec<Expr>) -> Result<SymbolicMatrix> {
    SymbolicMatrix::new(n, n, cells.into_iter().map(Value::from_expr).collect())
}

/// `exp(i (a + b))`
fn phase(a: &Expr, b: &Expr) -> Expr {
    Expr::cis(Expr::add(a.clone(), b.clone()))
}

fn beam_splitter(component: &Component) -> Result<SymbolicMatrix> {
    let half = Expr::div(param(component, "theta")?, Expr::Number(2.0));
    let (cos, sin) = (Expr::cos(half.clone()), Expr::sin(half));
    let tl = param(component, "phi_tl")?;
    let bl = param(component, "phi_bl")?;
    let tr = param(component, "phi_tr")?;
    let br = param(component, "phi_br")?;

    let (a, b, c, d) = match component.kind() {
        ComponentKind::BeamSplitterRx => (
            cos.clone(),
            Expr::mul(Expr::i(), sin.clone()),
            Expr::mul(Expr::i(), sin),
            cos,
        ),
        ComponentKind::BeamSplitterRy => (cos.clone(), Expr::neg(sin.clone()), sin, cos),
        _ => (cos.clone(), sin.clone(), sin, Expr::neg(cos)),
    };
    square(
        2,
        vec![
            Expr::mul(a, phase(&tl, &tr)),
            Expr::mul(b, phase(&tr, &bl)),
            Expr::mul(c, phase(&tl, &br)),
            Expr::mul(d, phase(&bl, &br)),
        ],
    )
}

/// Wave plate with retardance `delta` and axis angle `xsi`
fn wave_plate(delta: Expr, xsi: Expr) -> Result<SymbolicMatrix> {
    let double = Expr::mul(Expr::Number(2.0), xsi);
    let i_sin = Expr::mul(Expr::i(), Expr::sin(delta.clone()));
    let cos = Expr::cos(delta);
    let (c2, s2) = (Expr::cos(double.clone()), Expr::sin(double));
    square(
        2,
        vec![
            Expr::add(Expr::mul(i_sin.clone(), c2.clone()), cos.clone()),
            Expr::mul(i_sin.clone(), s2.clone()),
            Expr::mul(i_sin.clone(), s2),
            Expr::add(Expr::neg(Expr::mul(i_sin, c2)), cos),
        ],
    )
}

fn rotator(delta: Expr) -> Result<SymbolicMatrix> {
    let (cos, sin) = (Expr::cos(delta.clone()), Expr::sin(delta));
    square(2, vec![cos.clone(), sin.clone(), Expr::neg(sin), cos])
}

/// Unitary of a component, symbolic in its unresolved parameters
///
/// The result is `width × width`, or `2·width × 2·width` for
/// polarization-aware kinds.
pub fn symbolic_unitary(component: &Component) -> Result<Matrix> {
    let m = match component.kind() {
        ComponentKind::BeamSplitterRx
        | ComponentKind::BeamSplitterRy
        | ComponentKind::BeamSplitterH => beam_splitter(component)?,
        ComponentKind::PhaseShifter => square(1, vec![Expr::cis(param(component, "phi")?)])?,
        ComponentKind::WavePlate => {
            wave_plate(param(component, "delta")?, param(component, "xsi")?)?
        },
        ComponentKind::HalfWavePlate => {
            wave_plate(Expr::Number(FRAC_PI_2), param(component, "xsi")?)?
        },
        ComponentKind::QuarterWavePlate => {
            wave_plate(Expr::Number(FRAC_PI_4), param(component, "xsi")?)?
        },
        ComponentKind::PolarizationRotator => rotator(param(component, "delta")?)?,
        ComponentKind::PolarizingBeamSplitter => return Ok(Matrix::Numeric(to_numeric(&PBS)?)),
        ComponentKind::Permutation | ComponentKind::Unitary => {
            return payload_unitary(component).map(Matrix::Numeric)
        },
    };
    Ok(Matrix::from(m))
}

fn payload_unitary(component: &Component) -> Result<NumericMatrix> {
    match component.payload() {
        Payload::Permutation(perm) => permutation_matrix(perm),
        Payload::Matrix(m) => Ok(m.clone()),
        Payload::None => Err(OpticsError::Validation(format!(
            "{} carries no payload",
            component
        ))),
    }
}

/// Numeric unitary of a component, binding free parameters from `bindings`
///
/// # Errors
/// Returns [`OpticsError::UnboundSymbol`] if a parameter stays unresolved
pub fn component_unitary(component: &Component, bindings: &Bindings) -> Result<NumericMatrix> {
    symbolic_unitary(component)?.evaluate(bindings)
}

/// Numeric unitary of a component whose parameters are all fixed
pub fn compute_unitary(component: &Component) -> Result<NumericMatrix> {
    component_unitary(component, &Bindings::new())
}

/// `U ⊗ I₂`: lift a mode-space unitary to the polarization space
pub fn expand_polarization(u: &NumericMatrix) -> Result<NumericMatrix> {
    let n = u.rows();
    let dim = 2 * n;
    let mut data = vec![ZERO; dim * dim];
    for i in 0..n {
        for j in 0..u.cols() {
            let value = u.get(i, j);
            for p in 0..2 {
                data[(2 * i + p) * dim + 2 * j + p] = value;
            }
        }
    }
    NumericMatrix::new(dim, dim, data)
}

/// Embed a block acting on dimensions `offset..offset + block.rows()` into
/// a `dim`-dimensional identity
///
/// # Errors
/// Returns [`OpticsError::Range`] if the block does not fit
pub fn embed(block: &NumericMatrix, offset: usize, dim: usize) -> Result<NumericMatrix> {
    let n = block.rows();
    if offset + n > dim || !block.is_square() {
        return Err(OpticsError::Range(format!(
            "{}x{} block at offset {} does not fit in dimension {}",
            block.rows(),
            block.cols(),
            offset,
            dim
        )));
    }
    let mut data = vec![ZERO; dim * dim];
    for k in 0..dim {
        data[k * dim + k] = ONE;
    }
    for i in 0..n {
        for j in 0..n {
            data[(offset + i) * dim + offset + j] = block.get(i, j);
        }
    }
    NumericMatrix::new(dim, dim, data)
}

/// Whether a circuit needs the polarization space
pub fn is_polarized(circuit: &Circuit) -> bool {
    circuit
        .flatten()
        .iter()
        .any(|(_, c)| c.kind().is_polarized())
}

/// Unitary of a whole circuit
///
/// Components are composed in placement order: the first placed component
/// acts first, so the result is `U_k · … · U_1`.
///
/// # Errors
/// Returns [`OpticsError::UnboundSymbol`] if a parameter stays unresolved
pub fn circuit_unitary(circuit: &Circuit, bindings: &Bindings) -> Result<NumericMatrix> {
    let polarized = is_polarized(circuit);
    let scale = if polarized { 2 } else { 1 };
    let dim = scale * circuit.width();

    let mut u = NumericMatrix::identity(dim);
    for (ports, component) in circuit.flatten() {
        let mut block = component_unitary(component, bindings)?;
        if polarized && !component.kind().is_polarized() {
            block = expand_polarization(&block)?;
        }
        let offset = ports.first().map(|m| m.index()).unwrap_or(0) * scale;
        trace!(%component, offset, "composing component");
        u = embed(&block, offset, dim)?.mul(&u)?;
    }
    Ok(u)
}
