//! Optical component kinds and descriptors
//!
//! The set of component kinds is closed: [`ComponentKind`] enumerates them
//! and a static table records, per kind, the wire name, the ordered
//! parameter names with their defaults, the port width and any extra payload
//! (index mapping for permutations, matrix block for fixed unitaries).

use crate::expr::Bindings;
use crate::matrix::NumericMatrix;
use crate::parameter::Parameter;
use crate::{OpticsError, Result};
use std::collections::BTreeSet;
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

/// A declared parameter of a component kind
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
}

/// Extra data a component kind carries besides its parameters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    None,
    /// Explicit index mapping (permutation-like kinds)
    Permutation,
    /// Fixed numeric matrix block
    Matrix,
}

/// Registry entry for one component kind
#[derive(Debug)]
pub struct KindSpec {
    pub kind: ComponentKind,
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    /// Port width, `None` when it depends on the payload
    pub width: Option<usize>,
    pub payload: PayloadKind,
    /// Whether the unitary action acts on polarization
    pub polarized: bool,
}

const BS_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "theta",
        default: FRAC_PI_2,
    },
    ParamSpec {
        name: "phi_tl",
        default: 0.0,
    },
    ParamSpec {
        name: "phi_bl",
        default: 0.0,
    },
    ParamSpec {
        name: "phi_tr",
        default: 0.0,
    },
    ParamSpec {
        name: "phi_br",
        default: 0.0,
    },
];

const PS_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "phi",
    default: 0.0,
}];

const WP_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "delta",
        default: 0.0,
    },
    ParamSpec {
        name: "xsi",
        default: 0.0,
    },
];

const XSI_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "xsi",
    default: 0.0,
}];

const PR_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "delta",
    default: 0.0,
}];

/// The component registry, indexed by `ComponentKind as usize`
static REGISTRY: [KindSpec; 11] = [
    KindSpec {
        kind: ComponentKind::BeamSplitterRx,
        name: "BS.Rx",
        params: BS_PARAMS,
        width: Some(2),
        payload: PayloadKind::None,
        polarized: false,
    },
    KindSpec {
        kind: ComponentKind::BeamSplitterRy,
        name: "BS.Ry",
        params: BS_PARAMS,
        width: Some(2),
        payload: PayloadKind::None,
        polarized: false,
    },
    KindSpec {
        kind: ComponentKind::BeamSplitterH,
        name: "BS.H",
        params: BS_PARAMS,
        width: Some(2),
        payload: PayloadKind::None,
        polarized: false,
    },
    KindSpec {
        kind: ComponentKind::PhaseShifter,
        name: "PS",
        params: PS_PARAMS,
        width: Some(1),
        payload: PayloadKind::None,
        polarized: false,
    },
    KindSpec {
        kind: ComponentKind::Permutation,
        name: "PERM",
        params: &[],
        width: None,
        payload: PayloadKind::Permutation,
        polarized: false,
    },
    KindSpec {
        kind: ComponentKind::PolarizingBeamSplitter,
        name: "PBS",
        params: &[],
        width: Some(2),
        payload: PayloadKind::None,
        polarized: true,
    },
    KindSpec {
        kind: ComponentKind::WavePlate,
        name: "WP",
        params: WP_PARAMS,
        width: Some(1),
        payload: PayloadKind::None,
        polarized: true,
    },
    KindSpec {
        kind: ComponentKind::HalfWavePlate,
        name: "HWP",
        params: XSI_PARAMS,
        width: Some(1),
        payload: PayloadKind::None,
        polarized: true,
    },
    KindSpec {
        kind: ComponentKind::QuarterWavePlate,
        name: "QWP",
        params: XSI_PARAMS,
        width: Some(1),
        payload: PayloadKind::None,
        polarized: true,
    },
    KindSpec {
        kind: ComponentKind::PolarizationRotator,
        name: "PR",
        params: PR_PARAMS,
        width: Some(1),
        payload: PayloadKind::None,
        polarized: true,
    },
    KindSpec {
        kind: ComponentKind::Unitary,
        name: "Unitary",
        params: &[],
        width: None,
        payload: PayloadKind::Matrix,
        polarized: false,
    },
];

/// Closed set of optical component kinds
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    /// Beam splitter, Rx convention
    BeamSplitterRx,
    /// Beam splitter, Ry convention
    BeamSplitterRy,
    /// Beam splitter, Hadamard convention
    BeamSplitterH,
    PhaseShifter,
    Permutation,
    PolarizingBeamSplitter,
    /// Generic wave plate (retardance `delta`, axis angle `xsi`)
    WavePlate,
    HalfWavePlate,
    QuarterWavePlate,
    PolarizationRotator,
    /// Fixed unitary block
    Unitary,
}

impl ComponentKind {
    /// Every kind, in registry order
    pub const ALL: [ComponentKind; 11] = [
        ComponentKind::BeamSplitterRx,
        ComponentKind::BeamSplitterRy,
        ComponentKind::BeamSplitterH,
        ComponentKind::PhaseShifter,
        ComponentKind::Permutation,
        ComponentKind::PolarizingBeamSplitter,
        ComponentKind::WavePlate,
        ComponentKind::HalfWavePlate,
        ComponentKind::QuarterWavePlate,
        ComponentKind::PolarizationRotator,
        ComponentKind::Unitary,
    ];

    /// Registry entry for this kind
    #[inline]
    pub fn spec(self) -> &'static KindSpec {
        &REGISTRY[self as usize]
    }

    /// Wire name (e.g. `"BS.Rx"`, `"PERM"`)
    #[inline]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Declared parameters, in order
    #[inline]
    pub fn params(self) -> &'static [ParamSpec] {
        self.spec().params
    }

    /// Position of a parameter in the declared order
    pub fn param_index(self, name: &str) -> Option<usize> {
        self.params().iter().position(|p| p.name == name)
    }

    /// Fixed port width, `None` for payload-sized kinds
    #[inline]
    pub fn fixed_width(self) -> Option<usize> {
        self.spec().width
    }

    #[inline]
    pub fn payload(self) -> PayloadKind {
        self.spec().payload
    }

    #[inline]
    pub fn is_polarized(self) -> bool {
        self.spec().polarized
    }

    /// Look up a kind by wire name
    ///
    /// # Errors
    /// Returns [`OpticsError::UnknownKind`] for unregistered names
    pub fn from_name(name: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.kind)
            .ok_or_else(|| OpticsError::UnknownKind(format!("component kind '{}'", name)))
    }
}

impl FromStr for ComponentKind {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self> {
        ComponentKind::from_name(s)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Payload carried by a component instance
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    None,
    Permutation(Vec<usize>),
    Matrix(NumericMatrix),
}

/// A component descriptor: kind, parameter values, and payload
///
/// # Example
/// ```
/// use linopt_core::{Component, ComponentKind};
///
/// let bs = Component::new(ComponentKind::BeamSplitterH)
///     .unwrap()
///     .with_param("theta", 0.36)
///     .unwrap()
///     .with_param("phi_tl", 1.94)
///     .unwrap();
/// assert_eq!(bs.width(), 2);
/// assert_eq!(bs.param("theta").unwrap().value(), Some(0.36));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    kind: ComponentKind,
    params: Vec<Parameter>,
    payload: Payload,
}

impl Component {
    /// Create a component of a parameter-only kind with default parameter values
    ///
    /// # Errors
    /// Returns [`OpticsError::Validation`] for kinds that need a payload
    /// (use [`Component::perm`] or [`Component::unitary`])
    pub fn new(kind: ComponentKind) -> Result<Self> {
        if kind.payload() != PayloadKind::None {
            return Err(OpticsError::Validation(format!(
                "component '{}' needs a payload",
                kind
            )));
        }
        Ok(Self::with_defaults(kind, Payload::None))
    }

    fn with_defaults(kind: ComponentKind, payload: Payload) -> Self {
        Self {
            kind,
            params: kind
                .params()
                .iter()
                .map(|p| Parameter::Fixed(p.default))
                .collect(),
            payload,
        }
    }

    fn with_first(kind: ComponentKind, value: Parameter) -> Self {
        let mut c = Self::with_defaults(kind, Payload::None);
        c.params[0] = value;
        c
    }

    /// Beam splitter (Rx convention) with angle `theta`
    pub fn bs(theta: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::BeamSplitterRx, theta.into())
    }

    /// Beam splitter (Ry convention) with angle `theta`
    pub fn bs_ry(theta: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::BeamSplitterRy, theta.into())
    }

    /// Beam splitter (H convention) with angle `theta`
    pub fn bs_h(theta: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::BeamSplitterH, theta.into())
    }

    /// Phase shifter
    pub fn ps(phi: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::PhaseShifter, phi.into())
    }

    /// Polarizing beam splitter
    pub fn pbs() -> Self {
        Self::with_defaults(ComponentKind::PolarizingBeamSplitter, Payload::None)
    }

    /// Wave plate with retardance `delta` and axis angle `xsi`
    pub fn wp(delta: impl Into<Parameter>, xsi: impl Into<Parameter>) -> Self {
        let mut c = Self::with_defaults(ComponentKind::WavePlate, Payload::None);
        c.params[0] = delta.into();
        c.params[1] = xsi.into();
        c
    }

    /// Half-wave plate
    pub fn hwp(xsi: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::HalfWavePlate, xsi.into())
    }

    /// Quarter-wave plate
    pub fn qwp(xsi: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::QuarterWavePlate, xsi.into())
    }

    /// Polarization rotator
    pub fn pr(delta: impl Into<Parameter>) -> Self {
        Self::with_first(ComponentKind::PolarizationRotator, delta.into())
    }

    /// Mode permutation: input mode `i` goes to output mode `perm[i]`
    ///
    /// # Errors
    /// Returns [`OpticsError::Validation`] unless `perm` is a bijection of `0..perm.len()`
    pub fn perm(perm: Vec<usize>) -> Result<Self> {
        validate_permutation(&perm)?;
        Ok(Self::with_defaults(
            ComponentKind::Permutation,
            Payload::Permutation(perm),
        ))
    }

    /// Fixed unitary block
    ///
    /// # Errors
    /// Returns [`OpticsError::Validation`] if the matrix is not square and unitary
    pub fn unitary(matrix: NumericMatrix) -> Result<Self> {
        if !matrix.is_unitary(1e-6) {
            return Err(OpticsError::Validation(format!(
                "{}x{} matrix is not unitary",
                matrix.rows(),
                matrix.cols()
            )));
        }
        Ok(Self::with_defaults(ComponentKind::Unitary, Payload::Matrix(matrix)))
    }

    /// Set a named parameter (builder pattern)
    ///
    /// # Errors
    /// - [`OpticsError::UnknownKind`] if the kind declares no such parameter
    /// - [`OpticsError::NonFinite`] for a NaN or infinite fixed value
    pub fn with_param(mut self, name: &str, value: impl Into<Parameter>) -> Result<Self> {
        self.set_param(name, value)?;
        Ok(self)
    }

    /// Set a named parameter
    ///
    /// # Errors
    /// See [`Component::with_param`]
    pub fn set_param(&mut self, name: &str, value: impl Into<Parameter>) -> Result<()> {
        let index = self.kind.param_index(name).ok_or_else(|| {
            OpticsError::UnknownKind(format!("parameter '{}' for component '{}'", name, self.kind))
        })?;
        let value = value.into();
        if let Parameter::Fixed(v) = value {
            if !v.is_finite() {
                return Err(OpticsError::NonFinite(format!(
                    "parameter '{}' of '{}' is {}",
                    name, self.kind, v
                )));
            }
        }
        self.params[index] = value;
        Ok(())
    }

    #[inline]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Value of a named parameter
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.kind.param_index(name).map(|i| &self.params[i])
    }

    /// `(name, value)` pairs in declared order
    pub fn params(&self) -> impl Iterator<Item = (&'static str, &Parameter)> {
        self.kind.params().iter().map(|p| p.name).zip(self.params.iter())
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Index mapping of a permutation
    pub fn permutation(&self) -> Option<&[usize]> {
        match &self.payload {
            Payload::Permutation(p) => Some(p),
            _ => None,
        }
    }

    /// Matrix block of a fixed unitary
    pub fn matrix(&self) -> Option<&NumericMatrix> {
        match &self.payload {
            Payload::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Number of ports this component spans
    pub fn width(&self) -> usize {
        match (&self.payload, self.kind.fixed_width()) {
            (Payload::Permutation(p), _) => p.len(),
            (Payload::Matrix(m), _) => m.rows(),
            (Payload::None, Some(w)) => w,
            (Payload::None, None) => 0,
        }
    }

    /// Whether any parameter is symbolic
    pub fn is_symbolic(&self) -> bool {
        self.params.iter().any(Parameter::is_symbolic)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.params.iter().flat_map(Parameter::free_symbols).collect()
    }

    /// Bind free variables in every parameter
    pub fn subs(&self, bindings: &Bindings) -> Component {
        Component {
            kind: self.kind,
            params: self.params.iter().map(|p| p.subs(bindings)).collect(),
            payload: self.payload.clone(),
        }
    }
}

/// Check that `perm` is a bijection of `0..perm.len()`
pub(crate) fn validate_permutation(perm: &[usize]) -> Result<()> {
    if perm.is_empty() {
        return Err(OpticsError::Validation("permutation must not be empty".to_string()));
    }
    let mut seen = vec![false; perm.len()];
    for &target in perm {
        if target >= perm.len() || seen[target] {
            return Err(OpticsError::Validation(format!(
                "{:?} is not a permutation of 0..{}",
                perm,
                perm.len()
            )));
        }
        seen[target] = true;
    }
    Ok(())
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        let mut first = true;
        if let Some(perm) = self.permutation() {
            write!(f, "{:?}", perm)?;
            first = false;
        }
        if let Some(m) = self.matrix() {
            write!(f, "{}x{}", m.rows(), m.cols())?;
            first = false;
        }
        for (name, value) in self.params() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        write!(f, ")")
    }
}
