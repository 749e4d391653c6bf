//! Core types for linear optical circuits and their serialization
//!
//! This crate provides the data model of the linopt workspace:
//! - [`ModeId`]: Type-safe mode addressing
//! - [`Component`] / [`ComponentKind`]: Optical components from a closed registry
//! - [`Circuit`]: Ordered placements of components and nested sub-circuits
//! - [`NumericMatrix`] / [`SymbolicMatrix`]: Unitary matrices, exact or symbolic
//! - [`BasicState`] / [`SVDistribution`]: Fock states and distributions over them
//!
//! The [`serialization`] module converts all of these to JSON envelopes and back.
//!
//! # Example
//! ```
//! use linopt_core::{Circuit, Component, Parameter};
//!
//! let mut circuit = Circuit::new(2);
//! circuit
//!     .push(Component::bs(Parameter::symbol("theta")))
//!     .unwrap()
//!     .add(1, Component::ps(0.5))
//!     .unwrap();
//! assert_eq!(circuit.len(), 2);
//! assert!(circuit.is_symbolic());
//! ```

pub mod circuit;
pub mod component;
pub mod distribution;
pub mod error;
pub mod expr;
pub mod matrix;
pub mod mode;
pub mod parameter;
pub mod state;
pub mod value;

#[cfg(feature = "serialization")]
pub mod serialization;

// Re-exports for convenience
pub use circuit::{Circuit, Element, Placement};
pub use component::{Component, ComponentKind};
pub use distribution::SVDistribution;
pub use error::OpticsError;
pub use expr::{Bindings, Expr};
pub use matrix::{Matrix, NumericMatrix, SymbolicMatrix};
pub use mode::ModeId;
pub use num_complex::Complex64;
pub use parameter::Parameter;
pub use state::{Annotation, BasicState};
pub use value::Value;

/// Type alias for results in linopt
pub type Result<T> = std::result::Result<T, OpticsError>;
