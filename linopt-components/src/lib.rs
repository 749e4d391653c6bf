//! Unitary action of linear optical components
//!
//! This crate computes the matrices that `linopt-core` components and
//! circuits act with, and samples random unitaries.
//!
//! # Features
//!
//! - **Symbolic unitaries**: components with unresolved parameters yield
//!   symbolic matrices that evaluate once the parameters are bound
//! - **Circuit composition**: nested circuits are flattened and composed in
//!   placement order, in the polarization space when needed
//! - **Random unitaries**: Haar-distributed samples for tests and demos
//!
//! # Example
//!
//! ```
//! use linopt_components::{compute_unitary, random_unitary_seeded};
//! use linopt_core::Component;
//!
//! let u = random_unitary_seeded(3, 1).unwrap();
//! let block = Component::unitary(u.clone()).unwrap();
//! assert_eq!(compute_unitary(&block).unwrap(), u);
//! ```

pub mod matrices;
pub mod random;
pub mod unitary;

// Re-export commonly used items
pub use random::{random_unitary, random_unitary_seeded};
pub use unitary::{
    circuit_unitary, component_unitary, compute_unitary, embed, expand_polarization,
    symbolic_unitary,
};
