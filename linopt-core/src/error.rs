//! Error types for linopt

use thiserror::Error;

/// Errors that can occur while building, encoding or decoding optical entities
#[derive(Debug, Error)]
pub enum OpticsError {
    /// Malformed state text or symbolic-expression text
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Declared and actual dimensions disagree
    #[error("Shape error: {0}")]
    Shape(String),

    /// Component kind, parameter name or envelope discriminator not recognized
    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    /// Port index out of bounds, negative probability mass, ...
    #[error("Out of range: {0}")]
    Range(String),

    /// Envelope discriminator does not match the requested decoder
    #[error("Envelope type mismatch: expected '{expected}', found '{actual}'")]
    EnvelopeMismatch { expected: String, actual: String },

    /// Value handed to the dispatch facade is not a serializable entity
    #[error("Unsupported type for serialization: {0}")]
    UnsupportedType(String),

    /// Evaluation hit a free variable with no binding
    #[error("Unbound symbol '{0}'")]
    UnboundSymbol(String),

    /// NaN or infinite number where a finite one is required
    #[error("Non-finite value: {0}")]
    NonFinite(String),

    /// Envelope written by a newer format version
    #[error("Format version mismatch: supported up to {expected}, found {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    /// Envelope is not valid JSON or does not match the expected layout
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid model construction (bad permutation, bounds, placement)
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl OpticsError {
    /// Create a parse error
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an envelope mismatch error
    pub fn envelope_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::EnvelopeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a port-out-of-range error
    pub fn port_out_of_range(port: usize, width: usize) -> Self {
        Self::Range(format!("port {} outside circuit of width {}", port, width))
    }
}
