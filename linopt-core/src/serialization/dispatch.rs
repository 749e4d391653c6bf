//! Entry points: pick the codec for a value and run it
//!
//! [`serialize`] takes any [`Entity`]; each `deserialize_*` function decodes
//! one kind and rejects envelopes of another. [`Codec`] exposes the same
//! operations under a non-default [`CodecConfig`].

use crate::circuit::Circuit;
use crate::distribution::SVDistribution;
use crate::matrix::{Matrix, NumericMatrix, SymbolicMatrix};
use crate::serialization::circuit::SerializedCircuit;
use crate::serialization::distribution::{decode_distribution, SerializedDistribution};
use crate::serialization::matrix::SerializedMatrix;
use crate::serialization::state::decode_state;
use crate::serialization::{read_envelope, write_json, CodecConfig, EntityKind};
use crate::state::BasicState;
use crate::{OpticsError, Result};
use std::any::{type_name, Any};
use tracing::debug;

/// A borrowed value of one of the serializable entity kinds
#[derive(Clone, Copy, Debug)]
pub enum Entity<'a> {
    Matrix(&'a Matrix),
    NumericMatrix(&'a NumericMatrix),
    SymbolicMatrix(&'a SymbolicMatrix),
    Circuit(&'a Circuit),
    State(&'a BasicState),
    Distribution(&'a SVDistribution),
}

impl Entity<'_> {
    /// Envelope kind this entity encodes to
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Matrix(_) | Entity::NumericMatrix(_) | Entity::SymbolicMatrix(_) => {
                EntityKind::Matrix
            },
            Entity::Circuit(_) => EntityKind::Circuit,
            Entity::State(_) => EntityKind::State,
            Entity::Distribution(_) => EntityKind::Distribution,
        }
    }
}

impl<'a> From<&'a Matrix> for Entity<'a> {
    fn from(m: &'a Matrix) -> Self {
        Entity::Matrix(m)
    }
}

impl<'a> From<&'a NumericMatrix> for Entity<'a> {
    fn from(m: &'a NumericMatrix) -> Self {
        Entity::NumericMatrix(m)
    }
}

impl<'a> From<&'a SymbolicMatrix> for Entity<'a> {
    fn from(m: &'a SymbolicMatrix) -> Self {
        Entity::SymbolicMatrix(m)
    }
}

impl<'a> From<&'a Circuit> for Entity<'a> {
    fn from(c: &'a Circuit) -> Self {
        Entity::Circuit(c)
    }
}

impl<'a> From<&'a BasicState> for Entity<'a> {
    fn from(s: &'a BasicState) -> Self {
        Entity::State(s)
    }
}

impl<'a> From<&'a SVDistribution> for Entity<'a> {
    fn from(d: &'a SVDistribution) -> Self {
        Entity::Distribution(d)
    }
}

/// Codec with an explicit configuration
///
/// # Example
/// ```
/// use linopt_core::serialization::{Codec, CodecConfig};
/// use linopt_core::NumericMatrix;
///
/// let codec = Codec::new(CodecConfig::readable()).unwrap();
/// let json = codec.serialize(&NumericMatrix::identity(2)).unwrap();
/// assert!(json.contains('\n'));
/// let back = codec.deserialize_matrix(&json).unwrap();
/// assert_eq!(back.as_numeric(), Some(&NumericMatrix::identity(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    /// Create a codec after checking the configuration
    ///
    /// # Errors
    /// Returns [`OpticsError::Validation`] if [`CodecConfig::validate`] fails
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate().map_err(OpticsError::Validation)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode any entity
    ///
    /// States encode to their canonical text; every other kind to a JSON
    /// envelope.
    ///
    /// # Errors
    /// Returns [`OpticsError::NonFinite`] for NaN or infinite numbers
    pub fn serialize<'a>(&self, entity: impl Into<Entity<'a>>) -> Result<String> {
        let entity = entity.into();
        debug!(kind = %entity.kind(), "serializing");
        match entity {
            Entity::Matrix(m) => write_json(&SerializedMatrix::from_matrix(m)?, &self.config),
            Entity::NumericMatrix(m) => {
                write_json(&SerializedMatrix::from_numeric(m), &self.config)
            },
            Entity::SymbolicMatrix(m) => {
                write_json(&SerializedMatrix::from_symbolic(m)?, &self.config)
            },
            Entity::Circuit(c) => write_json(&SerializedCircuit::from_circuit(c)?, &self.config),
            Entity::State(s) => Ok(s.to_string()),
            Entity::Distribution(d) => {
                write_json(&SerializedDistribution::from_distribution(d), &self.config)
            },
        }
    }

    /// Encode a value whose type is only known at run time
    ///
    /// # Errors
    /// Returns [`OpticsError::UnsupportedType`] unless `T` is one of the
    /// entity types
    pub fn serialize_value<T: Any>(&self, value: &T) -> Result<String> {
        let any = value as &dyn Any;
        let entity = if let Some(m) = any.downcast_ref::<Matrix>() {
            Entity::Matrix(m)
        } else if let Some(m) = any.downcast_ref::<NumericMatrix>() {
            Entity::NumericMatrix(m)
        } else if let Some(m) = any.downcast_ref::<SymbolicMatrix>() {
            Entity::SymbolicMatrix(m)
        } else if let Some(c) = any.downcast_ref::<Circuit>() {
            Entity::Circuit(c)
        } else if let Some(s) = any.downcast_ref::<BasicState>() {
            Entity::State(s)
        } else if let Some(d) = any.downcast_ref::<SVDistribution>() {
            Entity::Distribution(d)
        } else {
            return Err(OpticsError::UnsupportedType(type_name::<T>().to_string()));
        };
        self.serialize(entity)
    }

    /// # Errors
    /// - [`OpticsError::EnvelopeMismatch`] for an envelope of another kind
    /// - [`OpticsError::UnknownKind`] for an unrecognized discriminator
    /// - any error of [`SerializedMatrix::to_matrix`]
    pub fn deserialize_matrix(&self, json: &str) -> Result<Matrix> {
        let envelope: SerializedMatrix = read_envelope(json, EntityKind::Matrix)?;
        envelope.to_matrix(self.config.collapse_numeric)
    }

    /// # Errors
    /// - [`OpticsError::EnvelopeMismatch`] for an envelope of another kind
    /// - [`OpticsError::UnknownKind`] for an unrecognized discriminator or component kind
    /// - any error of [`SerializedCircuit::to_circuit`]
    pub fn deserialize_circuit(&self, json: &str) -> Result<Circuit> {
        let envelope: SerializedCircuit = read_envelope(json, EntityKind::Circuit)?;
        envelope.to_circuit(&self.config)
    }

    /// Decode canonical state text, a JSON string holding it, or a state envelope
    pub fn deserialize_state(&self, text: &str) -> Result<BasicState> {
        decode_state(text)
    }

    /// Decode a distribution envelope or a bare `{"<state>": mass}` object
    pub fn deserialize_svdistribution(&self, json: &str) -> Result<SVDistribution> {
        decode_distribution(json)
    }
}

/// Encode any entity with the default configuration
pub fn serialize<'a>(entity: impl Into<Entity<'a>>) -> Result<String> {
    Codec::default().serialize(entity)
}

/// Encode a value whose type is only known at run time
pub fn serialize_value<T: Any>(value: &T) -> Result<String> {
    Codec::default().serialize_value(value)
}

pub fn deserialize_matrix(json: &str) -> Result<Matrix> {
    Codec::default().deserialize_matrix(json)
}

pub fn deserialize_circuit(json: &str) -> Result<Circuit> {
    Codec::default().deserialize_circuit(json)
}

pub fn deserialize_state(text: &str) -> Result<BasicState> {
    Codec::default().deserialize_state(text)
}

pub fn deserialize_svdistribution(json: &str) -> Result<SVDistribution> {
    Codec::default().deserialize_svdistribution(json)
}
