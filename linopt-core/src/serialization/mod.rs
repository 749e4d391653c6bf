//! Entity serialization
//!
//! This module converts matrices, circuits, basic states and state
//! distributions to JSON envelopes and back. Every envelope carries a `type`
//! discriminator naming its [`EntityKind`]; circuit envelopes also carry a
//! format version.
//!
//! # Example
//! ```
//! use linopt_core::serialization::{deserialize_circuit, serialize};
//! use linopt_core::{Circuit, Component};
//!
//! let mut circuit = Circuit::new(2);
//! circuit.push(Component::bs(0.4)).unwrap();
//!
//! let json = serialize(&circuit).unwrap();
//! let restored = deserialize_circuit(&json).unwrap();
//! assert_eq!(restored, circuit);
//! ```

pub mod circuit;
pub mod component;
pub mod config;
pub mod dispatch;
pub mod distribution;
pub mod matrix;
pub mod state;

#[cfg(test)]
mod tests;

pub use circuit::SerializedCircuit;
pub use component::{
    ComponentRegistry, SerializedComponent, SerializedPlacement, StandardComponentRegistry,
};
pub use config::CodecConfig;
pub use dispatch::{
    deserialize_circuit, deserialize_matrix, deserialize_state, deserialize_svdistribution,
    serialize, serialize_value, Codec, Entity,
};
pub use distribution::SerializedDistribution;
pub use matrix::{SerializedMatrix, SerializedValue};
pub use state::SerializedState;

use crate::{OpticsError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Circuit envelope format version
pub const CIRCUIT_FORMAT_VERSION: u32 = 1;

/// Envelope discriminator
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "matrix")]
    Matrix,
    #[serde(rename = "circuit")]
    Circuit,
    #[serde(rename = "state")]
    State,
    #[serde(rename = "svdistribution")]
    Distribution,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Matrix,
        EntityKind::Circuit,
        EntityKind::State,
        EntityKind::Distribution,
    ];

    /// Discriminator text used on the wire
    pub fn wire_name(self) -> &'static str {
        match self {
            EntityKind::Matrix => "matrix",
            EntityKind::Circuit => "circuit",
            EntityKind::State => "state",
            EntityKind::Distribution => "svdistribution",
        }
    }

    /// Look up a kind by discriminator text
    ///
    /// # Errors
    /// Returns [`OpticsError::UnknownKind`] for an unrecognized discriminator
    pub fn from_wire(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.wire_name() == name)
            .ok_or_else(|| OpticsError::UnknownKind(format!("envelope type '{}'", name)))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Read the `type` discriminator of a parsed envelope, if it has one
fn envelope_kind(value: &serde_json::Value) -> Result<Option<EntityKind>> {
    match value.get("type") {
        None => Ok(None),
        Some(serde_json::Value::String(name)) => EntityKind::from_wire(name).map(Some),
        Some(other) => Err(OpticsError::UnknownKind(format!("envelope type {}", other))),
    }
}

/// Check that an envelope's discriminator is `expected`
fn expect_kind(actual: Option<EntityKind>, expected: EntityKind) -> Result<()> {
    match actual {
        Some(kind) if kind == expected => Ok(()),
        Some(kind) => Err(OpticsError::envelope_mismatch(expected.wire_name(), kind.wire_name())),
        None => Err(OpticsError::envelope_mismatch(expected.wire_name(), "<none>")),
    }
}

/// Check the discriminator of `json`, then deserialize the envelope body
///
/// The body is read from the text rather than from the parsed tree so that
/// repeated object keys reach the envelope's own validation.
fn read_envelope<T: DeserializeOwned>(json: &str, expected: EntityKind) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    expect_kind(envelope_kind(&value)?, expected)?;
    Ok(serde_json::from_str(json)?)
}

fn write_json<T: Serialize>(value: &T, config: &CodecConfig) -> Result<String> {
    let text = if config.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

/// JSON object <-> `Vec<(String, V)>`, keeping wire order and duplicate keys
pub(crate) mod ordered_map {
    use serde::de::{DeserializeOwned, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serialize, Serializer};
    use std::fmt;
    use std::marker::PhantomData;

    pub fn serialize<S, V>(entries: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: DeserializeOwned,
    {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: DeserializeOwned> Visitor<'de> for EntriesVisitor<V> {
            type Value = Vec<(String, V)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
