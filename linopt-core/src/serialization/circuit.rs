//! Circuit serialization types

use crate::circuit::Circuit;
use crate::serialization::component::{
    ComponentRegistry, SerializedPlacement, StandardComponentRegistry,
};
use crate::serialization::{CodecConfig, EntityKind, CIRCUIT_FORMAT_VERSION};
use crate::{OpticsError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Serialized circuit envelope
///
/// Nested sub-circuits are stored as nested envelopes inside their
/// placement; nothing is flattened.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SerializedCircuit {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Format version for compatibility checking
    pub version: u32,
    /// Number of modes
    pub width: usize,
    /// Optional circuit name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Placements in composition order
    pub placements: Vec<SerializedPlacement>,
}

impl SerializedCircuit {
    /// Serialize a circuit with the standard registry
    pub fn from_circuit(circuit: &Circuit) -> Result<Self> {
        Self::from_circuit_with(circuit, &StandardComponentRegistry)
    }

    /// Serialize a circuit with a given registry
    pub fn from_circuit_with<R: ComponentRegistry + ?Sized>(
        circuit: &Circuit,
        registry: &R,
    ) -> Result<Self> {
        let placements = circuit
            .placements()
            .map(|p| registry.serialize_placement(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            kind: EntityKind::Circuit,
            version: CIRCUIT_FORMAT_VERSION,
            width: circuit.width(),
            name: circuit.name().map(str::to_string),
            placements,
        })
    }

    /// Check version compatibility
    pub fn check_version(&self) -> Result<()> {
        if self.version > CIRCUIT_FORMAT_VERSION {
            return Err(OpticsError::VersionMismatch {
                expected: CIRCUIT_FORMAT_VERSION,
                actual: self.version,
            });
        }
        Ok(())
    }

    /// Sub-circuit nesting depth: 0 without nested envelopes
    pub fn depth(&self) -> usize {
        self.placements
            .iter()
            .filter_map(|p| p.circuit.as_ref())
            .map(|sub| 1 + sub.depth())
            .max()
            .unwrap_or(0)
    }

    /// Rebuild the circuit with the standard registry
    pub fn to_circuit(&self, config: &CodecConfig) -> Result<Circuit> {
        self.to_circuit_with(&StandardComponentRegistry, config)
    }

    /// Rebuild the circuit, placement by placement, with a given registry
    ///
    /// # Errors
    /// - [`OpticsError::EnvelopeMismatch`] if a nested envelope is not a circuit
    /// - [`OpticsError::VersionMismatch`] for a newer format (when checked)
    /// - [`OpticsError::Shape`] for a zero width or nesting beyond `config.max_depth`
    /// - any placement error of [`ComponentRegistry::create_placement`]
    pub fn to_circuit_with<R: ComponentRegistry + ?Sized>(
        &self,
        registry: &R,
        config: &CodecConfig,
    ) -> Result<Circuit> {
        if self.kind != EntityKind::Circuit {
            return Err(OpticsError::envelope_mismatch(
                EntityKind::Circuit.wire_name(),
                self.kind.wire_name(),
            ));
        }
        if config.check_version {
            self.check_version()?;
        }
        let depth = self.depth();
        if depth > config.max_depth {
            return Err(OpticsError::Shape(format!(
                "sub-circuits nested {} deep, limit is {}",
                depth, config.max_depth
            )));
        }
        debug!(
            width = self.width,
            placements = self.placements.len(),
            depth,
            "decoding circuit"
        );

        let mut circuit = Circuit::try_new(self.width)?;
        if let Some(name) = &self.name {
            circuit = circuit.with_name(name.clone());
        }
        for (i, placement) in self.placements.iter().enumerate() {
            let placement = registry.create_placement(placement, self.width, config)?;
            if placement.element().is_circuit() {
                debug!(index = i, offset = placement.offset(), "sub-circuit spliced");
            }
            circuit.push_placement(placement)?;
        }
        Ok(circuit)
    }
}

impl Circuit {
    /// Serialize to a JSON circuit envelope
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&SerializedCircuit::from_circuit(self)?)?)
    }

    /// Deserialize from a JSON circuit envelope
    pub fn from_json(json: &str) -> Result<Self> {
        crate::serialization::deserialize_circuit(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Parameter};

    fn sample() -> Circuit {
        let mut inner = Circuit::new(2).with_name("inner");
        inner
            .push(Component::bs_h(0.36))
            .unwrap()
            .push(Component::perm(vec![1, 0]).unwrap())
            .unwrap();

        let mut c = Circuit::new(3);
        c.push(Component::ps(Parameter::symbol("phi")))
            .unwrap()
            .add_circuit(1, inner, false)
            .unwrap()
            .add(2, Component::hwp(0.3))
            .unwrap();
        c
    }

    #[test]
    fn test_nested_envelope_layout() {
        let s = SerializedCircuit::from_circuit(&sample()).unwrap();
        assert_eq!(s.version, CIRCUIT_FORMAT_VERSION);
        assert_eq!(s.width, 3);
        assert_eq!(s.placements.len(), 3);
        assert_eq!(s.depth(), 1);

        let nested = s.placements[1].circuit.as_ref().unwrap();
        assert_eq!(s.placements[1].ports, vec![1, 2]);
        assert_eq!(nested.width, 2);
        assert_eq!(nested.name.as_deref(), Some("inner"));
        assert_eq!(nested.placements.len(), 2);
    }

    #[test]
    fn test_roundtrip_keeps_structure() {
        let circuit = sample();
        let json = circuit.to_json().unwrap();
        let restored = Circuit::from_json(&json).unwrap();
        assert_eq!(restored, circuit);
        assert_eq!(restored.depth(), 1);
    }

    #[test]
    fn test_version_check() {
        let mut s = SerializedCircuit::from_circuit(&sample()).unwrap();
        s.version = CIRCUIT_FORMAT_VERSION + 1;
        assert!(matches!(
            s.to_circuit(&CodecConfig::default()),
            Err(OpticsError::VersionMismatch { .. })
        ));
        assert!(s.to_circuit(&CodecConfig::lenient()).is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let s = SerializedCircuit::from_circuit(&sample()).unwrap();
        let config = CodecConfig::new().with_max_depth(1);
        assert!(s.to_circuit(&config).is_ok());

        let mut outer = Circuit::new(3);
        outer.add_circuit(0, sample(), false).unwrap();
        let s = SerializedCircuit::from_circuit(&outer).unwrap();
        assert!(matches!(s.to_circuit(&config), Err(OpticsError::Shape(_))));
    }

    #[test]
    fn test_zero_width_rejected() {
        let mut s = SerializedCircuit::from_circuit(&Circuit::new(1)).unwrap();
        s.width = 0;
        assert!(matches!(
            s.to_circuit(&CodecConfig::default()),
            Err(OpticsError::Shape(_))
        ));
    }

    #[test]
    fn test_nested_port_out_of_range() {
        let mut s = SerializedCircuit::from_circuit(&sample()).unwrap();
        let nested = s.placements[1].circuit.as_mut().unwrap();
        nested.placements[0].ports = vec![1, 2];
        assert!(matches!(
            s.to_circuit(&CodecConfig::default()),
            Err(OpticsError::Range(_))
        ));
    }
}
