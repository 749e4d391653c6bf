//! Component serialization types and registry

use crate::circuit::{Element, Placement};
use crate::component::{Component, ComponentKind, PayloadKind};
use crate::mode::ModeId;
use crate::serialization::circuit::SerializedCircuit;
use crate::serialization::matrix::{SerializedMatrix, SerializedValue};
use crate::serialization::CodecConfig;
use crate::{OpticsError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Serialized representation of a component
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SerializedComponent {
    /// Wire name of the kind (`BS.Rx`, `PS`, `PERM`, ...)
    pub kind: String,
    /// Parameter values by name, in declaration order
    #[serde(default, with = "crate::serialization::ordered_map")]
    pub params: Vec<(String, SerializedValue)>,
    /// Index mapping of a permutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perm: Option<Vec<usize>>,
    /// Matrix block of a fixed unitary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<SerializedMatrix>,
}

/// Serialized placement: ports plus exactly one of `component` / `circuit`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SerializedPlacement {
    pub ports: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<SerializedComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit: Option<Box<SerializedCircuit>>,
}

/// Trait for registries that can build components from serialized representations
pub trait ComponentRegistry: Send + Sync {
    /// Create a component from its serialized representation
    fn create_component(&self, serialized: &SerializedComponent) -> Result<Component>;

    /// Serialize a component
    fn serialize_component(&self, component: &Component) -> Result<SerializedComponent>;

    /// Serialize a placement; nested circuits are serialized recursively
    fn serialize_placement(&self, placement: &Placement) -> Result<SerializedPlacement> {
        let ports = placement.ports().iter().map(|m| m.index()).collect();
        match placement.element() {
            Element::Component(c) => Ok(SerializedPlacement {
                ports,
                component: Some(self.serialize_component(c)?),
                circuit: None,
            }),
            Element::Circuit(sub) => Ok(SerializedPlacement {
                ports,
                component: None,
                circuit: Some(Box::new(SerializedCircuit::from_circuit_with(sub, self)?)),
            }),
        }
    }

    /// Create a placement inside a circuit of `width` modes
    fn create_placement(
        &self,
        serialized: &SerializedPlacement,
        width: usize,
        config: &CodecConfig,
    ) -> Result<Placement> {
        // Validate port indices
        for &port in &serialized.ports {
            if port >= width {
                return Err(OpticsError::port_out_of_range(port, width));
            }
        }

        let element = match (&serialized.component, &serialized.circuit) {
            (Some(component), None) => Element::Component(self.create_component(component)?),
            (None, Some(circuit)) => {
                Element::Circuit(Box::new(circuit.to_circuit_with(self, config)?))
            },
            (Some(_), Some(_)) => {
                return Err(OpticsError::Shape(
                    "placement has both a component and a circuit".to_string(),
                ))
            },
            (None, None) => {
                return Err(OpticsError::Shape(
                    "placement has neither a component nor a circuit".to_string(),
                ))
            },
        };
        trace!(ports = ?serialized.ports, width = element.width(), "placement decoded");

        let ports: Vec<ModeId> = serialized.ports.iter().map(|&i| ModeId::new(i)).collect();
        Placement::new(&ports, element)
    }
}

/// Registry for the built-in component kinds
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardComponentRegistry;

impl StandardComponentRegistry {
    /// Create a new standard component registry
    pub fn new() -> Self {
        Self
    }

    fn payload_of(kind: ComponentKind, serialized: &SerializedComponent) -> Result<Component> {
        match kind.payload() {
            PayloadKind::None => Component::new(kind),
            PayloadKind::Permutation => {
                let perm = serialized.perm.clone().ok_or_else(|| {
                    OpticsError::Shape(format!("'{}' component without 'perm'", kind))
                })?;
                Component::perm(perm).map_err(|err| match err {
                    OpticsError::Validation(msg) => OpticsError::Shape(msg),
                    other => other,
                })
            },
            PayloadKind::Matrix => {
                let matrix = serialized.matrix.as_ref().ok_or_else(|| {
                    OpticsError::Shape(format!("'{}' component without 'matrix'", kind))
                })?;
                Component::unitary(matrix.to_numeric()?)
            },
        }
    }
}

impl ComponentRegistry for StandardComponentRegistry {
    fn create_component(&self, serialized: &SerializedComponent) -> Result<Component> {
        let kind = ComponentKind::from_name(&serialized.kind)?;
        if serialized.perm.is_some() && kind.payload() != PayloadKind::Permutation {
            return Err(OpticsError::Shape(format!("'{}' takes no 'perm'", kind)));
        }
        if serialized.matrix.is_some() && kind.payload() != PayloadKind::Matrix {
            return Err(OpticsError::Shape(format!("'{}' takes no 'matrix'", kind)));
        }

        let mut component = Self::payload_of(kind, serialized)?;
        let mut seen = Vec::with_capacity(serialized.params.len());
        for (name, cell) in &serialized.params {
            if seen.contains(&name) {
                return Err(OpticsError::Shape(format!(
                    "parameter '{}' of '{}' given twice",
                    name, kind
                )));
            }
            seen.push(name);

            let value = cell.to_parameter().map_err(|err| match err {
                OpticsError::Parse { message, .. } => {
                    OpticsError::parse(format!("parameter '{}' of '{}'", name, kind), message)
                },
                other => other,
            })?;
            component.set_param(name, value)?;
        }
        Ok(component)
    }

    fn serialize_component(&self, component: &Component) -> Result<SerializedComponent> {
        let params = component
            .params()
            .map(|(name, p)| Ok((name.to_string(), SerializedValue::from_parameter(p)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(SerializedComponent {
            kind: component.name().to_string(),
            params,
            perm: component.permutation().map(<[usize]>::to_vec),
            matrix: component.matrix().map(SerializedMatrix::from_numeric),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::NumericMatrix;
    use crate::parameter::Parameter;
    use crate::Circuit;

    fn roundtrip(component: &Component) -> Component {
        let registry = StandardComponentRegistry::new();
        let serialized = registry.serialize_component(component).unwrap();
        let json = serde_json::to_string(&serialized).unwrap();
        let back: SerializedComponent = serde_json::from_str(&json).unwrap();
        registry.create_component(&back).unwrap()
    }

    #[test]
    fn test_component_wire_form() {
        let registry = StandardComponentRegistry::new();
        let serialized = registry.serialize_component(&Component::ps(0.5)).unwrap();
        let json = serde_json::to_string(&serialized).unwrap();
        assert_eq!(json, r#"{"kind":"PS","params":{"phi":[0.5,0.0]}}"#);

        let serialized = registry
            .serialize_component(&Component::perm(vec![2, 0, 1]).unwrap())
            .unwrap();
        let json = serde_json::to_string(&serialized).unwrap();
        assert_eq!(json, r#"{"kind":"PERM","params":{},"perm":[2,0,1]}"#);
    }

    #[test]
    fn test_every_kind_survives() {
        let components = vec![
            Component::bs(0.7),
            Component::bs_ry(Parameter::symbol("theta")),
            Component::bs_h(0.36).with_param("phi_tl", 1.94).unwrap(),
            Component::ps(Parameter::symbol("phi")),
            Component::perm(vec![1, 2, 0]).unwrap(),
            Component::pbs(),
            Component::wp(0.4, Parameter::symbol("xsi")),
            Component::hwp(0.25),
            Component::qwp(0.1),
            Component::pr(1.2),
            Component::unitary(NumericMatrix::identity(3)).unwrap(),
        ];
        for c in &components {
            assert_eq!(&roundtrip(c), c, "{} did not survive", c);
        }
    }

    #[test]
    fn test_missing_params_take_defaults() {
        let registry = StandardComponentRegistry::new();
        let json = r#"{"kind":"BS.H","params":{"theta":[0.36,0.0]}}"#;
        let serialized: SerializedComponent = serde_json::from_str(json).unwrap();
        let c = registry.create_component(&serialized).unwrap();
        assert_eq!(c.param("theta").unwrap().value(), Some(0.36));
        assert_eq!(c.param("phi_tl").unwrap().value(), Some(0.0));

        let bare: SerializedComponent = serde_json::from_str(r#"{"kind":"BS.Rx"}"#).unwrap();
        let c = registry.create_component(&bare).unwrap();
        assert_eq!(c, Component::new(ComponentKind::BeamSplitterRx).unwrap());
    }

    #[test]
    fn test_decode_errors() {
        let registry = StandardComponentRegistry::new();
        let decode = |json: &str| {
            let s: SerializedComponent = serde_json::from_str(json).unwrap();
            registry.create_component(&s)
        };

        assert!(matches!(decode(r#"{"kind":"MZI"}"#), Err(OpticsError::UnknownKind(_))));
        assert!(matches!(
            decode(r#"{"kind":"PS","params":{"theta":[1.0,0.0]}}"#),
            Err(OpticsError::UnknownKind(_))
        ));
        assert!(matches!(
            decode(r#"{"kind":"PS","params":{"phi":[1.0,0.5]}}"#),
            Err(OpticsError::Range(_))
        ));
        assert!(matches!(
            decode(r#"{"kind":"PS","params":{"phi":"1 +"}}"#),
            Err(OpticsError::Parse { .. })
        ));
        assert!(matches!(
            decode(r#"{"kind":"PS","params":{"phi":[1.0,0.0],"phi":[2.0,0.0]}}"#),
            Err(OpticsError::Shape(_))
        ));
        assert!(matches!(decode(r#"{"kind":"PERM"}"#), Err(OpticsError::Shape(_))));
        assert!(matches!(
            decode(r#"{"kind":"PERM","perm":[0,0]}"#),
            Err(OpticsError::Shape(_))
        ));
        assert!(matches!(
            decode(r#"{"kind":"PS","perm":[0]}"#),
            Err(OpticsError::Shape(_))
        ));
    }

    #[test]
    fn test_placement_validation() {
        let registry = StandardComponentRegistry::new();
        let config = CodecConfig::default();
        let bs = registry.serialize_component(&Component::bs(0.1)).unwrap();

        let placement = |ports: Vec<usize>| SerializedPlacement {
            ports,
            component: Some(bs.clone()),
            circuit: None,
        };

        let ok = registry.create_placement(&placement(vec![1, 2]), 3, &config).unwrap();
        assert_eq!(ok.offset(), 1);

        assert!(matches!(
            registry.create_placement(&placement(vec![2, 3]), 3, &config),
            Err(OpticsError::Range(_))
        ));
        assert!(matches!(
            registry.create_placement(&placement(vec![2, 1]), 3, &config),
            Err(OpticsError::Shape(_))
        ));
        assert!(matches!(
            registry.create_placement(&placement(vec![0]), 3, &config),
            Err(OpticsError::Shape(_))
        ));

        let both = SerializedPlacement {
            ports: vec![0, 1],
            component: Some(bs.clone()),
            circuit: Some(Box::new(
                SerializedCircuit::from_circuit_with(&Circuit::new(2), &registry).unwrap(),
            )),
        };
        assert!(matches!(
            registry.create_placement(&both, 3, &config),
            Err(OpticsError::Shape(_))
        ));

        let neither = SerializedPlacement {
            ports: vec![0, 1],
            component: None,
            circuit: None,
        };
        assert!(matches!(
            registry.create_placement(&neither, 3, &config),
            Err(OpticsError::Shape(_))
        ));
    }
}
