//! State distribution serialization

use crate::distribution::SVDistribution;
use crate::serialization::{envelope_kind, expect_kind, EntityKind};
use crate::state::BasicState;
use crate::{OpticsError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Serialized distribution envelope: state text to mass, in iteration order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SerializedDistribution {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(with = "crate::serialization::ordered_map")]
    pub entries: Vec<(String, f64)>,
}

/// Distribution without envelope, `{"|0,1>": 0.2, ...}`
#[derive(Deserialize)]
#[serde(transparent)]
struct BareEntries(#[serde(with = "crate::serialization::ordered_map")] Vec<(String, f64)>);

impl SerializedDistribution {
    pub fn from_distribution(distribution: &SVDistribution) -> Self {
        Self {
            kind: EntityKind::Distribution,
            entries: distribution
                .iter()
                .map(|(state, mass)| (state.to_string(), mass))
                .collect(),
        }
    }

    /// Rebuild the distribution
    ///
    /// # Errors
    /// - [`OpticsError::Parse`] for a malformed state key
    /// - [`OpticsError::Range`] for a negative mass
    /// - [`OpticsError::Shape`] if two keys denote the same state
    pub fn to_distribution(&self) -> Result<SVDistribution> {
        if self.kind != EntityKind::Distribution {
            return Err(OpticsError::envelope_mismatch(
                EntityKind::Distribution.wire_name(),
                self.kind.wire_name(),
            ));
        }
        entries_to_distribution(&self.entries)
    }
}

fn entries_to_distribution(entries: &[(String, f64)]) -> Result<SVDistribution> {
    let mut distribution = SVDistribution::new();
    for (key, mass) in entries {
        let state = BasicState::parse(key)?;
        trace!(%state, mass, "distribution entry");
        if distribution.contains(&state) {
            return Err(OpticsError::Shape(format!(
                "key '{}' repeats state {}",
                key, state
            )));
        }
        distribution.insert(state, *mass)?;
    }
    Ok(distribution)
}

/// Decode an envelope or a bare `state -> mass` object
pub(crate) fn decode_distribution(json: &str) -> Result<SVDistribution> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match envelope_kind(&value)? {
        None if value.is_object() => {
            let BareEntries(entries) = serde_json::from_str(json)?;
            debug!(entries = entries.len(), "decoding bare distribution");
            entries_to_distribution(&entries)
        },
        kind => {
            expect_kind(kind, EntityKind::Distribution)?;
            let envelope: SerializedDistribution = serde_json::from_str(json)?;
            debug!(entries = envelope.entries.len(), "decoding distribution");
            envelope.to_distribution()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(text: &str) -> BasicState {
        text.parse().unwrap()
    }

    #[test]
    fn test_envelope_keeps_order() {
        let mut d = SVDistribution::new();
        d.insert(state("|1,0>"), 0.3).unwrap();
        d.insert(state("|0,1>"), 0.7).unwrap();

        let json = serde_json::to_string(&SerializedDistribution::from_distribution(&d)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"svdistribution","entries":{"|1,0>":0.3,"|0,1>":0.7}}"#
        );

        let back = decode_distribution(&json).unwrap();
        let keys: Vec<String> = back.iter().map(|(s, _)| s.to_string()).collect();
        assert_eq!(keys, vec!["|1,0>", "|0,1>"]);
        assert_eq!(back, d);
    }

    #[test]
    fn test_bare_mapping() {
        let d = decode_distribution(r#"{"|0,1>":0.2,"|1,0>":0.3,"|1,1>":0.5}"#).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d.get(&state("|1,1>")), Some(0.5));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_distribution(r#"{"|0,1>":-0.2}"#),
            Err(OpticsError::Range(_))
        ));
        assert!(matches!(
            decode_distribution(r#"{"|0,1>":0.2,"| 0, 1 >":0.3}"#),
            Err(OpticsError::Shape(_))
        ));
        assert!(matches!(
            decode_distribution(r#"{"|0,1>":0.2,"|0,1>":0.3}"#),
            Err(OpticsError::Shape(_))
        ));
        assert!(matches!(
            decode_distribution(r#"{"0,1":0.2}"#),
            Err(OpticsError::Parse { .. })
        ));
        assert!(matches!(
            decode_distribution(r#"{"type":"state","state":"|0>"}"#),
            Err(OpticsError::EnvelopeMismatch { .. })
        ));
        assert!(matches!(
            decode_distribution(r#"{"|0,1>":"half"}"#),
            Err(OpticsError::Json(_))
        ));
    }
}
