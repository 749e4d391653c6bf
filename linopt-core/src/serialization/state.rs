//! Basic state serialization

use crate::serialization::{envelope_kind, expect_kind, EntityKind};
use crate::state::BasicState;
use crate::{OpticsError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Serialized state envelope, `{"type":"state","state":"|...>"}`
///
/// The plain encoding of a state is its canonical text; the envelope is for
/// embedding a state where a typed JSON object is expected.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedState {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub state: String,
}

impl SerializedState {
    pub fn from_state(state: &BasicState) -> Self {
        Self {
            kind: EntityKind::State,
            state: state.to_string(),
        }
    }

    pub fn to_state(&self) -> Result<BasicState> {
        if self.kind != EntityKind::State {
            return Err(OpticsError::envelope_mismatch(
                EntityKind::State.wire_name(),
                self.kind.wire_name(),
            ));
        }
        BasicState::parse(&self.state)
    }
}

/// Decode a state from canonical text, a JSON string holding it, or a state envelope
pub(crate) fn decode_state(text: &str) -> Result<BasicState> {
    let trimmed = text.trim();
    if trimmed.starts_with('|') {
        debug!(state = trimmed, "decoding state text");
        return BasicState::parse(trimmed);
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    match value {
        serde_json::Value::String(inner) => {
            debug!(state = %inner, "decoding quoted state text");
            BasicState::parse(&inner)
        },
        serde_json::Value::Object(_) => {
            expect_kind(envelope_kind(&value)?, EntityKind::State)?;
            let envelope: SerializedState = serde_json::from_value(value)?;
            debug!(state = %envelope.state, "decoding state envelope");
            envelope.to_state()
        },
        other => Err(OpticsError::parse(
            "state",
            format!("expected state text or a state envelope, found {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_forms() {
        let expected = BasicState::new(&[0, 1]);
        assert_eq!(decode_state("|0,1>").unwrap(), expected);
        assert_eq!(decode_state("\"|0,1>\"").unwrap(), expected);
        assert_eq!(
            decode_state(r#"{"type":"state","state":"|0,1>"}"#).unwrap(),
            expected
        );
    }

    #[test]
    fn test_envelope_roundtrip() {
        let state: BasicState = "|{P:H}{P:V},0>".parse().unwrap();
        let json = serde_json::to_string(&SerializedState::from_state(&state)).unwrap();
        assert_eq!(json, r#"{"type":"state","state":"|{P:H}{P:V},0>"}"#);
        assert_eq!(decode_state(&json).unwrap(), state);
    }

    #[test]
    fn test_wrong_envelope() {
        let err = decode_state(r#"{"type":"matrix","rows":1,"cols":1,"cells":[[1.0,0.0]]}"#)
            .unwrap_err();
        assert!(matches!(err, OpticsError::EnvelopeMismatch { .. }));

        assert!(matches!(decode_state("42"), Err(OpticsError::Parse { .. })));
        assert!(matches!(decode_state("|0,a>"), Err(OpticsError::Parse { .. })));
    }
}
