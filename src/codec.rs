//! Snapshot encode/decode for `EncounterState`.
//!
//! `EncounterState` is already a plain `Serialize`/`Deserialize` struct, so
//! encoding is mostly a matter of stamping a schema version and accepting a
//! legacy raw-state document on decode. The PRNG position is part of
//! `EncounterState` itself (see `rng.rs`), so it rides along for free.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EventEnvelope;
use crate::model::EncounterState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub state: EncounterState,
    #[serde(default)]
    pub events: Vec<EventEnvelope>,
}

impl Snapshot {
    pub fn new(state: EncounterState, events: Vec<EventEnvelope>, config: &EngineConfig) -> Self {
        Self {
            schema_version: config.schema_version,
            state,
            events,
        }
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|e| EngineError::MalformedState(e.to_string()))
    }

    /// Accepts both the current `{schema_version, state, events}` envelope
    /// and a legacy document that is the raw state object with no wrapper.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| EngineError::MalformedState(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        if value.get("state").is_some() {
            serde_json::from_value(value).map_err(|e| EngineError::MalformedState(e.to_string()))
        } else {
            let state: EncounterState = serde_json::from_value(value)
                .map_err(|e| EngineError::MalformedState(e.to_string()))?;
            Ok(Self {
                schema_version: 1,
                state,
                events: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EncounterState;

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::default();
        let state = EncounterState::new(42);
        let snap = Snapshot::new(state, Vec::new(), &config);
        let json = snap.to_json().unwrap();
        let back = Snapshot::from_json(&json).unwrap();
        assert_eq!(back.schema_version, config.schema_version);
        assert_eq!(back.state.rng_seed, 42);
    }

    #[test]
    fn accepts_legacy_raw_state_document() {
        let state = EncounterState::new(7);
        let raw = serde_json::to_string(&state).unwrap();
        let snap = Snapshot::from_json(&raw).unwrap();
        assert_eq!(snap.schema_version, 1);
        assert!(snap.events.is_empty());
        assert_eq!(snap.state.rng_seed, 7);
    }
}
