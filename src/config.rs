//! Engine-wide tunables that live outside any single encounter: the default
//! roll-middleware chain and the snapshot schema version. Plain struct plus
//! serde, matching the donor's own preference-struct approach rather than
//! reaching for an external config-parsing crate.

use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Names of the roll middlewares to install by default, in order.
    pub middleware_chain: Vec<String>,
    /// Schema version stamped onto encoded snapshots.
    pub schema_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            middleware_chain: vec!["bless".to_string()],
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_bless() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.middleware_chain, vec!["bless".to_string()]);
        assert_eq!(cfg.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = cfg.to_json().unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
