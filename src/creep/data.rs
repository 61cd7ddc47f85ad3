use crate::memorysystem::VersionedMemory;
use crate::pathing::movementsystem::TravelRecord;
use crate::world::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Persistent state for one agent, stored under `creeps.<name>`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentMemory {
    pub version: u32,
    /// Set once the one-time preparation step has finished.
    pub prep: bool,
    #[serde(rename = "_trav", skip_serializing_if = "Option::is_none")]
    pub travel: Option<TravelRecord>,
    pub has_load: bool,
    /// Prespawn lead time already reported to the owning mission.
    pub registered: bool,
    pub notify_disabled: bool,
    /// Boost compounds still to be applied before the agent starts work.
    pub boosts: Vec<String>,
    pub allow_unboosted: bool,
    pub remembered: BTreeMap<String, ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick_employed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heal_id: Option<String>,
    pub heal_check: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    /// Resource type this agent picks up when standing on a dropped pile of it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scavenger: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionedMemory for AgentMemory {
    const VERSION: u32 = 1;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn migrate(&mut self, _from: u32) {
        self.travel = None;
        self.remembered.clear();
        self.heal_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({ "version": 1, "prep": true, "customFlag": 12, "_trav": { "stuck": 2, "tick": 40, "cpu": 0.5, "count": 1 } });

        let memory: AgentMemory = serde_json::from_value(raw).unwrap();

        assert!(memory.prep);
        assert_eq!(memory.travel.as_ref().map(|t| t.stuck), Some(2));
        assert_eq!(memory.extra.get("customFlag"), Some(&json!(12)));

        let written = serde_json::to_value(&memory).unwrap();

        assert_eq!(written.get("customFlag"), Some(&json!(12)));
        assert!(written.get("_trav").is_some());
    }
}
