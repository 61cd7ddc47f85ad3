use crate::memorysystem::VersionedMemory;
use crate::world::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Persistent state for one mission, stored under `operations.<operation>.missions.<mission>`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissionMemory {
    pub version: u32,
    /// Roster of agent names per role.
    pub hc: BTreeMap<String, Vec<String>>,
    /// Prespawn lead time per role. Only ever raised.
    pub prespawn: BTreeMap<String, u32>,
    /// Population overrides per role, set from the console.
    pub max: BTreeMap<String, u32>,
    /// Boost compounds requested per role.
    pub boost: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_to_spawn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pave_tick: Option<u32>,
    pub road_repair_ids: Vec<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_spawn_failure: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionedMemory for MissionMemory {
    const VERSION: u32 = 1;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn migrate(&mut self, _from: u32) {
        self.distance_to_spawn = None;
        self.potency = None;
        self.road_repair_ids.clear();
    }
}
