use crate::memorysystem::VersionedMemory;
use crate::missions::data::*;
use crate::world::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Order in which operations run their phases. Lower runs first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationPriority {
    Emergency = 0,
    OwnedRoom = 1,
    VeryHigh = 2,
    High = 3,
    Medium = 4,
    Low = 5,
    VeryLow = 6,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRoomCandidate {
    pub room: RoomName,
    pub distance: u32,
}

/// Memoized remote spawn group selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpawnData {
    pub spawn_rooms: Vec<SpawnRoomCandidate>,
    pub next_spawn_check: u32,
}

/// Persistent state for one operation, stored under `operations.<name>`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationMemory {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_data: Option<SpawnData>,
    pub missions: BTreeMap<String, MissionMemory>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationMemory {
    /// Mission namespace, created with current-version defaults on first use.
    pub fn mission_mut(&mut self, name: &str) -> &mut MissionMemory {
        self.missions.entry(name.to_owned()).or_insert_with(MissionMemory::fresh)
    }
}

impl VersionedMemory for OperationMemory {
    const VERSION: u32 = 1;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn migrate(&mut self, _from: u32) {
        self.spawn_data = None;
    }
}
