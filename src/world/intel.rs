use super::snapshot::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpawnGroupMemory {
    pub average_availability: f64,
    pub last_sample: Option<u32>,
    /// Shared agent name per role, employed by whichever mission asks for it first each tick.
    pub community_roles: BTreeMap<String, String>,
}

/// What is remembered about a room between visits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomMemory {
    pub level: Option<u32>,
    pub owner: Option<String>,
    pub occupied: bool,
    pub source_keeper: bool,
    pub last_seen: Option<u32>,
    pub spawn_group: Option<SpawnGroupMemory>,
}

impl RoomMemory {
    /// Refresh ownership from a visible room. A room with a controller owned by someone else, or
    /// with towers owned by someone else, is occupied and avoided by travel unless hostile
    /// traversal is allowed. Returns whether the occupied state changed.
    pub fn update(&mut self, room: &RoomSnapshot, time: u32) -> bool {
        let was_occupied = self.occupied;

        self.last_seen = Some(time);

        let mut occupied = false;

        if let Some(controller) = room.controller.as_ref() {
            self.level = Some(controller.level);

            if let Some(owner) = controller.owner.as_ref() {
                self.owner = Some(owner.clone());
            }

            occupied = controller.owner.is_some() && !controller.my;
        }

        let hostile_towers = room.structures_of(StructureKind::Tower).any(|tower| !tower.my && tower.owner.is_some());

        self.occupied = occupied || hostile_towers;
        self.source_keeper = room.structures_of(StructureKind::KeeperLair).next().is_some();

        self.occupied != was_occupied
    }
}
