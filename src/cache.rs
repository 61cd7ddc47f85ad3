use crate::creep::actions::*;
use crate::world::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Lookups made during one tick. Everything is discarded when the next tick starts.
#[derive(Default)]
pub struct TickCache {
    time: u32,
    rooms: HashMap<RoomName, Option<Arc<RoomSnapshot>>>,
    creeps: Option<Arc<BTreeMap<String, CreepSnapshot>>>,
    actions: HashMap<String, SimultaneousActionFlags>,
    /// At most one road site is placed per tick across all missions.
    pub placed_road: bool,
    /// Roster keys (`<operation>_<role>_`) that already started a spawn this tick.
    pub spawned_roles: HashSet<String>,
}

impl TickCache {
    pub fn new() -> TickCache {
        TickCache::default()
    }

    pub fn reset(&mut self, time: u32) {
        *self = TickCache {
            time,
            ..TickCache::default()
        };
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    /// Snapshot of a room, `None` without vision.
    pub fn room(&mut self, host: &dyn GameHost, name: RoomName) -> Option<Arc<RoomSnapshot>> {
        self.rooms.entry(name).or_insert_with(|| host.room(name).map(Arc::new)).clone()
    }

    pub fn is_visible(&mut self, host: &dyn GameHost, name: RoomName) -> bool {
        self.room(host, name).is_some()
    }

    /// Own creeps alive when the tick started, keyed by name.
    pub fn creeps(&mut self, host: &dyn GameHost) -> Arc<BTreeMap<String, CreepSnapshot>> {
        self.creeps
            .get_or_insert_with(|| {
                Arc::new(
                    host.creep_names()
                        .into_iter()
                        .filter_map(|name| host.creep(&name).map(|creep| (name, creep)))
                        .collect(),
                )
            })
            .clone()
    }

    pub fn creep(&mut self, host: &dyn GameHost, name: &str) -> Option<CreepSnapshot> {
        self.creeps(host).get(name).cloned()
    }

    /// Claim the intent pipelines a creep is about to use. False when already used this tick.
    pub fn consume_action(&mut self, creep: &str, flags: SimultaneousActionFlags) -> bool {
        self.actions.entry(creep.to_owned()).or_default().consume(flags)
    }

    /// First structure with the given id in any visible room.
    pub fn structure(&mut self, host: &dyn GameHost, id: &ObjectId) -> Option<StructureSnapshot> {
        host.visible_rooms()
            .into_iter()
            .filter_map(|name| self.room(host, name))
            .find_map(|room| room.structures.iter().find(|s| s.id == *id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::*;

    #[test]
    fn snapshots_are_shared_until_reset() {
        let host = SimHost::new();
        let name = RoomName::new("E1S1").unwrap();
        host.add_owned_room(name, 2, 300);

        let mut cache = TickCache::new();
        cache.reset(host.time());

        let first = cache.room(&host, name).unwrap();
        let second = cache.room(&host, name).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!cache.is_visible(&host, RoomName::new("E9S9").unwrap()));

        cache.placed_road = true;
        cache.reset(host.time() + 1);

        let third = cache.room(&host, name).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(!cache.placed_road);
    }

    #[test]
    fn creeps_are_read_once_per_tick() {
        let host = SimHost::new();
        let name = RoomName::new("E1S1").unwrap();
        host.add_room(name, RoomTerrain::plains(), true);
        host.add_creep("worker", Position::new(5, 5, name), &[Part::Move], true);

        let mut cache = TickCache::new();

        assert!(cache.creep(&host, "worker").is_some());

        host.remove_creep("worker");

        assert!(cache.creep(&host, "worker").is_some());

        cache.reset(2);

        assert!(cache.creep(&host, "worker").is_none());
    }
}
