use crate::cache::*;
use crate::constants::*;
use crate::features;
use crate::jitter::*;
use crate::memorysystem::*;
use crate::panic::*;
use crate::world::*;
use log::*;
use specs::prelude::*;
use std::collections::HashSet;

/// Minimum pile size worth a pickup.
const SCAVENGE_MIN_AMOUNT: u32 = 10;

/// Drop memory of creeps that no longer exist and of hostiles no longer seen. Runs on a jittered
/// interval. Returns whether a collection ran.
pub fn collect_garbage(host: &dyn GameHost, memory: &mut RootMemory, rng: &mut TickRng) -> bool {
    let time = host.time();

    if memory.next_gc.map(|next| time < next).unwrap_or(false) {
        return false;
    }

    let alive: HashSet<String> = host.creep_names().into_iter().collect();

    let before = memory.creeps.len();

    memory.creeps.retain(|name, _| alive.contains(name));

    let hostiles: HashSet<String> = host
        .visible_rooms()
        .into_iter()
        .filter_map(|room| host.room(room))
        .flat_map(|room| room.hostiles().map(|c| c.id.as_str().to_owned()).collect::<Vec<_>>())
        .collect();

    let hostile_before = memory.hostile_memory.len();

    memory.hostile_memory.retain(|id, _| hostiles.contains(id));

    debug!(
        "Garbage collection - Creeps: {} - Hostiles: {}",
        before - memory.creeps.len(),
        hostile_before - memory.hostile_memory.len()
    );

    memory.next_gc = Some(time + random_interval(rng.get_mut(), GC_INTERVAL));

    true
}

/// Creeps marked as scavengers pick up piles of their resource they are standing on.
pub fn scavenge_resources(host: &mut dyn GameHost, cache: &mut TickCache, memory: &RootMemory) {
    for room_name in host.visible_rooms() {
        let room = match cache.room(&*host, room_name) {
            Some(room) => room,
            None => continue,
        };

        for resource in room.dropped.iter().filter(|r| r.amount > SCAVENGE_MIN_AMOUNT) {
            let creep = match room.my_creeps().find(|c| c.pos == resource.pos) {
                Some(creep) => creep,
                None => continue,
            };

            let scavenger = memory.creeps.get(&creep.name).and_then(|m| m.scavenger.as_deref());

            if scavenger != Some(resource.resource.as_str()) || creep.store.free() == 0 {
                continue;
            }

            let _ = host.creep_intent(&creep.name, CreepIntent::Pickup(resource.id.clone()));
        }
    }
}

#[derive(SystemData)]
pub struct CleanupSystemData<'a> {
    host: WriteExpect<'a, Host>,
    cache: WriteExpect<'a, TickCache>,
    rng: WriteExpect<'a, TickRng>,
    memory: Write<'a, RootMemory>,
}

pub struct ScavengeSystem;

impl<'a> System<'a> for ScavengeSystem {
    type SystemData = CleanupSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let CleanupSystemData { host, cache, memory, .. } = &mut data;

        bulkhead("scavenging", || scavenge_resources(host.get_mut(), cache, memory));
    }
}

pub struct GarbageCollectionSystem;

impl<'a> System<'a> for GarbageCollectionSystem {
    type SystemData = CleanupSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        if !features::gc::on(&data.memory.features) {
            return;
        }

        let CleanupSystemData { host, rng, memory, .. } = &mut data;

        bulkhead("garbage collection", || collect_garbage(host.get(), memory, rng));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::*;
    use serde_json::json;

    fn room() -> RoomName {
        RoomName::new("E1S1").unwrap()
    }

    #[test]
    fn collection_waits_for_the_interval() {
        let host = SimHost::new();
        host.add_room(room(), RoomTerrain::plains(), true);
        host.add_creep("alive", Position::new(5, 5, room()), &[Part::Move], true);

        let mut memory = RootMemory::load("");
        memory.agent_mut("alive");
        memory.agent_mut("dead");
        memory.hostile_memory.insert("gone".to_owned(), json!({}));

        let mut rng = TickRng::seeded(1);

        assert!(collect_garbage(&host, &mut memory, &mut rng));
        assert!(memory.creeps.contains_key("alive"));
        assert!(!memory.creeps.contains_key("dead"));
        assert!(memory.hostile_memory.is_empty());

        let next = memory.next_gc.unwrap();
        assert!(next >= host.time() + 90 && next <= host.time() + 110);

        memory.agent_mut("dead");
        assert!(!collect_garbage(&host, &mut memory, &mut rng));
        assert!(memory.creeps.contains_key("dead"));

        host.with(|state| state.time = next);
        assert!(collect_garbage(&host, &mut memory, &mut rng));
        assert!(!memory.creeps.contains_key("dead"));
    }

    #[test]
    fn scavengers_pick_up_their_resource_only() {
        let mut host = SimHost::new();
        host.add_room(room(), RoomTerrain::plains(), true);
        host.add_creep("picker", Position::new(5, 5, room()), &[Part::Carry, Part::Move], true);
        host.add_creep("idle", Position::new(6, 6, room()), &[Part::Carry, Part::Move], true);

        host.with(|state| {
            if let Some(sim_room) = state.rooms.get_mut(&room()) {
                for (id, x, amount) in [("a", 5, 40), ("b", 6, 40)] {
                    sim_room.snapshot.dropped.push(DroppedResource {
                        id: ObjectId::new(id),
                        pos: Position::new(x, x, room()),
                        resource: ENERGY.to_owned(),
                        amount,
                    });
                }
            }
        });

        let mut memory = RootMemory::load("");
        memory.agent_mut("picker").scavenger = Some(ENERGY.to_owned());

        let mut cache = TickCache::new();
        cache.reset(host.time());

        scavenge_resources(&mut host, &mut cache, &memory);

        assert_eq!(host.creep("picker").map(|c| c.store.energy()), Some(40));
        assert_eq!(host.creep("idle").map(|c| c.store.energy()), Some(0));
    }
}
