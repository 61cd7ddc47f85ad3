use super::data::*;
use crate::cache::*;
use crate::constants::*;
use crate::creep::agent::*;
use crate::jitter::*;
use crate::memorysystem::*;
use crate::pathing::movementsystem::*;
use crate::spawnsystem::*;
use crate::world::*;
use log::*;
use std::sync::Arc;

/// Everything a mission may touch while it runs. Built by the operation phase systems from the
/// world resources and handed down by reference.
pub struct MissionExecutionSystemData<'a> {
    pub host: &'a mut dyn GameHost,
    pub cache: &'a mut TickCache,
    pub traveler: &'a mut Traveler,
    pub spawn_groups: &'a mut SpawnGroups,
    pub memory: &'a mut RootMemory,
    pub rng: &'a mut TickRng,
}

impl<'a> MissionExecutionSystemData<'a> {
    pub fn time(&self) -> u32 {
        self.host.time()
    }

    pub fn room(&mut self, name: RoomName) -> Option<Arc<RoomSnapshot>> {
        self.cache.room(&*self.host, name)
    }
}

/// The operation a mission belongs to, as resolved this tick.
pub struct MissionExecutionRuntimeData<'a> {
    pub operation: &'a str,
    pub mission: &'a str,
    pub flag: Position,
    pub room: Option<Arc<RoomSnapshot>>,
    pub spawn_group: Option<RoomName>,
}

impl<'a> MissionExecutionRuntimeData<'a> {
    pub fn has_vision(&self) -> bool {
        self.room.is_some()
    }

    pub fn memory<'m>(&self, memory: &'m mut RootMemory) -> &'m mut MissionMemory {
        memory.operation_mut(self.operation).mission_mut(self.mission)
    }

    /// Name used to claim shared agents.
    pub fn employer(&self) -> String {
        format!("{}{}", self.operation, self.mission)
    }
}

/// A reusable unit of behavior owned by an operation. Missions are rebuilt every tick, anything
/// that must survive lives in mission memory.
pub trait Mission: Send + Sync {
    fn name(&self) -> &str;

    fn init(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }

    /// Find the agents of every role and spawn replacements.
    fn role_call(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }

    fn actions(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }

    fn invalidate_cache(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }

    fn finalize(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }
}

/// Override the population of a role. Returns a description of the change for the console.
pub fn set_max(memory: &mut MissionMemory, role: &str, max: u32) -> String {
    let old = memory.max.insert(role.to_owned(), max);

    format!("changing max for {} from {:?} to {}", role, old, max)
}

/// Boost compounds applied to agents of a role spawned from now on.
pub fn set_boost(memory: &mut MissionMemory, role: &str, boosts: Vec<String>) -> String {
    let old = if boosts.is_empty() {
        memory.boost.remove(role)
    } else {
        memory.boost.insert(role.to_owned(), boosts.clone())
    };

    format!("changing boosts for {} from {:?} to {:?}", role, old.unwrap_or_default(), boosts)
}

pub fn invalidate_spawn_distance(memory: &mut MissionMemory) {
    if memory.distance_to_spawn.take().is_some() {
        info!("Resetting spawn distance");
    }
}

/// Path length from the spawn group to a destination, remembered in mission memory.
pub fn find_distance_to_spawn(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, destination: Position) -> Option<u32> {
    if let Some(distance) = runtime_data.memory(system_data.memory).distance_to_spawn {
        return Some(distance);
    }

    let origin = system_data.spawn_groups.get(runtime_data.spawn_group?)?.pos;

    let linear_distance = origin.room.linear_distance(destination.room);

    let distance = if linear_distance <= OBSERVER_RANGE {
        let memory = &*system_data.memory;

        let result = system_data.traveler.find_travel_path(
            &*system_data.host,
            system_data.cache,
            &memory.rooms,
            origin,
            destination,
            &TravelOptions::default(),
        );

        if result.incomplete {
            warn!(
                "Unable to find spawn distance, falling back to room distance - Operation: {} - Destination: {}",
                runtime_data.operation, destination
            );

            linear_distance * SPAWN_DISTANCE_FALLBACK_PER_ROOM + SPAWN_DISTANCE_FALLBACK_OFFSET
        } else {
            result.path.len() as u32
        }
    } else {
        info!("Likely portal travel, using fixed spawn distance - Operation: {}", runtime_data.operation);

        SPAWN_DISTANCE_PORTAL
    };

    runtime_data.memory(system_data.memory).distance_to_spawn = Some(distance);

    Some(distance)
}

/// Walk an agent back to its spawn group and recycle it there.
pub fn recycle_agent(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, agent: &Agent) -> ActionResult {
    let group_room = runtime_data.spawn_group.ok_or(ActionError::NotFound)?;
    let group = system_data.spawn_groups.get(group_room).ok_or(ActionError::NotFound)?;

    if agent.pos().is_near_to(&group.pos) {
        group.recycle(&mut *system_data.host, agent.name())
    } else {
        let pos = group.pos;

        agent.travel_to(system_data, pos, &TravelOptions::range(1))
    }
}

/// Pair unpartnered agents of `role` with the agent of `other_role` closest in remaining lifetime.
pub fn find_partnerships(memory: &mut RootMemory, agents: &[Agent], role_agents: &[Agent]) {
    for agent in agents {
        if memory.agent_mut(agent.name()).partner.is_some() {
            continue;
        }

        let ttl = agent.ticks_to_live().unwrap_or(CREEP_LIFE_TIME) as i64;

        let closest = role_agents
            .iter()
            .filter(|other| other.name() != agent.name())
            .min_by_key(|other| (other.ticks_to_live().unwrap_or(CREEP_LIFE_TIME) as i64 - ttl).abs());

        if let Some(other) = closest {
            memory.agent_mut(other.name()).partner = Some(agent.name().to_owned());
            memory.agent_mut(agent.name()).partner = Some(other.name().to_owned());
        }
    }
}

pub fn get_partner<'p>(memory: &mut RootMemory, agent: &Agent, possibilities: &'p [Agent]) -> Option<&'p Agent> {
    let partner = memory.agent_mut(agent.name()).partner.clone()?;

    possibilities.iter().find(|possibility| possibility.name() == partner)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::world::sim::*;

    fn room() -> RoomName {
        RoomName::new("E1S1").unwrap()
    }

    #[test]
    fn overrides_are_recorded() {
        let mut memory = MissionMemory::default();

        set_max(&mut memory, "paver", 3);
        set_boost(&mut memory, "paver", vec!["XLH2O".to_owned()]);

        assert_eq!(memory.max.get("paver"), Some(&3));
        assert_eq!(memory.boost.get("paver").map(|b| b.len()), Some(1));

        set_boost(&mut memory, "paver", Vec::new());
        assert!(memory.boost.is_empty());

        memory.distance_to_spawn = Some(40);
        invalidate_spawn_distance(&mut memory);
        assert_eq!(memory.distance_to_spawn, None);
    }

    #[test]
    fn spawn_distance_is_measured_once() {
        let sim = SimHost::new();
        sim.add_owned_room(room(), 3, 800);
        sim.add_structure(Position::new(10, 10, room()), StructureKind::Spawn, true);

        let mut fixture = Fixture::new(&sim);
        fixture.refresh();

        let runtime = MissionExecutionRuntimeData {
            operation: "alpha",
            mission: "paver",
            flag: Position::new(30, 10, room()),
            room: None,
            spawn_group: Some(room()),
        };

        let mut data = fixture.data();

        assert_eq!(find_distance_to_spawn(&mut data, &runtime, Position::new(30, 10, room())), Some(19));

        runtime.memory(data.memory).distance_to_spawn = Some(5);

        assert_eq!(find_distance_to_spawn(&mut data, &runtime, Position::new(30, 10, room())), Some(5));
    }

    #[test]
    fn partners_pair_by_remaining_life() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);

        for (name, ttl) in [("miner_a", 1400), ("cart_a", 200), ("cart_b", 1300)] {
            sim.add_creep(name, Position::new(10, 10, room()), &[Part::Move], true);
            sim.update_creep(name, |c| c.ticks_to_live = Some(ttl));
        }

        let mut fixture = Fixture::new(&sim);

        let miners = vec![fixture.agent("miner_a")];
        let carts = vec![fixture.agent("cart_a"), fixture.agent("cart_b")];

        find_partnerships(&mut fixture.memory, &miners, &carts);

        let partner = get_partner(&mut fixture.memory, &miners[0], &carts).map(|a| a.name().to_owned());

        assert_eq!(partner.as_deref(), Some("cart_b"));
        assert_eq!(fixture.memory.agent_mut("cart_b").partner.as_deref(), Some("miner_a"));
    }
}
