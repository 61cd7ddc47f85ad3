use super::actions::*;
use super::data::*;
use crate::constants::*;
use crate::memorysystem::*;
use crate::missions::missionsystem::*;
use crate::pathing::costmatrix::*;
use crate::pathing::movementsystem::*;
use crate::pathing::search::*;
use crate::world::*;
use log::*;
use std::sync::Arc;

const BATTERY_KEY: &str = "battery";
const SOURCE_KEY: &str = "source";

const MIN_BATTERY_ENERGY: u32 = 50;
const FLEE_RANGE: u32 = 6;
const FLEE_ROOM_DISTANCE: u32 = 1;
const SOURCE_KEEPER_AVOID_RANGE: i32 = 4;
const SOURCE_KEEPER_AVOID_COST: u8 = 0xc8;

fn is_battery(structure: &StructureSnapshot) -> bool {
    matches!(
        structure.kind,
        StructureKind::Storage | StructureKind::Container | StructureKind::Terminal
    )
}

/// A live creep working for a mission this tick. Actions go through the tick cache so that each
/// intent pipeline is used at most once per creep and tick; a second request on a used pipeline
/// reports `Busy` without reaching the host.
#[derive(Clone, Debug)]
pub struct Agent {
    creep: CreepSnapshot,
}

impl Agent {
    pub fn new(creep: CreepSnapshot) -> Agent {
        Agent { creep }
    }

    pub fn name(&self) -> &str {
        &self.creep.name
    }

    pub fn creep(&self) -> &CreepSnapshot {
        &self.creep
    }

    pub fn pos(&self) -> Position {
        self.creep.pos
    }

    pub fn ticks_to_live(&self) -> Option<u32> {
        self.creep.ticks_to_live
    }

    pub fn is_spawning(&self) -> bool {
        self.creep.spawning
    }

    pub fn memory<'m>(&self, memory: &'m mut RootMemory) -> &'m mut AgentMemory {
        memory.agent_mut(&self.creep.name)
    }

    pub fn get_active_parts(&self, part: Part) -> u32 {
        self.creep.get_active_parts(part)
    }

    pub fn is_full(&self) -> bool {
        self.creep.store.free() == 0
    }

    pub fn is_near_exit(&self, range: u8) -> bool {
        self.creep.pos.is_near_exit(range)
    }

    /// Carrying state with hysteresis: loaded once full, unloaded once empty.
    pub fn has_load(&self, system_data: &mut MissionExecutionSystemData) -> bool {
        let used = self.creep.store.used();
        let full = self.is_full();

        let memory = self.memory(system_data.memory);

        if memory.has_load && used == 0 {
            memory.has_load = false;
        } else if !memory.has_load && full && used > 0 {
            memory.has_load = true;
        }

        memory.has_load
    }

    fn issue(&self, system_data: &mut MissionExecutionSystemData, intent: CreepIntent) -> ActionResult {
        let flags = SimultaneousActionFlags::for_intent(&intent);

        if !system_data.cache.consume_action(&self.creep.name, flags) {
            return Err(ActionError::Busy);
        }

        system_data.host.creep_intent(&self.creep.name, intent)
    }

    fn move_direction(&self, system_data: &mut MissionExecutionSystemData, direction: Direction) -> ActionResult {
        self.issue(system_data, CreepIntent::Move(direction))
    }

    /// Stop attack notifications for this agent. Only sent once per agent.
    pub fn disable_notify(&self, system_data: &mut MissionExecutionSystemData) -> ActionResult {
        if self.memory(system_data.memory).notify_disabled {
            return Ok(());
        }

        self.issue(system_data, CreepIntent::NotifyWhenAttacked(false))?;

        self.memory(system_data.memory).notify_disabled = true;

        Ok(())
    }

    pub fn say(&self, system_data: &mut MissionExecutionSystemData, message: &str) -> ActionResult {
        self.issue(system_data, CreepIntent::Say(message.to_owned()))
    }

    pub fn suicide(&self, system_data: &mut MissionExecutionSystemData) -> ActionResult {
        self.issue(system_data, CreepIntent::Suicide)
    }

    pub fn travel_to(&self, system_data: &mut MissionExecutionSystemData, destination: Position, options: &TravelOptions) -> ActionResult {
        if !system_data.cache.consume_action(&self.creep.name, SimultaneousActionFlags::MOVE) {
            return Err(ActionError::Busy);
        }

        let memory = &mut *system_data.memory;
        let record = &mut memory.creeps.entry(self.creep.name.clone()).or_insert_with(AgentMemory::fresh).travel;

        system_data.traveler.travel_to(
            &mut *system_data.host,
            system_data.cache,
            &memory.rooms,
            &self.creep,
            record,
            Some(destination),
            options,
        )
    }

    /// Travel until within `range` of the target, then act on it.
    pub fn travel_and_act<F>(&self, system_data: &mut MissionExecutionSystemData, target: Position, range: u32, act: F) -> ActionResult
    where
        F: FnOnce(&Agent, &mut MissionExecutionSystemData) -> ActionResult,
    {
        if self.creep.pos.in_range_to(&target, range) {
            act(self, system_data)
        } else {
            self.travel_to(system_data, target, &TravelOptions::range(range))
        }
    }

    pub fn retrieve(&self, system_data: &mut MissionExecutionSystemData, target: &StructureSnapshot, resource: &str) -> ActionResult {
        let intent = CreepIntent::Withdraw(target.id.clone(), resource.to_owned());

        self.travel_and_act(system_data, target.pos, 1, move |agent, system_data| agent.issue(system_data, intent))
    }

    pub fn deliver(&self, system_data: &mut MissionExecutionSystemData, target: &StructureSnapshot, resource: &str) -> ActionResult {
        let intent = CreepIntent::Transfer(target.id.clone(), resource.to_owned());

        self.travel_and_act(system_data, target.pos, 1, move |agent, system_data| agent.issue(system_data, intent))
    }

    pub fn harvest(&self, system_data: &mut MissionExecutionSystemData, source: &SourceSnapshot) -> ActionResult {
        let intent = CreepIntent::Harvest(source.id.clone());

        self.travel_and_act(system_data, source.pos, 1, move |agent, system_data| agent.issue(system_data, intent))
    }

    pub fn pickup(&self, system_data: &mut MissionExecutionSystemData, resource: &DroppedResource) -> ActionResult {
        let intent = CreepIntent::Pickup(resource.id.clone());

        self.travel_and_act(system_data, resource.pos, 1, move |agent, system_data| agent.issue(system_data, intent))
    }

    pub fn build(&self, system_data: &mut MissionExecutionSystemData, site: &ConstructionSiteSnapshot) -> ActionResult {
        let intent = CreepIntent::Build(site.id.clone());

        self.travel_and_act(system_data, site.pos, 3, move |agent, system_data| agent.issue(system_data, intent))
    }

    pub fn repair(&self, system_data: &mut MissionExecutionSystemData, structure: &StructureSnapshot) -> ActionResult {
        let intent = CreepIntent::Repair(structure.id.clone());

        self.travel_and_act(system_data, structure.pos, 3, move |agent, system_data| agent.issue(system_data, intent))
    }

    pub fn heal(&self, system_data: &mut MissionExecutionSystemData, target: &CreepSnapshot) -> ActionResult {
        if !self.creep.pos.is_near_to(&target.pos) {
            return Err(ActionError::NotInRange);
        }

        self.issue(system_data, CreepIntent::Heal(target.name.clone()))
    }

    pub fn ranged_heal(&self, system_data: &mut MissionExecutionSystemData, target: &CreepSnapshot) -> ActionResult {
        if !self.creep.pos.in_range_to(&target.pos, 3) {
            return Err(ActionError::NotInRange);
        }

        self.issue(system_data, CreepIntent::RangedHeal(target.name.clone()))
    }

    /// Structure remembered under `key`. A remembered id that no longer resolves, or that `forget`
    /// rejects, is cleared and `find` runs once to pick a replacement.
    pub fn remember_structure<F, G>(&self, system_data: &mut MissionExecutionSystemData, key: &str, find: F, forget: G) -> Option<StructureSnapshot>
    where
        F: FnOnce(&Agent, &mut MissionExecutionSystemData) -> Option<StructureSnapshot>,
        G: Fn(&StructureSnapshot) -> bool,
    {
        let remembered = self.memory(system_data.memory).remembered.get(key).cloned();

        if let Some(id) = remembered {
            match system_data.cache.structure(&*system_data.host, &id) {
                Some(structure) if !forget(&structure) => return Some(structure),
                _ => {
                    self.memory(system_data.memory).remembered.remove(key);
                }
            }
        }

        let structure = find(self, system_data).filter(|structure| !forget(structure))?;

        self.memory(system_data.memory)
            .remembered
            .insert(key.to_owned(), structure.id.clone());

        Some(structure)
    }

    fn remember_source(&self, system_data: &mut MissionExecutionSystemData) -> Option<SourceSnapshot> {
        let pos = self.creep.pos;
        let room = system_data.room(pos.room)?;

        let remembered = self.memory(system_data.memory).remembered.get(SOURCE_KEY).cloned();

        if let Some(id) = remembered {
            if let Some(source) = room.sources.iter().find(|source| source.id == id && source.energy > 0) {
                return Some(source.clone());
            }

            self.memory(system_data.memory).remembered.remove(SOURCE_KEY);
        }

        let source = room
            .sources
            .iter()
            .filter(|source| source.energy > 0)
            .min_by_key(|source| source.pos.range_to(&pos))?
            .clone();

        self.memory(system_data.memory)
            .remembered
            .insert(SOURCE_KEY.to_owned(), source.id.clone());

        Some(source)
    }

    /// Fill up with energy from the closest storage, container or terminal holding some. Agents
    /// with working WORK parts fall back to harvesting, others wait off the road. When the
    /// withdrawal happens the agent already steps towards `next_destination`.
    pub fn procure_energy(&self, system_data: &mut MissionExecutionSystemData, next_destination: Option<Position>) -> ActionResult {
        let pos = self.creep.pos;

        let battery = self.remember_structure(
            system_data,
            BATTERY_KEY,
            |agent, system_data| {
                let room = system_data.room(agent.pos().room)?;

                room.structures
                    .iter()
                    .filter(|structure| is_battery(structure) && structure.store.energy() >= MIN_BATTERY_ENERGY)
                    .min_by_key(|structure| structure.pos.range_to(&pos))
                    .cloned()
            },
            |structure| structure.store.energy() < MIN_BATTERY_ENERGY,
        );

        if let Some(battery) = battery {
            if !pos.is_near_to(&battery.pos) {
                return self.travel_to(system_data, battery.pos, &TravelOptions::range(1));
            }

            let result = self.retrieve(system_data, &battery, ENERGY);

            if let Some(next_destination) = next_destination {
                if result.is_ok() && !pos.is_near_to(&next_destination) {
                    let _ = self.travel_to(system_data, next_destination, &TravelOptions::default());
                }
            }

            return result;
        }

        if self.get_active_parts(Part::Work) > 0 {
            if let Some(source) = self.remember_source(system_data) {
                return self.harvest(system_data, &source);
            }
        }

        self.idle_off_road(system_data, next_destination.unwrap_or(pos))
    }

    /// Step away from threats closer than `range`. Returns whether the agent is fleeing.
    pub fn flee(&self, system_data: &mut MissionExecutionSystemData, threats: &[Position], range: u32) -> bool {
        let pos = self.creep.pos;

        if !threats.iter().any(|threat| pos.in_range_to(threat, range)) {
            return false;
        }

        let goals: Vec<SearchGoal> = threats.iter().map(|threat| SearchGoal::new(*threat, range)).collect();

        let memory = &*system_data.memory;

        let result = system_data.traveler.find_flee_path(
            &*system_data.host,
            system_data.cache,
            &memory.rooms,
            pos,
            &goals,
            FLEE_ROOM_DISTANCE,
        );

        match result.path.first().and_then(|next| pos.direction_to(next)) {
            Some(direction) => {
                let _ = self.move_direction(system_data, direction);
            }
            None => debug!("No flee path - Creep: {} - Position: {}", self.creep.name, pos),
        }

        true
    }

    /// Flee from hostiles able to hurt the agent.
    pub fn flee_hostiles(&self, system_data: &mut MissionExecutionSystemData) -> bool {
        let room = match system_data.room(self.creep.pos.room) {
            Some(room) => room,
            None => return false,
        };

        let threats: Vec<Position> = room
            .hostiles()
            .filter(|hostile| hostile.get_active_parts(Part::Attack) > 0 || hostile.get_active_parts(Part::RangedAttack) > 0)
            .map(|hostile| hostile.pos)
            .collect();

        !threats.is_empty() && self.flee(system_data, &threats, FLEE_RANGE)
    }

    /// Step off roads and exits so that traffic can pass, staying no further from `anchor`.
    pub fn idle_off_road(&self, system_data: &mut MissionExecutionSystemData, anchor: Position) -> ActionResult {
        let pos = self.creep.pos;

        let room = match system_data.room(pos.room) {
            Some(room) => room,
            None => return Ok(()),
        };

        let on_road = room.structure_at(&pos, StructureKind::Road).is_some();

        if !on_road && !pos.is_near_exit(0) {
            return Ok(());
        }

        let terrain = system_data.host.terrain(pos.room);
        let range = pos.range_to(&anchor).max(1);

        let spot = pos
            .neighbors()
            .filter(|spot| spot.room == pos.room && !spot.is_near_exit(0))
            .filter(|spot| spot.range_to(&anchor) <= range)
            .filter(|spot| terrain.as_ref().map(|terrain| !terrain.is_wall(spot.x, spot.y)).unwrap_or(false))
            .filter(|spot| room.structures.iter().all(|structure| structure.pos != *spot))
            .filter(|spot| room.construction_site_at(spot).is_none())
            .find(|spot| room.creeps.iter().all(|creep| creep.pos != *spot));

        match spot.and_then(|spot| pos.direction_to(&spot)) {
            Some(direction) => self.move_direction(system_data, direction),
            None => self.travel_to(system_data, anchor, &TravelOptions::range(1)),
        }
    }

    /// Wait within `range` of a place, out of the way.
    pub fn idle_near(&self, system_data: &mut MissionExecutionSystemData, place: Position, range: u32) -> ActionResult {
        if self.creep.pos.in_range_to(&place, range) && !self.creep.pos.is_near_exit(0) {
            self.idle_off_road(system_data, place)
        } else {
            self.travel_to(system_data, place, &TravelOptions::range(range))
        }
    }

    /// Travel while giving source keeper lairs a wide berth.
    pub fn avoid_sk(&self, system_data: &mut MissionExecutionSystemData, destination: Position) -> ActionResult {
        let callback: RoomCallback = Arc::new(|_: RoomName, room: Option<&RoomSnapshot>, matrix: &mut CostMatrix| {
            if let Some(room) = room {
                for lair in room.structures_of(StructureKind::KeeperLair) {
                    mark_area(matrix, lair.pos, SOURCE_KEEPER_AVOID_RANGE, SOURCE_KEEPER_AVOID_COST);
                }
            }

            true
        });

        let options = TravelOptions {
            room_callback: Some(callback),
            ..TravelOptions::default()
        };

        self.travel_to(system_data, destination, &options)
    }

    /// Apply the boosts requested in agent memory at labs holding them. Returns true once nothing
    /// is left to apply. Compounds no lab holds are dropped when the agent may go unboosted.
    pub fn seek_boost(&self, system_data: &mut MissionExecutionSystemData) -> bool {
        let pos = self.creep.pos;
        let memory = self.memory(system_data.memory);
        let boosts = memory.boosts.clone();
        let allow_unboosted = memory.allow_unboosted;

        for compound in boosts {
            let applied = self.creep.body.iter().any(|part| part.boost.as_deref() == Some(compound.as_str()));

            if applied {
                self.memory(system_data.memory).boosts.retain(|boost| *boost != compound);

                continue;
            }

            let needed = LAB_BOOST_MINERAL * self.creep.body.len() as u32;

            let lab = system_data.room(pos.room).and_then(|room| {
                room.structures_of(StructureKind::Lab)
                    .filter(|lab| lab.my && lab.store.amount(&compound) >= needed)
                    .min_by_key(|lab| lab.pos.range_to(&pos))
                    .cloned()
            });

            match lab {
                Some(lab) => {
                    if pos.is_near_to(&lab.pos) {
                        if system_data.host.boost_creep(&lab.id, &self.creep.name).is_ok() {
                            self.memory(system_data.memory).boosts.retain(|boost| *boost != compound);
                        }
                    } else {
                        let _ = self.travel_to(system_data, lab.pos, &TravelOptions::range(1));
                    }

                    return false;
                }
                None if allow_unboosted => {
                    info!("Boost unavailable, continuing without it - Creep: {} - Boost: {}", self.creep.name, compound);

                    self.memory(system_data.memory).boosts.retain(|boost| *boost != compound);
                }
                None => return false,
            }
        }

        true
    }
}

fn mark_area(matrix: &mut CostMatrix, center: Position, range: i32, cost: u8) {
    for dx in -range..=range {
        for dy in -range..=range {
            let x = center.x as i32 + dx;
            let y = center.y as i32 + dy;

            if (0..ROOM_SIZE).contains(&x) && (0..ROOM_SIZE).contains(&y) && matrix.get(x as u8, y as u8) < cost {
                matrix.set(x as u8, y as u8, cost);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::missionsystem::testing::*;
    use crate::world::sim::*;

    fn room() -> RoomName {
        RoomName::new("E1S1").unwrap()
    }

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y, room())
    }

    fn intents(sim: &SimHost, creep: &str) -> Vec<CreepIntent> {
        sim.with(|state| state.intent_log.iter().filter(|(_, name, _)| name == creep).map(|(_, _, intent)| intent.clone()).collect())
    }

    fn fill(sim: &SimHost, id: &ObjectId, resource: &str, amount: u32) {
        sim.with(|state| {
            for room in state.rooms.values_mut() {
                for structure in room.snapshot.structures.iter_mut().filter(|s| s.id == *id) {
                    structure.store.add(resource, amount);
                }
            }
        });
    }

    #[test]
    fn second_intent_on_a_pipeline_is_refused() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        sim.add_creep("worker", pos(10, 10), &[Part::Work, Part::Carry, Part::Move], true);

        let mut fixture = Fixture::new(&sim);
        let agent = fixture.agent("worker");
        let mut data = fixture.data();

        assert_eq!(agent.say(&mut data, "hi"), Ok(()));
        assert_eq!(agent.say(&mut data, "again"), Err(ActionError::Busy));
        assert_eq!(agent.move_direction(&mut data, Direction::Top), Ok(()));
        assert_eq!(agent.travel_to(&mut data, pos(20, 20), &TravelOptions::default()), Err(ActionError::Busy));

        assert_eq!(intents(&sim, "worker").len(), 2);
    }

    #[test]
    fn energy_comes_from_the_closest_battery() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        let near = sim.add_structure(pos(11, 10), StructureKind::Container, false);
        let far = sim.add_structure(pos(20, 10), StructureKind::Container, false);
        fill(&sim, &near, ENERGY, 500);
        fill(&sim, &far, ENERGY, 500);
        sim.add_creep("hauler", pos(10, 10), &[Part::Carry, Part::Move], true);

        let mut fixture = Fixture::new(&sim);
        let agent = fixture.agent("hauler");

        assert_eq!(agent.procure_energy(&mut fixture.data(), None), Ok(()));
        assert_eq!(sim.creep("hauler").map(|c| c.store.energy()), Some(50));
        assert_eq!(fixture.memory.agent_mut("hauler").remembered.get(BATTERY_KEY), Some(&near));
    }

    #[test]
    fn stale_memory_is_recomputed_once() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        let road = sim.add_structure(pos(12, 12), StructureKind::Road, true);
        sim.add_creep("paver", pos(10, 10), &[Part::Work, Part::Carry, Part::Move], true);

        let mut fixture = Fixture::new(&sim);
        let agent = fixture.agent("paver");

        fixture
            .memory
            .agent_mut("paver")
            .remembered
            .insert("road".to_owned(), ObjectId::new("gone"));

        let mut calls = 0;

        let found = agent.remember_structure(
            &mut fixture.data(),
            "road",
            |_, data| {
                calls += 1;

                data.room(room()).and_then(|room| room.structures_of(StructureKind::Road).next().cloned())
            },
            |_| false,
        );

        assert_eq!(found.map(|s| s.id), Some(road.clone()));
        assert_eq!(calls, 1);
        assert_eq!(fixture.memory.agent_mut("paver").remembered.get("road"), Some(&road));
    }

    #[test]
    fn workers_without_a_battery_harvest() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        let source = sim.add_source(pos(10, 11));
        sim.add_creep("miner", pos(10, 10), &[Part::Work, Part::Carry, Part::Move], true);

        let mut fixture = Fixture::new(&sim);
        let agent = fixture.agent("miner");

        assert_eq!(agent.procure_energy(&mut fixture.data(), None), Ok(()));
        assert_eq!(intents(&sim, "miner"), vec![CreepIntent::Harvest(source)]);
    }

    #[test]
    fn agents_flee_from_attackers() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        sim.add_creep("scout", pos(25, 25), &[Part::Move], true);
        sim.add_creep("invader", pos(27, 25), &[Part::Attack, Part::Move], false);

        let mut fixture = Fixture::new(&sim);
        let agent = fixture.agent("scout");

        assert!(agent.flee_hostiles(&mut fixture.data()));

        sim.advance();

        let after = sim.creep("scout").map(|c| c.pos).unwrap();
        assert!(after.range_to(&pos(27, 25)) > 2);
    }

    #[test]
    fn load_flips_only_when_full_or_empty() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        sim.add_creep("cart", pos(10, 10), &[Part::Carry, Part::Move], true);
        sim.update_creep("cart", |c| {
            c.store.add(ENERGY, 50);
        });

        let mut fixture = Fixture::new(&sim);

        assert!(fixture.agent("cart").has_load(&mut fixture.data()));

        sim.update_creep("cart", |c| {
            c.store.remove(ENERGY, 20);
        });
        fixture.refresh();

        assert!(fixture.agent("cart").has_load(&mut fixture.data()));

        sim.update_creep("cart", |c| {
            c.store.remove(ENERGY, 30);
        });
        fixture.refresh();

        assert!(!fixture.agent("cart").has_load(&mut fixture.data()));
    }

    #[test]
    fn missing_boosts_are_dropped_when_allowed() {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);
        let lab = sim.add_structure(pos(11, 10), StructureKind::Lab, true);
        fill(&sim, &lab, "XUH2O", 100);
        sim.add_creep("brawler", pos(10, 10), &[Part::Attack, Part::Move], true);

        let mut fixture = Fixture::new(&sim);
        {
            let memory = fixture.memory.agent_mut("brawler");
            memory.boosts = vec!["XUH2O".to_owned(), "XZHO2".to_owned()];
            memory.allow_unboosted = true;
        }

        let agent = fixture.agent("brawler");
        assert!(!agent.seek_boost(&mut fixture.data()));
        assert_eq!(fixture.memory.agent_mut("brawler").boosts, vec!["XZHO2".to_owned()]);

        fixture.refresh();

        let agent = fixture.agent("brawler");
        assert!(agent.seek_boost(&mut fixture.data()));
        assert!(fixture.memory.agent_mut("brawler").boosts.is_empty());
    }
}
