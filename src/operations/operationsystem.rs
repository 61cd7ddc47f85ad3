use super::data::*;
use crate::cache::*;
use crate::constants::*;
use crate::findnearest::*;
use crate::jitter::*;
use crate::memorysystem::*;
use crate::missions::missionsystem::*;
use crate::panic::*;
use crate::pathing::movementsystem::*;
use crate::spawnsystem::*;
use crate::timeout;
use crate::world::*;
use log::*;
use specs::prelude::*;
use std::sync::Arc;

/// The operation as resolved for the current tick.
pub struct OperationExecutionRuntimeData<'a> {
    pub name: &'a str,
    pub flag: Position,
    pub room: Option<Arc<RoomSnapshot>>,
    pub spawn_group: Option<RoomName>,
}

/// Behavior of one kind of operation. Shared phases run through the missions the operation adds
/// in `init`.
pub trait Operation: Send + Sync {
    fn priority(&self) -> OperationPriority;

    /// Lowest controller level of a remote spawn group able to serve this operation.
    fn spawn_level(&self) -> u32 {
        1
    }

    /// Rooms a remote spawn group may be away from the flag.
    fn spawn_distance(&self) -> u32 {
        REMOTE_SPAWN_DISTANCE
    }

    /// Add the missions needed this tick.
    fn init(
        &mut self,
        system_data: &mut MissionExecutionSystemData,
        runtime_data: &OperationExecutionRuntimeData,
        missions: &mut Vec<Box<dyn Mission>>,
    ) -> Result<(), String>;

    fn invalidate_cache(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &OperationExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }

    fn finalize(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &OperationExecutionRuntimeData) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationPhase {
    Init,
    RoleCall,
    Action,
    InvalidateCache,
    Finalize,
}

impl OperationPhase {
    pub fn name(self) -> &'static str {
        match self {
            OperationPhase::Init => "init",
            OperationPhase::RoleCall => "roleCall",
            OperationPhase::Action => "actions",
            OperationPhase::InvalidateCache => "invalidateCache",
            OperationPhase::Finalize => "finalize",
        }
    }
}

/// An operation discovered from a flag this tick.
pub struct OperationData {
    pub name: String,
    pub kind: String,
    pub flag: Position,
    pub priority: OperationPriority,
    pub room: Option<Arc<RoomSnapshot>>,
    pub spawn_group: Option<RoomName>,
    missions: Vec<Box<dyn Mission>>,
    operation: Box<dyn Operation>,
}

impl OperationData {
    pub fn new(name: &str, kind: &str, flag: Position, operation: Box<dyn Operation>) -> OperationData {
        OperationData {
            name: name.to_owned(),
            kind: kind.to_owned(),
            flag,
            priority: operation.priority(),
            room: None,
            spawn_group: None,
            missions: Vec::new(),
            operation,
        }
    }

    pub fn mission_names(&self) -> Vec<&str> {
        self.missions.iter().map(|mission| mission.name()).collect()
    }

    pub fn run_phase(&mut self, system_data: &mut MissionExecutionSystemData, phase: OperationPhase) -> Result<(), String> {
        let OperationData {
            name,
            flag,
            room,
            spawn_group,
            missions,
            operation,
            ..
        } = self;

        let name = name.as_str();

        if phase == OperationPhase::Init {
            *room = system_data.room(flag.room);
            *spawn_group = select_spawn_group(system_data, name, *flag, &**operation);

            missions.clear();
        }

        let runtime_data = OperationExecutionRuntimeData {
            name,
            flag: *flag,
            room: room.clone(),
            spawn_group: *spawn_group,
        };

        timeout::log(&mut system_data.memory.timeout_tracker, phase.name(), Some(name), None);

        match phase {
            OperationPhase::Init => operation.init(system_data, &runtime_data, missions)?,
            OperationPhase::InvalidateCache => operation.invalidate_cache(system_data, &runtime_data)?,
            _ => {}
        }

        for mission in missions.iter_mut() {
            let mission_name = mission.name().to_owned();

            timeout::log(&mut system_data.memory.timeout_tracker, phase.name(), Some(name), Some(mission_name.as_str()));

            let mission_runtime_data = MissionExecutionRuntimeData {
                operation: name,
                mission: &mission_name,
                flag: *flag,
                room: room.clone(),
                spawn_group: *spawn_group,
            };

            let result = match phase {
                OperationPhase::Init => mission.init(system_data, &mission_runtime_data),
                OperationPhase::RoleCall => mission.role_call(system_data, &mission_runtime_data),
                OperationPhase::Action => mission.actions(system_data, &mission_runtime_data),
                OperationPhase::InvalidateCache => mission.invalidate_cache(system_data, &mission_runtime_data),
                OperationPhase::Finalize => mission.finalize(system_data, &mission_runtime_data),
            };

            if let Err(err) = result {
                warn!(
                    "Mission failed - Phase: {} - Operation: {} - Mission: {} - Error: {}",
                    phase.name(),
                    name,
                    mission_name,
                    err
                );
            }
        }

        if phase == OperationPhase::Finalize {
            operation.finalize(system_data, &runtime_data)?;
        }

        Ok(())
    }
}

/// The local spawn group of the flag room, otherwise the remembered remote one.
fn select_spawn_group(system_data: &mut MissionExecutionSystemData, name: &str, flag: Position, operation: &dyn Operation) -> Option<RoomName> {
    if system_data.spawn_groups.get(flag.room).is_some() {
        return Some(flag.room);
    }

    find_remote_spawn(system_data, name, flag, operation.spawn_level(), operation.spawn_distance())
}

/// Spawn group in another room serving the flag. Candidates are ranked by path distance and
/// remembered; they are re-ranked on a jittered interval unless the empire is short on CPU. The
/// closest candidate with a free spawn on average wins, else the one most often free.
pub fn find_remote_spawn(
    system_data: &mut MissionExecutionSystemData,
    name: &str,
    flag: Position,
    level: u32,
    distance_limit: u32,
) -> Option<RoomName> {
    let time = system_data.time();
    let under_limit = system_data.memory.cpu.under_limit(system_data.host.gcl_level());

    let previous = system_data.memory.operation_mut(name).spawn_data.clone();

    let due = previous.as_ref().map(|data| time >= data.next_spawn_check).unwrap_or(true);

    if due && (previous.is_none() || under_limit) {
        let candidates: Vec<SpawnGroup> = system_data
            .spawn_groups
            .iter()
            .filter(|group| group.level >= level && group.room != flag.room)
            .cloned()
            .collect();

        let options = FindClosestOptions {
            linear_distance_limit: distance_limit,
            margin: 0,
        };

        let MissionExecutionSystemData {
            host, cache, traveler, memory, ..
        } = &mut *system_data;

        let rooms = &memory.rooms;

        let mut closest = find_closest(flag, candidates, &options, |origin, destination| {
            let result = traveler.find_travel_path(
                &**host,
                cache,
                rooms,
                origin,
                destination,
                &TravelOptions::default(),
            );

            if result.incomplete {
                None
            } else {
                Some(result.path.len() as u32)
            }
        });

        let spawn_data = if closest.is_empty() {
            info!("No remote spawn group found - Operation: {}", name);

            SpawnData {
                spawn_rooms: previous.map(|data| data.spawn_rooms).unwrap_or_default(),
                next_spawn_check: time + SPAWN_GROUP_RETRY_INTERVAL,
            }
        } else {
            closest.sort_by_key(|result| result.distance);

            SpawnData {
                spawn_rooms: closest
                    .iter()
                    .map(|result| SpawnRoomCandidate {
                        room: result.destination.room,
                        distance: result.distance,
                    })
                    .collect(),
                next_spawn_check: time + random_interval(system_data.rng.get_mut(), SPAWN_GROUP_RECHECK_INTERVAL),
            }
        };

        system_data.memory.operation_mut(name).spawn_data = Some(spawn_data);
    }

    let spawn_rooms = system_data
        .memory
        .operation_mut(name)
        .spawn_data
        .as_ref()
        .map(|data| data.spawn_rooms.clone())
        .unwrap_or_default();

    let mut best: Option<RoomName> = None;
    let mut best_availability = 0.0;

    for candidate in spawn_rooms {
        let group = match system_data.spawn_groups.get(candidate.room) {
            Some(group) => group,
            None => continue,
        };

        let availability = group.average_availability();

        if availability >= 1.0 {
            return Some(candidate.room);
        }

        if best.is_none() || availability > best_availability {
            best_availability = availability;
            best = Some(candidate.room);
        }
    }

    best
}

/// Operations discovered this tick, in phase order.
#[derive(Default)]
pub struct Operations {
    operations: Vec<OperationData>,
}

impl Operations {
    pub fn new() -> Operations {
        Operations::default()
    }

    pub fn replace(&mut self, operations: Vec<OperationData>) {
        self.operations = operations;
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationData> {
        self.operations.iter()
    }

    pub fn get(&self, name: &str) -> Option<&OperationData> {
        self.operations.iter().find(|operation| operation.name == name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[derive(SystemData)]
pub struct OperationSystemData<'a> {
    host: WriteExpect<'a, Host>,
    cache: WriteExpect<'a, TickCache>,
    traveler: WriteExpect<'a, Traveler>,
    spawn_groups: WriteExpect<'a, SpawnGroups>,
    rng: WriteExpect<'a, TickRng>,
    operations: WriteExpect<'a, Operations>,
    memory: Write<'a, RootMemory>,
}

/// Runs one phase for every operation. Each operation is isolated, a failure is logged and the
/// next operation runs.
pub struct OperationPhaseSystem {
    phase: OperationPhase,
}

impl OperationPhaseSystem {
    pub fn new(phase: OperationPhase) -> OperationPhaseSystem {
        OperationPhaseSystem { phase }
    }
}

impl<'a> System<'a> for OperationPhaseSystem {
    type SystemData = OperationSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let OperationSystemData {
            host,
            cache,
            traveler,
            spawn_groups,
            rng,
            operations,
            memory,
        } = &mut data;

        let mut system_data = MissionExecutionSystemData {
            host: host.get_mut(),
            cache,
            traveler,
            spawn_groups,
            memory,
            rng,
        };

        let phase = self.phase;

        for operation in operations.operations.iter_mut() {
            let label = format!("{} {}", operation.name, phase.name());

            match bulkhead(&label, || operation.run_phase(&mut system_data, phase)) {
                Some(Ok(())) => {}
                Some(Err(err)) => warn!("Operation failed - Phase: {} - Operation: {} - Error: {}", phase.name(), operation.name, err),
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::missionsystem::testing::*;
    use crate::world::sim::*;

    struct Idle;

    impl Operation for Idle {
        fn priority(&self) -> OperationPriority {
            OperationPriority::Low
        }

        fn init(&mut self, _: &mut MissionExecutionSystemData, _: &OperationExecutionRuntimeData, _: &mut Vec<Box<dyn Mission>>) -> Result<(), String> {
            Ok(())
        }
    }

    fn colony(sim: &SimHost, name: &str, spawn: (u8, u8), level: u32) -> RoomName {
        let room = RoomName::new(name).unwrap();

        sim.add_owned_room(room, level, 800);
        sim.add_structure(Position::new(spawn.0, spawn.1, room), StructureKind::Spawn, true);

        room
    }

    #[test]
    fn local_spawn_group_is_preferred() {
        let sim = SimHost::new();
        let home = colony(&sim, "E1S1", (20, 20), 3);

        let mut fixture = Fixture::new(&sim);
        fixture.refresh();

        let mut operation = OperationData::new("alpha", "idle", Position::new(25, 25, home), Box::new(Idle));

        let mut data = fixture.data();
        operation.run_phase(&mut data, OperationPhase::Init).unwrap();

        assert_eq!(operation.spawn_group, Some(home));
        assert!(operation.room.is_some());
        assert!(data.memory.operation_mut("alpha").spawn_data.is_none());
    }

    #[test]
    fn closest_remote_spawn_group_is_remembered() {
        let sim = SimHost::new();
        let near = colony(&sim, "E2S1", (25, 25), 3);
        let far = colony(&sim, "E4S1", (25, 25), 3);
        let target = RoomName::new("E1S1").unwrap();

        sim.add_room(RoomName::new("E3S1").unwrap(), RoomTerrain::plains(), false);
        sim.add_room(target, RoomTerrain::plains(), false);

        let mut fixture = Fixture::new(&sim);

        // Both groups have a free spawn on average.
        for _ in 0..200 {
            fixture.next_tick();
        }

        let flag = Position::new(25, 25, target);

        let mut data = fixture.data();

        assert_eq!(find_remote_spawn(&mut data, "alpha", flag, 1, 8), Some(near));

        let spawn_data = data.memory.operation_mut("alpha").spawn_data.clone().unwrap();

        assert_eq!(spawn_data.spawn_rooms.len(), 1);
        assert!(spawn_data.next_spawn_check > data.time() + 8_000);

        // Remembered candidates are used until the next check is due.
        data.memory.operation_mut("alpha").spawn_data.as_mut().unwrap().spawn_rooms[0].room = far;

        assert_eq!(find_remote_spawn(&mut data, "alpha", flag, 1, 8), Some(far));
    }

    #[test]
    fn level_requirement_filters_remote_groups() {
        let sim = SimHost::new();
        colony(&sim, "E2S1", (25, 25), 2);
        let target = RoomName::new("E1S1").unwrap();
        sim.add_room(target, RoomTerrain::plains(), false);

        let mut fixture = Fixture::new(&sim);
        fixture.next_tick();

        let mut data = fixture.data();
        let time = data.time();

        assert_eq!(find_remote_spawn(&mut data, "alpha", Position::new(25, 25, target), 4, 8), None);
        assert_eq!(
            data.memory.operation_mut("alpha").spawn_data.as_ref().map(|d| d.next_spawn_check),
            Some(time + SPAWN_GROUP_RETRY_INTERVAL)
        );
    }

    #[test]
    fn busy_remote_group_is_used_as_a_last_resort() {
        let sim = SimHost::new();
        let remote = RoomName::new("E2S1").unwrap();
        let target = RoomName::new("E1S1").unwrap();
        sim.add_owned_room(remote, 3, 800);
        sim.add_room(target, RoomTerrain::plains(), false);

        // Spawning from before the first sample, so the group has never been seen idle.
        let spawn = sim.add_structure(Position::new(25, 25, remote), StructureKind::Spawn, true);
        sim.clone().spawn_creep(&spawn, &[Part::Move; 10], "busy").unwrap();

        let mut fixture = Fixture::new(&sim);
        fixture.refresh();

        assert_eq!(fixture.spawn_groups.get(remote).map(|g| g.average_availability()), Some(0.0));

        let mut data = fixture.data();

        assert_eq!(find_remote_spawn(&mut data, "alpha", Position::new(25, 25, target), 1, 8), Some(remote));
    }

    #[test]
    fn recheck_is_skipped_while_over_budget() {
        let sim = SimHost::new();
        let near = colony(&sim, "E2S1", (25, 25), 3);
        let target = RoomName::new("E1S1").unwrap();
        sim.add_room(target, RoomTerrain::plains(), false);

        let mut fixture = Fixture::new(&sim);
        fixture.next_tick();

        fixture.memory.cpu.average = 1000.0;
        fixture.memory.operation_mut("alpha").spawn_data = Some(SpawnData {
            spawn_rooms: Vec::new(),
            next_spawn_check: 0,
        });

        let mut data = fixture.data();

        assert_eq!(find_remote_spawn(&mut data, "alpha", Position::new(25, 25, target), 1, 8), None);

        data.memory.cpu.average = 0.0;

        assert_eq!(find_remote_spawn(&mut data, "alpha", Position::new(25, 25, target), 1, 8), Some(near));
    }
}
