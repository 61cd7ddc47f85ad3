use crate::cache::*;
use crate::constants::*;
use crate::memorysystem::*;
use crate::world::*;
use lerp::*;
use log::*;
use specs::prelude::*;
use std::collections::BTreeMap;

/// Limits that keep part of a spawn group free for other work.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SpawnReservation {
    /// Minimum number of idle spawns before this request may use one.
    pub spawns: usize,
    /// Minimum spawn energy before this request may use it.
    pub energy: u32,
}

/// The spawns of one owned room, as available this tick.
#[derive(Clone, Debug)]
pub struct SpawnGroup {
    pub room: RoomName,
    pub pos: Position,
    pub level: u32,
    spawns: Vec<ObjectId>,
    idle: Vec<ObjectId>,
    current_spawn_energy: u32,
    max_spawn_energy: u32,
    average_availability: f64,
}

impl SpawnGroup {
    /// Group for a visible owned room with at least one spawn.
    pub fn from_room(host: &dyn GameHost, room: &RoomSnapshot, memory: &mut SpawnGroupMemory, time: u32) -> Option<SpawnGroup> {
        if !room.is_mine() {
            return None;
        }

        let spawns: Vec<&StructureSnapshot> = room.structures_of(StructureKind::Spawn).filter(|s| s.my).collect();

        let pos = spawns.first()?.pos;

        let idle: Vec<ObjectId> = spawns.iter().filter(|s| !host.spawn_busy(&s.id)).map(|s| s.id.clone()).collect();

        if memory.last_sample != Some(time) {
            memory.average_availability = memory
                .average_availability
                .lerp_bounded(idle.len() as f64, 1.0 / SPAWN_AVAILABILITY_WINDOW);
            memory.last_sample = Some(time);
        }

        Some(SpawnGroup {
            room: room.name,
            pos,
            level: room.controller.as_ref().map(|c| c.level).unwrap_or(0),
            spawns: spawns.iter().map(|s| s.id.clone()).collect(),
            idle,
            current_spawn_energy: room.energy_available,
            max_spawn_energy: room.energy_capacity_available,
            average_availability: memory.average_availability,
        })
    }

    /// At least one spawn has not been used this tick.
    pub fn is_available(&self) -> bool {
        !self.idle.is_empty()
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn current_spawn_energy(&self) -> u32 {
        self.current_spawn_energy
    }

    pub fn max_spawn_energy(&self) -> u32 {
        self.max_spawn_energy
    }

    /// Rolling average of idle spawns.
    pub fn average_availability(&self) -> f64 {
        self.average_availability
    }

    pub fn primary_spawn(&self) -> Option<&ObjectId> {
        self.spawns.first()
    }

    /// Start a creep on the first idle spawn. `name` is asked for a new candidate every time the
    /// previous one is already taken.
    pub fn spawn<F>(&mut self, host: &mut dyn GameHost, body: &[Part], mut name: F, reservation: Option<SpawnReservation>) -> Result<String, ActionError>
    where
        F: FnMut(u32) -> String,
    {
        if let Some(reservation) = reservation {
            if self.idle.len() < reservation.spawns {
                return Err(ActionError::Busy);
            }

            if self.current_spawn_energy < reservation.energy {
                return Err(ActionError::NotEnough);
            }
        }

        let spawn = self.idle.first().cloned().ok_or(ActionError::Busy)?;

        let cost = body_cost(body);

        if cost > self.current_spawn_energy {
            return Err(ActionError::NotEnough);
        }

        const MAX_NAME_ATTEMPTS: u32 = 10;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = name(attempt);

            match host.spawn_creep(&spawn, body, &candidate) {
                Ok(()) => {
                    self.idle.retain(|id| *id != spawn);
                    self.current_spawn_energy -= cost;

                    debug!("Spawning - Room: {} - Name: {} - Parts: {}", self.room, candidate, body.len());

                    return Ok(candidate);
                }
                Err(ActionError::NameExists) => continue,
                Err(ActionError::Busy) => {
                    self.idle.retain(|id| *id != spawn);

                    return Err(ActionError::Busy);
                }
                Err(err) => return Err(err),
            }
        }

        Err(ActionError::NameExists)
    }

    pub fn recycle(&self, host: &mut dyn GameHost, creep: &str) -> ActionResult {
        let spawn = self.spawns.first().ok_or(ActionError::NotFound)?;

        host.recycle_creep(spawn, creep)
    }
}

/// Spawn groups of every owned room, rebuilt each tick.
#[derive(Default)]
pub struct SpawnGroups {
    groups: BTreeMap<RoomName, SpawnGroup>,
}

impl SpawnGroups {
    pub fn new() -> SpawnGroups {
        SpawnGroups::default()
    }

    pub fn rebuild(&mut self, host: &dyn GameHost, cache: &mut TickCache, rooms: &mut BTreeMap<RoomName, RoomMemory>) {
        let time = host.time();

        self.groups.clear();

        for room_name in host.visible_rooms() {
            let room = match cache.room(host, room_name) {
                Some(room) if room.is_mine() => room,
                _ => continue,
            };

            let room_memory = rooms.entry(room_name).or_default();
            let group_memory = room_memory.spawn_group.get_or_insert_with(SpawnGroupMemory::default);

            if let Some(group) = SpawnGroup::from_room(host, &room, group_memory, time) {
                self.groups.insert(room_name, group);
            }
        }
    }

    pub fn get(&self, room: RoomName) -> Option<&SpawnGroup> {
        self.groups.get(&room)
    }

    pub fn get_mut(&mut self, room: RoomName) -> Option<&mut SpawnGroup> {
        self.groups.get_mut(&room)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(SystemData)]
pub struct SpawnGroupSystemData<'a> {
    host: ReadExpect<'a, Host>,
    cache: WriteExpect<'a, TickCache>,
    spawn_groups: WriteExpect<'a, SpawnGroups>,
    memory: Write<'a, RootMemory>,
}

pub struct SpawnGroupSystem;

impl<'a> System<'a> for SpawnGroupSystem {
    type SystemData = SpawnGroupSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let host = data.host.get();

        data.spawn_groups.rebuild(host, &mut data.cache, &mut data.memory.rooms);
    }
}
