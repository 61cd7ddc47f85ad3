//! In-memory world used to drive the bot offline. Cloning a `SimHost` shares the state, so a
//! test can hand one clone to the scheduler and inspect the world through another.

use super::host::*;
use super::position::*;
use super::snapshot::*;
use super::terrain::*;
use crate::constants::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct SimRoom {
    pub snapshot: RoomSnapshot,
    pub terrain: RoomTerrain,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRecord {
    pub tick: u32,
    pub spawn: ObjectId,
    pub name: String,
    pub body: Vec<Part>,
}

struct SimCreep {
    snapshot: CreepSnapshot,
    spawn_complete: u32,
}

pub struct SimState {
    pub time: u32,
    pub cpu_used: f64,
    pub cpu_limit: f64,
    pub cpu_bucket: f64,
    pub gcl: u32,
    pub rooms: BTreeMap<RoomName, SimRoom>,
    pub flags: Vec<FlagSnapshot>,
    pub memory: String,
    pub segments: BTreeMap<u8, String>,
    pub spawn_log: Vec<SpawnRecord>,
    pub intent_log: Vec<(u32, String, CreepIntent)>,
    pub notifications: Vec<String>,
    pub spawn_time_per_part: u32,
    pub refill_energy: bool,
    creeps: BTreeMap<String, SimCreep>,
    pending_moves: BTreeMap<String, Direction>,
    busy_spawns: BTreeMap<ObjectId, u32>,
    requested_segments: Vec<u8>,
    active_segments: Vec<u8>,
    next_id: u32,
}

impl SimState {
    fn new() -> SimState {
        SimState {
            time: 1,
            cpu_used: 0.0,
            cpu_limit: 20.0,
            cpu_bucket: 10_000.0,
            gcl: 1,
            rooms: BTreeMap::new(),
            flags: Vec::new(),
            memory: String::new(),
            segments: BTreeMap::new(),
            spawn_log: Vec::new(),
            intent_log: Vec::new(),
            notifications: Vec::new(),
            spawn_time_per_part: CREEP_SPAWN_TIME,
            refill_energy: true,
            creeps: BTreeMap::new(),
            pending_moves: BTreeMap::new(),
            busy_spawns: BTreeMap::new(),
            requested_segments: Vec::new(),
            active_segments: Vec::new(),
            next_id: 0,
        }
    }

    fn allocate_id(&mut self, prefix: &str) -> ObjectId {
        self.next_id += 1;

        ObjectId::new(&format!("{}{}", prefix, self.next_id))
    }

    fn is_visible(&self, name: RoomName) -> bool {
        match self.rooms.get(&name) {
            Some(room) => room.visible || room.snapshot.is_mine() || self.creeps.values().any(|c| c.snapshot.my && c.snapshot.pos.room == name),
            None => false,
        }
    }

    fn is_passable(&self, pos: &Position) -> bool {
        let room = match self.rooms.get(&pos.room) {
            Some(room) => room,
            None => return false,
        };

        if room.terrain.is_wall(pos.x, pos.y) {
            return false;
        }

        let blocked_by_structure = room
            .snapshot
            .structures
            .iter()
            .any(|s| s.pos == *pos && (!s.kind.is_walkable() || (s.kind == StructureKind::Rampart && !s.my && !s.is_public)));

        !blocked_by_structure && !self.creeps.values().any(|c| c.snapshot.pos == *pos)
    }

    fn find_structure_mut(&mut self, id: &ObjectId) -> Option<&mut StructureSnapshot> {
        self.rooms
            .values_mut()
            .flat_map(|r| r.snapshot.structures.iter_mut())
            .find(|s| s.id == *id)
    }

    fn find_structure(&self, id: &ObjectId) -> Option<&StructureSnapshot> {
        self.rooms.values().flat_map(|r| r.snapshot.structures.iter()).find(|s| s.id == *id)
    }

    fn own_creep(&self, name: &str) -> Result<&CreepSnapshot, ActionError> {
        let creep = self.creeps.get(name).map(|c| &c.snapshot).ok_or(ActionError::NotFound)?;

        if !creep.my {
            return Err(ActionError::NotOwner);
        }

        Ok(creep)
    }

    fn apply_intent(&mut self, name: &str, intent: &CreepIntent) -> ActionResult {
        let creep = self.own_creep(name)?.clone();

        if creep.spawning {
            return Err(ActionError::Busy);
        }

        match intent {
            CreepIntent::Move(direction) => {
                if creep.fatigue > 0 {
                    return Err(ActionError::Tired);
                }

                self.pending_moves.insert(name.to_owned(), *direction);
            }
            CreepIntent::Harvest(id) => {
                let work = creep.get_active_parts(Part::Work);

                if work == 0 {
                    return Err(ActionError::NoBodypart);
                }

                let source = self
                    .rooms
                    .get_mut(&creep.pos.room)
                    .and_then(|r| r.snapshot.sources.iter_mut().find(|s| s.id == *id))
                    .ok_or(ActionError::InvalidTarget)?;

                if !creep.pos.is_near_to(&source.pos) {
                    return Err(ActionError::NotInRange);
                }

                let mined = (work * 2).min(source.energy);

                if mined == 0 {
                    return Err(ActionError::NotEnough);
                }

                source.energy -= mined;

                self.with_creep(name, |c| {
                    c.store.add(ENERGY, mined);
                });
            }
            CreepIntent::Withdraw(id, resource) => {
                let structure = self.find_structure_mut(id).ok_or(ActionError::InvalidTarget)?;

                if !creep.pos.is_near_to(&structure.pos) {
                    return Err(ActionError::NotInRange);
                }

                let taken = structure.store.remove(resource, creep.store.free());

                if taken == 0 {
                    return Err(ActionError::NotEnough);
                }

                let resource = resource.clone();

                self.with_creep(name, |c| {
                    c.store.add(&resource, taken);
                });
            }
            CreepIntent::Transfer(id, resource) => {
                let amount = creep.store.amount(resource);

                if amount == 0 {
                    return Err(ActionError::NotEnough);
                }

                let structure = self.find_structure_mut(id).ok_or(ActionError::InvalidTarget)?;

                if !creep.pos.is_near_to(&structure.pos) {
                    return Err(ActionError::NotInRange);
                }

                let accepted = structure.store.add(resource, amount);

                if accepted == 0 {
                    return Err(ActionError::Full);
                }

                let resource = resource.clone();

                self.with_creep(name, |c| {
                    c.store.remove(&resource, accepted);
                });
            }
            CreepIntent::Pickup(id) => {
                let room = self.rooms.get_mut(&creep.pos.room).ok_or(ActionError::InvalidTarget)?;
                let index = room.snapshot.dropped.iter().position(|d| d.id == *id).ok_or(ActionError::InvalidTarget)?;

                if !creep.pos.is_near_to(&room.snapshot.dropped[index].pos) {
                    return Err(ActionError::NotInRange);
                }

                let resource = room.snapshot.dropped[index].resource.clone();
                let taken = room.snapshot.dropped[index].amount.min(creep.store.free());

                room.snapshot.dropped[index].amount -= taken;

                if room.snapshot.dropped[index].amount == 0 {
                    room.snapshot.dropped.remove(index);
                }

                self.with_creep(name, |c| {
                    c.store.add(&resource, taken);
                });
            }
            CreepIntent::Repair(id) => {
                let work = creep.get_active_parts(Part::Work);

                if creep.store.energy() == 0 {
                    return Err(ActionError::NotEnough);
                }

                let structure = self.find_structure_mut(id).ok_or(ActionError::InvalidTarget)?;

                if !creep.pos.in_range_to(&structure.pos, 3) {
                    return Err(ActionError::NotInRange);
                }

                structure.hits = (structure.hits + work * 100).min(structure.hits_max);

                self.with_creep(name, |c| {
                    c.store.remove(ENERGY, work);
                });
            }
            CreepIntent::Suicide => {
                self.creeps.remove(name);
            }
            CreepIntent::Build(_)
            | CreepIntent::Heal(_)
            | CreepIntent::RangedHeal(_)
            | CreepIntent::Say(_)
            | CreepIntent::NotifyWhenAttacked(_) => {}
        }

        Ok(())
    }

    fn with_creep(&mut self, name: &str, f: impl FnOnce(&mut CreepSnapshot)) {
        if let Some(creep) = self.creeps.get_mut(name) {
            f(&mut creep.snapshot);
        }
    }

    fn advance(&mut self) {
        self.time += 1;

        let moves = std::mem::take(&mut self.pending_moves);

        for (name, direction) in moves {
            let target = match self.creeps.get(&name) {
                Some(creep) if !creep.snapshot.spawning => creep.snapshot.pos.position_at_direction(direction),
                _ => continue,
            };

            if self.is_passable(&target) {
                self.with_creep(&name, |c| c.pos = target);
            }
        }

        let time = self.time;

        for creep in self.creeps.values_mut() {
            if creep.snapshot.spawning {
                if creep.spawn_complete <= time {
                    creep.snapshot.spawning = false;
                    creep.snapshot.ticks_to_live = Some(CREEP_LIFE_TIME);
                }
            } else if let Some(ttl) = creep.snapshot.ticks_to_live.as_mut() {
                *ttl = ttl.saturating_sub(1);
            }
        }

        self.creeps.retain(|_, c| c.snapshot.ticks_to_live != Some(0));

        self.busy_spawns.retain(|_, until| *until > time);

        if self.refill_energy {
            for room in self.rooms.values_mut() {
                room.snapshot.energy_available = room.snapshot.energy_capacity_available;
            }
        }

        self.active_segments = std::mem::take(&mut self.requested_segments);
    }
}

#[derive(Clone)]
pub struct SimHost {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimHost {
    fn default() -> Self {
        SimHost::new()
    }
}

impl SimHost {
    pub fn new() -> SimHost {
        SimHost {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state())
    }

    pub fn add_room(&self, name: RoomName, terrain: RoomTerrain, visible: bool) {
        self.state().rooms.insert(
            name,
            SimRoom {
                snapshot: RoomSnapshot::new(name),
                terrain,
                visible,
            },
        );
    }

    /// Owned room with a controller at the given level and energy available for spawning.
    pub fn add_owned_room(&self, name: RoomName, level: u32, energy: u32) {
        let mut state = self.state();
        let id = state.allocate_id("controller");

        let mut snapshot = RoomSnapshot::new(name);
        snapshot.controller = Some(ControllerSnapshot {
            id,
            pos: Position::new(25, 40, name),
            level,
            my: true,
            owner: Some(SIM_USERNAME.to_owned()),
            reservation: None,
        });
        snapshot.energy_available = energy;
        snapshot.energy_capacity_available = energy;

        state.rooms.insert(
            name,
            SimRoom {
                snapshot,
                terrain: RoomTerrain::plains(),
                visible: true,
            },
        );
    }

    pub fn add_structure(&self, pos: Position, kind: StructureKind, my: bool) -> ObjectId {
        let mut state = self.state();
        let id = state.allocate_id(&format!("{:?}", kind).to_lowercase());

        let hits_max = match kind {
            StructureKind::Road => 5000,
            StructureKind::Container => 250_000,
            _ => 1000,
        };

        let structure = StructureSnapshot {
            id: id.clone(),
            kind,
            pos,
            hits: hits_max,
            hits_max,
            my,
            owner: if my { Some(SIM_USERNAME.to_owned()) } else { None },
            is_public: false,
            store: Store::with_capacity(if kind == StructureKind::Container { 2000 } else { 300 }),
        };

        if let Some(room) = state.rooms.get_mut(&pos.room) {
            room.snapshot.structures.push(structure);
        }

        id
    }

    pub fn add_source(&self, pos: Position) -> ObjectId {
        let mut state = self.state();
        let id = state.allocate_id("source");

        if let Some(room) = state.rooms.get_mut(&pos.room) {
            room.snapshot.sources.push(SourceSnapshot {
                id: id.clone(),
                pos,
                energy: 3000,
                energy_capacity: 3000,
            });
        }

        id
    }

    pub fn add_creep(&self, name: &str, pos: Position, body: &[Part], my: bool) {
        let mut state = self.state();
        let id = state.allocate_id("creep");

        let carry = body.iter().filter(|p| **p == Part::Carry).count() as u32 * 50;

        let snapshot = CreepSnapshot {
            id,
            name: name.to_owned(),
            pos,
            my,
            owner: if my { SIM_USERNAME.to_owned() } else { "Invader".to_owned() },
            body: body.iter().map(|p| BodyPart::new(*p)).collect(),
            fatigue: 0,
            ticks_to_live: Some(CREEP_LIFE_TIME),
            spawning: false,
            hits: body.len() as u32 * 100,
            hits_max: body.len() as u32 * 100,
            store: Store::with_capacity(carry),
        };

        state.creeps.insert(name.to_owned(), SimCreep { snapshot, spawn_complete: 0 });
    }

    pub fn update_creep(&self, name: &str, f: impl FnOnce(&mut CreepSnapshot)) {
        self.state().with_creep(name, f);
    }

    pub fn remove_creep(&self, name: &str) {
        self.state().creeps.remove(name);
    }

    pub fn add_flag(&self, name: &str, pos: Position) {
        self.state().flags.push(FlagSnapshot { name: name.to_owned(), pos });
    }

    pub fn advance(&self) {
        self.state().advance();
    }

    pub fn spawn_log(&self) -> Vec<SpawnRecord> {
        self.state().spawn_log.clone()
    }

    pub fn live_creeps(&self) -> Vec<String> {
        self.state().creeps.iter().filter(|(_, c)| c.snapshot.my).map(|(n, _)| n.clone()).collect()
    }
}

pub const SIM_USERNAME: &str = "bonzai";

impl GameHost for SimHost {
    fn time(&self) -> u32 {
        self.state().time
    }

    fn cpu_used(&self) -> f64 {
        self.state().cpu_used
    }

    fn cpu_limit(&self) -> f64 {
        self.state().cpu_limit
    }

    fn cpu_bucket(&self) -> f64 {
        self.state().cpu_bucket
    }

    fn gcl_level(&self) -> u32 {
        self.state().gcl
    }

    fn visible_rooms(&self) -> Vec<RoomName> {
        let state = self.state();

        state.rooms.keys().copied().filter(|name| state.is_visible(*name)).collect()
    }

    fn room(&self, name: RoomName) -> Option<RoomSnapshot> {
        let state = self.state();

        if !state.is_visible(name) {
            return None;
        }

        let room = state.rooms.get(&name)?;
        let mut snapshot = room.snapshot.clone();

        snapshot.creeps = state
            .creeps
            .values()
            .filter(|c| c.snapshot.pos.room == name)
            .map(|c| c.snapshot.clone())
            .collect();

        Some(snapshot)
    }

    fn terrain(&self, name: RoomName) -> Option<RoomTerrain> {
        self.state().rooms.get(&name).map(|r| r.terrain.clone())
    }

    fn room_exists(&self, name: RoomName) -> bool {
        self.state().rooms.contains_key(&name)
    }

    fn creep_names(&self) -> Vec<String> {
        self.live_creeps()
    }

    fn creep(&self, name: &str) -> Option<CreepSnapshot> {
        self.state().creeps.get(name).filter(|c| c.snapshot.my).map(|c| c.snapshot.clone())
    }

    fn flags(&self) -> Vec<FlagSnapshot> {
        self.state().flags.clone()
    }

    fn construction_site_count(&self) -> u32 {
        self.state().rooms.values().map(|r| r.snapshot.construction_sites.iter().filter(|s| s.my).count() as u32).sum()
    }

    fn spawn_busy(&self, spawn: &ObjectId) -> bool {
        self.state().busy_spawns.contains_key(spawn)
    }

    fn creep_intent(&mut self, creep: &str, intent: CreepIntent) -> ActionResult {
        let mut state = self.state();

        let result = state.apply_intent(creep, &intent);

        if result.is_ok() {
            let time = state.time;

            state.intent_log.push((time, creep.to_owned(), intent));
        }

        result
    }

    fn spawn_creep(&mut self, spawn: &ObjectId, body: &[Part], name: &str) -> ActionResult {
        let mut state = self.state();

        if body.is_empty() {
            return Err(ActionError::InvalidArgs);
        }

        let spawn_structure = state.find_structure(spawn).ok_or(ActionError::InvalidTarget)?.clone();

        if spawn_structure.kind != StructureKind::Spawn || !spawn_structure.my {
            return Err(ActionError::NotOwner);
        }

        if state.busy_spawns.contains_key(spawn) {
            return Err(ActionError::Busy);
        }

        if state.creeps.contains_key(name) {
            return Err(ActionError::NameExists);
        }

        let cost = body_cost(body);
        let room_name = spawn_structure.pos.room;

        {
            let room = state.rooms.get_mut(&room_name).ok_or(ActionError::InvalidTarget)?;

            if room.snapshot.energy_available < cost {
                return Err(ActionError::NotEnough);
            }

            room.snapshot.energy_available -= cost;
        }

        let time = state.time;
        let duration = body.len() as u32 * state.spawn_time_per_part;
        let id = state.allocate_id("creep");
        let carry = body.iter().filter(|p| **p == Part::Carry).count() as u32 * 50;

        let snapshot = CreepSnapshot {
            id,
            name: name.to_owned(),
            pos: spawn_structure.pos,
            my: true,
            owner: SIM_USERNAME.to_owned(),
            body: body.iter().map(|p| BodyPart::new(*p)).collect(),
            fatigue: 0,
            ticks_to_live: None,
            spawning: true,
            hits: body.len() as u32 * 100,
            hits_max: body.len() as u32 * 100,
            store: Store::with_capacity(carry),
        };

        state.creeps.insert(
            name.to_owned(),
            SimCreep {
                snapshot,
                spawn_complete: time + duration,
            },
        );

        state.busy_spawns.insert(spawn.clone(), time + duration.max(1));

        state.spawn_log.push(SpawnRecord {
            tick: time,
            spawn: spawn.clone(),
            name: name.to_owned(),
            body: body.to_vec(),
        });

        Ok(())
    }

    fn recycle_creep(&mut self, spawn: &ObjectId, creep: &str) -> ActionResult {
        let mut state = self.state();

        let spawn_pos = state.find_structure(spawn).map(|s| s.pos).ok_or(ActionError::InvalidTarget)?;
        let creep_pos = state.own_creep(creep)?.pos;

        if !creep_pos.is_near_to(&spawn_pos) {
            return Err(ActionError::NotInRange);
        }

        state.creeps.remove(creep);

        Ok(())
    }

    fn boost_creep(&mut self, lab: &ObjectId, creep: &str) -> ActionResult {
        let mut state = self.state();

        let lab = state.find_structure(lab).cloned().ok_or(ActionError::InvalidTarget)?;
        let creep_pos = state.own_creep(creep)?.pos;

        if !creep_pos.is_near_to(&lab.pos) {
            return Err(ActionError::NotInRange);
        }

        let compound = lab
            .store
            .resources
            .keys()
            .find(|r| r.as_str() != ENERGY)
            .cloned()
            .ok_or(ActionError::NotEnough)?;

        state.with_creep(creep, |c| {
            for part in c.body.iter_mut().filter(|p| p.boost.is_none()) {
                part.boost = Some(compound.clone());
            }
        });

        Ok(())
    }

    fn tower_heal(&mut self, tower: &ObjectId, creep: &str) -> ActionResult {
        let mut state = self.state();

        let tower = state.find_structure(tower).cloned().ok_or(ActionError::InvalidTarget)?;

        if tower.kind != StructureKind::Tower {
            return Err(ActionError::InvalidTarget);
        }

        state.with_creep(creep, |c| c.hits = (c.hits + 400).min(c.hits_max));

        Ok(())
    }

    fn create_construction_site(&mut self, pos: Position, kind: StructureKind) -> ActionResult {
        let mut state = self.state();
        let id = state.allocate_id("site");

        let room = state.rooms.get_mut(&pos.room).ok_or(ActionError::InvalidTarget)?;

        if room.terrain.is_wall(pos.x, pos.y) || room.snapshot.construction_site_at(&pos).is_some() {
            return Err(ActionError::InvalidTarget);
        }

        room.snapshot.construction_sites.push(ConstructionSiteSnapshot { id, kind, pos, my: true });

        Ok(())
    }

    fn raw_memory(&self) -> String {
        self.state().memory.clone()
    }

    fn set_raw_memory(&mut self, data: String) {
        self.state().memory = data;
    }

    fn active_segments(&self) -> Vec<u8> {
        self.state().active_segments.clone()
    }

    fn segment(&self, id: u8) -> Option<String> {
        let state = self.state();

        if state.active_segments.contains(&id) {
            Some(state.segments.get(&id).cloned().unwrap_or_default())
        } else {
            None
        }
    }

    fn set_segment(&mut self, id: u8, data: String) {
        self.state().segments.insert(id, data);
    }

    fn set_active_segments(&mut self, ids: &[u8]) {
        let unique: HashSet<u8> = ids.iter().copied().collect();

        self.state().requested_segments = unique.into_iter().collect();
    }

    fn notify(&mut self, message: &str) {
        self.state().notifications.push(message.to_owned());
    }
}
