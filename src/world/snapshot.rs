use super::position::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: &str) -> ObjectId {
        ObjectId(id.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        ObjectId::new(value)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Move,
    Work,
    Carry,
    Attack,
    RangedAttack,
    Heal,
    Claim,
    Tough,
}

impl Part {
    pub fn cost(self) -> u32 {
        match self {
            Part::Move => 50,
            Part::Work => 100,
            Part::Carry => 50,
            Part::Attack => 80,
            Part::RangedAttack => 150,
            Part::Heal => 250,
            Part::Claim => 600,
            Part::Tough => 10,
        }
    }
}

pub fn body_cost(body: &[Part]) -> u32 {
    body.iter().map(|p| p.cost()).sum()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    pub part: Part,
    pub hits: u32,
    pub boost: Option<String>,
}

impl BodyPart {
    pub fn new(part: Part) -> BodyPart {
        BodyPart { part, hits: 100, boost: None }
    }
}

pub const ENERGY: &str = "energy";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub resources: BTreeMap<String, u32>,
    pub capacity: u32,
}

impl Store {
    pub fn with_capacity(capacity: u32) -> Store {
        Store {
            resources: BTreeMap::new(),
            capacity,
        }
    }

    pub fn amount(&self, resource: &str) -> u32 {
        self.resources.get(resource).copied().unwrap_or(0)
    }

    pub fn energy(&self) -> u32 {
        self.amount(ENERGY)
    }

    pub fn used(&self) -> u32 {
        self.resources.values().sum()
    }

    pub fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.used())
    }

    pub fn add(&mut self, resource: &str, amount: u32) -> u32 {
        let accepted = amount.min(self.free());

        if accepted > 0 {
            *self.resources.entry(resource.to_owned()).or_insert(0) += accepted;
        }

        accepted
    }

    pub fn remove(&mut self, resource: &str, amount: u32) -> u32 {
        let entry = self.resources.entry(resource.to_owned()).or_insert(0);
        let removed = amount.min(*entry);

        *entry -= removed;

        if *entry == 0 {
            self.resources.remove(resource);
        }

        removed
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepSnapshot {
    pub id: ObjectId,
    pub name: String,
    pub pos: Position,
    pub my: bool,
    pub owner: String,
    pub body: Vec<BodyPart>,
    pub fatigue: u32,
    pub ticks_to_live: Option<u32>,
    pub spawning: bool,
    pub hits: u32,
    pub hits_max: u32,
    pub store: Store,
}

impl CreepSnapshot {
    pub fn get_active_parts(&self, part: Part) -> u32 {
        self.body.iter().filter(|p| p.part == part && p.hits > 0).count() as u32
    }

    pub fn part_count(&self, part: Part) -> u32 {
        self.body.iter().filter(|p| p.part == part).count() as u32
    }

    pub fn is_hurt(&self) -> bool {
        self.hits < self.hits_max
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Spawn,
    Extension,
    Road,
    Container,
    Rampart,
    Wall,
    Tower,
    Storage,
    Terminal,
    Link,
    Lab,
    Controller,
    KeeperLair,
    Observer,
    Extractor,
}

impl StructureKind {
    pub fn is_walkable(self) -> bool {
        matches!(self, StructureKind::Road | StructureKind::Container | StructureKind::Rampart)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub id: ObjectId,
    pub kind: StructureKind,
    pub pos: Position,
    pub hits: u32,
    pub hits_max: u32,
    pub my: bool,
    pub owner: Option<String>,
    pub is_public: bool,
    pub store: Store,
}

impl StructureSnapshot {
    pub fn needs_repair(&self) -> bool {
        self.hits < self.hits_max
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstructionSiteSnapshot {
    pub id: ObjectId,
    pub kind: StructureKind,
    pub pos: Position,
    pub my: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub id: ObjectId,
    pub pos: Position,
    pub energy: u32,
    pub energy_capacity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub id: ObjectId,
    pub pos: Position,
    pub level: u32,
    pub my: bool,
    pub owner: Option<String>,
    pub reservation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroppedResource {
    pub id: ObjectId,
    pub pos: Position,
    pub resource: String,
    pub amount: u32,
}

/// Everything visible in one room this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub name: RoomName,
    pub controller: Option<ControllerSnapshot>,
    pub structures: Vec<StructureSnapshot>,
    pub construction_sites: Vec<ConstructionSiteSnapshot>,
    pub sources: Vec<SourceSnapshot>,
    pub dropped: Vec<DroppedResource>,
    pub creeps: Vec<CreepSnapshot>,
    pub energy_available: u32,
    pub energy_capacity_available: u32,
}

impl RoomSnapshot {
    pub fn new(name: RoomName) -> RoomSnapshot {
        RoomSnapshot {
            name,
            controller: None,
            structures: Vec::new(),
            construction_sites: Vec::new(),
            sources: Vec::new(),
            dropped: Vec::new(),
            creeps: Vec::new(),
            energy_available: 0,
            energy_capacity_available: 0,
        }
    }

    pub fn structures_of(&self, kind: StructureKind) -> impl Iterator<Item = &StructureSnapshot> {
        self.structures.iter().filter(move |s| s.kind == kind)
    }

    pub fn structure_at(&self, pos: &Position, kind: StructureKind) -> Option<&StructureSnapshot> {
        self.structures.iter().find(|s| s.kind == kind && s.pos == *pos)
    }

    pub fn construction_site_at(&self, pos: &Position) -> Option<&ConstructionSiteSnapshot> {
        self.construction_sites.iter().find(|s| s.pos == *pos)
    }

    pub fn hostiles(&self) -> impl Iterator<Item = &CreepSnapshot> {
        self.creeps.iter().filter(|c| !c.my)
    }

    pub fn my_creeps(&self) -> impl Iterator<Item = &CreepSnapshot> {
        self.creeps.iter().filter(|c| c.my)
    }

    pub fn is_mine(&self) -> bool {
        self.controller.as_ref().map(|c| c.my).unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagSnapshot {
    pub name: String,
    pub pos: Position,
}
