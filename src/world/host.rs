use super::position::*;
use super::snapshot::*;
use super::terrain::*;
use std::fmt;

/// Failure codes returned by world actions. None of these are exceptional; callers retry
/// next tick or degrade.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActionError {
    NotOwner,
    NoPath,
    NameExists,
    Busy,
    NotFound,
    NotEnough,
    InvalidTarget,
    Full,
    NotInRange,
    InvalidArgs,
    Tired,
    NoBodypart,
    RclNotEnough,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionError::NotOwner => "not owner",
            ActionError::NoPath => "no path",
            ActionError::NameExists => "name exists",
            ActionError::Busy => "busy",
            ActionError::NotFound => "not found",
            ActionError::NotEnough => "not enough resources",
            ActionError::InvalidTarget => "invalid target",
            ActionError::Full => "full",
            ActionError::NotInRange => "not in range",
            ActionError::InvalidArgs => "invalid arguments",
            ActionError::Tired => "tired",
            ActionError::NoBodypart => "no bodypart",
            ActionError::RclNotEnough => "controller level too low",
        };

        f.write_str(text)
    }
}

pub type ActionResult = Result<(), ActionError>;

/// A single-step creep command. The host accepts at most one command per kind per creep per
/// tick; the last accepted one wins.
#[derive(Clone, Debug, PartialEq)]
pub enum CreepIntent {
    Move(Direction),
    Harvest(ObjectId),
    Withdraw(ObjectId, String),
    Transfer(ObjectId, String),
    Pickup(ObjectId),
    Build(ObjectId),
    Repair(ObjectId),
    Heal(String),
    RangedHeal(String),
    Say(String),
    Suicide,
    NotifyWhenAttacked(bool),
}

/// The world as seen from the bot. Snapshots are owned copies valid for the current tick.
pub trait GameHost: Send + Sync {
    fn time(&self) -> u32;

    fn cpu_used(&self) -> f64;

    fn cpu_limit(&self) -> f64;

    fn cpu_bucket(&self) -> f64;

    fn gcl_level(&self) -> u32;

    fn visible_rooms(&self) -> Vec<RoomName>;

    /// `None` when there is no vision into the room this tick.
    fn room(&self, name: RoomName) -> Option<RoomSnapshot>;

    /// `None` when the room does not exist.
    fn terrain(&self, name: RoomName) -> Option<RoomTerrain>;

    fn room_exists(&self, name: RoomName) -> bool {
        self.terrain(name).is_some()
    }

    fn creep_names(&self) -> Vec<String>;

    fn creep(&self, name: &str) -> Option<CreepSnapshot>;

    fn flags(&self) -> Vec<FlagSnapshot>;

    fn construction_site_count(&self) -> u32;

    /// Whether a spawn is busy producing a creep.
    fn spawn_busy(&self, spawn: &ObjectId) -> bool;

    fn creep_intent(&mut self, creep: &str, intent: CreepIntent) -> ActionResult;

    fn spawn_creep(&mut self, spawn: &ObjectId, body: &[Part], name: &str) -> ActionResult;

    fn recycle_creep(&mut self, spawn: &ObjectId, creep: &str) -> ActionResult;

    fn boost_creep(&mut self, lab: &ObjectId, creep: &str) -> ActionResult;

    fn tower_heal(&mut self, tower: &ObjectId, creep: &str) -> ActionResult;

    fn create_construction_site(&mut self, pos: Position, kind: StructureKind) -> ActionResult;

    fn raw_memory(&self) -> String;

    fn set_raw_memory(&mut self, data: String);

    fn active_segments(&self) -> Vec<u8>;

    fn segment(&self, id: u8) -> Option<String>;

    fn set_segment(&mut self, id: u8, data: String);

    fn set_active_segments(&mut self, ids: &[u8]);

    fn notify(&mut self, _message: &str) {}
}

/// World resource owning the host for the duration of the environment.
pub struct Host(Box<dyn GameHost>);

impl Host {
    pub fn new<H: GameHost + 'static>(host: H) -> Host {
        Host(Box::new(host))
    }

    pub fn get(&self) -> &dyn GameHost {
        self.0.as_ref()
    }

    pub fn get_mut(&mut self) -> &mut dyn GameHost {
        self.0.as_mut()
    }
}
