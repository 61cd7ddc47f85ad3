use crate::creep::data::*;
use crate::memory_helper::*;
use crate::missions::data::*;
use crate::notifier::*;
use crate::operations::data::*;
use crate::statssystem::*;
use crate::timeout::*;
use crate::world::*;
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use specs::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const MEMORY_SEGMENT_SIZE_LIMIT: usize = 100 * 1024;

/// Memory structs carrying an explicit layout version. Defaults are filled when a namespace is
/// created; an entry written by an older layout is migrated when it is loaded.
pub trait VersionedMemory: Default {
    const VERSION: u32;

    fn version(&self) -> u32;

    fn set_version(&mut self, version: u32);

    /// Reset anything derived from the older layout.
    fn migrate(&mut self, from: u32);

    fn fresh() -> Self {
        let mut memory = Self::default();

        memory.set_version(Self::VERSION);

        memory
    }

    fn upgrade(&mut self) {
        let version = self.version();

        if version < Self::VERSION {
            self.migrate(version);
            self.set_version(Self::VERSION);
        }
    }
}

/// Segment access for the tick. Segment contents are read once when the tick starts, writes are
/// buffered and handed to the host together with the next set of requested segments.
#[derive(Default)]
pub struct MemoryArbiter {
    active: HashMap<u8, String>,
    requests: HashSet<u8>,
    writes: BTreeMap<u8, String>,
}

impl MemoryArbiter {
    pub fn new() -> MemoryArbiter {
        MemoryArbiter::default()
    }

    pub fn load(&mut self, host: &dyn GameHost) {
        self.active = host
            .active_segments()
            .into_iter()
            .filter_map(|segment| host.segment(segment).map(|data| (segment, data)))
            .collect();
    }

    pub fn request(&mut self, segment: u8) {
        self.requests.insert(segment);
    }

    pub fn is_active(&self, segment: u8) -> bool {
        self.active.contains_key(&segment)
    }

    pub fn get(&self, segment: u8) -> Option<&str> {
        self.writes
            .get(&segment)
            .or_else(|| self.active.get(&segment))
            .map(|data| data.as_str())
    }

    pub fn set(&mut self, segment: u8, data: String) {
        if data.len() > MEMORY_SEGMENT_SIZE_LIMIT {
            error!("Memory segment too large - Segment: {} - Length: {}", segment, data.len());

            return;
        }

        self.writes.insert(segment, data);
    }

    pub fn flush(&mut self, host: &mut dyn GameHost) {
        for (segment, data) in std::mem::take(&mut self.writes) {
            host.set_segment(segment, data);
        }

        let segments: Vec<_> = self.requests.iter().cloned().collect();

        host.set_active_segments(&segments);

        self.clear();
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.active.clear();
    }
}

#[derive(SystemData)]
pub struct MemoryArbiterSystemData<'a> {
    host: WriteExpect<'a, Host>,
    memory_arbiter: WriteExpect<'a, MemoryArbiter>,
}

pub struct MemoryArbiterSystem;

impl<'a> System<'a> for MemoryArbiterSystem {
    type SystemData = MemoryArbiterSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        data.memory_arbiter.flush(data.host.get_mut());
    }
}

/// The durable memory document. Every section is parsed on its own so that a section broken by
/// hand does not take the rest of memory down with it. Keys the bot does not know are kept.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootMemory {
    pub creeps: BTreeMap<String, AgentMemory>,
    pub operations: BTreeMap<String, OperationMemory>,
    pub rooms: BTreeMap<RoomName, RoomMemory>,
    pub hostile_memory: BTreeMap<String, Value>,
    pub cpu: CpuMemory,
    pub notifier: Notifier,
    #[serde(rename = "nextGC", skip_serializing_if = "Option::is_none")]
    pub next_gc: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_tracker: Option<TimeoutRecord>,
    #[serde(rename = "_features")]
    pub features: Value,
    pub player_config: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RootMemory {
    pub fn load(raw: &str) -> RootMemory {
        let mut root = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(root)) => root,
            Ok(_) => Map::new(),
            Err(err) => {
                if !raw.trim().is_empty() {
                    error!("Memory is not valid JSON, starting from empty memory: {}", err);
                }

                Map::new()
            }
        };

        let creeps = parse_entries(&mut root, "creeps", |name| Some(name.to_owned()), parse_versioned::<AgentMemory>);
        let operations = parse_entries(&mut root, "operations", |name| Some(name.to_owned()), parse_operation);
        let rooms = parse_entries(&mut root, "rooms", |name| RoomName::new(name).ok(), parse_value::<RoomMemory>);
        let hostile_memory = parse_entries(&mut root, "hostileMemory", |name| Some(name.to_owned()), Ok);

        let mut memory = RootMemory {
            creeps,
            operations,
            rooms,
            hostile_memory,
            cpu: parse_section(&mut root, "cpu"),
            notifier: parse_section(&mut root, "notifier"),
            next_gc: parse_section(&mut root, "nextGC"),
            timeout_tracker: parse_section(&mut root, "timeoutTracker"),
            features: root.remove("_features").unwrap_or(Value::Null),
            player_config: root.remove("playerConfig").unwrap_or(Value::Null),
            extra: root,
        };

        memory.prepare();

        memory
    }

    fn prepare(&mut self) {
        crate::features::prepare(&mut self.features);

        if !self.player_config.is_object() {
            self.player_config = json!({});
        }

        defaults_deep(&mut self.player_config, &json!({ "muteSpawn": false }));
    }

    pub fn to_raw(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| e.to_string())
    }

    /// Drop everything except the feature switches.
    pub fn reset(&mut self) {
        let features = std::mem::take(&mut self.features);

        *self = RootMemory {
            features,
            ..RootMemory::default()
        };

        self.prepare();
    }

    pub fn agent_mut(&mut self, name: &str) -> &mut AgentMemory {
        self.creeps.entry(name.to_owned()).or_insert_with(AgentMemory::fresh)
    }

    pub fn operation_mut(&mut self, name: &str) -> &mut OperationMemory {
        self.operations.entry(name.to_owned()).or_insert_with(OperationMemory::fresh)
    }
}

fn parse_section<T: DeserializeOwned + Default>(root: &mut Map<String, Value>, key: &str) -> T {
    match root.remove(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
            warn!("Memory section {} is malformed, resetting - Error: {}", key, err);

            T::default()
        }),
    }
}

fn parse_entries<K, T, KF, VF>(root: &mut Map<String, Value>, key: &str, key_parser: KF, value_parser: VF) -> BTreeMap<K, T>
where
    K: Ord,
    KF: Fn(&str) -> Option<K>,
    VF: Fn(Value) -> Result<T, String>,
{
    let entries = match root.remove(key) {
        Some(Value::Object(entries)) => entries,
        None | Some(Value::Null) => return BTreeMap::new(),
        Some(_) => {
            warn!("Memory section {} is not an object, resetting", key);

            return BTreeMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(name, value)| {
            let parsed_key = match key_parser(&name) {
                Some(parsed_key) => parsed_key,
                None => {
                    warn!("Dropping memory entry with invalid key - Section: {} - Key: {}", key, name);

                    return None;
                }
            };

            match value_parser(value) {
                Ok(parsed) => Some((parsed_key, parsed)),
                Err(err) => {
                    warn!("Dropping malformed memory entry - Section: {} - Key: {} - Error: {}", key, name, err);

                    None
                }
            }
        })
        .collect()
}

fn parse_value<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn parse_versioned<T: DeserializeOwned + VersionedMemory>(value: Value) -> Result<T, String> {
    let mut memory: T = parse_value(value)?;

    memory.upgrade();

    Ok(memory)
}

fn parse_operation(value: Value) -> Result<OperationMemory, String> {
    let mut value = match value {
        Value::Object(value) => value,
        _ => return Err("operation memory is not an object".to_owned()),
    };

    let missions = parse_entries(&mut value, "missions", |name| Some(name.to_owned()), parse_versioned::<MissionMemory>);

    let mut operation: OperationMemory = parse_versioned(Value::Object(value))?;

    operation.missions = missions;

    Ok(operation)
}
