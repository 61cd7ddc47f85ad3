use super::costmatrix::*;
use super::costmatrixsystem::*;
use super::route::*;
use super::search::*;
use crate::cache::*;
use crate::constants::*;
use crate::world::*;
use log::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Per-agent travel state, stored in agent memory under `_trav`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelRecord {
    pub stuck: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub tick: u32,
    pub cpu: f64,
    pub count: u32,
}

impl TravelRecord {
    fn has_path(&self) -> bool {
        self.path.as_deref().map(|path| !path.is_empty()).unwrap_or(false)
    }
}

/// Adjusts the cost matrix of a room taking part in a search. Returning false keeps the search out
/// of the room.
pub type RoomCallback = Arc<dyn Fn(RoomName, Option<&RoomSnapshot>, &mut CostMatrix) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct TravelOptions {
    pub ignore_roads: bool,
    /// Creeps are ignored unless explicitly disabled or the agent is stuck.
    pub ignore_creeps: Option<bool>,
    pub ignore_stuck: bool,
    pub ignore_structures: bool,
    pub prefer_highway: bool,
    pub allow_hostile: bool,
    pub allow_sk: bool,
    pub range: Option<u32>,
    pub obstacles: Vec<Position>,
    pub restrict_distance: Option<u32>,
    /// `None` decides from the room distance, `Some(false)` never restricts the search to a route.
    pub use_find_route: Option<bool>,
    pub max_ops: Option<u32>,
    pub moving_target: bool,
    pub fresh_matrix: bool,
    pub off_road: bool,
    pub stuck_value: Option<u32>,
    pub room_callback: Option<RoomCallback>,
}

impl TravelOptions {
    pub fn range(range: u32) -> TravelOptions {
        TravelOptions {
            range: Some(range),
            ..TravelOptions::default()
        }
    }

    fn route_options(&self) -> RouteOptions {
        RouteOptions {
            prefer_highway: self.prefer_highway,
            allow_hostile: self.allow_hostile,
            allow_sk: self.allow_sk,
            restrict_distance: self.restrict_distance.unwrap_or(DEFAULT_RESTRICT_DISTANCE),
        }
    }
}

/// The parameters of the most recent path search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub origin: Position,
    pub destination: Position,
    pub ignore_creeps: bool,
    pub fresh_matrix: bool,
    pub use_find_route: bool,
}

/// One direction digit per step, each relative to the previous position.
pub fn serialize_path(start: Position, path: &[Position]) -> String {
    let mut serialized = String::with_capacity(path.len());
    let mut last = start;

    for pos in path {
        if let Some(direction) = last.direction_to(pos) {
            serialized.push(direction.to_digit());
        }

        last = *pos;
    }

    serialized
}

pub fn deserialize_path(start: Position, path: &str) -> Vec<Position> {
    path.chars()
        .filter_map(Direction::from_digit)
        .scan(start, |pos, direction| {
            *pos = pos.position_at_direction(direction);

            Some(*pos)
        })
        .collect()
}

#[derive(Default)]
pub struct Traveler {
    matrices: CostMatrixCache,
    routes: RouteCache,
    last_search: Option<SearchRequest>,
}

impl Traveler {
    pub fn new() -> Traveler {
        Traveler::default()
    }

    pub fn matrices(&mut self) -> &mut CostMatrixCache {
        &mut self.matrices
    }

    pub fn routes(&mut self) -> &mut RouteCache {
        &mut self.routes
    }

    pub fn last_search(&self) -> Option<&SearchRequest> {
        self.last_search.as_ref()
    }

    pub fn route_distance(&mut self, host: &dyn GameHost, rooms: &BTreeMap<RoomName, RoomMemory>, origin: RoomName, destination: RoomName) -> Option<u32> {
        self.routes.route_distance(host, rooms, origin, destination)
    }

    /// Move a creep one step towards a destination, reusing the cached path in the travel record
    /// while it stays valid.
    #[allow(clippy::too_many_arguments)]
    pub fn travel_to(
        &mut self,
        host: &mut dyn GameHost,
        cache: &mut TickCache,
        rooms: &BTreeMap<RoomName, RoomMemory>,
        creep: &CreepSnapshot,
        record: &mut Option<TravelRecord>,
        destination: Option<Position>,
        options: &TravelOptions,
    ) -> ActionResult {
        let time = host.time();

        let record = record.get_or_insert_with(|| TravelRecord {
            tick: time,
            ..TravelRecord::default()
        });

        if creep.fatigue > 0 {
            record.tick = time;

            return Err(ActionError::Busy);
        }

        let destination = destination.ok_or(ActionError::InvalidArgs)?;

        let range_to_destination = creep.pos.range_to(&destination);

        if options.range.map(|range| range_to_destination <= range).unwrap_or(false) {
            return Ok(());
        } else if range_to_destination <= 1 {
            if range_to_destination == 1 && options.range.unwrap_or(0) == 0 {
                let direction = creep.pos.direction_to(&destination).ok_or(ActionError::InvalidArgs)?;

                return host.creep_intent(&creep.name, CreepIntent::Move(direction));
            }

            return Ok(());
        }

        let mut has_moved = true;

        if let Some(prev) = record.prev {
            if creep.pos == prev {
                has_moved = false;
                record.stuck += 1;
            } else {
                record.stuck = 0;
            }
        }

        let stuck_value = options.stuck_value.unwrap_or(DEFAULT_STUCK_VALUE);

        let options = if record.stuck >= stuck_value && !options.ignore_stuck {
            record.path = None;

            Cow::Owned(TravelOptions {
                ignore_creeps: Some(false),
                fresh_matrix: true,
                ..options.clone()
            })
        } else {
            Cow::Borrowed(options)
        };

        if time.saturating_sub(record.tick) > 1 && has_moved {
            record.path = None;
        }

        record.tick = time;

        if record.dest != Some(destination) {
            match record.dest {
                Some(dest) if options.moving_target && dest.is_near_to(&destination) => {
                    if let (Some(path), Some(direction)) = (record.path.as_mut(), dest.direction_to(&destination)) {
                        path.push(direction.to_digit());
                    }

                    record.dest = Some(destination);
                }
                _ => record.path = None,
            }
        }

        if record.prev.is_some() && record.stuck == 0 {
            if let Some(path) = record.path.as_mut() {
                if !path.is_empty() {
                    path.remove(0);
                }
            }
        }

        if !record.has_path() {
            if creep.spawning {
                return Err(ActionError::Busy);
            }

            record.dest = Some(destination);
            record.prev = None;

            let cpu = host.cpu_used();

            let mut result = self.find_travel_path(&*host, cache, rooms, creep.pos, destination, &options);

            record.cpu += host.cpu_used() - cpu;
            record.count += 1;

            if record.cpu > REPORT_CPU_THRESHOLD {
                warn!(
                    "Heavy travel cpu use - Creep: {} - Cpu: {:.2} - Origin: {} - Destination: {}",
                    creep.name, record.cpu, creep.pos, destination
                );
            }

            if result.incomplete && result.ops < RETRY_WITHOUT_ROUTE_MAX_OPS && options.use_find_route.is_none() && record.stuck < DEFAULT_STUCK_VALUE {
                let retry_options = TravelOptions {
                    use_find_route: Some(false),
                    ..(*options).clone()
                };

                result = self.find_travel_path(&*host, cache, rooms, creep.pos, destination, &retry_options);

                debug!(
                    "Retried path without route - Creep: {} - Success: {}",
                    creep.name, !result.incomplete
                );
            }

            record.path = Some(serialize_path(creep.pos, &result.path));
            record.stuck = 0;
        }

        let direction = record
            .path
            .as_deref()
            .and_then(|path| path.chars().next())
            .and_then(Direction::from_digit)
            .ok_or(ActionError::NoPath)?;

        record.prev = Some(creep.pos);

        host.creep_intent(&creep.name, CreepIntent::Move(direction))
    }

    /// Path between two positions honoring the travel options. Usable without an agent.
    pub fn find_travel_path(
        &mut self,
        host: &dyn GameHost,
        cache: &mut TickCache,
        rooms: &BTreeMap<RoomName, RoomMemory>,
        origin: Position,
        destination: Position,
        options: &TravelOptions,
    ) -> SearchResult {
        let time = host.time();
        let ignore_creeps = options.ignore_creeps.unwrap_or(true);
        let range = if options.moving_target { 0 } else { options.range.unwrap_or(1) };

        let use_find_route = options
            .use_find_route
            .unwrap_or_else(|| origin.room.linear_distance(destination.room) > ROUTE_SEARCH_DISTANCE);

        self.last_search = Some(SearchRequest {
            origin,
            destination,
            ignore_creeps,
            fresh_matrix: options.fresh_matrix,
            use_find_route,
        });

        let allowed_rooms: Option<HashSet<RoomName>> = if use_find_route {
            find_allowed_rooms(host, rooms, origin.room, destination.room, &options.route_options())
        } else {
            None
        };

        let (plain_cost, swamp_cost) = if options.off_road {
            (1, 1)
        } else if options.ignore_roads {
            (1, 5)
        } else {
            (2, 10)
        };

        let search_options = SearchOptions {
            plain_cost,
            swamp_cost,
            max_ops: options.max_ops.unwrap_or(DEFAULT_MAX_OPS),
            flee: false,
        };

        let matrices = &mut self.matrices;

        let room_callback = |room_name: RoomName| -> Option<SearchRoom> {
            if let Some(allowed_rooms) = allowed_rooms.as_ref() {
                if !allowed_rooms.contains(&room_name) {
                    return None;
                }
            } else if !options.allow_hostile && is_occupied(rooms, room_name) {
                return None;
            }

            let terrain = host.terrain(room_name)?;
            let snapshot = cache.room(host, room_name);

            let mut matrix = snapshot.as_ref().map(|room| {
                let mut matrix = if options.ignore_structures {
                    let mut matrix = CostMatrix::new();

                    if !ignore_creeps {
                        matrix.add_creeps(room);
                    }

                    Arc::new(matrix)
                } else if ignore_creeps || room_name != origin.room {
                    matrices.structure_matrix(room, time, options.fresh_matrix)
                } else {
                    matrices.creep_matrix(room, time)
                };

                let obstacles: Vec<_> = options.obstacles.iter().filter(|pos| pos.room == room_name).collect();

                if !obstacles.is_empty() {
                    let matrix = Arc::make_mut(&mut matrix);

                    for obstacle in obstacles {
                        matrix.set(obstacle.x, obstacle.y, IMPASSABLE);
                    }
                }

                matrix
            });

            if let Some(callback) = options.room_callback.as_ref() {
                let mut adjusted = matrix.as_deref().cloned().unwrap_or_default();

                if !callback(room_name, snapshot.as_deref(), &mut adjusted) {
                    return None;
                }

                matrix = Some(Arc::new(adjusted));
            }

            Some(SearchRoom { terrain, matrix })
        };

        search(origin, &[SearchGoal::new(destination, range)], &search_options, room_callback)
    }

    /// Path leading out of range of every threat, kept within `max_room_distance` rooms of the origin.
    pub fn find_flee_path(
        &mut self,
        host: &dyn GameHost,
        cache: &mut TickCache,
        rooms: &BTreeMap<RoomName, RoomMemory>,
        origin: Position,
        threats: &[SearchGoal],
        max_room_distance: u32,
    ) -> SearchResult {
        let time = host.time();
        let matrices = &mut self.matrices;

        let room_callback = |room_name: RoomName| -> Option<SearchRoom> {
            if origin.room.linear_distance(room_name) > max_room_distance {
                return None;
            }

            if room_name != origin.room && is_occupied(rooms, room_name) {
                return None;
            }

            let terrain = host.terrain(room_name)?;

            let matrix = cache.room(host, room_name).map(|room| {
                if room_name == origin.room {
                    matrices.creep_matrix(&room, time)
                } else {
                    matrices.structure_matrix(&room, time, false)
                }
            });

            Some(SearchRoom { terrain, matrix })
        };

        let options = SearchOptions {
            plain_cost: 2,
            swamp_cost: 10,
            max_ops: DEFAULT_MAX_OPS,
            flee: true,
        };

        search(origin, threats, &options, room_callback)
    }
}
