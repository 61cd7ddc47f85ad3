use crate::constants::*;
use crate::serialize::*;
use crate::world::*;
use log::*;
use pathfinding::prelude::dijkstra;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// Room costs are scaled by ten to stay integral.
const HIGHWAY_ROUTE_COST: u32 = 10;
const SOURCE_KEEPER_ROUTE_COST: u32 = 100;
const DEFAULT_ROUTE_COST: u32 = 25;

/// Beyond this linear distance the route distance is approximated by the linear distance.
const ROUTE_DISTANCE_LINEAR_LIMIT: u32 = 20;

pub const ROUTE_CACHE_TTL: u32 = 1000;

#[derive(Clone, Debug)]
pub struct RouteOptions {
    pub prefer_highway: bool,
    pub allow_hostile: bool,
    pub allow_sk: bool,
    pub restrict_distance: u32,
}

impl Default for RouteOptions {
    fn default() -> Self {
        RouteOptions {
            prefer_highway: false,
            allow_hostile: false,
            allow_sk: false,
            restrict_distance: DEFAULT_RESTRICT_DISTANCE,
        }
    }
}

pub fn is_occupied(rooms: &BTreeMap<RoomName, RoomMemory>, name: RoomName) -> bool {
    rooms.get(&name).map(|room| room.occupied).unwrap_or(false)
}

/// Rooms to cross from `origin` to `destination`, excluding the origin. `None` when the destination
/// lies beyond the restriction or cannot be reached.
pub fn find_route(
    host: &dyn GameHost,
    rooms: &BTreeMap<RoomName, RoomMemory>,
    origin: RoomName,
    destination: RoomName,
    options: &RouteOptions,
) -> Option<Vec<RoomName>> {
    if origin.linear_distance(destination) > options.restrict_distance {
        return None;
    }

    let visible: HashSet<RoomName> = if options.allow_sk {
        HashSet::new()
    } else {
        host.visible_rooms().into_iter().collect()
    };

    let room_cost = |name: RoomName| -> Option<u32> {
        if origin.linear_distance(name) > options.restrict_distance {
            return None;
        }

        if !options.allow_hostile && is_occupied(rooms, name) && name != destination && name != origin {
            return None;
        }

        if options.prefer_highway && name.is_highway() {
            return Some(HIGHWAY_ROUTE_COST);
        }

        if !options.allow_sk && !visible.contains(&name) && name.is_source_keeper() {
            return Some(SOURCE_KEEPER_ROUTE_COST);
        }

        Some(DEFAULT_ROUTE_COST)
    };

    let successors = |name: &RoomName| {
        name.neighbors()
            .iter()
            .filter(|neighbor| host.room_exists(**neighbor))
            .filter_map(|neighbor| room_cost(*neighbor).map(|cost| (*neighbor, cost)))
            .collect::<Vec<_>>()
    };

    let result = dijkstra(&origin, successors, |name| *name == destination);

    match result {
        Some((path, _)) => Some(path.into_iter().skip(1).collect()),
        None => {
            info!("Unable to find route - Origin: {} - Destination: {}", origin, destination);

            None
        }
    }
}

/// Rooms a path search may enter: both ends plus the route between them.
pub fn find_allowed_rooms(
    host: &dyn GameHost,
    rooms: &BTreeMap<RoomName, RoomMemory>,
    origin: RoomName,
    destination: RoomName,
    options: &RouteOptions,
) -> Option<HashSet<RoomName>> {
    let route = find_route(host, rooms, origin, destination, options)?;

    let mut allowed: HashSet<RoomName> = route.into_iter().collect();

    allowed.insert(origin);
    allowed.insert(destination);

    Some(allowed)
}

/// Number of rooms involved in travelling between two rooms, counting both ends.
pub fn route_distance(host: &dyn GameHost, rooms: &BTreeMap<RoomName, RoomMemory>, origin: RoomName, destination: RoomName) -> Option<u32> {
    let linear_distance = origin.linear_distance(destination);

    if linear_distance >= ROUTE_DISTANCE_LINEAR_LIMIT {
        return Some(linear_distance);
    }

    find_allowed_rooms(host, rooms, origin, destination, &RouteOptions::default()).map(|allowed| allowed.len() as u32)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedRoute {
    pub distance: Option<u32>,
    pub cached_at: u32,
}

/// Route distances between room pairs. Exits are static but ownership is not, so entries expire.
/// The cache is written to an intel segment and survives environment resets.
#[derive(Default, Serialize, Deserialize)]
pub struct RouteCache {
    routes: HashMap<(RoomName, RoomName), CachedRoute>,
    #[serde(skip)]
    dirty: bool,
    #[serde(skip)]
    loaded: bool,
}

impl RouteCache {
    pub fn new() -> RouteCache {
        RouteCache::default()
    }

    pub fn route_distance(
        &mut self,
        host: &dyn GameHost,
        rooms: &BTreeMap<RoomName, RoomMemory>,
        origin: RoomName,
        destination: RoomName,
    ) -> Option<u32> {
        let time = host.time();

        let expired = self
            .routes
            .get(&(origin, destination))
            .map(|entry| time.saturating_sub(entry.cached_at) > ROUTE_CACHE_TTL)
            .unwrap_or(true);

        if expired {
            let distance = route_distance(host, rooms, origin, destination);

            self.routes.insert((origin, destination), CachedRoute { distance, cached_at: time });

            self.dirty = true;
        }

        self.routes.get(&(origin, destination)).and_then(|entry| entry.distance)
    }

    /// Forget routes touching a room whose disposition changed.
    pub fn invalidate_room(&mut self, room: RoomName) {
        let before = self.routes.len();

        self.routes.retain(|(from, to), _| *from != room && *to != room);

        self.dirty |= self.routes.len() != before;
    }

    pub fn prune(&mut self, time: u32) {
        let before = self.routes.len();

        self.routes.retain(|_, entry| time.saturating_sub(entry.cached_at) <= ROUTE_CACHE_TTL);

        self.dirty |= self.routes.len() != before;
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Merge entries read from storage. Entries computed this session win.
    pub fn load(&mut self, data: &str) -> Result<(), String> {
        self.loaded = true;

        if data.is_empty() {
            return Ok(());
        }

        let stored: RouteCache = decode_segment(data)?;

        for (key, entry) in stored.routes {
            self.routes.entry(key).or_insert(entry);
        }

        Ok(())
    }

    pub fn store(&mut self) -> Result<String, String> {
        let encoded = encode_segment(self)?;

        self.dirty = false;

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::*;

    fn name(name: &str) -> RoomName {
        RoomName::new(name).unwrap()
    }

    fn grid(host: &SimHost, width: i32, height: i32) {
        for x in 0..width {
            for y in 0..height {
                host.add_room(RoomName::from_coords(x, y), RoomTerrain::plains(), false);
            }
        }
    }

    #[test]
    fn route_avoids_occupied_rooms() {
        let host = SimHost::new();
        grid(&host, 3, 3);

        let origin = RoomName::from_coords(0, 1);
        let destination = RoomName::from_coords(2, 1);
        let blocker = RoomName::from_coords(1, 1);

        let mut rooms = BTreeMap::new();
        rooms.insert(blocker, RoomMemory { occupied: true, ..RoomMemory::default() });

        let route = find_route(&host, &rooms, origin, destination, &RouteOptions::default()).unwrap();
        assert!(!route.contains(&blocker));
        assert_eq!(route.last(), Some(&destination));
        assert_eq!(route.len(), 4);

        let hostile = RouteOptions {
            allow_hostile: true,
            ..RouteOptions::default()
        };
        let route = find_route(&host, &rooms, origin, destination, &hostile).unwrap();
        assert_eq!(route, vec![blocker, destination]);
    }

    #[test]
    fn occupied_destination_is_still_reachable() {
        let host = SimHost::new();
        grid(&host, 2, 1);

        let destination = RoomName::from_coords(1, 0);
        let mut rooms = BTreeMap::new();
        rooms.insert(destination, RoomMemory { occupied: true, ..RoomMemory::default() });

        let route = find_route(&host, &rooms, RoomName::from_coords(0, 0), destination, &RouteOptions::default());

        assert_eq!(route, Some(vec![destination]));
    }

    #[test]
    fn restriction_refuses_distant_destinations() {
        let host = SimHost::new();
        grid(&host, 4, 1);

        let options = RouteOptions {
            restrict_distance: 2,
            ..RouteOptions::default()
        };

        assert!(find_route(&host, &BTreeMap::new(), RoomName::from_coords(0, 0), RoomName::from_coords(3, 0), &options).is_none());
        assert!(find_route(&host, &BTreeMap::new(), RoomName::from_coords(0, 0), RoomName::from_coords(2, 0), &options).is_some());
    }

    #[test]
    fn missing_rooms_are_not_crossed() {
        let host = SimHost::new();
        host.add_room(RoomName::from_coords(0, 0), RoomTerrain::plains(), false);
        host.add_room(RoomName::from_coords(2, 0), RoomTerrain::plains(), false);

        assert!(find_route(&host, &BTreeMap::new(), RoomName::from_coords(0, 0), RoomName::from_coords(2, 0), &RouteOptions::default()).is_none());
    }

    fn block(host: &SimHost, xs: std::ops::RangeInclusive<u32>, ys: std::ops::RangeInclusive<u32>, visible: bool) {
        for x in xs {
            for y in ys.clone() {
                host.add_room(name(&format!("E{}S{}", x, y)), RoomTerrain::plains(), visible);
            }
        }
    }

    fn occupied(names: &[&str]) -> BTreeMap<RoomName, RoomMemory> {
        names
            .iter()
            .map(|room| (name(room), RoomMemory { occupied: true, ..RoomMemory::default() }))
            .collect()
    }

    #[test]
    fn highways_are_preferred_when_asked() {
        let host = SimHost::new();

        // E9 is a controller column, E10 a highway.
        block(&host, 9..=10, 1..=5, false);

        let origin = name("E9S1");
        let destination = name("E9S5");

        let direct = find_route(&host, &BTreeMap::new(), origin, destination, &RouteOptions::default()).unwrap();
        assert_eq!(direct, vec![name("E9S2"), name("E9S3"), name("E9S4"), destination]);

        let highway = RouteOptions {
            prefer_highway: true,
            ..RouteOptions::default()
        };
        let via_highway = find_route(&host, &BTreeMap::new(), origin, destination, &highway).unwrap();
        assert_eq!(
            via_highway,
            vec![name("E10S1"), name("E10S2"), name("E10S3"), name("E10S4"), name("E10S5"), destination]
        );
    }

    #[test]
    fn unseen_source_keeper_rooms_are_avoided() {
        let host = SimHost::new();

        // E4S4 to E4S6 are source keeper rooms between E4S3 and E4S7.
        block(&host, 3..=4, 3..=7, false);

        let origin = name("E4S3");
        let destination = name("E4S7");
        let through_keepers = vec![name("E4S4"), name("E4S5"), name("E4S6"), destination];

        let around = find_route(&host, &BTreeMap::new(), origin, destination, &RouteOptions::default()).unwrap();
        assert_eq!(
            around,
            vec![name("E3S3"), name("E3S4"), name("E3S5"), name("E3S6"), name("E3S7"), destination]
        );

        let allow_sk = RouteOptions {
            allow_sk: true,
            ..RouteOptions::default()
        };
        assert_eq!(find_route(&host, &BTreeMap::new(), origin, destination, &allow_sk).unwrap(), through_keepers);

        block(&host, 4..=4, 4..=6, true);
        assert_eq!(find_route(&host, &BTreeMap::new(), origin, destination, &RouteOptions::default()).unwrap(), through_keepers);
    }

    #[test]
    fn occupied_highways_are_not_crossed() {
        let host = SimHost::new();
        block(&host, 9..=11, 1..=2, false);

        let rooms = occupied(&["E10S1"]);
        let highway = RouteOptions {
            prefer_highway: true,
            ..RouteOptions::default()
        };

        let route = find_route(&host, &rooms, name("E9S1"), name("E11S1"), &highway).unwrap();

        assert_eq!(route, vec![name("E9S2"), name("E10S2"), name("E11S2"), name("E11S1")]);
    }

    #[test]
    fn occupied_source_keeper_rooms_are_not_crossed() {
        let host = SimHost::new();
        block(&host, 3..=5, 3..=4, false);

        let rooms = occupied(&["E4S4"]);

        let route = find_route(&host, &rooms, name("E3S4"), name("E5S4"), &RouteOptions::default()).unwrap();

        assert!(!route.contains(&name("E4S4")));
        assert_eq!(route.last(), Some(&name("E5S4")));
    }

    #[test]
    fn cached_distances_expire_and_persist() {
        let host = SimHost::new();
        grid(&host, 3, 1);

        let mut cache = RouteCache::new();
        let origin = RoomName::from_coords(0, 0);
        let destination = RoomName::from_coords(2, 0);

        assert_eq!(cache.route_distance(&host, &BTreeMap::new(), origin, destination), Some(3));
        assert!(cache.is_dirty());

        let stored = cache.store().unwrap();
        assert!(!cache.is_dirty());

        let mut restored = RouteCache::new();
        restored.load(&stored).unwrap();
        assert!(restored.is_loaded());
        assert_eq!(restored.len(), 1);

        restored.prune(host.time() + ROUTE_CACHE_TTL + 1);
        assert!(restored.is_empty());
        assert!(restored.is_dirty());
    }
}
