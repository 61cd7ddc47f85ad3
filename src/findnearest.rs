use crate::spawnsystem::*;
use crate::world::*;
use itertools::Itertools;
use log::*;

pub trait HasPosition {
    fn pos(&self) -> Position;
}

impl HasPosition for Position {
    fn pos(&self) -> Position {
        *self
    }
}

impl HasPosition for SpawnGroup {
    fn pos(&self) -> Position {
        self.pos
    }
}

impl HasPosition for StructureSnapshot {
    fn pos(&self) -> Position {
        self.pos
    }
}

impl HasPosition for CreepSnapshot {
    fn pos(&self) -> Position {
        self.pos
    }
}

impl<T: HasPosition> HasPosition for &T {
    fn pos(&self) -> Position {
        (*self).pos()
    }
}

pub trait FindNearest<T: Sized + HasPosition> {
    fn find_nearest_linear(self, start_pos: Position) -> Option<T>
    where
        Self: Sized;
}

impl<I> FindNearest<I::Item> for I
where
    I: Iterator,
    I::Item: HasPosition,
{
    fn find_nearest_linear(self, start_pos: Position) -> Option<I::Item> {
        self.map(|pos_object| (start_pos.range_to(&pos_object.pos()), pos_object))
            .min_by_key(|(length, _)| *length)
            .map(|(_, pos_object)| pos_object)
    }
}

#[derive(Clone, Debug)]
pub struct FindClosestOptions {
    /// Destinations further than this many rooms away are not considered.
    pub linear_distance_limit: u32,
    /// Destinations within this distance of the best one are also returned.
    pub margin: u32,
}

impl Default for FindClosestOptions {
    fn default() -> Self {
        FindClosestOptions {
            linear_distance_limit: 16,
            margin: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClosestResult<T> {
    pub destination: T,
    pub distance: u32,
}

/// Destinations closest to `origin` by the given distance measure, nearest rooms first. A
/// destination in a room further away than the current best room is not measured at all.
/// `distance` returns `None` for unreachable destinations.
pub fn find_closest<T, I, F>(origin: Position, destinations: I, options: &FindClosestOptions, mut distance: F) -> Vec<ClosestResult<T>>
where
    T: HasPosition,
    I: IntoIterator<Item = T>,
    F: FnMut(Position, Position) -> Option<u32>,
{
    let filtered = destinations
        .into_iter()
        .map(|destination| (origin.room.linear_distance(destination.pos().room), destination))
        .filter(|(linear_distance, _)| *linear_distance <= options.linear_distance_limit)
        .sorted_by_key(|(linear_distance, _)| *linear_distance)
        .collect::<Vec<_>>();

    let considered = filtered.len();

    let mut best_destinations: Vec<ClosestResult<T>> = Vec::new();
    let mut best_linear_distance = u32::MAX;
    let mut best_distance = u32::MAX;

    for (linear_distance, destination) in filtered {
        if linear_distance > best_linear_distance {
            continue;
        }

        let distance = match distance(origin, destination.pos()) {
            Some(distance) => distance,
            None => continue,
        };

        if distance < best_distance {
            best_linear_distance = linear_distance;
            best_distance = distance;
            best_destinations.retain(|value| value.distance <= best_distance + options.margin);
        }

        if distance <= best_distance.saturating_add(options.margin) {
            best_destinations.push(ClosestResult { destination, distance });
        }
    }

    debug!("Find closest - Considered: {} - Selected: {}", considered, best_destinations.len());

    best_destinations
}
