use super::costmatrix::*;
use crate::constants::*;
use crate::world::*;
use pathfinding::prelude::dijkstra_reach;
use std::collections::HashMap;
use std::sync::Arc;

/// Terrain and optional cost overrides for one room taking part in a search.
#[derive(Clone)]
pub struct SearchRoom {
    pub terrain: RoomTerrain,
    pub matrix: Option<Arc<CostMatrix>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchGoal {
    pub pos: Position,
    pub range: u32,
}

impl SearchGoal {
    pub fn new(pos: Position, range: u32) -> SearchGoal {
        SearchGoal { pos, range }
    }
}

#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub plain_cost: u32,
    pub swamp_cost: u32,
    pub max_ops: u32,
    pub flee: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            plain_cost: 1,
            swamp_cost: 5,
            max_ops: DEFAULT_MAX_OPS,
            flee: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Steps after the origin. When incomplete this leads to the explored tile closest to the goal.
    pub path: Vec<Position>,
    pub ops: u32,
    pub cost: u32,
    pub incomplete: bool,
}

impl SearchResult {
    pub fn last_pos(&self) -> Option<Position> {
        self.path.last().copied()
    }
}

/// Tiles left to cover before the position satisfies the goals. For a flee search this is the
/// largest shortfall against any threat.
fn remaining(pos: &Position, goals: &[SearchGoal], flee: bool) -> u32 {
    if flee {
        goals
            .iter()
            .map(|goal| goal.range.saturating_sub(pos.range_to(&goal.pos)))
            .max()
            .unwrap_or(0)
    } else {
        goals
            .iter()
            .map(|goal| pos.range_to(&goal.pos).saturating_sub(goal.range))
            .min()
            .unwrap_or(0)
    }
}

fn tile_cost(room: &SearchRoom, pos: &Position, options: &SearchOptions) -> Option<u32> {
    let terrain = room.terrain.get(pos.x, pos.y);

    if terrain == Terrain::Wall {
        return None;
    }

    let matrix_cost = room.matrix.as_ref().map(|m| m.get(pos.x, pos.y)).unwrap_or(0);

    match matrix_cost {
        IMPASSABLE => None,
        0 => Some(match terrain {
            Terrain::Swamp => options.swamp_cost,
            _ => options.plain_cost,
        }),
        cost => Some(cost as u32),
    }
}

/// Weighted search over the world grid with an expansion budget.
///
/// The search runs Dijkstra over reduced edge costs `c + h(v) - h(u)`, with `h` the Chebyshev
/// distance still to cover. Tile costs are at least one, so `h` is consistent and the reduced
/// costs stay non-negative, which makes this an A* search. Flee searches run without a heuristic.
///
/// The room callback is consulted once per room and search. Returning `None` keeps the search out
/// of the room.
pub fn search<F>(origin: Position, goals: &[SearchGoal], options: &SearchOptions, mut room_callback: F) -> SearchResult
where
    F: FnMut(RoomName) -> Option<SearchRoom>,
{
    let flee = options.flee;

    let heuristic = |pos: &Position| -> u32 {
        if flee {
            0
        } else {
            remaining(pos, goals, false)
        }
    };

    let mut rooms: HashMap<RoomName, Option<SearchRoom>> = HashMap::new();

    let successors = |node: &Position| {
        let node_heuristic = heuristic(node);

        node.neighbors()
            .filter_map(|next| {
                let room = rooms.entry(next.room).or_insert_with(|| room_callback(next.room)).as_ref()?;
                let cost = tile_cost(room, &next, options)?;

                Some((next, cost + heuristic(&next) - node_heuristic))
            })
            .collect::<Vec<_>>()
    };

    let mut parents: HashMap<Position, Position> = HashMap::new();
    let mut ops = 0;
    let mut best: Option<(u32, u32, Position)> = None;
    let mut found = None;

    let origin_heuristic = heuristic(&origin);

    for item in dijkstra_reach(&origin, successors) {
        if ops >= options.max_ops {
            break;
        }

        ops += 1;

        if let Some(parent) = item.parent {
            parents.insert(item.node, parent);
        }

        let real_cost = item.total_cost + origin_heuristic - heuristic(&item.node);
        let left = remaining(&item.node, goals, flee);

        if left == 0 {
            found = Some((item.node, real_cost));

            break;
        }

        let closer = best
            .map(|(best_left, best_cost, _)| (left, real_cost) < (best_left, best_cost))
            .unwrap_or(true);

        if closer {
            best = Some((left, real_cost, item.node));
        }
    }

    let (target, cost, incomplete) = match (found, best) {
        (Some((node, cost)), _) => (node, cost, false),
        (None, Some((_, cost, node))) => (node, cost, true),
        (None, None) => (origin, 0, true),
    };

    let mut path = Vec::new();
    let mut current = target;

    while current != origin {
        path.push(current);

        match parents.get(&current) {
            Some(parent) => current = *parent,
            None => break,
        }
    }

    path.reverse();

    SearchResult {
        path,
        ops,
        cost,
        incomplete,
    }
}
