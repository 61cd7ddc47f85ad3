use crate::constants::*;
use crate::world::*;

/// Body with the parts in WORK, CARRY, MOVE order.
pub fn worker_body(work: u32, carry: u32, movement: u32) -> Vec<Part> {
    config_body(&[(Part::Work, work), (Part::Carry, carry), (Part::Move, movement)])
}

pub fn config_body(config: &[(Part, u32)]) -> Vec<Part> {
    config
        .iter()
        .flat_map(|(part, count)| std::iter::repeat(*part).take(*count as usize))
        .collect()
}

/// Repeat a WORK/CARRY/MOVE unit as often as `spawn_fraction` of the spawn energy allows. Without a
/// limit the body is capped at the largest unit count that fits the part limit.
pub fn body_ratio(work: u32, carry: u32, movement: u32, max_spawn_energy: u32, spawn_fraction: f64, limit: Option<u32>) -> Vec<Part> {
    let unit_cost = work * Part::Work.cost() + carry * Part::Carry.cost() + movement * Part::Move.cost();
    let parts_per_unit = work + carry + movement;

    if unit_cost == 0 || parts_per_unit == 0 {
        return Vec::new();
    }

    let limit = limit.unwrap_or(MAX_CREEP_SIZE / parts_per_unit);
    let affordable = ((max_spawn_energy as f64 * spawn_fraction) / unit_cost as f64).floor() as u32;
    let units = affordable.min(limit);

    worker_body(work * units, carry * units, movement * units)
}
