use super::missionsystem::*;
use crate::constants::*;
use crate::creep::agent::*;
use crate::features;
use crate::pathing::costmatrix::*;
use crate::pathing::movementsystem::*;
use crate::pathing::route::*;
use crate::pathing::search::*;
use crate::world::*;
use log::*;
use std::sync::Arc;

/// Keep the road between `start` and `finish` built. Places at most one road site per tick across
/// all missions. Returns the path length once the whole road exists, after which the road is only
/// checked again every `PAVE_INTERVAL` ticks.
pub fn pave_path(
    system_data: &mut MissionExecutionSystemData,
    runtime_data: &MissionExecutionRuntimeData,
    start: Position,
    finish: Position,
    range: u32,
    ignore_limit: bool,
) -> Option<u32> {
    if !features::paving::on(&system_data.memory.features) {
        return None;
    }

    let time = system_data.time();

    let checked_recently = runtime_data
        .memory(system_data.memory)
        .pave_tick
        .map(|tick| time.saturating_sub(tick) < PAVE_INTERVAL)
        .unwrap_or(false);

    if checked_recently {
        return None;
    }

    if start.room.linear_distance(finish.room) > PAVE_MAX_ROOM_DISTANCE {
        info!("Paving distance too far - Operation: {} - From: {} - To: {}", runtime_data.operation, start, finish);

        return None;
    }

    let path = match find_paved_path(system_data, start, finish, range) {
        Some(path) => path,
        None => {
            warn!("Incomplete paving path - Operation: {} - From: {} - To: {}", runtime_data.operation, start, finish);

            return None;
        }
    };

    let site = examine_paved_path(system_data, runtime_data, &path);

    match site {
        Some(pos) if ignore_limit || system_data.host.construction_site_count() < PAVE_SITE_LIMIT => {
            if !system_data.cache.placed_road {
                system_data.cache.placed_road = true;

                info!("Placing road - Operation: {} - Position: {}", runtime_data.operation, pos);

                if let Err(err) = system_data.host.create_construction_site(pos, StructureKind::Road) {
                    debug!("Failed to place road - Position: {} - Error: {}", pos, err);
                }
            }

            None
        }
        _ => {
            runtime_data.memory(system_data.memory).pave_tick = Some(time);

            match path.last() {
                Some(last) if last.in_range_to(&finish, range) => Some(path.len() as u32),
                _ => None,
            }
        }
    }
}

/// Road friendly path from `start` to within `range` of `finish`. Existing roads and road sites
/// are preferred, controllers, source containers and keeper lairs are kept clear.
pub fn find_paved_path(system_data: &mut MissionExecutionSystemData, start: Position, finish: Position, range: u32) -> Option<Vec<Position>> {
    let host = &*system_data.host;
    let cache = &mut *system_data.cache;
    let rooms = &system_data.memory.rooms;

    let options = SearchOptions {
        plain_cost: PAVE_PLAIN_COST as u32,
        swamp_cost: PAVE_SWAMP_COST as u32,
        max_ops: PAVE_MAX_OPS,
        flee: false,
    };

    let result = search(start, &[SearchGoal::new(finish, range)], &options, |room_name| {
        if start.room.linear_distance(room_name) > PAVE_MAX_ROOM_DISTANCE || is_occupied(rooms, room_name) {
            return None;
        }

        let terrain = host.terrain(room_name)?;

        let matrix = match cache.room(host, room_name) {
            Some(room) => Some(paving_matrix(&room, &terrain)),
            None if room_name.is_highway() => {
                let mut matrix = CostMatrix::new();

                block_exits(&mut matrix, &terrain, PAVE_AVOID_COST);

                Some(matrix)
            }
            None => None,
        };

        Some(SearchRoom {
            terrain,
            matrix: matrix.map(Arc::new),
        })
    });

    if result.incomplete {
        None
    } else {
        Some(result.path)
    }
}

fn paving_matrix(room: &RoomSnapshot, terrain: &RoomTerrain) -> CostMatrix {
    let mut matrix = CostMatrix::from_structures(room, PAVE_ROAD_COST);

    for site in room.construction_sites.iter().filter(|s| s.my && s.kind == StructureKind::Road) {
        matrix.set(site.pos.x, site.pos.y, PAVE_ROAD_COST);
    }

    if let Some(controller) = room.controller.as_ref() {
        block_off(&mut matrix, terrain, controller.pos, 3, PAVE_AVOID_COST);
    }

    for source in room.sources.iter() {
        let storage = room
            .structures_of(StructureKind::Container)
            .find(|container| container.pos.is_near_to(&source.pos))
            .or_else(|| room.structures_of(StructureKind::Link).find(|link| link.pos.in_range_to(&source.pos, 2)));

        if let Some(storage) = storage {
            block_off(&mut matrix, terrain, storage.pos, 1, PAVE_AVOID_COST);
        }
    }

    for lair in room.structures_of(StructureKind::KeeperLair) {
        block_off(&mut matrix, terrain, lair.pos, 1, PAVE_AVOID_COST);
    }

    matrix
}

fn block_off(matrix: &mut CostMatrix, terrain: &RoomTerrain, center: Position, range: i32, cost: u8) {
    for dx in -range..=range {
        for dy in -range..=range {
            let x = center.x as i32 + dx;
            let y = center.y as i32 + dy;

            if !(0..ROOM_SIZE).contains(&x) || !(0..ROOM_SIZE).contains(&y) {
                continue;
            }

            let (x, y) = (x as u8, y as u8);

            if terrain.is_wall(x, y) || matrix.get(x, y) == IMPASSABLE {
                continue;
            }

            matrix.set(x, y, cost);
        }
    }
}

fn block_exits(matrix: &mut CostMatrix, terrain: &RoomTerrain, cost: u8) {
    let edge = (ROOM_SIZE - 1) as u8;

    for i in 0..=edge {
        for (x, y) in [(i, 0), (i, edge), (0, i), (edge, i)] {
            if !terrain.is_wall(x, y) {
                matrix.set(x, y, cost);
            }
        }
    }
}

/// First tile of the path that still needs a road. Existing roads along the way are queued for
/// repair and a paver is summoned when they have decayed too far. `None` when the road is
/// complete or part of the path is not visible.
pub fn examine_paved_path(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, path: &[Position]) -> Option<Position> {
    let mut repair_ids = Vec::new();
    let mut hits_to_repair = 0;

    for pos in path {
        let room = system_data.room(pos.room)?;

        if pos.is_near_exit(0) {
            continue;
        }

        if let Some(road) = room.structure_at(pos, StructureKind::Road) {
            repair_ids.push(road.id.clone());
            hits_to_repair += road.hits_max.saturating_sub(road.hits);

            let memory = runtime_data.memory(system_data.memory);

            let decayed = hits_to_repair > PAVE_SUMMON_HITS || (road.hits as f64) < road.hits_max as f64 * PAVE_SUMMON_RATIO;

            if memory.road_repair_ids.is_empty() && decayed {
                info!("Summoning paver - Operation: {} - Position: {}", runtime_data.operation, pos);

                memory.road_repair_ids = repair_ids.clone();
            }

            continue;
        }

        if room.construction_site_at(pos).is_some() {
            continue;
        }

        return Some(*pos);
    }

    None
}

/// Next queued road that still needs repair. Roads that were repaired or are gone leave the queue.
pub fn find_road_to_repair(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Option<StructureSnapshot> {
    loop {
        let id = runtime_data.memory(system_data.memory).road_repair_ids.first().cloned()?;

        match system_data.cache.structure(&*system_data.host, &id) {
            Some(road) if road.hits < road.hits_max => return Some(road),
            _ => {
                runtime_data.memory(system_data.memory).road_repair_ids.remove(0);
            }
        }
    }
}

/// Work through the repair queue of the mission with a (usually shared) paver.
pub fn paver_actions(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, paver: &Agent) {
    let pos = paver.pos();

    if paver.creep().is_hurt() {
        if let Some(room) = system_data.room(pos.room) {
            if room.hostiles().next().is_none() && !pos.is_near_exit(0) {
                let tower = room
                    .structures_of(StructureKind::Tower)
                    .filter(|tower| tower.my)
                    .min_by_key(|tower| tower.pos.range_to(&pos));

                if let Some(tower) = tower {
                    let _ = system_data.host.tower_heal(&tower.id, paver.name());

                    return;
                }
            }

            if room.my_creeps().any(|creep| creep.get_active_parts(Part::Heal) > 0) {
                let _ = paver.idle_off_road(system_data, pos);

                return;
            }
        }

        if paver.get_active_parts(Part::Work) == 0 {
            if let Some(home) = runtime_data.spawn_group.and_then(|room| system_data.spawn_groups.get(room)).map(|group| group.pos) {
                let _ = paver.travel_to(system_data, home, &TravelOptions::range(1));
            }

            return;
        }
    }

    if !paver.has_load(system_data) {
        let next = find_road_to_repair(system_data, runtime_data).map(|road| road.pos);

        let _ = paver.procure_energy(system_data, next);

        return;
    }

    let road = match find_road_to_repair(system_data, runtime_data) {
        Some(road) => road,
        None => {
            info!("Paver checking out - Operation: {} - Paver: {} - Ticks to live: {:?}", runtime_data.operation, paver.name(), paver.ticks_to_live());

            let memory = paver.memory(system_data.memory);
            memory.employer = None;
            memory.last_tick_employed = None;

            let anchor = runtime_data.room.as_ref().and_then(|room| room.controller.as_ref()).map(|controller| controller.pos);

            let _ = paver.idle_off_road(system_data, anchor.unwrap_or(runtime_data.flag));

            return;
        }
    };

    let mut paving = false;

    if pos.in_range_to(&road.pos, 3) && !pos.is_near_exit(0) {
        paving = paver.repair(system_data, &road).is_ok();
    } else {
        let _ = paver.travel_to(system_data, road.pos, &TravelOptions::range(0));
    }

    if !paving {
        let underfoot = system_data
            .room(pos.room)
            .and_then(|room| room.structure_at(&pos, StructureKind::Road).filter(|road| road.needs_repair()).cloned());

        if let Some(underfoot) = underfoot {
            let _ = paver.repair(system_data, &underfoot);
        }
    }
}
