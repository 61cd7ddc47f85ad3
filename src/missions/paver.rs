use super::body::*;
use super::headcount::*;
use super::missionsystem::*;
use super::paving::*;
use crate::constants::*;
use crate::creep::agent::*;
use crate::pathing::movementsystem::*;
use crate::world::*;
use log::*;
use rand::Rng;

pub const PAVER_ROLE: &str = "paver";

const ROAD_KEY: &str = "road";

/// Keeps the roads of the flag room in repair and the road from the spawn group to the flag built.
/// A community paver from the spawn group is borrowed whenever the road to the flag decays.
#[derive(Default)]
pub struct PaverMission {
    potency: Option<u32>,
    pavers: Vec<Agent>,
    shared: Option<Agent>,
}

impl PaverMission {
    pub fn new() -> PaverMission {
        PaverMission::default()
    }

    /// WORK parts needed to keep up with decay of the roads in the room.
    fn find_potency(room: &RoomSnapshot) -> u32 {
        let hits: u64 = room.structures_of(StructureKind::Road).map(|road| road.hits_max as u64).sum();

        ((hits as f64 / PAVER_HITS_PER_POTENCY as f64).ceil() as u32).max(1)
    }

    fn paver_body(potency: u32, max_spawn_energy: u32) -> Vec<Part> {
        if max_spawn_energy <= PAVER_SMALL_ENERGY {
            body_ratio(1, 3, 1, max_spawn_energy, 1.0, None)
        } else {
            worker_body(potency, potency * 3, potency * 2)
        }
    }

    fn run_paver(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, paver: &Agent) {
        if paver.flee_hostiles(system_data) {
            return;
        }

        let flag = runtime_data.flag;

        if paver.pos().room != flag.room {
            let _ = paver.travel_to(system_data, flag, &TravelOptions::range(1));

            return;
        }

        paver.memory(system_data.memory).scavenger = Some(ENERGY.to_owned());

        if !paver.has_load(system_data) {
            let _ = paver.procure_energy(system_data, None);

            return;
        }

        let pos = paver.pos();

        let target = paver
            .remember_structure(
                system_data,
                ROAD_KEY,
                |agent, system_data| {
                    let room = system_data.room(agent.pos().room)?;

                    room.structures_of(StructureKind::Road)
                        .filter(|road| road.hits < road.hits_max.saturating_sub(PAVER_REPAIR_MARGIN))
                        .min_by_key(|road| road.pos.range_to(&pos))
                        .cloned()
                },
                |road| road.hits >= road.hits_max,
            )
            .or_else(|| Self::find_container_to_repair(runtime_data, pos));

        let target = match target {
            Some(target) => target,
            None => {
                let _ = paver.idle_off_road(system_data, flag);

                return;
            }
        };

        if pos.in_range_to(&target.pos, 3) {
            if let Err(err) = paver.repair(system_data, &target) {
                debug!("Paver failed to repair - Paver: {} - Target: {} - Error: {}", paver.name(), target.id, err);
            }
        } else {
            let _ = paver.travel_to(system_data, target.pos, &TravelOptions::range(3));
        }
    }

    /// Containers of owned rooms below half their hits.
    fn find_container_to_repair(runtime_data: &MissionExecutionRuntimeData, pos: Position) -> Option<StructureSnapshot> {
        let room = runtime_data.room.as_ref().filter(|room| room.is_mine())?;

        room.structures_of(StructureKind::Container)
            .filter(|container| container.hits < container.hits_max / 2)
            .min_by_key(|container| container.pos.range_to(&pos))
            .cloned()
    }
}

impl Mission for PaverMission {
    fn name(&self) -> &str {
        PAVER_ROLE
    }

    fn init(&mut self, system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        let room = match runtime_data.room.as_ref() {
            Some(room) => room.clone(),
            None => return Ok(()),
        };

        let memory = runtime_data.memory(system_data.memory);

        let potency = *memory.potency.get_or_insert_with(|| Self::find_potency(&room));

        self.potency = Some(potency);

        let home = runtime_data
            .spawn_group
            .and_then(|group| system_data.spawn_groups.get(group))
            .map(|group| group.pos);

        if let Some(home) = home {
            if home.room != runtime_data.flag.room {
                pave_path(system_data, runtime_data, home, runtime_data.flag, 1, false);
            }
        }

        Ok(())
    }

    fn role_call(&mut self, system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        let has_roads = runtime_data
            .room
            .as_ref()
            .map(|room| room.structures_of(StructureKind::Road).next().is_some())
            .unwrap_or(false);

        let potency = self.potency.unwrap_or(1);

        let options = HeadcountOptions {
            prespawn: Some(PAVER_PRESPAWN),
            ..HeadcountOptions::default()
        };

        self.pavers = headcount(
            system_data,
            runtime_data,
            PAVER_ROLE,
            |group| Self::paver_body(potency, group.max_spawn_energy()),
            || if has_roads { 1 } else { 0 },
            &options,
        );

        let summoned = !runtime_data.memory(system_data.memory).road_repair_ids.is_empty();

        self.shared = if summoned {
            spawn_shared_agent(system_data, runtime_data, PAVER_ROLE, |group| {
                body_ratio(1, 3, 2, group.max_spawn_energy(), 1.0, Some(5))
            })
        } else {
            None
        };

        Ok(())
    }

    fn actions(&mut self, system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        for paver in self.pavers.iter() {
            Self::run_paver(system_data, runtime_data, paver);
        }

        if let Some(shared) = self.shared.as_ref() {
            paver_actions(system_data, runtime_data, shared);
        }

        Ok(())
    }

    fn invalidate_cache(&mut self, system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        if system_data.rng.get_mut().gen_bool(PAVER_POTENCY_RESET_CHANCE) {
            runtime_data.memory(system_data.memory).potency = None;
        }

        Ok(())
    }
}
