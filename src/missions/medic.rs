use super::missionsystem::*;
use crate::constants::*;
use crate::creep::agent::*;
use crate::pathing::movementsystem::*;
use crate::world::*;
use std::cmp::Reverse;

const MEDIC_IDLE_RANGE: u32 = 12;

/// Heal the creep the medic is tending, otherwise wait near the flag.
pub fn medic_actions(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, medic: &Agent) {
    let hurt = match find_hurt_creep(system_data, runtime_data, medic) {
        Some(hurt) => hurt,
        None => {
            let _ = medic.idle_near(system_data, runtime_data.flag, MEDIC_IDLE_RANGE);

            return;
        }
    };

    let range = medic.pos().range_to(&hurt.pos);

    if range > 1 {
        let options = TravelOptions {
            moving_target: true,
            ..TravelOptions::default()
        };

        let _ = medic.travel_to(system_data, hurt.pos, &options);
    }

    if range <= 1 {
        let _ = medic.heal(system_data, &hurt);
    } else if range <= 3 {
        let _ = medic.ranged_heal(system_data, &hurt);
    }
}

/// The creep remembered by the medic while it stays hurt and nearby. A new patient is only
/// searched for every `HEAL_CHECK_INTERVAL` ticks, preferring creeps with the most WORK parts.
pub fn find_hurt_creep(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, medic: &Agent) -> Option<CreepSnapshot> {
    let room = runtime_data.room.clone()?;
    let time = system_data.time();

    if let Some(name) = medic.memory(system_data.memory).heal_id.clone() {
        match system_data.cache.creep(&*system_data.host, &name) {
            Some(creep) if creep.pos.room == medic.pos().room && creep.is_hurt() => return Some(creep),
            _ => medic.memory(system_data.memory).heal_id = None,
        }
    }

    let memory = medic.memory(system_data.memory);

    if memory.heal_check != 0 && time.saturating_sub(memory.heal_check) <= HEAL_CHECK_INTERVAL {
        return None;
    }

    memory.heal_check = time;

    let hurt = room
        .my_creeps()
        .filter(|creep| creep.is_hurt() && creep.ticks_to_live.map(|ttl| ttl > HEAL_MIN_TICKS_TO_LIVE).unwrap_or(false))
        .min_by_key(|creep| Reverse(creep.part_count(Part::Work)))
        .cloned()?;

    memory.heal_id = Some(hurt.name.clone());

    Some(hurt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::missionsystem::testing::*;
    use crate::world::sim::*;

    fn room() -> RoomName {
        RoomName::new("E1S1").unwrap()
    }

    fn setup() -> (SimHost, Fixture) {
        let sim = SimHost::new();
        sim.add_room(room(), RoomTerrain::plains(), true);

        sim.add_creep("medic", Position::new(20, 20, room()), &[Part::Heal, Part::Move], true);
        sim.add_creep("hauler", Position::new(21, 20, room()), &[Part::Carry, Part::Move], true);
        sim.add_creep("miner", Position::new(23, 20, room()), &[Part::Work, Part::Work, Part::Move], true);

        sim.update_creep("hauler", |c| c.hits = 50);
        sim.update_creep("miner", |c| c.hits = 100);

        let mut fixture = Fixture::new(&sim);
        fixture.refresh();

        (sim, fixture)
    }

    fn flag_runtime(fixture: &mut Fixture) -> MissionExecutionRuntimeData<'static> {
        MissionExecutionRuntimeData {
            operation: "alpha",
            mission: "defense",
            flag: Position::new(25, 25, room()),
            room: fixture.cache.room(&fixture.host, room()),
            spawn_group: None,
        }
    }

    #[test]
    fn hurt_workers_are_tended_first() {
        let (sim, mut fixture) = setup();

        let runtime = flag_runtime(&mut fixture);
        let medic = fixture.agent("medic");

        {
            let mut data = fixture.data();
            medic_actions(&mut data, &runtime, &medic);
        }

        assert_eq!(fixture.memory.agent_mut("medic").heal_id.as_deref(), Some("miner"));

        let healed = sim.with(|state| {
            state
                .intent_log
                .iter()
                .any(|(_, name, intent)| name == "medic" && *intent == CreepIntent::RangedHeal("miner".to_owned()))
        });

        assert!(healed);
    }

    #[test]
    fn patients_are_dropped_once_healthy() {
        let (sim, mut fixture) = setup();

        let runtime = flag_runtime(&mut fixture);
        let medic = fixture.agent("medic");

        {
            let mut data = fixture.data();
            assert_eq!(find_hurt_creep(&mut data, &runtime, &medic).map(|c| c.name), Some("miner".to_owned()));
        }

        sim.update_creep("miner", |c| c.hits = c.hits_max);
        fixture.next_tick();

        let runtime = flag_runtime(&mut fixture);
        let mut data = fixture.data();

        // Healed and the next search is not due yet.
        assert_eq!(find_hurt_creep(&mut data, &runtime, &medic), None);
        assert_eq!(medic.memory(data.memory).heal_id, None);
    }
}
