use super::missionsystem::*;
use crate::constants::*;
use crate::creep::agent::*;
use crate::creep::data::*;
use crate::features;
use crate::jitter::*;
use crate::memory_helper::*;
use crate::memorysystem::*;
use crate::spawnsystem::*;
use crate::world::*;
use log::*;

/// How a role is populated.
#[derive(Clone, Debug)]
pub struct HeadcountOptions {
    /// Ticks before death at which a replacement is started, on top of the spawn time.
    pub prespawn: Option<u32>,
    /// Memory given to newly spawned agents.
    pub memory: Option<AgentMemory>,
    /// Spawn even when the flag room is not visible.
    pub blind_spawn: bool,
    pub alt_spawn_group: Option<RoomName>,
    pub reservation: Option<SpawnReservation>,
    pub disable_notify: bool,
    pub skip_move_to_room: bool,
    pub allow_spawn: bool,
}

impl Default for HeadcountOptions {
    fn default() -> Self {
        HeadcountOptions {
            prespawn: None,
            memory: None,
            blind_spawn: false,
            alt_spawn_group: None,
            reservation: None,
            disable_notify: false,
            skip_move_to_room: false,
            allow_spawn: true,
        }
    }
}

fn roster_prefix(runtime_data: &MissionExecutionRuntimeData, role: &str) -> String {
    format!("{}_{}_", runtime_data.operation, role)
}

/// Agents of `role` that are alive and prepared. Starts at most one replacement per call when the
/// counted population is below `max`. A population override in mission memory wins over `max`.
pub fn headcount<B, M>(
    system_data: &mut MissionExecutionSystemData,
    runtime_data: &MissionExecutionRuntimeData,
    role: &str,
    body: B,
    max: M,
    options: &HeadcountOptions,
) -> Vec<Agent>
where
    B: FnOnce(&SpawnGroup) -> Vec<Part>,
    M: FnOnce() -> u32,
{
    let prefix = roster_prefix(runtime_data, role);

    let roster = match runtime_data.memory(system_data.memory).hc.get(role) {
        Some(roster) => roster.clone(),
        None => find_orphans(system_data, &prefix),
    };

    let prespawn = options.prespawn.map(|requested| {
        let stored = runtime_data.memory(system_data.memory).prespawn.entry(role.to_owned()).or_insert(0);

        *stored = (*stored).max(requested);

        *stored
    });

    let mut live = Vec::with_capacity(roster.len());
    let mut agents = Vec::with_capacity(roster.len());
    let mut count = 0;

    for name in roster {
        let creep = match system_data.cache.creep(&*system_data.host, &name) {
            Some(creep) => creep,
            None => {
                debug!("Removing dead agent from roster - Role: {} - Name: {}", role, name);

                system_data.memory.creeps.remove(&name);

                continue;
            }
        };

        let lead_time = prespawn
            .map(|prespawn| creep.body.len() as u32 * PRESPAWN_TICKS_PER_PART + prespawn)
            .unwrap_or(0);

        if creep.ticks_to_live.map(|ttl| ttl > lead_time).unwrap_or(true) {
            count += 1;
        }

        let agent = Agent::new(creep);

        if prep_agent(system_data, runtime_data, &agent, options) {
            agents.push(agent);
        }

        live.push(name);
    }

    let can_spawn = options.allow_spawn
        && (runtime_data.has_vision() || options.blind_spawn)
        && !system_data.cache.spawned_roles.contains(&prefix);

    if can_spawn {
        let max = runtime_data.memory(system_data.memory).max.get(role).copied().unwrap_or_else(max);

        if count < max {
            if let Some(name) = spawn_agent(system_data, runtime_data, role, &prefix, body, options) {
                live.push(name);
            }
        }
    }

    runtime_data.memory(system_data.memory).hc.insert(role.to_owned(), live);

    agents
}

fn spawn_agent<B>(
    system_data: &mut MissionExecutionSystemData,
    runtime_data: &MissionExecutionRuntimeData,
    role: &str,
    prefix: &str,
    body: B,
    options: &HeadcountOptions,
) -> Option<String>
where
    B: FnOnce(&SpawnGroup) -> Vec<Part>,
{
    let group_room = options.alt_spawn_group.or(runtime_data.spawn_group)?;
    let group = system_data.spawn_groups.get_mut(group_room)?;

    if !group.is_available() {
        return None;
    }

    let body = body(group);

    if body.is_empty() {
        return None;
    }

    let rng = &mut *system_data.rng;

    let result = group.spawn(
        &mut *system_data.host,
        &body,
        |_| format!("{}{}", prefix, name_suffix(rng.get_mut())),
        options.reservation,
    );

    match result {
        Ok(name) => {
            system_data.cache.spawned_roles.insert(prefix.to_owned());

            let mut memory = options.memory.clone().unwrap_or_else(AgentMemory::fresh);

            if memory.boosts.is_empty() {
                if let Some(boosts) = runtime_data.memory(system_data.memory).boost.get(role) {
                    memory.boosts = boosts.clone();
                }
            }

            system_data.memory.creeps.insert(name.clone(), memory);

            Some(name)
        }
        Err(err) => {
            report_spawn_failure(system_data, runtime_data, role, err);

            None
        }
    }
}

fn report_spawn_failure(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, role: &str, err: ActionError) {
    if err == ActionError::NotEnough {
        return;
    }

    if features::spawn::mute(&system_data.memory.features) || path_bool(&system_data.memory.player_config, "muteSpawn") {
        return;
    }

    let time = system_data.time();
    let memory = runtime_data.memory(system_data.memory);

    let recent = memory
        .last_spawn_failure
        .map(|last| time.saturating_sub(last) < SPAWN_FAILURE_LOG_INTERVAL)
        .unwrap_or(false);

    if recent {
        return;
    }

    memory.last_spawn_failure = Some(time);

    warn!(
        "Spawn failed - Operation: {} - Mission: {} - Role: {} - Error: {}",
        runtime_data.operation, runtime_data.mission, role, err
    );
}

/// Live creeps whose name marks them as belonging to the roster, used when the roster itself was
/// lost from memory.
pub fn find_orphans(system_data: &mut MissionExecutionSystemData, prefix: &str) -> Vec<String> {
    let orphans: Vec<String> = system_data
        .cache
        .creeps(&*system_data.host)
        .keys()
        .filter(|name| name.contains(prefix))
        .cloned()
        .collect();

    if !orphans.is_empty() {
        info!("Recovered orphaned agents - Roster: {} - Count: {}", prefix, orphans.len());
    }

    orphans
}

/// One-time preparation. Returns true once the agent is ready for its mission.
pub fn prep_agent(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, agent: &Agent, options: &HeadcountOptions) -> bool {
    if agent.memory(system_data.memory).prep {
        return true;
    }

    if agent.is_spawning() {
        return false;
    }

    if options.disable_notify {
        let _ = agent.disable_notify(system_data);
    }

    if !agent.seek_boost(system_data) {
        return false;
    }

    if !options.skip_move_to_room && (agent.pos().room != runtime_data.flag.room || agent.is_near_exit(1)) {
        let _ = agent.avoid_sk(system_data, runtime_data.flag);

        return false;
    }

    agent.memory(system_data.memory).prep = true;

    true
}

/// The community agent of `role` for the mission's spawn group. Only one employer may use it per
/// tick. Spawns it when missing.
pub fn spawn_shared_agent<B>(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, role: &str, body: B) -> Option<Agent>
where
    B: FnOnce(&SpawnGroup) -> Vec<Part>,
{
    let group_room = runtime_data.spawn_group?;
    let time = system_data.time();

    let existing = system_data
        .memory
        .rooms
        .get(&group_room)
        .and_then(|room| room.spawn_group.as_ref())
        .and_then(|group| group.community_roles.get(role))
        .cloned();

    if let Some(name) = existing {
        match system_data.cache.creep(&*system_data.host, &name) {
            Some(creep) if group_room.linear_distance(creep.pos.room) <= COMMUNITY_AGENT_RANGE => {
                if creep.spawning {
                    return None;
                }

                let employer = runtime_data.employer();
                let memory = system_data.memory.agent_mut(&name);

                let claimable = memory.employer.as_deref() == Some(employer.as_str())
                    || memory.last_tick_employed.map(|last| time.saturating_sub(last) > 1).unwrap_or(true);

                if !claimable {
                    return None;
                }

                memory.employer = Some(employer);
                memory.last_tick_employed = Some(time);

                return Some(Agent::new(creep));
            }
            alive => {
                info!("Releasing community agent - Role: {} - Name: {}", role, name);

                system_data.memory.creeps.remove(&name);

                if let Some(group) = system_data.memory.rooms.get_mut(&group_room).and_then(|room| room.spawn_group.as_mut()) {
                    group.community_roles.remove(role);
                }

                if alive.is_some() {
                    return None;
                }
            }
        }
    }

    let group = system_data.spawn_groups.get_mut(group_room)?;

    if !group.is_available() {
        return None;
    }

    let body = body(group);

    let base = format!("community_{}", role);
    let rng = &mut *system_data.rng;

    let result = group.spawn(
        &mut *system_data.host,
        &body,
        |attempt| {
            if attempt == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, name_suffix(rng.get_mut()))
            }
        },
        None,
    );

    match result {
        Ok(name) => {
            system_data
                .memory
                .rooms
                .entry(group_room)
                .or_default()
                .spawn_group
                .get_or_insert_with(Default::default)
                .community_roles
                .insert(role.to_owned(), name);
        }
        Err(err) => report_spawn_failure(system_data, runtime_data, role, err),
    }

    None
}

/// Raise the role's prespawn to cover the time this agent needed to reach work. Once per agent.
pub fn register_prespawn(system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData, role: &str, agent: &Agent) {
    let ttl = match agent.ticks_to_live() {
        Some(ttl) => ttl,
        None => return,
    };

    let memory = agent.memory(system_data.memory);

    if memory.registered {
        return;
    }

    memory.registered = true;

    let prespawn = CREEP_LIFE_TIME.saturating_sub(ttl).max(CREEP_LIFE_TIME / 2);

    let stored = runtime_data.memory(system_data.memory).prespawn.entry(role.to_owned()).or_insert(0);

    *stored = (*stored).max(prespawn);

    debug!("Registered prespawn - Role: {} - Agent: {} - Prespawn: {}", role, agent.name(), *stored);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::body::*;
    use crate::missions::missionsystem::testing::*;
    use crate::world::sim::*;
    use std::sync::Arc;

    fn room() -> RoomName {
        RoomName::new("E1S1").unwrap()
    }

    fn runtime(room_snapshot: Option<Arc<RoomSnapshot>>) -> MissionExecutionRuntimeData<'static> {
        MissionExecutionRuntimeData {
            operation: "alpha",
            mission: "worker",
            flag: Position::new(25, 25, room()),
            room: room_snapshot,
            spawn_group: Some(room()),
        }
    }

    fn colony(spawns: &[(u8, u8)]) -> (SimHost, Fixture) {
        let sim = SimHost::new();
        sim.add_owned_room(room(), 3, 800);

        for (x, y) in spawns {
            sim.add_structure(Position::new(*x, *y, room()), StructureKind::Spawn, true);
        }

        let mut fixture = Fixture::new(&sim);
        fixture.refresh();

        (sim, fixture)
    }

    fn count_workers(fixture: &mut Fixture, max: u32, options: &HeadcountOptions) -> Vec<Agent> {
        let snapshot = fixture.cache.room(&fixture.host, room());
        let runtime = runtime(snapshot);
        let mut data = fixture.data();

        headcount(&mut data, &runtime, "worker", |_| worker_body(1, 1, 1), || max, options)
    }

    #[test]
    fn prespawn_only_grows() {
        let (_sim, mut fixture) = colony(&[(20, 20)]);

        count_workers(&mut fixture, 0, &HeadcountOptions { prespawn: Some(50), ..Default::default() });
        count_workers(&mut fixture, 0, &HeadcountOptions { prespawn: Some(10), ..Default::default() });

        let stored = fixture.memory.operation_mut("alpha").mission_mut("worker").prespawn.get("worker").copied();

        assert_eq!(stored, Some(50));
    }

    #[test]
    fn dead_agents_leave_the_roster() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        sim.add_creep("alpha_worker_2", Position::new(25, 24, room()), &[Part::Work, Part::Carry, Part::Move], true);

        {
            let mission = fixture.memory.operation_mut("alpha").mission_mut("worker");
            mission.hc.insert("worker".to_owned(), vec!["alpha_worker_1".to_owned(), "alpha_worker_2".to_owned()]);
        }

        fixture.memory.agent_mut("alpha_worker_1").prep = true;
        fixture.memory.agent_mut("alpha_worker_2").prep = true;

        let agents = count_workers(&mut fixture, 1, &HeadcountOptions::default());

        assert_eq!(agents.iter().map(|a| a.name()).collect::<Vec<_>>(), vec!["alpha_worker_2"]);
        assert!(!fixture.memory.creeps.contains_key("alpha_worker_1"));

        let roster = fixture.memory.operation_mut("alpha").mission_mut("worker").hc.get("worker").cloned();

        assert_eq!(roster, Some(vec!["alpha_worker_2".to_owned()]));
        assert!(sim.spawn_log().is_empty());
    }

    #[test]
    fn one_spawn_per_role_per_tick() {
        let (sim, mut fixture) = colony(&[(20, 20), (30, 20)]);

        count_workers(&mut fixture, 3, &HeadcountOptions::default());
        count_workers(&mut fixture, 3, &HeadcountOptions::default());

        assert_eq!(sim.spawn_log().len(), 1);

        fixture.next_tick();

        count_workers(&mut fixture, 3, &HeadcountOptions::default());

        let log = sim.spawn_log();

        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|record| record.name.starts_with("alpha_worker_")));
        assert_ne!(log[0].spawn, log[1].spawn);
    }

    #[test]
    fn orphans_are_recovered_when_the_roster_is_lost() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        sim.add_creep("alpha_worker_7", Position::new(25, 24, room()), &[Part::Move], true);
        sim.add_creep("beta_worker_7", Position::new(25, 23, room()), &[Part::Move], true);

        let agents = count_workers(&mut fixture, 1, &HeadcountOptions::default());

        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name(), "alpha_worker_7");
        assert!(sim.spawn_log().is_empty());
    }

    #[test]
    fn dying_agents_are_replaced_ahead_of_time() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        sim.add_creep("alpha_worker_1", Position::new(25, 24, room()), &[Part::Move], true);
        sim.update_creep("alpha_worker_1", |c| c.ticks_to_live = Some(20));

        fixture.refresh();

        // Lead time is 1 part * 3 + 30.
        let agents = count_workers(&mut fixture, 1, &HeadcountOptions { prespawn: Some(30), ..Default::default() });

        assert_eq!(agents.len(), 1);
        assert_eq!(sim.spawn_log().len(), 1);

        let roster = fixture.memory.operation_mut("alpha").mission_mut("worker").hc.get("worker").cloned().unwrap_or_default();

        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn blind_rooms_only_spawn_when_allowed() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        let runtime = runtime(None);
        let mut data = fixture.data();

        headcount(&mut data, &runtime, "scout", |_| worker_body(0, 0, 1), || 1, &HeadcountOptions::default());
        assert!(sim.spawn_log().is_empty());

        let options = HeadcountOptions {
            blind_spawn: true,
            ..Default::default()
        };

        headcount(&mut data, &runtime, "scout", |_| worker_body(0, 0, 1), || 1, &options);
        assert_eq!(sim.spawn_log().len(), 1);
    }

    #[test]
    fn population_override_wins() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        set_max(fixture.memory.operation_mut("alpha").mission_mut("worker"), "worker", 0);

        count_workers(&mut fixture, 4, &HeadcountOptions::default());

        assert!(sim.spawn_log().is_empty());
    }

    #[test]
    fn boosts_are_handed_to_new_agents() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        set_boost(fixture.memory.operation_mut("alpha").mission_mut("worker"), "worker", vec!["XGH2O".to_owned()]);

        count_workers(&mut fixture, 1, &HeadcountOptions::default());

        let name = sim.spawn_log()[0].name.clone();

        assert_eq!(fixture.memory.agent_mut(&name).boosts, vec!["XGH2O".to_owned()]);
    }

    #[test]
    fn spawn_failures_are_rate_limited() {
        let (_sim, mut fixture) = colony(&[(20, 20)]);

        let snapshot = fixture.cache.room(&fixture.host, room());
        let runtime = runtime(snapshot);

        // Every spawn must leave one spawn idle, which a single spawn never does.
        let options = HeadcountOptions {
            reservation: Some(SpawnReservation { spawns: 2, energy: 0 }),
            ..Default::default()
        };

        {
            let mut data = fixture.data();
            headcount(&mut data, &runtime, "worker", |_| worker_body(1, 1, 1), || 1, &options);
        }

        let first = fixture.memory.operation_mut("alpha").mission_mut("worker").last_spawn_failure;
        assert!(first.is_some());

        for _ in 0..3 {
            fixture.next_tick();

            let mut data = fixture.data();
            headcount(&mut data, &runtime, "worker", |_| worker_body(1, 1, 1), || 1, &options);
        }

        assert_eq!(fixture.memory.operation_mut("alpha").mission_mut("worker").last_spawn_failure, first);
    }

    #[test]
    fn agents_travel_to_the_flag_room_before_work() {
        let other = RoomName::new("E2S1").unwrap();

        let (sim, mut fixture) = colony(&[(20, 20)]);
        sim.add_room(other, RoomTerrain::plains(), true);
        sim.add_creep("alpha_worker_1", Position::new(10, 10, other), &[Part::Move], true);

        fixture.refresh();

        let agent = fixture.agent("alpha_worker_1");
        let runtime = runtime(None);

        let ready = {
            let mut data = fixture.data();
            prep_agent(&mut data, &runtime, &agent, &HeadcountOptions::default())
        };

        assert!(!ready);
        assert!(!fixture.memory.agent_mut("alpha_worker_1").prep);

        let moved = sim.with(|state| state.intent_log.iter().any(|(_, name, intent)| name == "alpha_worker_1" && matches!(intent, CreepIntent::Move(_))));
        assert!(moved);

        let skip = HeadcountOptions {
            skip_move_to_room: true,
            disable_notify: true,
            ..Default::default()
        };

        fixture.next_tick();

        let ready = {
            let mut data = fixture.data();
            prep_agent(&mut data, &runtime, &agent, &skip)
        };

        assert!(ready);
        assert!(fixture.memory.agent_mut("alpha_worker_1").notify_disabled);
    }

    #[test]
    fn shared_agents_serve_one_employer_per_tick() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        let first = runtime(None);
        let second = MissionExecutionRuntimeData {
            mission: "builder",
            ..runtime(None)
        };

        {
            let mut data = fixture.data();
            assert!(spawn_shared_agent(&mut data, &first, "paver", |_| worker_body(1, 1, 1)).is_none());
        }

        assert_eq!(sim.spawn_log()[0].name, "community_paver");

        // Let the spawn finish.
        for _ in 0..10 {
            fixture.next_tick();
        }

        let mut data = fixture.data();

        let agent = spawn_shared_agent(&mut data, &first, "paver", |_| worker_body(1, 1, 1));
        assert_eq!(agent.map(|a| a.name().to_owned()).as_deref(), Some("community_paver"));

        assert!(spawn_shared_agent(&mut data, &second, "paver", |_| worker_body(1, 1, 1)).is_none());
        assert!(spawn_shared_agent(&mut data, &first, "paver", |_| worker_body(1, 1, 1)).is_some());
        assert_eq!(sim.spawn_log().len(), 1);
    }

    #[test]
    fn stray_shared_agents_are_released() {
        let far = RoomName::new("E9S1").unwrap();

        let (sim, mut fixture) = colony(&[(20, 20)]);
        sim.add_room(far, RoomTerrain::plains(), true);
        sim.add_creep("community_paver", Position::new(10, 10, far), &[Part::Move], true);

        fixture
            .memory
            .rooms
            .entry(room())
            .or_default()
            .spawn_group
            .get_or_insert_with(Default::default)
            .community_roles
            .insert("paver".to_owned(), "community_paver".to_owned());

        fixture.memory.agent_mut("community_paver").employer = Some("alphaworker".to_owned());

        fixture.refresh();

        let runtime = runtime(None);
        let mut data = fixture.data();

        assert!(spawn_shared_agent(&mut data, &runtime, "paver", |_| worker_body(1, 1, 1)).is_none());
        assert!(!data.memory.creeps.contains_key("community_paver"));
        assert!(sim.spawn_log().is_empty());
    }

    #[test]
    fn prespawn_registration_happens_once() {
        let (sim, mut fixture) = colony(&[(20, 20)]);

        sim.add_creep("alpha_worker_1", Position::new(25, 24, room()), &[Part::Move], true);
        sim.update_creep("alpha_worker_1", |c| c.ticks_to_live = Some(1100));

        fixture.refresh();

        let agent = fixture.agent("alpha_worker_1");
        let runtime = runtime(None);

        {
            let mut data = fixture.data();
            register_prespawn(&mut data, &runtime, "worker", &agent);
        }

        assert_eq!(fixture.memory.operation_mut("alpha").mission_mut("worker").prespawn.get("worker"), Some(&750));

        sim.update_creep("alpha_worker_1", |c| c.ticks_to_live = Some(100));
        fixture.refresh();

        let agent = fixture.agent("alpha_worker_1");

        {
            let mut data = fixture.data();
            register_prespawn(&mut data, &runtime, "worker", &agent);
        }

        assert_eq!(fixture.memory.operation_mut("alpha").mission_mut("worker").prespawn.get("worker"), Some(&750));
    }
}
