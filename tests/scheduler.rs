use screeps_bonzai::game_loop::*;
use screeps_bonzai::memorysystem::*;
use screeps_bonzai::missions::missionsystem::*;
use screeps_bonzai::operations::data::*;
use screeps_bonzai::operations::managersystem::*;
use screeps_bonzai::operations::operationsystem::*;
use screeps_bonzai::world::sim::*;
use screeps_bonzai::world::*;
use specs::WorldExt;
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<String>>>;

/// Writes every phase it takes part in to the journal. Panics in the phase named by `explode`.
struct Recorder {
    label: String,
    journal: Journal,
    explode: Option<&'static str>,
}

impl Recorder {
    fn record(&self, phase: &str) -> Result<(), String> {
        if self.explode == Some(phase) {
            panic!("{} exploded during {}", self.label, phase);
        }

        self.journal.lock().unwrap().push(format!("{}.{}", self.label, phase));

        Ok(())
    }
}

impl Mission for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn init(&mut self, _: &mut MissionExecutionSystemData, _: &MissionExecutionRuntimeData) -> Result<(), String> {
        self.record("init")
    }

    fn role_call(&mut self, _: &mut MissionExecutionSystemData, _: &MissionExecutionRuntimeData) -> Result<(), String> {
        self.record("roleCall")
    }

    fn actions(&mut self, _: &mut MissionExecutionSystemData, _: &MissionExecutionRuntimeData) -> Result<(), String> {
        self.record("action")
    }

    fn invalidate_cache(&mut self, _: &mut MissionExecutionSystemData, _: &MissionExecutionRuntimeData) -> Result<(), String> {
        self.record("invalidateCache")
    }

    fn finalize(&mut self, _: &mut MissionExecutionSystemData, _: &MissionExecutionRuntimeData) -> Result<(), String> {
        self.record("finalize")
    }
}

struct RecordingOperation {
    priority: OperationPriority,
    label: String,
    journal: Journal,
    explode: Option<&'static str>,
}

impl Operation for RecordingOperation {
    fn priority(&self) -> OperationPriority {
        self.priority
    }

    fn init(&mut self, _: &mut MissionExecutionSystemData, _: &OperationExecutionRuntimeData, missions: &mut Vec<Box<dyn Mission>>) -> Result<(), String> {
        missions.push(Box::new(Recorder {
            label: self.label.clone(),
            journal: self.journal.clone(),
            explode: self.explode,
        }));

        Ok(())
    }
}

fn register(types: &mut OperationTypes, prefix: &str, priority: OperationPriority, journal: &Journal, explode: Option<&'static str>) {
    let journal = journal.clone();

    types.register(prefix, move |name| {
        Ok(Box::new(RecordingOperation {
            priority,
            label: name.to_owned(),
            journal: journal.clone(),
            explode,
        }))
    });
}

fn room() -> RoomName {
    RoomName::new("E1S1").unwrap()
}

fn setup(explode: Option<&'static str>) -> (SimHost, Environment, Journal) {
    let sim = SimHost::new();
    sim.add_room(room(), RoomTerrain::plains(), true);

    // Discovered in flag order, run in priority order.
    sim.add_flag("late_B", Position::new(10, 10, room()));
    sim.add_flag("early_A", Position::new(20, 20, room()));

    let journal: Journal = Arc::new(Mutex::new(Vec::new()));

    let mut types = OperationTypes::new();
    register(&mut types, "early", OperationPriority::High, &journal, explode);
    register(&mut types, "late", OperationPriority::Low, &journal, None);

    let environment = Environment::with_types(sim.clone(), types);

    (sim, environment, journal)
}

#[test]
fn phases_run_in_lockstep_across_operations() {
    let (_sim, mut environment, journal) = setup(None);

    environment.tick();

    let entries = journal.lock().unwrap().clone();

    assert_eq!(
        entries,
        vec![
            "A.init",
            "B.init",
            "A.roleCall",
            "B.roleCall",
            "A.action",
            "B.action",
            "A.invalidateCache",
            "B.invalidateCache",
            "A.finalize",
            "B.finalize",
        ]
    );

    let operations = environment.world().read_resource::<Operations>();

    assert_eq!(operations.len(), 2);
    assert_eq!(operations.get("A").map(|o| o.mission_names()), Some(vec!["recorder"]));
}

#[test]
fn failing_operation_does_not_stop_the_others() {
    let (sim, mut environment, journal) = setup(Some("roleCall"));

    environment.tick();

    let entries = journal.lock().unwrap().clone();

    assert!(!entries.contains(&"A.roleCall".to_owned()));
    assert!(entries.contains(&"B.roleCall".to_owned()));
    assert!(entries.contains(&"A.action".to_owned()));
    assert!(entries.contains(&"B.finalize".to_owned()));

    // The tick completed and cleared its progress record.
    let memory = RootMemory::load(&sim.with(|state| state.memory.clone()));

    assert!(memory.timeout_tracker.is_none());
}

#[test]
fn truncated_tick_is_reported() {
    let (sim, mut environment, _journal) = setup(None);

    sim.with(|state| {
        state.memory = r#"{"timeoutTracker":{"phase":"roleCall","operation":"A","mission":"recorder"}}"#.to_owned();
    });

    environment.tick();

    let memory = RootMemory::load(&sim.with(|state| state.memory.clone()));

    assert_eq!(memory.notifier.len(), 1);
    assert!(memory.notifier.entries().any(|entry| entry.message.contains("operation: A, mission: recorder, phase: roleCall")));
}

#[test]
fn memory_of_dead_creeps_is_collected() {
    let (sim, mut environment, _journal) = setup(None);

    sim.add_creep("alive", Position::new(5, 5, room()), &[Part::Move], true);
    sim.with(|state| {
        state.memory = r#"{"creeps":{"alive":{"version":1},"ghost":{"version":1}},"operations":"not a map"}"#.to_owned();
    });

    environment.tick();

    let memory = RootMemory::load(&sim.with(|state| state.memory.clone()));

    assert!(memory.creeps.contains_key("alive"));
    assert!(!memory.creeps.contains_key("ghost"));
    assert!(memory.next_gc.is_some());
}

#[test]
fn memory_reset_keeps_feature_switches() {
    let (sim, mut environment, _journal) = setup(None);

    sim.with(|state| {
        state.memory = r#"{"creeps":{"ghost":{"version":1}},"_features":{"reset":{"memory":true},"paving":{"on":false}}}"#.to_owned();
    });

    environment.tick();

    let memory = RootMemory::load(&sim.with(|state| state.memory.clone()));

    assert!(memory.creeps.is_empty());
    assert!(!screeps_bonzai::features::paving::on(&memory.features));
    assert!(!screeps_bonzai::features::reset::reset_memory(&memory.features));
}
