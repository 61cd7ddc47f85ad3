use super::data::*;
use super::operationsystem::*;
use crate::missions::missionsystem::*;
use crate::missions::scout::*;

pub const SCOUT_OPERATION: &str = "scout";

/// Keeps vision of the flag room.
#[derive(Default)]
pub struct ScoutOperation;

impl ScoutOperation {
    pub fn new() -> ScoutOperation {
        ScoutOperation
    }
}

impl Operation for ScoutOperation {
    fn priority(&self) -> OperationPriority {
        OperationPriority::Low
    }

    fn init(&mut self, _system_data: &mut MissionExecutionSystemData, _runtime_data: &OperationExecutionRuntimeData, missions: &mut Vec<Box<dyn Mission>>) -> Result<(), String> {
        missions.push(Box::new(ScoutMission::new()));

        Ok(())
    }
}
