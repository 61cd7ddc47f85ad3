use super::data::*;
use super::operationsystem::*;
use crate::constants::*;
use crate::missions::missionsystem::*;
use crate::missions::paver::*;

pub const PAVER_OPERATION: &str = "paver";

/// Maintains the roads of the flag room and the road leading to it. Only spawn groups close
/// enough to pave to the flag serve it.
#[derive(Default)]
pub struct PaverOperation;

impl PaverOperation {
    pub fn new() -> PaverOperation {
        PaverOperation
    }
}

impl Operation for PaverOperation {
    fn priority(&self) -> OperationPriority {
        OperationPriority::Medium
    }

    fn spawn_distance(&self) -> u32 {
        PAVE_MAX_ROOM_DISTANCE
    }

    fn init(&mut self, _system_data: &mut MissionExecutionSystemData, runtime_data: &OperationExecutionRuntimeData, missions: &mut Vec<Box<dyn Mission>>) -> Result<(), String> {
        if runtime_data.spawn_group.is_none() {
            return Err(format!("No spawn group can serve {}", runtime_data.name));
        }

        missions.push(Box::new(PaverMission::new()));

        Ok(())
    }
}
