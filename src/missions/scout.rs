use super::body::*;
use super::headcount::*;
use super::missionsystem::*;
use crate::creep::agent::*;
use log::*;

pub const SCOUT_ROLE: &str = "scout";

/// Keeps one scout parked at the flag while the flag room has no other source of vision.
#[derive(Default)]
pub struct ScoutMission {
    scouts: Vec<Agent>,
}

impl ScoutMission {
    pub fn new() -> ScoutMission {
        ScoutMission::default()
    }
}

impl Mission for ScoutMission {
    fn name(&self) -> &str {
        SCOUT_ROLE
    }

    fn role_call(&mut self, system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        let has_vision = runtime_data.has_vision();

        let options = HeadcountOptions {
            blind_spawn: true,
            ..HeadcountOptions::default()
        };

        self.scouts = headcount(
            system_data,
            runtime_data,
            SCOUT_ROLE,
            |_| worker_body(0, 0, 1),
            || if has_vision { 0 } else { 1 },
            &options,
        );

        Ok(())
    }

    fn actions(&mut self, system_data: &mut MissionExecutionSystemData, runtime_data: &MissionExecutionRuntimeData) -> Result<(), String> {
        for scout in self.scouts.iter() {
            if scout.pos().is_near_to(&runtime_data.flag) {
                continue;
            }

            if let Err(err) = scout.avoid_sk(system_data, runtime_data.flag) {
                debug!("Scout unable to reach flag - Scout: {} - Error: {}", scout.name(), err);
            }
        }

        Ok(())
    }
}
