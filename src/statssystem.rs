use crate::constants::*;
use crate::memorysystem::*;
use crate::world::*;
use serde::{Deserialize, Serialize};
use specs::prelude::*;
use std::collections::VecDeque;

/// Rolling record of CPU use, stored under `cpu`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuMemory {
    pub history: VecDeque<f64>,
    pub average: f64,
}

impl CpuMemory {
    /// Sample every few ticks. Memory serialization costs CPU after the sample is taken, so a small
    /// allowance scaled by GCL is added.
    pub fn record(&mut self, time: u32, cpu_used: f64, gcl: u32) {
        if time % CPU_SAMPLE_INTERVAL != 0 {
            return;
        }

        self.history.push_back(cpu_used + gcl as f64 / 5.0);

        while self.history.len() > CPU_HISTORY_LENGTH {
            self.history.pop_front();
        }

        self.average = self.history.iter().sum::<f64>() / self.history.len() as f64;
    }

    /// Average use as a proportion of the CPU the empire is entitled to at this GCL.
    pub fn proportion_used(&self, gcl: u32) -> f64 {
        self.average / (gcl as f64 * 10.0 + 20.0)
    }

    pub fn under_limit(&self, gcl: u32) -> bool {
        self.proportion_used(gcl) < CPU_THROTTLE_THRESHOLD
    }
}

#[derive(SystemData)]
pub struct CpuStatsSystemData<'a> {
    host: WriteExpect<'a, Host>,
    memory: Write<'a, RootMemory>,
}

pub struct CpuStatsSystem;

impl<'a> System<'a> for CpuStatsSystem {
    type SystemData = CpuStatsSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let host = data.host.get();

        let time = host.time();
        let used = host.cpu_used();
        let gcl = host.gcl_level();

        data.memory.cpu.record(time, used, gcl);
    }
}
