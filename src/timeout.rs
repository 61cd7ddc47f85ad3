//! Diagnoses ticks that were cut short. The scheduler writes its current position in memory as
//! it goes and removes the record at the end of the tick; a record still present at the start of
//! the next tick means the previous one never finished.

use crate::notifier::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutRecord {
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
}

pub fn init(record: &mut Option<TimeoutRecord>, notifier: &mut Notifier, time: u32) {
    if let Some(previous) = record.take() {
        notifier.log(
            time,
            &format!(
                "TIMEOUT: operation: {}, mission: {}, phase: {}",
                previous.operation.as_deref().unwrap_or("none"),
                previous.mission.as_deref().unwrap_or("none"),
                previous.phase
            ),
            5,
        );
    }

    *record = Some(TimeoutRecord {
        phase: "pre-operation init".to_owned(),
        operation: None,
        mission: None,
    });
}

pub fn log(record: &mut Option<TimeoutRecord>, phase: &str, operation: Option<&str>, mission: Option<&str>) {
    let record = record.get_or_insert_with(TimeoutRecord::default);

    record.phase = phase.to_owned();
    record.operation = operation.map(str::to_owned);
    record.mission = mission.map(str::to_owned);
}

pub fn finalize(record: &mut Option<TimeoutRecord>) {
    *record = None;
}
