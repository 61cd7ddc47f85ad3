use crate::constants::*;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifierEntry {
    pub time: u32,
    pub message: String,
    #[serde(default)]
    pub severity: u8,
}

/// Notable events kept in memory for the operator to review later. Capped, oldest first out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notifier {
    entries: VecDeque<NotifierEntry>,
}

impl Notifier {
    pub fn new() -> Notifier {
        Notifier::default()
    }

    /// Severity 0 is plain output, 5 is the most severe.
    pub fn log(&mut self, time: u32, message: &str, severity: u8) {
        match severity {
            0..=2 => info!("{}", message),
            3 | 4 => warn!("{}", message),
            _ => error!("{}", message),
        }

        self.entries.push_back(NotifierEntry {
            time,
            message: message.to_owned(),
            severity,
        });

        while self.entries.len() > NOTIFIER_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &NotifierEntry> {
        self.entries.iter()
    }

    /// Render up to `limit` entries, oldest first, with their approximate age. With
    /// `burn_after_reading` the same number of entries is dropped afterwards.
    pub fn review(&mut self, time: u32, limit: usize, burn_after_reading: bool) -> Vec<String> {
        let total = self.entries.len();

        let mut lines: Vec<String> = self
            .entries
            .iter()
            .take(limit)
            .map(|entry| {
                let seconds_elapsed = time.saturating_sub(entry.time) * 3;

                format!(
                    "{} (roughly {}m {}s ago) {}",
                    entry.time,
                    seconds_elapsed / 60,
                    seconds_elapsed % 60,
                    entry.message
                )
            })
            .collect();

        lines.push(format!("viewing {} of {} notifications", lines.len(), total));

        if burn_after_reading {
            let count = limit.min(self.entries.len());

            self.entries.drain(..count);
        }

        lines
    }

    /// Remove every entry whose message contains `term` (case insensitive), or all entries when
    /// no term is given. Returns the number removed.
    pub fn clear(&mut self, term: Option<&str>) -> usize {
        let before = self.entries.len();

        match term {
            Some(term) => {
                let term = term.to_lowercase();

                self.entries.retain(|entry| !entry.message.to_lowercase().contains(&term));
            }
            None => self.entries.clear(),
        }

        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_evicted_past_capacity() {
        let mut notifier = Notifier::new();

        for i in 0..(NOTIFIER_CAPACITY as u32 + 5) {
            notifier.log(i, &format!("event {}", i), 0);
        }

        assert_eq!(notifier.len(), NOTIFIER_CAPACITY);
        assert_eq!(notifier.entries().next().map(|e| e.time), Some(5));
    }

    #[test]
    fn clear_by_term_is_case_insensitive() {
        let mut notifier = Notifier::new();
        notifier.log(1, "TIMEOUT in scout", 5);
        notifier.log(2, "spawned paver", 1);

        assert_eq!(notifier.clear(Some("timeout")), 1);
        assert_eq!(notifier.len(), 1);
        assert_eq!(notifier.clear(None), 1);
        assert!(notifier.is_empty());
    }

    #[test]
    fn review_can_burn_entries() {
        let mut notifier = Notifier::new();
        notifier.log(10, "a", 1);
        notifier.log(20, "b", 1);
        notifier.log(30, "c", 1);

        let lines = notifier.review(50, 2, true);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("10 (roughly 2m 0s ago) a"));
        assert_eq!(lines[2], "viewing 2 of 3 notifications");
        assert_eq!(notifier.len(), 1);
    }
}
