use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::debug;

use crate::types::timer::{Timer, TimerStatus};

/// Identifies one `GET /api/timers` request. Tickets are issued in request
/// order, so a response carrying an older ticket than the last applied one is
/// stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Displayed state of one recipe step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Idle,
    Running,
    Completed,
}

/// Last applied server snapshot, keyed by client step id.
#[derive(Debug, Default)]
pub struct TimerBoard {
    timers: BTreeMap<String, Timer>,
    issued: u64,
    applied: u64,
}

impl TimerBoard {
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Replaces the whole snapshot, unless a newer response was applied already.
    pub fn apply(&mut self, ticket: FetchTicket, timers: Vec<Timer>) -> bool {
        if ticket.0 <= self.applied {
            debug!(ticket = ticket.0, applied = self.applied, "discarding stale timer response");
            return false;
        }
        self.applied = ticket.0;
        self.timers = index_by_step(timers);
        true
    }

    pub fn get(&self, step_id: &str) -> Option<&Timer> {
        self.timers.get(step_id)
    }

    pub fn status(&self, step_id: &str) -> StepStatus {
        match self.timers.get(step_id).map(|timer| timer.status) {
            None => StepStatus::Idle,
            Some(TimerStatus::Running) => StepStatus::Running,
            Some(TimerStatus::Completed) => StepStatus::Completed,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.values()
    }

    pub fn running(&self) -> impl Iterator<Item = &Timer> {
        self.iter()
            .filter(|timer| timer.status == TimerStatus::Running)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

// The server does not enforce one timer per step; a running timer wins over a
// completed one, then the newest id.
fn index_by_step(timers: Vec<Timer>) -> BTreeMap<String, Timer> {
    let mut indexed = BTreeMap::new();
    for timer in timers {
        match indexed.entry(timer.client_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(timer);
            }
            Entry::Occupied(mut slot) => {
                if rank(&timer) > rank(slot.get()) {
                    slot.insert(timer);
                }
            }
        }
    }
    indexed
}

fn rank(timer: &Timer) -> (bool, i64) {
    (timer.status == TimerStatus::Running, timer.id)
}
