use std::collections::BTreeMap;
use std::time::Duration;

use time::OffsetDateTime;

use crate::recipes;
use crate::timers::board::{StepStatus, TimerBoard};

/// Local countdowns for running steps, all advanced by one shared tick.
///
/// Countdowns are a rendering aid only: one reaching zero removes itself and
/// asks for a refetch, it never marks the step completed.
#[derive(Debug, Default)]
pub struct Countdowns {
    entries: BTreeMap<String, Countdown>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub timer_id: i64,
    pub expiry: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tick {
    /// Steps whose countdown reached zero on this tick.
    pub expired: Vec<String>,
    pub refresh_due: bool,
}

impl Countdowns {
    /// Rebuilds the set from the board. Previous countdowns are dropped first.
    /// A running timer already past its expiry gets no countdown; the regular
    /// poll picks up its completion.
    pub fn render(&mut self, board: &TimerBoard, now: OffsetDateTime) {
        self.entries.clear();
        for timer in board.running() {
            if remaining_until(now, timer.expiry_time).is_none() {
                continue;
            }
            self.entries.insert(
                timer.client_id.clone(),
                Countdown {
                    timer_id: timer.id,
                    expiry: timer.expiry_time,
                },
            );
        }
    }

    pub fn active(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, step_id: &str) -> Option<&Countdown> {
        self.entries.get(step_id)
    }

    pub fn remaining(&self, step_id: &str, now: OffsetDateTime) -> Option<Duration> {
        let countdown = self.entries.get(step_id)?;
        Some(remaining_until(now, countdown.expiry).unwrap_or(Duration::ZERO))
    }

    pub fn tick(&mut self, now: OffsetDateTime) -> Tick {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, countdown)| remaining_until(now, countdown.expiry).is_none())
            .map(|(step_id, _)| step_id.clone())
            .collect();
        for step_id in &expired {
            self.entries.remove(step_id);
        }
        Tick {
            refresh_due: !expired.is_empty(),
            expired,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn remaining_until(now: OffsetDateTime, at: OffsetDateTime) -> Option<Duration> {
    let delay = at - now;
    if delay.is_positive() {
        match delay.try_into() {
            Ok(std_delay) => Some(std_delay),
            Err(_) => Some(Duration::MAX),
        }
    } else {
        None
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepDisplay {
    Idle,
    Running { timer_id: i64, remaining: Duration },
    Completed { timer_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRow {
    pub step_id: String,
    pub label: String,
    pub display: StepDisplay,
}

impl StepRow {
    pub fn status_text(&self) -> String {
        match &self.display {
            StepDisplay::Idle => "idle".to_string(),
            StepDisplay::Running { remaining, .. } => {
                format!("running {}", format_remaining(*remaining))
            }
            StepDisplay::Completed { .. } => "completed".to_string(),
        }
    }
}

/// Rows for every catalogue step, followed by server timers for steps the
/// catalogue does not know.
pub fn step_rows(board: &TimerBoard, countdowns: &Countdowns, now: OffsetDateTime) -> Vec<StepRow> {
    let mut rows: Vec<StepRow> = recipes::steps()
        .map(|(recipe, step)| StepRow {
            step_id: step.id.to_string(),
            label: format!("{} / {}", recipe.title, step.text),
            display: display_for(board, countdowns, step.id, now),
        })
        .collect();

    for timer in board.iter() {
        if recipes::find_step(&timer.client_id).is_none() {
            rows.push(StepRow {
                step_id: timer.client_id.clone(),
                label: timer.client_id.clone(),
                display: display_for(board, countdowns, &timer.client_id, now),
            });
        }
    }
    rows
}

fn display_for(
    board: &TimerBoard,
    countdowns: &Countdowns,
    step_id: &str,
    now: OffsetDateTime,
) -> StepDisplay {
    let Some(timer) = board.get(step_id) else {
        return StepDisplay::Idle;
    };
    match board.status(step_id) {
        StepStatus::Idle => StepDisplay::Idle,
        StepStatus::Running => StepDisplay::Running {
            timer_id: timer.id,
            remaining: countdowns.remaining(step_id, now).unwrap_or(Duration::ZERO),
        },
        StepStatus::Completed => StepDisplay::Completed { timer_id: timer.id },
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::testing::{base_time, timer};
    use crate::types::timer::TimerStatus;

    fn board_with(timers: Vec<crate::types::timer::Timer>) -> TimerBoard {
        let mut board = TimerBoard::default();
        let ticket = board.begin_fetch();
        board.apply(ticket, timers);
        board
    }

    #[test]
    fn remaining_until__should_return_none_for_past_and_now() {
        let now = base_time();

        assert!(remaining_until(now, now - time::Duration::seconds(5)).is_none());
        assert!(remaining_until(now, now).is_none());
        assert_eq!(
            remaining_until(now, now + time::Duration::milliseconds(1500)),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn format_remaining__should_switch_to_hours_at_one_hour() {
        assert_eq!(format_remaining(Duration::from_secs(3599)), "59:59");
        assert_eq!(format_remaining(Duration::from_secs(3600)), "1:00:00");
        assert_eq!(format_remaining(Duration::from_secs(7)), "00:07");
        assert_eq!(format_remaining(Duration::from_millis(999)), "00:00");
    }

    #[test]
    fn render__should_not_accumulate_countdowns_across_renders() {
        // Given
        let now = base_time();
        let mut countdowns = Countdowns::default();
        let board = board_with(vec![
            timer(1, "dough_1", TimerStatus::Running, now + time::Duration::minutes(60)),
            timer(2, "dough_2", TimerStatus::Completed, now),
            timer(3, "chicken_1", TimerStatus::Running, now + time::Duration::minutes(5)),
        ]);

        // When
        for _ in 0..10 {
            countdowns.render(&board, now);
        }

        // Then
        assert_eq!(countdowns.active(), 2);

        // When
        let board = board_with(vec![timer(
            1,
            "dough_1",
            TimerStatus::Running,
            now + time::Duration::minutes(60),
        )]);
        countdowns.render(&board, now);

        // Then
        assert_eq!(countdowns.active(), 1);
        assert!(countdowns.get("chicken_1").is_none());
    }

    #[test]
    fn tick__should_stop_expired_countdown_and_request_refresh_without_completing() {
        // Given
        let now = base_time();
        let board = board_with(vec![
            timer(1, "test_1", TimerStatus::Running, now + time::Duration::seconds(2)),
            timer(2, "dough_1", TimerStatus::Running, now + time::Duration::minutes(60)),
        ]);
        let mut countdowns = Countdowns::default();
        countdowns.render(&board, now);

        // When
        let first = countdowns.tick(now + time::Duration::seconds(1));
        let second = countdowns.tick(now + time::Duration::seconds(2));

        // Then
        assert_eq!(first, Tick::default());
        assert_eq!(second.expired, vec!["test_1".to_string()]);
        assert!(second.refresh_due);
        assert_eq!(countdowns.active(), 1);
        assert_eq!(board.status("test_1"), StepStatus::Running);
        let rows = step_rows(&board, &countdowns, now + time::Duration::seconds(3));
        let row = rows.iter().find(|r| r.step_id == "test_1").expect("row");
        assert_eq!(
            row.display,
            StepDisplay::Running {
                timer_id: 1,
                remaining: Duration::ZERO
            }
        );
    }

    #[test]
    fn render__should_skip_running_timers_already_past_expiry() {
        // Given
        let now = base_time();
        let board = board_with(vec![
            timer(1, "test_1", TimerStatus::Running, now - time::Duration::seconds(1)),
            timer(2, "dough_2", TimerStatus::Running, now),
            timer(3, "dough_1", TimerStatus::Running, now + time::Duration::minutes(60)),
        ]);
        let mut countdowns = Countdowns::default();

        // When
        countdowns.render(&board, now);
        let tick = countdowns.tick(now + time::Duration::seconds(1));

        // Then
        assert_eq!(countdowns.active(), 1);
        assert!(countdowns.get("test_1").is_none());
        assert_eq!(tick, Tick::default());
    }

    #[test]
    fn step_rows__should_show_catalogue_steps_and_unknown_server_steps() {
        // Given
        let now = base_time();
        let board = board_with(vec![
            timer(7, "dough_1", TimerStatus::Running, now + time::Duration::seconds(3600)),
            timer(8, "legacy_step", TimerStatus::Completed, now),
        ]);
        let mut countdowns = Countdowns::default();
        countdowns.render(&board, now);

        // When
        let rows = step_rows(&board, &countdowns, now + time::Duration::seconds(1));

        // Then
        let dough = rows.iter().find(|r| r.step_id == "dough_1").expect("dough row");
        assert_eq!(dough.status_text(), "running 59:59");
        let idle = rows.iter().find(|r| r.step_id == "dough_2").expect("idle row");
        assert_eq!(idle.display, StepDisplay::Idle);
        let legacy = rows.last().expect("legacy row");
        assert_eq!(legacy.step_id, "legacy_step");
        assert_eq!(legacy.display, StepDisplay::Completed { timer_id: 8 });
    }
}
