use crate::error::ClientError;
use crate::ports::{Confirmer, TimeProvider, TimerApi};
use crate::state::ClientState;
use crate::types::push::Subscription;
use crate::ports::ApiError;
use crate::types::timer::{HealthReport, StartTimerRequest, StartedTimer};

pub mod board;
pub mod countdown;

pub use board::{FetchTicket, StepStatus, TimerBoard};
pub use countdown::{Countdowns, StepDisplay, StepRow, Tick, format_remaining};

use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAllOutcome {
    Cancelled,
    Declined,
}

/// Keeps the local timer snapshot in step with the server. The server is the
/// only source of status transitions; every action ends with a refetch.
pub struct TimerSync<A, T> {
    api: A,
    time: T,
}

impl<A, T> TimerSync<A, T>
where
    A: TimerApi,
    T: TimeProvider,
{
    pub fn new(api: A, time: T) -> Self {
        Self { api, time }
    }

    /// Fetches the timer set for `endpoint` and replaces the local snapshot.
    /// Failures are logged and the current snapshot is kept.
    pub async fn fetch_timers(&self, state: &mut ClientState, endpoint: &str) -> bool {
        let ticket = state.timers.begin_fetch();
        match self.api.list_timers(endpoint).await {
            Ok(timers) => {
                let count = timers.len();
                let applied = state.timers.apply(ticket, timers);
                if applied {
                    debug!(count, "timer snapshot applied");
                    self.render(state);
                }
                applied
            }
            Err(err) => {
                warn!(error = %err, "timer poll failed; keeping current state");
                false
            }
        }
    }

    pub fn render(&self, state: &mut ClientState) {
        state.countdowns.render(&state.timers, self.time.now());
    }

    pub fn tick(&self, state: &mut ClientState) -> Tick {
        let tick = state.countdowns.tick(self.time.now());
        if tick.refresh_due {
            debug!(expired = ?tick.expired, "countdown reached zero; refresh requested");
        }
        tick
    }

    pub fn rows(&self, state: &ClientState) -> Vec<StepRow> {
        countdown::step_rows(&state.timers, &state.countdowns, self.time.now())
    }

    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        self.api.health().await
    }

    pub async fn start_timer(
        &self,
        state: &mut ClientState,
        subscription: Option<&Subscription>,
        step_id: &str,
        minutes: u32,
        message: &str,
    ) -> Result<StartedTimer, ClientError> {
        let subscription = subscription.ok_or(ClientError::NoSubscription)?;
        if minutes == 0 {
            return Err(ClientError::InvalidMinutes(minutes));
        }

        let request = StartTimerRequest {
            minutes,
            client_id: step_id.to_string(),
            message: message.to_string(),
            subscription: subscription.clone(),
        };
        let started = self.api.start_timer(&request).await?;
        info!(step_id, timer_id = started.timer_id, minutes, "timer started");
        self.fetch_timers(state, &subscription.endpoint).await;
        Ok(started)
    }

    pub async fn cancel_timer(
        &self,
        state: &mut ClientState,
        subscription: Option<&Subscription>,
        timer_id: i64,
    ) -> Result<(), ClientError> {
        let subscription = subscription.ok_or(ClientError::NoSubscription)?;
        self.api.cancel_timer(timer_id).await?;
        info!(timer_id, "timer cancelled");
        self.fetch_timers(state, &subscription.endpoint).await;
        Ok(())
    }

    pub async fn cancel_all<C: Confirmer>(
        &self,
        state: &mut ClientState,
        subscription: Option<&Subscription>,
        confirmer: &mut C,
    ) -> Result<CancelAllOutcome, ClientError> {
        let subscription = subscription.ok_or(ClientError::NoSubscription)?;
        if !confirmer.confirm("Cancel all timers? This cannot be undone.") {
            debug!("cancel-all declined");
            return Ok(CancelAllOutcome::Declined);
        }
        self.api.cancel_all(subscription).await?;
        info!("all timers cancelled");
        self.fetch_timers(state, &subscription.endpoint).await;
        Ok(CancelAllOutcome::Cancelled)
    }
}
