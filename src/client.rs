use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::diagnostics::DiagnosticsReport;
use crate::error::ClientError;
use crate::notice::{Notice, NoticeLevel};
use crate::ports::{Confirmer, LocalStore, PushPlatform, TimeProvider, TimerApi, TimerView};
use crate::recipes;
use crate::state::ClientState;
use crate::subscription::{SubscriptionManager, SubscriptionStatus};
use crate::timers::{CancelAllOutcome, StepRow, Tick, TimerSync};
use crate::types::push::Subscription;
use crate::types::timer::StartedTimer;

/// Input to the watch loop besides its own timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The user is looking at the timers again; poll right away.
    VisibilityRegained,
    Shutdown,
}

/// One client session: the subscription manager and timer synchronizer
/// sharing a single `ClientState`.
pub struct Client<P, A, S, T> {
    config: ClientConfig,
    subscriptions: SubscriptionManager<P, A, S, T>,
    timers: TimerSync<A, T>,
    time: T,
    state: ClientState,
}

impl<P, A, S, T> Client<P, A, S, T>
where
    P: PushPlatform,
    A: TimerApi,
    S: LocalStore,
    T: TimeProvider,
{
    pub fn new(config: ClientConfig, platform: P, api: A, store: S, time: T) -> Self {
        let subscriptions = SubscriptionManager::new(
            platform,
            api.clone(),
            store,
            time.clone(),
            config.worker.clone(),
            config.vapid_public_key.clone(),
        );
        Self {
            timers: TimerSync::new(api, time.clone()),
            subscriptions,
            config,
            time,
            state: ClientState::default(),
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn subscriptions(&self) -> &SubscriptionManager<P, A, S, T> {
        &self.subscriptions
    }

    /// Picks up an existing worker registration and subscription, fetching
    /// timers when subscribed.
    pub async fn initialize(&mut self) -> SubscriptionStatus {
        match self.subscriptions.platform().registration().await {
            Ok(registration) => self.state.registration = registration,
            Err(err) => warn!(error = %err, "failed to look up worker registration"),
        }
        let status = self.subscriptions.status().await;
        match &status {
            SubscriptionStatus::Subscribed(subscription) => {
                info!("push subscription found");
                self.timers
                    .fetch_timers(&mut self.state, &subscription.endpoint)
                    .await;
            }
            SubscriptionStatus::NotSubscribed => info!("not subscribed to push notifications"),
        }
        status
    }

    pub async fn status(&self) -> SubscriptionStatus {
        self.subscriptions.status().await
    }

    /// Subscribes, registers the subscription with the server and loads the
    /// timers that belong to it.
    pub async fn enable_notifications(&mut self) -> Result<Subscription, ClientError> {
        let result = self.subscribe_and_persist().await;
        if result.is_ok() {
            self.state.notices.push(
                NoticeLevel::Success,
                "Push notifications enabled.",
                Vec::new(),
                self.time.now(),
            );
        }
        self.reported(result)
    }

    async fn subscribe_and_persist(&mut self) -> Result<Subscription, ClientError> {
        let subscription = self.subscriptions.subscribe(&mut self.state).await?;
        self.subscriptions.persist(&subscription).await?;
        self.timers
            .fetch_timers(&mut self.state, &subscription.endpoint)
            .await;
        Ok(subscription)
    }

    async fn live_subscription(&self) -> Result<Option<Subscription>, ClientError> {
        self.subscriptions.current_subscription().await
    }

    pub async fn start_timer(
        &mut self,
        step_id: &str,
        minutes: u32,
        message: &str,
    ) -> Result<StartedTimer, ClientError> {
        let result = match self.live_subscription().await {
            Ok(subscription) => {
                self.timers
                    .start_timer(
                        &mut self.state,
                        subscription.as_ref(),
                        step_id,
                        minutes,
                        message,
                    )
                    .await
            }
            Err(err) => Err(err),
        };
        self.reported(result)
    }

    /// Starts the catalogue timer for a recipe step.
    pub async fn start_step(&mut self, step_id: &str) -> Result<StartedTimer, ClientError> {
        let Some((recipe, step)) = recipes::find_step(step_id) else {
            return self.reported(Err(ClientError::UnknownStep(step_id.to_string())));
        };
        let message = recipes::timer_message(recipe, step.minutes);
        self.start_timer(step.id, step.minutes, &message).await
    }

    pub async fn cancel_timer(&mut self, timer_id: i64) -> Result<(), ClientError> {
        let result = match self.live_subscription().await {
            Ok(subscription) => {
                self.timers
                    .cancel_timer(&mut self.state, subscription.as_ref(), timer_id)
                    .await
            }
            Err(err) => Err(err),
        };
        self.reported(result)
    }

    pub async fn cancel_all<C: Confirmer>(
        &mut self,
        confirmer: &mut C,
    ) -> Result<CancelAllOutcome, ClientError> {
        let result = match self.live_subscription().await {
            Ok(subscription) => {
                self.timers
                    .cancel_all(&mut self.state, subscription.as_ref(), confirmer)
                    .await
            }
            Err(err) => Err(err),
        };
        self.reported(result)
    }

    /// Polls the server for the current subscription's timers. Failures only
    /// log.
    pub async fn refresh(&mut self) -> bool {
        match self.live_subscription().await {
            Ok(Some(subscription)) => {
                self.timers
                    .fetch_timers(&mut self.state, &subscription.endpoint)
                    .await
            }
            Ok(None) => {
                debug!("skipping timer poll without a subscription");
                false
            }
            Err(err) => {
                warn!(error = %err, "timer poll skipped");
                false
            }
        }
    }

    /// Advances the countdowns; a countdown reaching zero triggers a poll.
    pub async fn tick(&mut self) -> Tick {
        let tick = self.timers.tick(&mut self.state);
        if tick.refresh_due {
            self.refresh().await;
        }
        tick
    }

    pub fn rows(&self) -> Vec<StepRow> {
        self.timers.rows(&self.state)
    }

    pub fn notices(&mut self) -> Vec<Notice> {
        self.state.notices.active(self.time.now()).to_vec()
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        self.state.notices.dismiss(id)
    }

    pub async fn diagnostics(&self) -> DiagnosticsReport {
        let platform = self.subscriptions.platform();
        let registration = match &self.state.registration {
            Some(registration) => Some(registration.clone()),
            None => platform.registration().await.ok().flatten(),
        };
        let worker = match registration {
            Some(registration) => platform.worker_state(&registration).await.ok(),
            None => None,
        };
        DiagnosticsReport {
            support: platform.support(),
            permission: platform.permission(),
            online: platform.is_online(),
            worker,
            subscribed: platform.get_subscription().await.ok().flatten().is_some(),
            cached_flag: self.subscriptions.cache().is_subscribed(),
            server: self.timers.health().await,
        }
    }

    /// Drops every piece of local push state and starts over.
    pub async fn reset(&mut self) -> Result<(), ClientError> {
        let result = self.subscriptions.clear(&mut self.state).await;
        if result.is_ok() {
            let notices = std::mem::take(&mut self.state.notices);
            self.state = ClientState {
                notices,
                ..ClientState::default()
            };
            self.state.notices.push(
                NoticeLevel::Info,
                "All local push data cleared.",
                Vec::new(),
                self.time.now(),
            );
        }
        self.reported(result)
    }

    /// Keeps the view current until shutdown: polls on the configured
    /// interval, ticks countdowns, and polls early when visibility returns.
    pub async fn watch<V: TimerView>(
        &mut self,
        view: &mut V,
        mut events: mpsc::Receiver<ClientEvent>,
    ) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown = tokio::time::interval(self.config.countdown_tick);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(poll = ?self.config.poll_interval, "watching timers");
        self.flush(view);
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.refresh().await;
                }
                _ = countdown.tick() => {
                    self.tick().await;
                }
                event = events.recv() => match event {
                    Some(ClientEvent::VisibilityRegained) => {
                        debug!("visibility regained; polling now");
                        self.refresh().await;
                        poll.reset();
                    }
                    Some(ClientEvent::Shutdown) | None => break,
                },
            }
            self.flush(view);
        }
        info!("stopped watching timers");
    }

    fn flush<V: TimerView>(&mut self, view: &mut V) {
        for notice in self.state.notices.drain() {
            view.notice(&notice);
        }
        view.render(&self.rows());
    }

    fn reported<R>(&mut self, result: Result<R, ClientError>) -> Result<R, ClientError> {
        if let Err(err) = &result {
            warn!(error = %err, "client operation failed");
            self.state.notices.push_error(err, self.time.now());
        }
        result
    }
}
