use crate::config::WorkerConfig;
use crate::error::ClientError;
use crate::ports::{LocalStore, PushPlatform, TimeProvider, TimerApi};
use crate::state::ClientState;
use crate::types::push::{Permission, Subscription, WorkerRegistration, WorkerState};

pub mod cache;
pub mod keys;
pub mod strategy;

use std::time::Duration;

use tracing::{debug, error, info, warn};

use cache::SubscriptionCache;
use strategy::STRATEGIES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Subscribed(Subscription),
    NotSubscribed,
}

/// Owns the single push subscription: worker registration, creation,
/// persistence and recovery from stale local state.
pub struct SubscriptionManager<P, A, S, T> {
    platform: P,
    api: A,
    cache: SubscriptionCache<S>,
    time: T,
    worker: WorkerConfig,
    server_key: Option<String>,
}

impl<P, A, S, T> SubscriptionManager<P, A, S, T>
where
    P: PushPlatform,
    A: TimerApi,
    S: LocalStore,
    T: TimeProvider,
{
    pub fn new(
        platform: P,
        api: A,
        store: S,
        time: T,
        worker: WorkerConfig,
        server_key: Option<String>,
    ) -> Self {
        Self {
            platform,
            api,
            cache: SubscriptionCache::new(store),
            time,
            worker,
            server_key,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn cache(&self) -> &SubscriptionCache<S> {
        &self.cache
    }

    /// Registers the push worker from scratch and waits for it to activate,
    /// retrying with exponential backoff.
    pub async fn ensure_service_worker_ready(
        &self,
        state: &mut ClientState,
    ) -> Result<WorkerRegistration, ClientError> {
        if let Some(missing) = self.platform.support().missing() {
            return Err(ClientError::Unsupported(missing));
        }
        state.registration = None;

        let attempts = self.worker.registration_attempts.max(1);
        let mut attempt = 1;
        loop {
            info!(attempt, attempts, script = %self.worker.script, "registering push worker");
            match self.register_once().await {
                Ok(registration) => {
                    info!(scope = %registration.scope, "push worker active");
                    state.registration = Some(registration.clone());
                    return Ok(registration);
                }
                Err(err) if attempt >= attempts => {
                    error!(error = %err, attempt, "push worker registration failed");
                    return Err(err);
                }
                Err(err) => {
                    let delay = backoff_delay(self.worker.registration_backoff, attempt);
                    warn!(error = %err, attempt, ?delay, "push worker registration failed; retrying");
                    self.time.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn register_once(&self) -> Result<WorkerRegistration, ClientError> {
        let removed = self.platform.unregister_all().await?;
        if removed > 0 {
            debug!(removed, "unregistered previous push workers");
            self.time.sleep(self.worker.settle_delay).await;
        }
        let registration = self
            .platform
            .register(&self.worker.script, &self.worker.scope)
            .await?;
        self.wait_for_activation(&registration).await?;
        Ok(registration)
    }

    async fn wait_for_activation(&self, registration: &WorkerRegistration) -> Result<(), ClientError> {
        let timeout = self.worker.activation_timeout;
        let deadline = self.time.now() + timeout;
        loop {
            match self.platform.worker_state(registration).await? {
                WorkerState::Activated => return Ok(()),
                WorkerState::Redundant => return Err(ClientError::WorkerRedundant),
                pending => {
                    if self.time.now() >= deadline {
                        return Err(ClientError::WorkerActivationTimeout { waited: timeout });
                    }
                    debug!(state = ?pending, "waiting for push worker activation");
                    self.time.sleep(self.worker.activation_poll).await;
                }
            }
        }
    }

    /// Creates a fresh subscription, replacing any previous one. The worker is
    /// always registered anew, so a leftover registration is never trusted.
    pub async fn subscribe(&self, state: &mut ClientState) -> Result<Subscription, ClientError> {
        self.ensure_service_worker_ready(state).await?;
        if !self.platform.is_online() {
            return Err(ClientError::NetworkUnavailable);
        }
        let permission = self.platform.request_permission().await;
        if permission != Permission::Granted {
            info!(permission = permission.label(), "notification permission not granted");
            return Err(ClientError::PermissionDenied);
        }

        self.remove_existing().await?;
        let key = keys::decode_server_key(self.server_key.as_deref())?;

        let mut failures = Vec::new();
        for strategy in &STRATEGIES {
            if !strategy.delay.is_zero() {
                self.time.sleep(strategy.delay).await;
            }
            match self.platform.subscribe(&strategy.options(&key)).await {
                Ok(subscription) if subscription.endpoint.trim().is_empty() => {
                    warn!(strategy = strategy.name, "subscription came back without an endpoint");
                    if let Err(err) = self.platform.unsubscribe(&subscription).await {
                        warn!(strategy = strategy.name, error = %err, "failed to drop endpointless subscription");
                    }
                    failures.push(format!("{}: missing endpoint", strategy.name));
                }
                Ok(subscription) => {
                    info!(
                        strategy = strategy.name,
                        endpoint = %short_endpoint(&subscription.endpoint),
                        "push subscription created"
                    );
                    return Ok(subscription);
                }
                Err(err) => {
                    warn!(strategy = strategy.name, error = %err, "subscribe attempt failed");
                    failures.push(format!("{}: {err}", strategy.name));
                }
            }
        }

        Err(ClientError::SubscriptionCreationFailed {
            reason: failures.join("; "),
        })
    }

    async fn remove_existing(&self) -> Result<(), ClientError> {
        let Some(existing) = self.platform.get_subscription().await? else {
            return Ok(());
        };
        info!(endpoint = %short_endpoint(&existing.endpoint), "removing previous push subscription");
        self.platform.unsubscribe(&existing).await?;
        if self.platform.get_subscription().await?.is_some() {
            return Err(ClientError::SubscriptionCreationFailed {
                reason: "previous subscription is still active".to_string(),
            });
        }
        self.cache.forget()?;
        Ok(())
    }

    /// Sends the subscription to the server, then records it locally.
    pub async fn persist(&self, subscription: &Subscription) -> Result<(), ClientError> {
        self.api.register_subscription(subscription).await?;
        self.cache.remember(subscription)?;
        debug!(endpoint = %short_endpoint(&subscription.endpoint), "subscription persisted");
        Ok(())
    }

    /// The live platform subscription, provided the local cache agrees with it.
    /// A disagreement clears the cache and reports no subscription.
    pub async fn current_subscription(&self) -> Result<Option<Subscription>, ClientError> {
        let live = self.platform.get_subscription().await?;
        let flagged = self.cache.is_subscribed();
        match live {
            Some(live)
                if flagged
                    && self
                        .cache
                        .cached()
                        .is_none_or(|cached| cached.endpoint == live.endpoint) =>
            {
                Ok(Some(live))
            }
            live => {
                if flagged || live.is_some() {
                    warn!(
                        flagged,
                        live = live.is_some(),
                        "local subscription state disagrees with platform; treating as not subscribed"
                    );
                    self.cache.forget()?;
                }
                Ok(None)
            }
        }
    }

    pub async fn status(&self) -> SubscriptionStatus {
        match self.current_subscription().await {
            Ok(Some(subscription)) => SubscriptionStatus::Subscribed(subscription),
            Ok(None) => SubscriptionStatus::NotSubscribed,
            Err(err) => {
                warn!(error = %err, "failed to check subscription status");
                SubscriptionStatus::NotSubscribed
            }
        }
    }

    /// Unsubscribes, drops the local cache and unregisters every worker.
    pub async fn clear(&self, state: &mut ClientState) -> Result<(), ClientError> {
        if let Some(subscription) = self.platform.get_subscription().await? {
            self.platform.unsubscribe(&subscription).await?;
        }
        self.cache.forget()?;
        let removed = self.platform.unregister_all().await?;
        state.registration = None;
        info!(removed, "push state cleared");
        Ok(())
    }
}

pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1 << exponent)
}

pub(crate) fn short_endpoint(endpoint: &str) -> &str {
    match endpoint.char_indices().nth(50) {
        Some((idx, _)) => &endpoint[..idx],
        None => endpoint,
    }
}
