//! In-memory fakes for the ports, shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::ports::{ApiError, PlatformError, PushPlatform, TimeProvider, TimerApi};
use crate::types::push::{
    Permission, PlatformSupport, SubscribeOptions, Subscription, SubscriptionKeys,
    WorkerRegistration, WorkerState,
};
use crate::types::timer::{
    HealthReport, StartTimerRequest, StartedTimer, Timer, TimerStatus,
};

/// A well-formed uncompressed P-256 public key.
pub const SERVER_KEY: &str =
    "BE0_aRw-529C4ZGHk90uZsKzAOexmMhAd24OYd182cE3rYMnFWOq__ODXZfVVzMeVPbpSregGuaLH3yDZqtbx-8";

pub fn base_time() -> OffsetDateTime {
    OffsetDateTime::parse("2025-01-12T09:30:00Z", &Rfc3339).expect("parse base time")
}

pub fn subscription(endpoint: &str) -> Subscription {
    Subscription {
        endpoint: endpoint.to_string(),
        expiration_time: None,
        keys: SubscriptionKeys {
            p256dh: "p256dh-key".to_string(),
            auth: "auth-secret".to_string(),
        },
    }
}

pub fn timer(id: i64, client_id: &str, status: TimerStatus, expiry_time: OffsetDateTime) -> Timer {
    Timer {
        id,
        client_id: client_id.to_string(),
        status,
        expiry_time,
        message: String::new(),
    }
}

/// Clock that advances by exactly the requested amount whenever something
/// sleeps on it.
#[derive(Clone)]
pub struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl Default for TestTime {
    fn default() -> Self {
        Self {
            now: Arc::new(Mutex::new(base_time())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TestTime {
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("now lock");
        *now += duration;
    }

    pub fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }
}

impl TimeProvider for TestTime {
    type Sleep<'a>
        = std::future::Ready<()>
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.advance(duration);
        std::future::ready(())
    }
}

#[derive(Default)]
struct PlatformState {
    support: Option<PlatformSupport>,
    offline: bool,
    permission: Option<Permission>,
    permission_requests: usize,
    registrations: Vec<WorkerRegistration>,
    register_calls: usize,
    worker_states: VecDeque<WorkerState>,
    keep_installing: bool,
    worker_state_polls: usize,
    live: Vec<Subscription>,
    unsubscribe_sticks: bool,
    subscribe_failures: VecDeque<PlatformError>,
    subscribe_calls: Vec<SubscribeOptions>,
    blank_endpoints: usize,
    unsubscribe_failure: Option<PlatformError>,
    created: usize,
}

/// Scriptable push platform. Unless told otherwise it supports everything,
/// is online, grants permission on request and activates workers at once.
#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl FakePlatform {
    fn with_state<R>(&self, f: impl FnOnce(&mut PlatformState) -> R) -> R {
        let mut state = self.state.lock().expect("platform lock");
        f(&mut state)
    }

    pub fn set_push_supported(&self, supported: bool) {
        self.with_state(|state| {
            state.support = Some(PlatformSupport {
                push_manager: supported,
                ..PlatformSupport::full()
            })
        });
    }

    pub fn set_online(&self, online: bool) {
        self.with_state(|state| state.offline = !online);
    }

    pub fn set_permission(&self, permission: Permission) {
        self.with_state(|state| state.permission = Some(permission));
    }

    pub fn permission_requests(&self) -> usize {
        self.with_state(|state| state.permission_requests)
    }

    pub fn add_stale_registrations(&self, count: usize) {
        self.with_state(|state| {
            for idx in 0..count {
                state.registrations.push(WorkerRegistration {
                    script: format!("/old-{idx}.js"),
                    scope: "/".to_string(),
                });
            }
        });
    }

    pub fn registration_count(&self) -> usize {
        self.with_state(|state| state.registrations.len())
    }

    pub fn register_calls(&self) -> usize {
        self.with_state(|state| state.register_calls)
    }

    pub fn script_worker_states(&self, states: Vec<WorkerState>) {
        self.with_state(|state| state.worker_states = states.into());
    }

    pub fn keep_worker_installing(&self) {
        self.with_state(|state| state.keep_installing = true);
    }

    pub fn worker_state_polls(&self) -> usize {
        self.with_state(|state| state.worker_state_polls)
    }

    pub fn seed_live_subscription(&self, subscription: Subscription) {
        self.with_state(|state| state.live.push(subscription));
    }

    pub fn live_subscriptions(&self) -> Vec<Subscription> {
        self.with_state(|state| state.live.clone())
    }

    pub fn make_unsubscribe_stick(&self) {
        self.with_state(|state| state.unsubscribe_sticks = true);
    }

    pub fn script_subscribe_failures(&self, failures: Vec<PlatformError>) {
        self.with_state(|state| state.subscribe_failures = failures.into());
    }

    /// The next `count` subscribe calls succeed without an endpoint.
    pub fn return_blank_endpoints(&self, count: usize) {
        self.with_state(|state| state.blank_endpoints = count);
    }

    pub fn fail_next_unsubscribe(&self, error: PlatformError) {
        self.with_state(|state| state.unsubscribe_failure = Some(error));
    }

    pub fn subscribe_calls(&self) -> Vec<SubscribeOptions> {
        self.with_state(|state| state.subscribe_calls.clone())
    }
}

impl PushPlatform for FakePlatform {
    fn support(&self) -> PlatformSupport {
        self.with_state(|state| state.support.unwrap_or_else(PlatformSupport::full))
    }

    fn is_online(&self) -> bool {
        self.with_state(|state| !state.offline)
    }

    fn permission(&self) -> Permission {
        self.with_state(|state| state.permission.unwrap_or(Permission::Default))
    }

    async fn request_permission(&self) -> Permission {
        self.with_state(|state| {
            state.permission_requests += 1;
            let granted = match state.permission.unwrap_or(Permission::Default) {
                Permission::Default => Permission::Granted,
                decided => decided,
            };
            state.permission = Some(granted);
            granted
        })
    }

    async fn registration(&self) -> Result<Option<WorkerRegistration>, PlatformError> {
        Ok(self.with_state(|state| state.registrations.last().cloned()))
    }

    async fn unregister_all(&self) -> Result<usize, PlatformError> {
        Ok(self.with_state(|state| state.registrations.drain(..).count()))
    }

    async fn register(&self, script: &str, scope: &str) -> Result<WorkerRegistration, PlatformError> {
        let registration = WorkerRegistration {
            script: script.to_string(),
            scope: scope.to_string(),
        };
        self.with_state(|state| {
            state.register_calls += 1;
            state.registrations.push(registration.clone());
        });
        Ok(registration)
    }

    async fn worker_state(
        &self,
        _registration: &WorkerRegistration,
    ) -> Result<WorkerState, PlatformError> {
        Ok(self.with_state(|state| {
            state.worker_state_polls += 1;
            if state.keep_installing {
                return WorkerState::Installing;
            }
            state
                .worker_states
                .pop_front()
                .unwrap_or(WorkerState::Activated)
        }))
    }

    async fn get_subscription(&self) -> Result<Option<Subscription>, PlatformError> {
        Ok(self.with_state(|state| state.live.last().cloned()))
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Subscription, PlatformError> {
        self.with_state(|state| {
            state.subscribe_calls.push(options.clone());
            if let Some(failure) = state.subscribe_failures.pop_front() {
                return Err(failure);
            }
            if state.blank_endpoints > 0 {
                state.blank_endpoints -= 1;
                return Ok(subscription(""));
            }
            state.created += 1;
            let created = subscription(&format!("https://push.example/sub/{}", state.created));
            state.live.push(created.clone());
            Ok(created)
        })
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> Result<bool, PlatformError> {
        self.with_state(|state| {
            if let Some(failure) = state.unsubscribe_failure.take() {
                return Err(failure);
            }
            if state.unsubscribe_sticks {
                return Ok(false);
            }
            let before = state.live.len();
            state.live.retain(|live| live.endpoint != subscription.endpoint);
            Ok(state.live.len() != before)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Subscribe(String),
    StartTimer(StartTimerRequest),
    ListTimers(String),
    Cancel(i64),
    CancelAll(String),
    Health,
}

#[derive(Default)]
struct ApiState {
    calls: Vec<ApiCall>,
    timers: Vec<Timer>,
    list_errors: VecDeque<ApiError>,
    subscribe_error: Option<ApiError>,
    start_error: Option<ApiError>,
    health: Option<Result<HealthReport, ApiError>>,
    next_timer_id: i64,
}

/// Timer server double that records every call and serves a settable timer
/// list.
#[derive(Clone, Default)]
pub struct RecordingApi {
    state: Arc<Mutex<ApiState>>,
}

impl RecordingApi {
    fn with_state<R>(&self, f: impl FnOnce(&mut ApiState) -> R) -> R {
        let mut state = self.state.lock().expect("api lock");
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.with_state(|state| state.calls.clone())
    }

    pub fn set_timers(&self, timers: Vec<Timer>) {
        self.with_state(|state| state.timers = timers);
    }

    pub fn queue_list_error(&self, error: ApiError) {
        self.with_state(|state| state.list_errors.push_back(error));
    }

    pub fn fail_subscribe(&self, status: u16, message: Option<&str>) {
        self.with_state(|state| {
            state.subscribe_error = Some(ApiError::Status {
                status,
                message: message.map(str::to_string),
            })
        });
    }

    pub fn fail_start(&self, status: u16, message: Option<&str>) {
        self.with_state(|state| {
            state.start_error = Some(ApiError::Status {
                status,
                message: message.map(str::to_string),
            })
        });
    }

    pub fn set_health(&self, health: Result<HealthReport, ApiError>) {
        self.with_state(|state| state.health = Some(health));
    }

    pub fn list_count(&self) -> usize {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter(|call| matches!(call, ApiCall::ListTimers(_)))
                .count()
        })
    }
}

impl TimerApi for RecordingApi {
    async fn register_subscription(&self, subscription: &Subscription) -> Result<(), ApiError> {
        self.with_state(|state| {
            state
                .calls
                .push(ApiCall::Subscribe(subscription.endpoint.clone()));
            match state.subscribe_error.clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    async fn start_timer(&self, request: &StartTimerRequest) -> Result<StartedTimer, ApiError> {
        self.with_state(|state| {
            state.calls.push(ApiCall::StartTimer(request.clone()));
            if let Some(err) = state.start_error.clone() {
                return Err(err);
            }
            state.next_timer_id += 1;
            let timer_id = state
                .timers
                .iter()
                .filter(|timer| timer.client_id == request.client_id)
                .map(|timer| timer.id)
                .max()
                .unwrap_or(state.next_timer_id);
            Ok(StartedTimer {
                timer_id,
                expiry_time: None,
            })
        })
    }

    async fn list_timers(&self, endpoint: &str) -> Result<Vec<Timer>, ApiError> {
        self.with_state(|state| {
            state.calls.push(ApiCall::ListTimers(endpoint.to_string()));
            match state.list_errors.pop_front() {
                Some(err) => Err(err),
                None => Ok(state.timers.clone()),
            }
        })
    }

    async fn cancel_timer(&self, timer_id: i64) -> Result<(), ApiError> {
        self.with_state(|state| state.calls.push(ApiCall::Cancel(timer_id)));
        Ok(())
    }

    async fn cancel_all(&self, subscription: &Subscription) -> Result<(), ApiError> {
        self.with_state(|state| {
            state
                .calls
                .push(ApiCall::CancelAll(subscription.endpoint.clone()))
        });
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        self.with_state(|state| {
            state.calls.push(ApiCall::Health);
            state.health.clone().unwrap_or_else(|| {
                Ok(HealthReport {
                    status: "healthy".to_string(),
                    database_connected: true,
                    vapid_configured: true,
                })
            })
        })
    }
}
