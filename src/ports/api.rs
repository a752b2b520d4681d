use thiserror::Error;

use crate::types::push::Subscription;
use crate::types::timer::{HealthReport, StartTimerRequest, StartedTimer, Timer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("server responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

/// The timer server's HTTP surface.
pub trait TimerApi: Clone + Send + Sync + 'static {
    fn register_subscription(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn start_timer(
        &self,
        request: &StartTimerRequest,
    ) -> impl Future<Output = Result<StartedTimer, ApiError>> + Send;
    fn list_timers(&self, endpoint: &str)
    -> impl Future<Output = Result<Vec<Timer>, ApiError>> + Send;
    fn cancel_timer(&self, timer_id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn cancel_all(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn health(&self) -> impl Future<Output = Result<HealthReport, ApiError>> + Send;
}
