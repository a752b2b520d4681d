use thiserror::Error;

use crate::types::push::{
    Permission, PlatformSupport, SubscribeOptions, Subscription, WorkerRegistration, WorkerState,
};

/// Failures reported by the push platform, mirroring the DOM exception names
/// a browser raises from the push and service-worker APIs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("push service error: {0}")]
    PushService(String),
    #[error("not allowed: {0}")]
    NotAllowed(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("{0}")]
    Other(String),
}

/// Push-capable host: worker registration, permission prompt and the push
/// manager of the current registration.
pub trait PushPlatform: Send + Sync + 'static {
    fn support(&self) -> PlatformSupport;
    fn is_online(&self) -> bool;
    fn permission(&self) -> Permission;
    fn request_permission(&self) -> impl Future<Output = Permission> + Send;

    /// The current worker registration, if any.
    fn registration(
        &self,
    ) -> impl Future<Output = Result<Option<WorkerRegistration>, PlatformError>> + Send;
    /// Unregisters every worker registration, returning how many were removed.
    fn unregister_all(&self) -> impl Future<Output = Result<usize, PlatformError>> + Send;
    fn register(
        &self,
        script: &str,
        scope: &str,
    ) -> impl Future<Output = Result<WorkerRegistration, PlatformError>> + Send;
    fn worker_state(
        &self,
        registration: &WorkerRegistration,
    ) -> impl Future<Output = Result<WorkerState, PlatformError>> + Send;

    fn get_subscription(
        &self,
    ) -> impl Future<Output = Result<Option<Subscription>, PlatformError>> + Send;
    fn subscribe(
        &self,
        options: &SubscribeOptions,
    ) -> impl Future<Output = Result<Subscription, PlatformError>> + Send;
    fn unsubscribe(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send;
}
