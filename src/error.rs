use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::ports::{ApiError, PlatformError, StoreError};
use crate::subscription::keys::KeyError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("notification permission was not granted")]
    PermissionDenied,
    #[error("push worker did not activate within {}ms", .waited.as_millis())]
    WorkerActivationTimeout { waited: Duration },
    #[error("push worker became redundant before activating")]
    WorkerRedundant,
    #[error("push subscription could not be created: {reason}")]
    SubscriptionCreationFailed { reason: String },
    #[error("no live push subscription")]
    NoSubscription,
    #[error("{}", rejection_text(.status, .message))]
    ServerRejected { status: u16, message: Option<String> },
    #[error("network unavailable")]
    NetworkUnavailable,
    #[error("this platform does not support {0}")]
    Unsupported(&'static str),
    #[error("invalid server key: {0}")]
    InvalidServerKey(#[from] KeyError),
    #[error("timer minutes must be positive, got {0}")]
    InvalidMinutes(u32),
    #[error("unknown recipe step '{0}'")]
    UnknownStep(String),
    #[error("invalid server response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

fn rejection_text(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("request failed (HTTP {status})"),
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => ClientError::ServerRejected { status, message },
            ApiError::Network(detail) => {
                debug!(%detail, "request did not reach the server");
                ClientError::NetworkUnavailable
            }
            ApiError::Decode(detail) => ClientError::InvalidResponse(detail),
        }
    }
}
