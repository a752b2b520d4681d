use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Push subscription in its canonical transportable form, matching the
/// browser's `PushSubscription.toJSON()` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub endpoint: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

impl Subscription {
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        let millis = self.expiration_time?;
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationServerKey {
    Raw(Vec<u8>),
    Encoded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Option<ApplicationServerKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

impl Permission {
    pub fn label(self) -> &'static str {
        match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub script: String,
    pub scope: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSupport {
    pub service_worker: bool,
    pub push_manager: bool,
    pub notifications: bool,
}

impl PlatformSupport {
    pub fn full() -> Self {
        Self {
            service_worker: true,
            push_manager: true,
            notifications: true,
        }
    }

    /// First missing capability, if any.
    pub fn missing(&self) -> Option<&'static str> {
        if !self.service_worker {
            Some("service workers")
        } else if !self.push_manager {
            Some("push messaging")
        } else if !self.notifications {
            Some("notifications")
        } else {
            None
        }
    }
}
