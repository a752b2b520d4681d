use std::time::Duration;

use time::OffsetDateTime;

use crate::error::ClientError;
use crate::ports::PlatformError;

/// How long a notice stays up unless dismissed earlier.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

const EXTENSION_CONFLICT_MARKERS: [&str; 3] = [
    "Extension context invalidated",
    "chrome-extension://",
    "moz-extension://",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn label(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    /// Steps the user can take, shown below the message.
    pub guidance: Vec<String>,
    pub raised_at: OffsetDateTime,
}

/// Dismissible user-facing notices.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn push(
        &mut self,
        level: NoticeLevel,
        message: impl Into<String>,
        guidance: Vec<String>,
        now: OffsetDateTime,
    ) -> u64 {
        self.next_id += 1;
        self.notices.push(Notice {
            id: self.next_id,
            level,
            message: message.into(),
            guidance,
            raised_at: now,
        });
        self.next_id
    }

    pub fn push_error(&mut self, err: &ClientError, now: OffsetDateTime) -> u64 {
        let (level, message, guidance) = describe_error(err);
        self.push(level, message, guidance, now)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    /// Notices still within their display time; expired ones are dropped.
    pub fn active(&mut self, now: OffsetDateTime) -> &[Notice] {
        self.notices.retain(|notice| now - notice.raised_at < NOTICE_TTL);
        &self.notices
    }

    /// Hands every pending notice to the caller.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

pub fn is_extension_conflict(text: &str) -> bool {
    EXTENSION_CONFLICT_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

fn extension_guidance() -> Vec<String> {
    vec![
        "Temporarily disable ad blockers".to_string(),
        "Check the settings of privacy extensions".to_string(),
        "Try a private window".to_string(),
    ]
}

fn describe_error(err: &ClientError) -> (NoticeLevel, String, Vec<String>) {
    match err {
        ClientError::PermissionDenied => (
            NoticeLevel::Error,
            "Notification permission was denied.".to_string(),
            vec!["Allow notifications for this site in the browser settings".to_string()],
        ),
        ClientError::WorkerActivationTimeout { .. } | ClientError::WorkerRedundant => (
            NoticeLevel::Error,
            format!("Push worker setup failed: {err}."),
            vec!["Reload the page and enable notifications again".to_string()],
        ),
        ClientError::SubscriptionCreationFailed { reason } if is_extension_conflict(reason) => (
            NoticeLevel::Warning,
            "A browser extension is interfering with push notifications.".to_string(),
            extension_guidance(),
        ),
        ClientError::SubscriptionCreationFailed { .. } => (
            NoticeLevel::Error,
            "The push service could not create a subscription.".to_string(),
            vec![
                "The browser push service may be temporarily unavailable".to_string(),
                "A firewall or network policy may block the push service".to_string(),
                "Try a current Chrome or Firefox".to_string(),
            ],
        ),
        ClientError::Platform(platform) if is_extension_conflict(&platform.to_string()) => (
            NoticeLevel::Warning,
            "A browser extension is interfering with push notifications.".to_string(),
            extension_guidance(),
        ),
        ClientError::Platform(PlatformError::NotAllowed(_)) => (
            NoticeLevel::Error,
            "The browser blocked the request.".to_string(),
            vec!["Allow notifications for this site in the browser settings".to_string()],
        ),
        ClientError::Platform(PlatformError::NotSupported(_)) | ClientError::Unsupported(_) => (
            NoticeLevel::Error,
            format!("Push notifications are not available: {err}."),
            vec!["Try a current Chrome or Firefox".to_string()],
        ),
        ClientError::NoSubscription => (
            NoticeLevel::Warning,
            "Enable push notifications first.".to_string(),
            vec!["Use the enable notifications control to subscribe again".to_string()],
        ),
        ClientError::NetworkUnavailable => (
            NoticeLevel::Error,
            "The network is unavailable.".to_string(),
            vec!["Check the connection and try again".to_string()],
        ),
        ClientError::InvalidServerKey(_) => (
            NoticeLevel::Error,
            format!("Push is misconfigured: {err}."),
            vec!["Check the configured VAPID public key".to_string()],
        ),
        other => (NoticeLevel::Error, other.to_string(), Vec::new()),
    }
}
