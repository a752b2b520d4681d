use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::push::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Running,
    Completed,
}

/// Server-side timer record as returned by `GET /api/timers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: i64,
    /// Recipe step id chosen by the client.
    pub client_id: String,
    pub status: TimerStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry_time: OffsetDateTime,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartTimerRequest {
    pub minutes: u32,
    pub client_id: String,
    pub message: String,
    pub subscription: Subscription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedTimer {
    pub timer_id: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiry_time: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub database_connected: bool,
    #[serde(default)]
    pub vapid_configured: bool,
}

/// Optional body of a failed response.
#[derive(Debug, Default, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ServerMessage {
    pub fn into_text(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}
