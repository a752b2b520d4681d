use std::fmt;

use crate::ports::ApiError;
use crate::types::push::{Permission, PlatformSupport, WorkerState};
use crate::types::timer::HealthReport;

/// Snapshot of everything that has to line up for a timer notification to
/// arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub support: PlatformSupport,
    pub permission: Permission,
    pub online: bool,
    pub worker: Option<WorkerState>,
    pub subscribed: bool,
    pub cached_flag: bool,
    pub server: Result<HealthReport, ApiError>,
}

impl DiagnosticsReport {
    /// Whether nothing in the report blocks notifications.
    pub fn healthy(&self) -> bool {
        self.support.missing().is_none()
            && self.permission == Permission::Granted
            && self.online
            && self.subscribed
            && self
                .server
                .as_ref()
                .is_ok_and(|health| health.database_connected && health.vapid_configured)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "service workers:   {}", yes_no(self.support.service_worker))?;
        writeln!(f, "push messaging:    {}", yes_no(self.support.push_manager))?;
        writeln!(f, "notifications:     {}", yes_no(self.support.notifications))?;
        writeln!(f, "permission:        {}", self.permission.label())?;
        writeln!(f, "online:            {}", yes_no(self.online))?;
        match self.worker {
            Some(state) => writeln!(f, "worker:            {state:?}")?,
            None => writeln!(f, "worker:            not registered")?,
        }
        writeln!(f, "subscribed:        {}", yes_no(self.subscribed))?;
        writeln!(f, "local flag:        {}", yes_no(self.cached_flag))?;
        match &self.server {
            Ok(health) => writeln!(
                f,
                "server:            {} (database {}, vapid {})",
                health.status,
                if health.database_connected { "connected" } else { "disconnected" },
                if health.vapid_configured { "configured" } else { "missing" },
            ),
            Err(err) => writeln!(f, "server:            unreachable ({err})"),
        }
    }
}
