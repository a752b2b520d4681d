use std::time::Duration;

use time::OffsetDateTime;

use crate::ports;

pub mod http;
pub mod platform;
pub mod store;
pub mod terminal;

pub use http::HttpTimerApi;
pub use platform::RelayPushPlatform;
pub use store::{FileStore, MemoryStore};
pub use terminal::{StdinConfirmer, TerminalView};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}
