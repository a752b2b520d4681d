use crate::notice::NoticeBoard;
use crate::timers::{Countdowns, TimerBoard};
use crate::types::push::WorkerRegistration;

/// All mutable client state, created once at startup and handed to the
/// subscription manager and timer synchronizer by reference.
#[derive(Debug, Default)]
pub struct ClientState {
    pub registration: Option<WorkerRegistration>,
    pub timers: TimerBoard,
    pub countdowns: Countdowns,
    pub notices: NoticeBoard,
}
