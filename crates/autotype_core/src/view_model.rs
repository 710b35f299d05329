use crate::{Command, RunId, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub state: SessionState,
    pub in_flight: Option<Command>,
    pub active_run: Option<RunId>,
}
