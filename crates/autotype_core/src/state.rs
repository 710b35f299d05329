use std::fmt;

use serde::{Deserialize, Serialize};

use crate::view_model::SessionView;

/// Identifies one `auto_typer` invocation. Allocated when `start` is issued.
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    /// A `stop` invocation is pending.
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Control commands that act on the typing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Start, Command::Pause, Command::Resume, Command::Stop];

    /// Whether this command may be issued while the session is in `state`.
    pub fn accepted_from(self, state: SessionState) -> bool {
        matches!(
            (self, state),
            (Command::Start, SessionState::Idle)
                | (Command::Pause, SessionState::Running)
                | (Command::Resume, SessionState::Paused)
                | (Command::Stop, SessionState::Running | SessionState::Paused)
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => write!(f, "start"),
            Command::Pause => write!(f, "pause"),
            Command::Resume => write!(f, "resume"),
            Command::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    state: SessionState,
    in_flight: Option<Command>,
    revert_to: SessionState,
    next_run: RunId,
    pending_run: Option<RunId>,
    active_run: Option<RunId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn in_flight(&self) -> Option<Command> {
        self.in_flight
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active_run
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state,
            in_flight: self.in_flight,
            active_run: self.active_run,
        }
    }

    pub(crate) fn set_state(&mut self, state: SessionState) -> bool {
        let changed = self.state != state;
        self.state = state;
        changed
    }

    pub(crate) fn begin(&mut self, command: Command) -> Option<RunId> {
        self.in_flight = Some(command);
        self.revert_to = self.state;
        if command != Command::Start {
            return None;
        }
        self.next_run += 1;
        self.pending_run = Some(self.next_run);
        self.pending_run
    }

    pub(crate) fn finish(&mut self) -> SessionState {
        self.in_flight = None;
        self.revert_to
    }

    pub(crate) fn set_revert_target(&mut self, state: SessionState) {
        self.revert_to = state;
    }

    pub(crate) fn promote_pending_run(&mut self) {
        if let Some(run) = self.pending_run.take() {
            self.active_run = Some(run);
        }
    }

    pub(crate) fn drop_pending_run(&mut self) {
        self.pending_run = None;
    }

    pub(crate) fn clear_active_run(&mut self) {
        self.active_run = None;
    }

    pub(crate) fn is_active_run(&self, run: RunId) -> bool {
        self.active_run == Some(run)
    }
}
