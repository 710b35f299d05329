use crate::{Command, RunId, SessionState, StateConflict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Spawn the worker invocation for `command`. `run` is set for `Start`.
    Invoke { command: Command, run: Option<RunId> },
    /// The command was refused; no worker must be spawned.
    Rejected(StateConflict),
    StateChanged(SessionState),
}
