use std::error::Error;
use std::fmt;

use crate::{Command, SessionState};

/// A control command was issued outside its accepted states, or while another
/// control command was still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateConflict {
    pub command: Command,
    pub state: SessionState,
    pub pending: Option<Command>,
}

impl fmt::Display for StateConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pending {
            Some(pending) => write!(
                f,
                "cannot {} typing: a {} command is still in progress",
                self.command, pending
            ),
            None => write!(
                f,
                "cannot {} typing while the session is {}",
                self.command, self.state
            ),
        }
    }
}

impl Error for StateConflict {}
