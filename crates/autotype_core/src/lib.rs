//! AutoType core: pure typing-session state machine and progress records.
mod effect;
mod error;
mod msg;
mod progress;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::StateConflict;
pub use msg::Msg;
pub use progress::ProgressRecord;
pub use state::{Command, RunId, Session, SessionState};
pub use update::update;
pub use view_model::SessionView;
