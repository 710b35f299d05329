use crate::{Command, ProgressRecord, RunId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The UI asked for a control command.
    CommandIssued(Command),
    /// The worker invocation backing a control command settled.
    /// For `Start` this fires once the worker has been launched (or failed to launch).
    CommandSettled { command: Command, success: bool },
    /// Progress reported by a typing run.
    Progress { run: RunId, record: ProgressRecord },
    /// The `auto_typer` invocation of a run settled.
    TypingRunSettled { run: RunId, completed: bool },
}
