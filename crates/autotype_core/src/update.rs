use crate::{Command, Effect, Msg, Session, SessionState, StateConflict};

/// Pure update function: applies a message to the session and returns any effects.
pub fn update(mut session: Session, msg: Msg) -> (Session, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::CommandIssued(command) => {
            let state = session.state();
            if let Some(pending) = session.in_flight() {
                effects.push(Effect::Rejected(StateConflict {
                    command,
                    state,
                    pending: Some(pending),
                }));
            } else if !command.accepted_from(state) {
                effects.push(Effect::Rejected(StateConflict {
                    command,
                    state,
                    pending: None,
                }));
            } else {
                let run = session.begin(command);
                if command == Command::Stop {
                    transition(&mut session, SessionState::Stopping, &mut effects);
                }
                effects.push(Effect::Invoke { command, run });
            }
        }
        Msg::CommandSettled { command, success } => {
            // Stale or duplicate settlement; the session has moved on.
            if session.in_flight() != Some(command) {
                return (session, effects);
            }
            let state = session.state();
            let revert_to = session.finish();
            let next = match (command, success) {
                (Command::Start, true) => {
                    session.promote_pending_run();
                    if state == SessionState::Idle {
                        SessionState::Running
                    } else {
                        state
                    }
                }
                (Command::Pause, true) if state == SessionState::Running => SessionState::Paused,
                (Command::Resume, true) if state == SessionState::Paused => SessionState::Running,
                (Command::Stop, true) => {
                    session.clear_active_run();
                    SessionState::Idle
                }
                (Command::Start, false) => {
                    session.drop_pending_run();
                    state
                }
                (Command::Stop, false) => revert_to,
                _ => state,
            };
            transition(&mut session, next, &mut effects);
        }
        Msg::Progress { run, record } => {
            if session.is_active_run(run) && record.is_complete() {
                complete_run(&mut session, &mut effects);
            }
        }
        Msg::TypingRunSettled { run, completed } => {
            if session.is_active_run(run) {
                if completed {
                    complete_run(&mut session, &mut effects);
                } else {
                    // Left Running/Paused until a later `stop`.
                    session.clear_active_run();
                }
            }
        }
    }

    (session, effects)
}

fn complete_run(session: &mut Session, effects: &mut Vec<Effect>) {
    session.clear_active_run();
    match session.state() {
        SessionState::Running | SessionState::Paused => {
            transition(session, SessionState::Idle, effects);
        }
        SessionState::Stopping => session.set_revert_target(SessionState::Idle),
        SessionState::Idle => {}
    }
}

fn transition(session: &mut Session, next: SessionState, effects: &mut Vec<Effect>) {
    if session.set_state(next) {
        effects.push(Effect::StateChanged(next));
    }
}
