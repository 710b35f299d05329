use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autotype_core::{
    update, Command, Effect, Msg, ProgressRecord, RunId, Session, SessionState, SessionView,
    StateConflict,
};
use autotype_logging::{autotype_debug, autotype_info, autotype_warn};
use tokio::sync::oneshot;

use crate::classify::ProgressSink;
use crate::events::{BridgeEvent, EventBus, Publisher};
use crate::future::OperationOutcome;
use crate::request::TypingOptions;
use crate::worker::WorkerLauncher;
use crate::{
    BridgeError, FailureKind, MessageKind, Operation, OperationRequest, WorkerError, WorkerMessage,
};

/// Owns the typing session and serializes its control commands.
///
/// Every check-and-transition happens under one lock, so the controller can be
/// cloned freely across tasks.
#[derive(Clone)]
pub struct SessionController {
    launcher: Arc<dyn WorkerLauncher>,
    bus: EventBus,
    session: Arc<Mutex<Session>>,
}

impl SessionController {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, bus: EventBus) -> Self {
        Self {
            launcher,
            bus,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    pub fn view(&self) -> SessionView {
        lock(&self.session).view()
    }

    /// Launches an `auto_typer` run.
    ///
    /// Returns once the worker is running; progress streams on the bus and the
    /// run's own outcome is available from the returned [`TypingRun`].
    pub fn start(&self, text: &str, options: &TypingOptions) -> Result<TypingRun, BridgeError> {
        let mut session = lock(&self.session);
        let run = self.issue(&mut session, Command::Start)?.unwrap_or_default();

        let sink = Arc::new(TypingSink {
            run,
            session: Arc::clone(&self.session),
            bus: self.bus.clone(),
            publisher: self.bus.publisher(),
            reached_end: AtomicBool::new(false),
        });
        let request = OperationRequest::typing(text, options).with_sink(sink.clone());

        let future = match self.launcher.launch(request) {
            Ok(future) => future,
            Err(err) => {
                sink.publisher.publish(BridgeEvent::TypingError {
                    message: err.message.clone(),
                });
                sink.publisher.close();
                self.settle(&mut session, Command::Start, false);
                return Err(err.into());
            }
        };
        self.settle(&mut session, Command::Start, true);
        drop(session);
        autotype_info!("Typing run {} started", run);

        let (tx, rx) = oneshot::channel();
        let controller = self.clone();
        tokio::spawn(async move {
            let outcome = future.await;
            let completed = outcome.is_ok() && sink.reached_end.load(Ordering::Acquire);
            if let Err(err) = &outcome {
                autotype_warn!("Typing run {} failed ({}): {}", run, err.kind, err.message);
                // Explicit error records were already forwarded as they arrived.
                if err.kind != FailureKind::Reported {
                    sink.publisher.publish(BridgeEvent::TypingError {
                        message: err.message.clone(),
                    });
                }
            }
            sink.publisher.close();

            let mut session = lock(&controller.session);
            let effects = apply(&mut session, Msg::TypingRunSettled { run, completed });
            announce(&controller.bus, effects);
            drop(session);
            autotype_info!("Typing run {} settled (completed={})", run, completed);
            let _ = tx.send(outcome);
        });

        Ok(TypingRun { run, outcome: rx })
    }

    pub async fn pause(&self) -> Result<SessionState, BridgeError> {
        self.control(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<SessionState, BridgeError> {
        self.control(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<SessionState, BridgeError> {
        self.control(Command::Stop).await
    }

    async fn control(&self, command: Command) -> Result<SessionState, BridgeError> {
        {
            let mut session = lock(&self.session);
            self.issue(&mut session, command)?;
        }

        let operation = Operation::for_command(command);
        let controller = self.clone();
        let task = tokio::spawn(async move {
            let outcome = controller
                .launcher
                .invoke(OperationRequest::new(operation))
                .await;
            let mut session = lock(&controller.session);
            controller.settle(&mut session, command, outcome.is_ok());
            outcome.map(|_| session.state())
        });

        match task.await {
            Ok(outcome) => Ok(outcome?),
            Err(err) => Err(WorkerError::new(
                operation,
                FailureKind::Aborted,
                format!("{operation} command was aborted: {err}"),
            )
            .into()),
        }
    }

    fn issue(
        &self,
        session: &mut Session,
        command: Command,
    ) -> Result<Option<RunId>, StateConflict> {
        let mut run = None;
        for effect in apply(session, Msg::CommandIssued(command)) {
            match effect {
                Effect::Rejected(conflict) => {
                    autotype_info!("Rejected {} command: {}", command, conflict);
                    return Err(conflict);
                }
                Effect::Invoke { run: allocated, .. } => run = allocated,
                Effect::StateChanged(state) => publish_state(&self.bus, state),
            }
        }
        Ok(run)
    }

    fn settle(&self, session: &mut Session, command: Command, success: bool) {
        let effects = apply(session, Msg::CommandSettled { command, success });
        if !success {
            autotype_info!("{} command failed; session is {}", command, session.state());
        }
        announce(&self.bus, effects);
    }
}

/// Handle on a launched typing run.
#[derive(Debug)]
pub struct TypingRun {
    run: RunId,
    outcome: oneshot::Receiver<OperationOutcome>,
}

impl TypingRun {
    pub fn id(&self) -> RunId {
        self.run
    }

    /// Waits for the `auto_typer` invocation to settle.
    pub async fn wait(self) -> OperationOutcome {
        self.outcome.await.unwrap_or_else(|_| {
            Err(WorkerError::new(
                Operation::AutoTyper,
                FailureKind::Aborted,
                format!("typing run {} was abandoned", self.run),
            ))
        })
    }
}

/// Routes one run's progress and error records to the bus and the state machine.
struct TypingSink {
    run: RunId,
    session: Arc<Mutex<Session>>,
    bus: EventBus,
    publisher: Publisher,
    reached_end: AtomicBool,
}

impl ProgressSink for TypingSink {
    fn emit(&self, message: &WorkerMessage) {
        match message.kind {
            MessageKind::Progress => {
                let record = match serde_json::from_value::<ProgressRecord>(message.payload.clone())
                {
                    Ok(record) => record.normalized(),
                    Err(err) => {
                        autotype_warn!("Skipping unreadable progress of run {}: {}", self.run, err);
                        return;
                    }
                };
                if record.is_complete() {
                    self.reached_end.store(true, Ordering::Release);
                }
                let mut session = lock(&self.session);
                let effects = apply(
                    &mut session,
                    Msg::Progress {
                        run: self.run,
                        record,
                    },
                );
                self.publisher.publish(BridgeEvent::TypingProgress(record));
                announce(&self.bus, effects);
            }
            MessageKind::Error => self.publisher.publish(BridgeEvent::TypingError {
                message: message.error_text(),
            }),
            MessageKind::Result => {}
        }
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(session: &mut Session, msg: Msg) -> Vec<Effect> {
    let (next, effects) = update(std::mem::take(session), msg);
    *session = next;
    effects
}

fn announce(bus: &EventBus, effects: Vec<Effect>) {
    for effect in effects {
        if let Effect::StateChanged(state) = effect {
            publish_state(bus, state);
        }
    }
}

fn publish_state(bus: &EventBus, state: SessionState) {
    autotype_debug!("Session state -> {}", state);
    bus.publish(BridgeEvent::SessionState(state));
}
