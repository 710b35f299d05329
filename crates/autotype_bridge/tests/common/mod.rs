#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use autotype_bridge::{
    BridgeEvent, Classifier, FailureKind, Operation, OperationFuture, OperationRequest,
    Subscription, WorkerError, WorkerExit, WorkerLauncher,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

enum Step {
    Line(String),
    Wait(Arc<Notify>),
}

/// Scripted stand-in for one worker invocation.
pub struct Script {
    steps: Vec<Step>,
    exit: WorkerExit,
    launch_error: Option<String>,
}

impl Script {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            exit: WorkerExit::success(),
            launch_error: None,
        }
    }

    pub fn launch_failure(message: &str) -> Self {
        Self {
            launch_error: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.steps.push(Step::Line(line.into()));
        self
    }

    pub fn progress(self, percent: f64, typed: u64, total: u64) -> Self {
        self.line(progress_line(percent, typed, total))
    }

    pub fn result(self, data: Value) -> Self {
        self.line(json!({"type": "result", "data": data}).to_string())
    }

    /// Blocks the invocation here until `gate` is notified.
    pub fn wait(mut self, gate: &Arc<Notify>) -> Self {
        self.steps.push(Step::Wait(Arc::clone(gate)));
        self
    }

    pub fn exit(mut self, exit: WorkerExit) -> Self {
        self.exit = exit;
        self
    }
}

pub fn progress_line(percent: f64, typed: u64, total: u64) -> String {
    json!({
        "type": "progress",
        "data": {"percentComplete": percent, "charactersTyped": typed, "totalCharacters": total}
    })
    .to_string()
}

/// Launcher that replays queued scripts per operation through the real
/// classifier. Operations without a queued script succeed with no output.
#[derive(Default)]
pub struct ScriptedLauncher {
    scripts: Mutex<HashMap<Operation, VecDeque<Script>>>,
    launches: Mutex<Vec<Operation>>,
}

impl ScriptedLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, operation: Operation, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(script);
    }

    pub fn launches(&self) -> Vec<Operation> {
        self.launches.lock().unwrap().clone()
    }
}

impl WorkerLauncher for ScriptedLauncher {
    fn launch(&self, request: OperationRequest) -> Result<OperationFuture, WorkerError> {
        let operation = request.operation();
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(Script::new);
        if let Some(message) = script.launch_error {
            return Err(WorkerError::new(operation, FailureKind::Launch, message));
        }
        self.launches.lock().unwrap().push(operation);

        let sink = request.into_sink();
        Ok(OperationFuture::spawn(operation, async move {
            let mut classifier = Classifier::new(operation, sink);
            for step in script.steps {
                match step {
                    Step::Line(line) => classifier.accept_line(&line),
                    Step::Wait(gate) => gate.notified().await,
                }
            }
            classifier.finish(script.exit)
        }))
    }
}

/// Everything currently buffered on `subscription`.
pub fn drain(subscription: &mut Subscription) -> Vec<BridgeEvent> {
    std::iter::from_fn(|| subscription.try_recv()).collect()
}
