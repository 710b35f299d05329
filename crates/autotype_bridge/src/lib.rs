//! AutoType bridge: worker process invocation, message routing, event fan-out
//! and the typing session controller.
mod bridge;
mod classify;
mod events;
mod future;
mod payloads;
mod request;
mod session;
mod types;
mod worker;

pub use bridge::BridgeHandle;
pub use classify::{Classifier, ProgressSink, WorkerExit};
pub use events::{BridgeEvent, Completion, EventBus, Publisher, Subscription, Topic};
pub use future::{OperationFuture, OperationOutcome};
pub use payloads::{PlagiarismReport, PlagiarismSource, TonePreset, WindowInfo, WindowSelection};
pub use request::{HumanizeOptions, OperationRequest, ToneOptions, TypingOptions};
pub use session::{SessionController, TypingRun};
pub use types::{BridgeError, FailureKind, MessageKind, Operation, WorkerError, WorkerMessage};
pub use worker::{ProcessLauncher, WorkerLauncher, WorkerSettings};
