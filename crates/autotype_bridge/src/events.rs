use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use autotype_core::{ProgressRecord, SessionState};
use autotype_logging::autotype_trace;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::WorkerError;

/// Typed channels the UI can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TypingProgress,
    TypingError,
    HumanizationComplete,
    ToneAdjustmentComplete,
    PlagiarismResults,
    SessionState,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::TypingProgress,
        Topic::TypingError,
        Topic::HumanizationComplete,
        Topic::ToneAdjustmentComplete,
        Topic::PlagiarismResults,
        Topic::SessionState,
    ];

    /// Wire name of the channel.
    pub fn channel(self) -> &'static str {
        match self {
            Topic::TypingProgress => "typing-progress",
            Topic::TypingError => "typing-error",
            Topic::HumanizationComplete => "humanization-complete",
            Topic::ToneAdjustmentComplete => "tone-adjustment-complete",
            Topic::PlagiarismResults => "plagiarism-results",
            Topic::SessionState => "session-state",
        }
    }
}

/// Payload of the `*-complete` and `plagiarism-results` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Completion {
    pub fn from_outcome<T>(outcome: &Result<T, WorkerError>) -> Self {
        match outcome {
            Ok(_) => Self {
                success: true,
                error: None,
            },
            Err(err) => Self {
                success: false,
                error: Some(err.message.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum BridgeEvent {
    TypingProgress(ProgressRecord),
    TypingError { message: String },
    HumanizationComplete(Completion),
    ToneAdjustmentComplete(Completion),
    PlagiarismResults(Completion),
    SessionState(SessionState),
}

impl BridgeEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BridgeEvent::TypingProgress(_) => Topic::TypingProgress,
            BridgeEvent::TypingError { .. } => Topic::TypingError,
            BridgeEvent::HumanizationComplete(_) => Topic::HumanizationComplete,
            BridgeEvent::ToneAdjustmentComplete(_) => Topic::ToneAdjustmentComplete,
            BridgeEvent::PlagiarismResults(_) => Topic::PlagiarismResults,
            BridgeEvent::SessionState(_) => Topic::SessionState,
        }
    }
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    publishers: usize,
}

struct Subscriber {
    id: u64,
    topics: Vec<Topic>,
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

/// Publish/subscribe hub between the bridge and the UI.
///
/// Delivery is in publish order per subscriber. Subscribers that fall behind
/// buffer without bound; publishing never blocks.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `topics` until the returned handle is dropped.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(Subscriber {
            id,
            topics: topics.to_vec(),
            tx,
        });
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscribe_all(&self) -> Subscription {
        self.subscribe(&Topic::ALL)
    }

    pub fn publish(&self, event: BridgeEvent) {
        let topic = event.topic();
        let mut inner = lock(&self.inner);
        inner.subscribers.retain(|subscriber| {
            if !subscriber.topics.contains(&topic) {
                return true;
            }
            subscriber.tx.send(event.clone()).is_ok()
        });
    }

    /// Registers an invocation-scoped publisher. It must be closed (or
    /// dropped) once the invocation settles.
    pub fn publisher(&self) -> Publisher {
        lock(&self.inner).publishers += 1;
        Publisher {
            bus: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    pub fn active_publishers(&self) -> usize {
        lock(&self.inner).publishers
    }
}

fn lock(inner: &Mutex<BusInner>) -> MutexGuard<'_, BusInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receiving end of a topic subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<BridgeEvent>,
    bus: Weak<Mutex<BusInner>>,
}

impl Subscription {
    /// Next event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            lock(&inner).subscribers.retain(|s| s.id != self.id);
        }
    }
}

/// Publishing registration owned by one invocation.
pub struct Publisher {
    bus: EventBus,
    closed: AtomicBool,
}

impl Publisher {
    /// Forwards `event` unless the publisher has been closed.
    pub fn publish(&self, event: BridgeEvent) {
        if self.is_closed() {
            autotype_trace!("Dropping {} event from a closed publisher", event.topic().channel());
            return;
        }
        self.bus.publish(event);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Unregisters the publisher. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let mut inner = lock(&self.bus.inner);
            inner.publishers = inner.publishers.saturating_sub(1);
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.close();
    }
}
