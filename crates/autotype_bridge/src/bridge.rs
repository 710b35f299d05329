use std::sync::Arc;

use autotype_core::{SessionState, SessionView};
use autotype_logging::autotype_debug;

use crate::events::{BridgeEvent, Completion, EventBus, Subscription, Topic};
use crate::payloads::{self, PlagiarismReport, TonePreset, WindowInfo, WindowSelection};
use crate::request::{HumanizeOptions, ToneOptions, TypingOptions};
use crate::session::{SessionController, TypingRun};
use crate::worker::{ProcessLauncher, WorkerLauncher, WorkerSettings};
use crate::{BridgeError, Operation, OperationRequest, WorkerError};

/// Control surface offered to the UI.
///
/// Cheap to clone; clones share the session, the event bus and the launcher.
#[derive(Clone)]
pub struct BridgeHandle {
    launcher: Arc<dyn WorkerLauncher>,
    bus: EventBus,
    session: SessionController,
}

impl BridgeHandle {
    pub fn new(settings: WorkerSettings) -> Self {
        Self::with_launcher(Arc::new(ProcessLauncher::new(settings)))
    }

    pub fn with_launcher(launcher: Arc<dyn WorkerLauncher>) -> Self {
        let bus = EventBus::new();
        let session = SessionController::new(Arc::clone(&launcher), bus.clone());
        Self {
            launcher,
            bus,
            session,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        self.bus.subscribe(topics)
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session_view(&self) -> SessionView {
        self.session.view()
    }

    pub fn start_typing(
        &self,
        text: &str,
        options: &TypingOptions,
    ) -> Result<TypingRun, BridgeError> {
        self.session.start(text, options)
    }

    pub async fn stop_typing(&self) -> Result<SessionState, BridgeError> {
        self.session.stop().await
    }

    pub async fn pause_typing(&self) -> Result<SessionState, BridgeError> {
        self.session.pause().await
    }

    pub async fn resume_typing(&self) -> Result<SessionState, BridgeError> {
        self.session.resume().await
    }

    pub async fn get_available_windows(&self) -> Result<Vec<WindowInfo>, WorkerError> {
        let results = self.run(OperationRequest::new(Operation::GetWindows)).await?;
        payloads::decode(Operation::GetWindows, results)
    }

    pub async fn select_window(&self, window_id: &str) -> Result<WindowSelection, WorkerError> {
        let results = self.run(OperationRequest::select_window(window_id)).await?;
        payloads::decode(Operation::SelectWindow, results)
    }

    pub async fn humanize_text(
        &self,
        text: &str,
        options: &HumanizeOptions,
    ) -> Result<String, WorkerError> {
        let outcome = match self.run(OperationRequest::humanize(text, options)).await {
            Ok(results) => payloads::decode_text(Operation::HumanizeText, results, "humanizedText"),
            Err(err) => Err(err),
        };
        self.bus.publish(BridgeEvent::HumanizationComplete(
            Completion::from_outcome(&outcome),
        ));
        outcome
    }

    pub async fn adjust_tone(&self, text: &str, options: &ToneOptions) -> Result<String, WorkerError> {
        let outcome = match self.run(OperationRequest::adjust_tone(text, options)).await {
            Ok(results) => payloads::decode_text(Operation::AdjustTone, results, "adjustedText"),
            Err(err) => Err(err),
        };
        self.bus.publish(BridgeEvent::ToneAdjustmentComplete(
            Completion::from_outcome(&outcome),
        ));
        outcome
    }

    pub async fn get_tone_presets(&self) -> Result<Vec<TonePreset>, WorkerError> {
        let results = self.run(OperationRequest::new(Operation::GetTonePresets)).await?;
        payloads::decode(Operation::GetTonePresets, results)
    }

    pub async fn check_plagiarism(&self, text: &str) -> Result<PlagiarismReport, WorkerError> {
        let outcome = match self.run(OperationRequest::check_plagiarism(text)).await {
            Ok(results) => payloads::decode(Operation::CheckPlagiarism, results),
            Err(err) => Err(err),
        };
        self.bus.publish(BridgeEvent::PlagiarismResults(Completion::from_outcome(
            &outcome,
        )));
        outcome
    }

    async fn run(&self, request: OperationRequest) -> Result<Vec<serde_json::Value>, WorkerError> {
        let operation = request.operation();
        let results = self.launcher.invoke(request).await?;
        autotype_debug!("{} returned {} result record(s)", operation, results.len());
        Ok(results)
    }
}
