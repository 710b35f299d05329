use std::process::ExitStatus;
use std::sync::Arc;

use autotype_logging::{autotype_trace, autotype_warn};
use serde_json::Value;

use crate::{FailureKind, MessageKind, Operation, WorkerError, WorkerMessage};

const LINE_PREVIEW_CHARS: usize = 120;

/// Receives progress and error records of one invocation as they arrive.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, message: &WorkerMessage);
}

/// How a worker process ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerExit {
    pub success: bool,
    pub code: Option<i32>,
    pub signal: Option<i32>,
    /// Captured (possibly truncated) stderr output.
    pub stderr: String,
}

impl WorkerExit {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn code(code: i32) -> Self {
        Self {
            success: code == 0,
            code: Some(code),
            ..Self::default()
        }
    }

    pub fn from_status(status: ExitStatus, stderr: String) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            success: status.success(),
            code: status.code(),
            signal,
            stderr,
        }
    }

    fn describe(&self, operation: Operation) -> String {
        let mut message = match (self.code, self.signal) {
            (Some(code), _) => format!("{operation} worker exited with code {code}"),
            (None, Some(signal)) => format!("{operation} worker was terminated by signal {signal}"),
            (None, None) => format!("{operation} worker exited abnormally"),
        };
        if let Some(last) = self.stderr.lines().map(str::trim).rev().find(|l| !l.is_empty()) {
            message.push_str(": ");
            message.push_str(last);
        }
        message
    }
}

/// Splits one invocation's record stream into progress/error (forwarded to the
/// sink as they arrive) and results (buffered in order until the stream ends).
pub struct Classifier {
    operation: Operation,
    sink: Option<Arc<dyn ProgressSink>>,
    results: Vec<Value>,
    failure: Option<WorkerError>,
    halted: bool,
}

impl Classifier {
    pub fn new(operation: Operation, sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            operation,
            sink,
            results: Vec::new(),
            failure: None,
            halted: false,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Handles one raw stdout line. Blank lines are not records.
    pub fn accept_line(&mut self, line: &str) {
        // Nothing after a protocol violation is trusted.
        if self.halted {
            return;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        match WorkerMessage::parse(trimmed) {
            Ok(message) => self.dispatch(message),
            Err(err) => self.protocol_violation(format!(
                "{} worker produced unreadable output ({err}): {}",
                self.operation,
                preview(trimmed)
            )),
        }
    }

    /// Marks the stream as broken; the invocation will fail with `reason`.
    pub fn protocol_violation(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        autotype_warn!("{reason}");
        self.halted = true;
        if self.failure.is_none() {
            self.failure = Some(WorkerError::new(
                self.operation,
                FailureKind::ProtocolViolation,
                reason,
            ));
        }
    }

    fn dispatch(&mut self, message: WorkerMessage) {
        match message.kind {
            MessageKind::Progress => {
                if let Some(sink) = &self.sink {
                    sink.emit(&message);
                } else {
                    autotype_trace!("{} progress without subscriber", self.operation);
                }
            }
            MessageKind::Error => {
                if let Some(sink) = &self.sink {
                    sink.emit(&message);
                }
                if self.failure.is_none() {
                    self.failure = Some(WorkerError::new(
                        self.operation,
                        FailureKind::Reported,
                        message.error_text(),
                    ));
                }
            }
            MessageKind::Result => self.results.push(message.payload),
        }
    }

    /// Resolves the invocation once the stream has closed and the process is reaped.
    pub fn finish(self, exit: WorkerExit) -> Result<Vec<Value>, WorkerError> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        if !exit.success {
            return Err(WorkerError::new(
                self.operation,
                FailureKind::AbnormalExit { code: exit.code },
                exit.describe(self.operation),
            ));
        }
        Ok(self.results)
    }
}

fn preview(line: &str) -> String {
    match line.char_indices().nth(LINE_PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &line[..end]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{Classifier, ProgressSink, WorkerExit};
    use crate::{FailureKind, MessageKind, Operation, WorkerMessage};

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<WorkerMessage>>,
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<MessageKind> {
            self.messages.lock().unwrap().iter().map(|m| m.kind).collect()
        }
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, message: &WorkerMessage) {
            self.messages.lock().unwrap().push(message.clone());
        }
    }

    fn classifier_with_sink(operation: Operation) -> (Classifier, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (Classifier::new(operation, Some(sink.clone())), sink)
    }

    #[test]
    fn results_keep_emission_order_and_skip_progress() {
        let (mut classifier, sink) = classifier_with_sink(Operation::AutoTyper);
        classifier.accept_line(r#"{"type":"result","data":"a"}"#);
        classifier.accept_line(r#"{"type":"progress","data":{"percentComplete":50}}"#);
        classifier.accept_line("");
        classifier.accept_line(r#"{"type":"result","data":"b"}"#);
        classifier.accept_line(r#"{"data":"c"}"#);

        assert_eq!(sink.kinds(), vec![MessageKind::Progress]);
        let results = classifier.finish(WorkerExit::success()).unwrap();
        assert_eq!(results, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn error_record_is_forwarded_and_fails_the_outcome() {
        let (mut classifier, sink) = classifier_with_sink(Operation::AutoTyper);
        classifier.accept_line(r#"{"type":"error","data":"window vanished"}"#);
        classifier.accept_line(r#"{"type":"result","data":{"success":true}}"#);
        classifier.accept_line(r#"{"type":"error","data":"second"}"#);

        assert_eq!(sink.kinds(), vec![MessageKind::Error, MessageKind::Error]);
        let err = classifier.finish(WorkerExit::code(1)).unwrap_err();
        assert_eq!(err.kind, FailureKind::Reported);
        assert_eq!(err.message, "window vanished");
    }

    #[test]
    fn malformed_line_fails_without_partial_results() {
        let (mut classifier, sink) = classifier_with_sink(Operation::HumanizeText);
        classifier.accept_line(r#"{"type":"result","data":"early"}"#);
        classifier.accept_line("Traceback (most recent call last):");
        classifier.accept_line(r#"{"type":"progress","data":{}}"#);

        assert!(sink.kinds().is_empty());
        let err = classifier.finish(WorkerExit::success()).unwrap_err();
        assert_eq!(err.kind, FailureKind::ProtocolViolation);
        assert!(err.message.contains("Traceback"));
    }

    #[test]
    fn empty_stream_fulfills_with_empty_buffer() {
        let classifier = Classifier::new(Operation::GetWindows, None);
        assert_eq!(classifier.finish(WorkerExit::success()).unwrap(), Vec::<serde_json::Value>::new());
    }

    #[test]
    fn non_zero_exit_without_error_record_is_abnormal() {
        let mut classifier = Classifier::new(Operation::HumanizeText, None);
        classifier.accept_line(r#"{"type":"result","data":"ignored"}"#);
        let exit = WorkerExit {
            stderr: "Traceback\nValueError: bad level\n\n".to_string(),
            ..WorkerExit::code(1)
        };

        let err = classifier.finish(exit).unwrap_err();
        assert_eq!(err.kind, FailureKind::AbnormalExit { code: Some(1) });
        assert_eq!(
            err.message,
            "humanize_text worker exited with code 1: ValueError: bad level"
        );
    }

    #[test]
    fn signal_termination_has_no_code() {
        let classifier = Classifier::new(Operation::StopTyping, None);
        let exit = WorkerExit {
            success: false,
            code: None,
            signal: Some(9),
            stderr: String::new(),
        };

        let err = classifier.finish(exit).unwrap_err();
        assert_eq!(err.kind, FailureKind::AbnormalExit { code: None });
        assert_eq!(err.message, "stop_typing worker was terminated by signal 9");
    }

    #[test]
    fn long_garbage_is_truncated_in_the_message() {
        let mut classifier = Classifier::new(Operation::CheckPlagiarism, None);
        classifier.accept_line(&"x".repeat(500));
        let err = classifier.finish(WorkerExit::success()).unwrap_err();
        assert!(err.message.ends_with("..."));
        assert!(err.message.len() < 300);
    }
}
