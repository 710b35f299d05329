use std::fmt;

use autotype_core::{Command, StateConflict};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operations understood by the worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AutoTyper,
    StopTyping,
    PauseTyping,
    ResumeTyping,
    GetWindows,
    SelectWindow,
    HumanizeText,
    AdjustTone,
    GetTonePresets,
    CheckPlagiarism,
}

impl Operation {
    /// The operation name passed to the worker as its first parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::AutoTyper => "auto_typer",
            Operation::StopTyping => "stop_typing",
            Operation::PauseTyping => "pause_typing",
            Operation::ResumeTyping => "resume_typing",
            Operation::GetWindows => "get_windows",
            Operation::SelectWindow => "select_window",
            Operation::HumanizeText => "humanize_text",
            Operation::AdjustTone => "adjust_tone",
            Operation::GetTonePresets => "get_tone_presets",
            Operation::CheckPlagiarism => "check_plagiarism",
        }
    }

    pub fn for_command(command: Command) -> Self {
        match command {
            Command::Start => Operation::AutoTyper,
            Command::Pause => Operation::PauseTyping,
            Command::Resume => Operation::ResumeTyping,
            Command::Stop => Operation::StopTyping,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Progress,
    Error,
    /// Anything not tagged `progress` or `error`.
    Result,
}

/// One structured record read from a worker's stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerMessage {
    pub kind: MessageKind,
    pub payload: Value,
}

impl WorkerMessage {
    /// Parses one `{"type": ..., "data": ...}` record. A record without `data`
    /// carries the whole object as its payload.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        let kind = match value.get("type").and_then(Value::as_str) {
            Some("progress") => MessageKind::Progress,
            Some("error") => MessageKind::Error,
            _ => MessageKind::Result,
        };
        let payload = match value {
            Value::Object(mut map) => match map.remove("data") {
                Some(data) => data,
                None => Value::Object(map),
            },
            other => other,
        };
        Ok(Self { kind, payload })
    }

    /// Display text for an error record.
    pub fn error_text(&self) -> String {
        match &self.payload {
            Value::String(text) => text.clone(),
            Value::Null => "worker reported an error".to_string(),
            Value::Object(map) => match map.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => self.payload.to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The worker could not be started at all.
    Launch,
    /// Output that is not a well-formed record.
    ProtocolViolation,
    /// The worker emitted an explicit error record.
    Reported,
    /// Non-zero exit or termination by signal (`code` is `None`) without an error record.
    AbnormalExit { code: Option<i32> },
    Timeout,
    /// The invocation task went away before producing an outcome.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Launch => write!(f, "launch failure"),
            FailureKind::ProtocolViolation => write!(f, "protocol violation"),
            FailureKind::Reported => write!(f, "worker error"),
            FailureKind::AbnormalExit { code: Some(code) } => write!(f, "abnormal exit {code}"),
            FailureKind::AbnormalExit { code: None } => write!(f, "abnormal exit"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Aborted => write!(f, "aborted"),
        }
    }
}

/// Failure of one worker invocation. `message` is suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WorkerError {
    pub operation: Operation,
    pub kind: FailureKind,
    pub message: String,
}

impl WorkerError {
    pub fn new(operation: Operation, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Session(#[from] StateConflict),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MessageKind, WorkerMessage};

    #[test]
    fn parses_tagged_records() {
        let progress = WorkerMessage::parse(r#"{"type":"progress","data":{"percentComplete":10}}"#)
            .unwrap();
        assert_eq!(progress.kind, MessageKind::Progress);
        assert_eq!(progress.payload, json!({"percentComplete": 10}));

        let error = WorkerMessage::parse(r#"{"type":"error","data":"boom"}"#).unwrap();
        assert_eq!(error.kind, MessageKind::Error);
        assert_eq!(error.error_text(), "boom");
    }

    #[test]
    fn untagged_records_are_results_with_whole_payload() {
        let message = WorkerMessage::parse(r#"{"similarityScore":0.5}"#).unwrap();
        assert_eq!(message.kind, MessageKind::Result);
        assert_eq!(message.payload, json!({"similarityScore": 0.5}));

        let other = WorkerMessage::parse(r#"{"type":"status","data":[1,2]}"#).unwrap();
        assert_eq!(other.kind, MessageKind::Result);
        assert_eq!(other.payload, json!([1, 2]));
    }

    #[test]
    fn error_text_prefers_message_field() {
        let error = WorkerMessage::parse(r#"{"type":"error","data":{"message":"no window"}}"#)
            .unwrap();
        assert_eq!(error.error_text(), "no window");
    }

    #[test]
    fn rejects_non_json() {
        assert!(WorkerMessage::parse("Traceback (most recent call last):").is_err());
    }
}
