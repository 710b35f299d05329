use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ProgressSink;
use crate::Operation;

/// Options for `start-typing`, as sent by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingOptions {
    /// Words per minute.
    pub speed: u32,
    /// Percentage of characters mistyped and corrected.
    pub typo_rate: f64,
    /// Milliseconds.
    pub pause_after_comma: u64,
    /// Milliseconds.
    pub pause_after_period: u64,
    /// Upper bound of random hesitation, in milliseconds.
    pub random_hesitation: u64,
    pub window_id: String,
}

impl Default for TypingOptions {
    fn default() -> Self {
        Self {
            speed: 120,
            typo_rate: 0.0,
            pause_after_comma: 500,
            pause_after_period: 1000,
            random_hesitation: 500,
            window_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HumanizeOptions {
    /// 1 (simple) to 5 (complex).
    pub sentence_complexity: u8,
    /// 1 (plain) to 5 (elaborate).
    pub vocabulary_level: u8,
    pub add_filler_words: bool,
    pub vary_sentence_beginnings: bool,
}

impl Default for HumanizeOptions {
    fn default() -> Self {
        Self {
            sentence_complexity: 3,
            vocabulary_level: 3,
            add_filler_words: false,
            vary_sentence_beginnings: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneOptions {
    pub formality_level: u8,
    pub technical_level: u8,
    /// A preset id from `get_tone_presets`, or `custom` to use the levels.
    pub preset: String,
}

impl Default for ToneOptions {
    fn default() -> Self {
        Self {
            formality_level: 3,
            technical_level: 3,
            preset: "custom".to_string(),
        }
    }
}

/// Immutable description of one worker invocation.
#[derive(Clone)]
pub struct OperationRequest {
    operation: Operation,
    args: Vec<(String, String)>,
    sink: Option<Arc<dyn ProgressSink>>,
    timeout: Option<Duration>,
}

impl OperationRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            args: Vec::new(),
            sink: None,
            timeout: None,
        }
    }

    pub fn typing(text: &str, options: &TypingOptions) -> Self {
        Self::new(Operation::AutoTyper)
            .arg("text", text)
            .arg("window_id", &options.window_id)
            .arg("typing_speed", options.speed.to_string())
            .arg("typo_rate", options.typo_rate.to_string())
            .arg("pause_after_comma", options.pause_after_comma.to_string())
            .arg("pause_after_period", options.pause_after_period.to_string())
            .arg("random_hesitation", options.random_hesitation.to_string())
    }

    pub fn select_window(window_id: &str) -> Self {
        Self::new(Operation::SelectWindow).arg("window_id", window_id)
    }

    pub fn humanize(text: &str, options: &HumanizeOptions) -> Self {
        Self::new(Operation::HumanizeText)
            .arg("text", text)
            .arg("sentence_complexity", options.sentence_complexity.to_string())
            .arg("vocabulary_level", options.vocabulary_level.to_string())
            .arg("add_filler_words", options.add_filler_words.to_string())
            .arg(
                "vary_sentence_beginnings",
                options.vary_sentence_beginnings.to_string(),
            )
    }

    pub fn adjust_tone(text: &str, options: &ToneOptions) -> Self {
        Self::new(Operation::AdjustTone)
            .arg("text", text)
            .arg("formality_level", options.formality_level.to_string())
            .arg("technical_level", options.technical_level.to_string())
            .arg("preset", &options.preset)
    }

    pub fn check_plagiarism(text: &str) -> Self {
        Self::new(Operation::CheckPlagiarism).arg("text", text)
    }

    /// Appends a `--key=value` pair. Order is preserved on the command line.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Overrides the launcher's default timeout for this invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    pub fn arg_keys(&self) -> Vec<&str> {
        self.args.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn into_sink(self) -> Option<Arc<dyn ProgressSink>> {
        self.sink
    }
}

impl fmt::Debug for OperationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Argument values carry user text; keep them out of logs.
        f.debug_struct("OperationRequest")
            .field("operation", &self.operation)
            .field("args", &self.arg_keys())
            .field("sink", &self.sink.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
