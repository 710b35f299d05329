use serde::{Deserialize, Serialize};

/// Transient status update of a typing run.
///
/// Records are normalised on construction so that `percent_complete` lies in
/// `0..=100` and `characters_typed <= total_characters`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressRecord {
    pub percent_complete: f64,
    pub characters_typed: u64,
    pub total_characters: u64,
}

impl ProgressRecord {
    pub fn new(percent_complete: f64, characters_typed: u64, total_characters: u64) -> Self {
        Self {
            percent_complete,
            characters_typed,
            total_characters,
        }
        .normalized()
    }

    pub fn normalized(self) -> Self {
        let percent_complete = if self.percent_complete.is_finite() {
            self.percent_complete.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            percent_complete,
            characters_typed: self.characters_typed.min(self.total_characters),
            total_characters: self.total_characters,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent_complete >= 100.0
    }
}
