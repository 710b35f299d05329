use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use autotype_bridge::{HumanizeOptions, ToneOptions, TypingOptions, WorkerSettings};
use autotype_logging::autotype_info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "autotype.ron";

/// Contents of `autotype.ron`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub worker: WorkerConfig,
    pub typing: TypingOptions,
    pub humanize: HumanizeOptions,
    pub tone: ToneOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub python: Option<PathBuf>,
    pub script: Option<PathBuf>,
    /// Seconds; 0 disables the bound.
    pub request_timeout_secs: Option<u64>,
    /// Seconds; 0 disables the bound.
    pub typing_timeout_secs: Option<u64>,
    pub max_line_bytes: Option<usize>,
}

impl AppConfig {
    /// Loads `path`, or `autotype.ron` in the working directory. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                autotype_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {path:?}"));
            }
        };
        let config = Self::from_ron(&text).with_context(|| format!("invalid config {path:?}"))?;
        autotype_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Worker settings from this file, with command-line/environment overrides.
    pub fn worker_settings(
        &self,
        python: Option<PathBuf>,
        script: Option<PathBuf>,
    ) -> WorkerSettings {
        let mut settings = WorkerSettings::default();
        if let Some(program) = python.or_else(|| self.worker.python.clone()) {
            settings.program = program;
        }
        if let Some(script) = script.or_else(|| self.worker.script.clone()) {
            settings.script = Some(script);
        }
        if let Some(secs) = self.worker.request_timeout_secs {
            settings.request_timeout = bound(secs);
        }
        if let Some(secs) = self.worker.typing_timeout_secs {
            settings.typing_timeout = bound(secs);
        }
        if let Some(max) = self.worker.max_line_bytes {
            settings.max_line_bytes = max;
        }
        settings
    }
}

fn bound(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
