//! Command-line definitions for `autotype`.

use std::path::PathBuf;

use autotype_bridge::{HumanizeOptions, ToneOptions, TypingOptions};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "autotype", version)]
#[command(about = "Drive the AutoType worker: typing sessions and text tools")]
pub struct Cli {
    /// RON configuration file (defaults to ./autotype.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Python interpreter used to run the worker
    #[arg(long, env = "AUTOTYPE_PYTHON", global = true)]
    pub python: Option<PathBuf>,

    /// Worker script passed to the interpreter
    #[arg(long, env = "AUTOTYPE_WORKER_SCRIPT", global = true)]
    pub worker_script: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log only to --log-file, not to stderr
    #[arg(long, global = true, requires = "log_file")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List windows that can receive typed text
    Windows,
    /// Focus a window by id
    SelectWindow { id: String },
    /// Rewrite text so it reads as human-written
    Humanize {
        text: String,
        #[command(flatten)]
        options: HumanizeArgs,
    },
    /// Rewrite text in another tone
    AdjustTone {
        text: String,
        #[command(flatten)]
        options: ToneArgs,
    },
    /// List the tone presets the worker offers
    TonePresets,
    /// Check text for plagiarism
    Plagiarism { text: String },
    /// Type text into a window, printing events until the run settles
    Type {
        text: String,
        #[command(flatten)]
        options: TypingArgs,
    },
    /// Interactive session: one command per line on stdin
    Shell,
}

#[derive(Debug, Clone, Default, Args)]
pub struct TypingArgs {
    /// Target window id
    #[arg(long)]
    pub window: Option<String>,
    /// Words per minute
    #[arg(long)]
    pub speed: Option<u32>,
    /// Percentage of characters mistyped and corrected
    #[arg(long)]
    pub typo_rate: Option<f64>,
    /// Milliseconds
    #[arg(long)]
    pub pause_after_comma: Option<u64>,
    /// Milliseconds
    #[arg(long)]
    pub pause_after_period: Option<u64>,
    /// Milliseconds
    #[arg(long)]
    pub random_hesitation: Option<u64>,
}

impl TypingArgs {
    pub fn apply(&self, mut options: TypingOptions) -> TypingOptions {
        if let Some(window) = &self.window {
            options.window_id = window.clone();
        }
        if let Some(speed) = self.speed {
            options.speed = speed;
        }
        if let Some(rate) = self.typo_rate {
            options.typo_rate = rate;
        }
        if let Some(ms) = self.pause_after_comma {
            options.pause_after_comma = ms;
        }
        if let Some(ms) = self.pause_after_period {
            options.pause_after_period = ms;
        }
        if let Some(ms) = self.random_hesitation {
            options.random_hesitation = ms;
        }
        options
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct HumanizeArgs {
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub sentence_complexity: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub vocabulary_level: Option<u8>,
    #[arg(long)]
    pub add_filler_words: bool,
    #[arg(long)]
    pub vary_sentence_beginnings: bool,
}

impl HumanizeArgs {
    pub fn apply(&self, mut options: HumanizeOptions) -> HumanizeOptions {
        if let Some(level) = self.sentence_complexity {
            options.sentence_complexity = level;
        }
        if let Some(level) = self.vocabulary_level {
            options.vocabulary_level = level;
        }
        options.add_filler_words |= self.add_filler_words;
        options.vary_sentence_beginnings |= self.vary_sentence_beginnings;
        options
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ToneArgs {
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub formality_level: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub technical_level: Option<u8>,
    /// Preset id, or `custom` to use the levels
    #[arg(long)]
    pub preset: Option<String>,
}

impl ToneArgs {
    pub fn apply(&self, mut options: ToneOptions) -> ToneOptions {
        if let Some(level) = self.formality_level {
            options.formality_level = level;
        }
        if let Some(level) = self.technical_level {
            options.technical_level = level;
        }
        if let Some(preset) = &self.preset {
            options.preset = preset.clone();
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use autotype_bridge::{HumanizeOptions, TypingOptions};
    use clap::Parser;

    use super::{Cli, Commands};

    #[test]
    fn type_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "autotype", "type", "hello", "--window", "7", "--speed", "80", "--typo-rate", "2",
        ])
        .unwrap();
        let Commands::Type { text, options } = cli.command else {
            panic!("expected the type command");
        };
        let options = options.apply(TypingOptions::default());
        assert_eq!(text, "hello");
        assert_eq!(options.window_id, "7");
        assert_eq!(options.speed, 80);
        assert_eq!(options.typo_rate, 2.0);
        assert_eq!(options.pause_after_period, 1000);
    }

    #[test]
    fn levels_outside_one_to_five_are_refused() {
        assert!(Cli::try_parse_from(["autotype", "humanize", "x", "--vocabulary-level", "9"]).is_err());
        let cli = Cli::try_parse_from(["autotype", "humanize", "x", "--add-filler-words"]).unwrap();
        let Commands::Humanize { options, .. } = cli.command else {
            panic!("expected the humanize command");
        };
        assert!(options.apply(HumanizeOptions::default()).add_filler_words);
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["autotype", "windows", "--verbose", "--python", "py"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.python.as_deref(), Some(std::path::Path::new("py")));
    }

    #[test]
    fn quiet_requires_a_log_file() {
        assert!(Cli::try_parse_from(["autotype", "--quiet", "shell"]).is_err());
    }
}
