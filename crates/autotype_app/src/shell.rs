//! Interactive line shell over the bridge.

use std::sync::Arc;

use anyhow::Context;
use autotype_bridge::{BridgeHandle, Topic};
use autotype_core::SessionState;
use autotype_logging::{autotype_debug, autotype_info};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::AppConfig;
use crate::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Start { text: String, window: Option<String> },
    Pause,
    Resume,
    Stop,
    State,
    Windows,
    SelectWindow(String),
    Humanize(String),
    AdjustTone { text: String, preset: Option<String> },
    TonePresets,
    Plagiarism(String),
    Help,
    Quit,
}

const USAGE: &[&str] = &[
    "start <text> [window-id]",
    "pause",
    "resume",
    "stop",
    "state",
    "windows",
    "select-window <window-id>",
    "humanize <text>",
    "adjust-tone <text> [preset]",
    "tone-presets",
    "plagiarism <text>",
    "help",
    "quit",
];

/// Parses one shell line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let words = shell_words::split(line).map_err(|err| format!("cannot parse line: {err}"))?;
    let Some((name, args)) = words.split_first() else {
        return Ok(None);
    };
    if name.starts_with('#') {
        return Ok(None);
    }
    let command = match (name.as_str(), args) {
        ("start", [text]) => ShellCommand::Start {
            text: text.clone(),
            window: None,
        },
        ("start", [text, window]) => ShellCommand::Start {
            text: text.clone(),
            window: Some(window.clone()),
        },
        ("pause", []) => ShellCommand::Pause,
        ("resume", []) => ShellCommand::Resume,
        ("stop", []) => ShellCommand::Stop,
        ("state", []) => ShellCommand::State,
        ("windows", []) => ShellCommand::Windows,
        ("select-window", [id]) => ShellCommand::SelectWindow(id.clone()),
        ("humanize", [text]) => ShellCommand::Humanize(text.clone()),
        ("adjust-tone", [text]) => ShellCommand::AdjustTone {
            text: text.clone(),
            preset: None,
        },
        ("adjust-tone", [text, preset]) => ShellCommand::AdjustTone {
            text: text.clone(),
            preset: Some(preset.clone()),
        },
        ("tone-presets", []) => ShellCommand::TonePresets,
        ("plagiarism", [text]) => ShellCommand::Plagiarism(text.clone()),
        ("help", _) => ShellCommand::Help,
        ("quit" | "exit", []) => ShellCommand::Quit,
        (other, _) => match USAGE.iter().find(|usage| usage.split(' ').next() == Some(other)) {
            Some(usage) => return Err(format!("usage: {usage}")),
            None => return Err(format!("unknown command `{other}`; try `help`")),
        },
    };
    Ok(Some(command))
}

/// Reads commands from stdin until EOF or `quit`, printing results and bus
/// events as JSON lines. A running session is stopped on the way out.
pub async fn run(bridge: BridgeHandle, config: AppConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let mut events = bridge.subscribe(&Topic::ALL);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(ShellCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        autotype_debug!("Shell command {:?}", command);
                        tokio::spawn(execute(bridge.clone(), Arc::clone(&config), command));
                    }
                    Err(message) => render::emit(&json!({"ok": false, "error": message})),
                }
            }
            Some(event) = events.recv() => render::emit(&render::event(&event)),
        }
        if render::stdout_closed() {
            autotype_info!("Output closed; leaving the shell");
            break;
        }
    }

    if matches!(
        bridge.session_state(),
        SessionState::Running | SessionState::Paused
    ) {
        autotype_info!("Stopping the typing session before exit");
        render::emit(&render::outcome("stop", bridge.stop_typing().await));
    }
    while let Some(event) = events.try_recv() {
        render::emit(&render::event(&event));
    }
    Ok(())
}

async fn execute(bridge: BridgeHandle, config: Arc<AppConfig>, command: ShellCommand) {
    let line = match command {
        ShellCommand::Start { text, window } => {
            let mut options = config.typing.clone();
            if let Some(window) = window {
                options.window_id = window;
            }
            match bridge.start_typing(&text, &options) {
                Ok(run) => {
                    let id = run.id();
                    render::emit(&render::success("start", &json!({"run": id})));
                    let outcome = run.wait().await;
                    render::outcome("typing-run", outcome.map(|results| json!({"run": id, "results": results})))
                }
                Err(err) => render::failure("start", &err),
            }
        }
        ShellCommand::Pause => render::outcome("pause", bridge.pause_typing().await),
        ShellCommand::Resume => render::outcome("resume", bridge.resume_typing().await),
        ShellCommand::Stop => render::outcome("stop", bridge.stop_typing().await),
        ShellCommand::State => render::success("state", &state_document(&bridge)),
        ShellCommand::Windows => render::outcome("windows", bridge.get_available_windows().await),
        ShellCommand::SelectWindow(id) => {
            render::outcome("select-window", bridge.select_window(&id).await)
        }
        ShellCommand::Humanize(text) => render::outcome(
            "humanize",
            bridge.humanize_text(&text, &config.humanize).await,
        ),
        ShellCommand::AdjustTone { text, preset } => {
            let mut options = config.tone.clone();
            if let Some(preset) = preset {
                options.preset = preset;
            }
            render::outcome("adjust-tone", bridge.adjust_tone(&text, &options).await)
        }
        ShellCommand::TonePresets => {
            render::outcome("tone-presets", bridge.get_tone_presets().await)
        }
        ShellCommand::Plagiarism(text) => {
            render::outcome("plagiarism", bridge.check_plagiarism(&text).await)
        }
        ShellCommand::Help => render::success("help", &USAGE),
        ShellCommand::Quit => return,
    };
    render::emit(&line);
}

fn state_document(bridge: &BridgeHandle) -> Value {
    let view = bridge.session_view();
    json!({
        "state": view.state,
        "inFlight": view.in_flight.map(|command| command.to_string()),
        "activeRun": view.active_run,
    })
}
