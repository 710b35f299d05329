mod cli;
mod config;
mod logging;
mod render;
mod shell;

use std::process::ExitCode;

use anyhow::Context;
use autotype_bridge::{BridgeError, BridgeHandle, Topic, TypingOptions};
use autotype_logging::autotype_info;
use clap::Parser;
use log::LevelFilter;
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::logging::LogDestination;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(
        LogDestination::from_flags(cli.log_file.clone(), !cli.quiet),
        level,
    );

    let config = AppConfig::load(cli.config.as_deref())?;
    let settings = config.worker_settings(cli.python.clone(), cli.worker_script.clone());
    autotype_info!(
        "Worker: {:?} {:?}",
        settings.program,
        settings.script
    );

    // One coordinating thread; worker I/O is multiplexed on it.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(cli.command, config, BridgeHandle::new(settings)))
}

async fn run(command: Commands, config: AppConfig, bridge: BridgeHandle) -> anyhow::Result<ExitCode> {
    let code = match command {
        Commands::Windows => report("windows", bridge.get_available_windows().await),
        Commands::SelectWindow { id } => {
            report("select-window", bridge.select_window(&id).await)
        }
        Commands::Humanize { text, options } => {
            let options = options.apply(config.humanize.clone());
            report("humanize", bridge.humanize_text(&text, &options).await)
        }
        Commands::AdjustTone { text, options } => {
            let options = options.apply(config.tone.clone());
            report("adjust-tone", bridge.adjust_tone(&text, &options).await)
        }
        Commands::TonePresets => report("tone-presets", bridge.get_tone_presets().await),
        Commands::Plagiarism { text } => report("plagiarism", bridge.check_plagiarism(&text).await),
        Commands::Type { text, options } => {
            let options = options.apply(config.typing.clone());
            type_text(&bridge, &text, &options).await
        }
        Commands::Shell => {
            shell::run(bridge, config).await?;
            ExitCode::SUCCESS
        }
    };
    Ok(code)
}

fn report<T: Serialize, E: Into<BridgeError>>(command: &str, result: Result<T, E>) -> ExitCode {
    let code = if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };
    render::emit(&render::outcome(command, result));
    code
}

/// Runs one typing session to completion, printing every bus event on the way.
async fn type_text(bridge: &BridgeHandle, text: &str, options: &TypingOptions) -> ExitCode {
    let mut events = bridge.subscribe(&Topic::ALL);
    let outcome = match bridge.start_typing(text, options) {
        Ok(run) => {
            let wait = run.wait();
            tokio::pin!(wait);
            loop {
                tokio::select! {
                    outcome = &mut wait => break outcome.map_err(BridgeError::from),
                    Some(event) = events.recv() => render::emit(&render::event(&event)),
                }
            }
        }
        Err(err) => Err(err),
    };
    while let Some(event) = events.try_recv() {
        render::emit(&render::event(&event));
    }
    report("type", outcome)
}
