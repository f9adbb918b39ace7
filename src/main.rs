//! Nueva Play CLI
//!
//! Command-line front end for the playback library.

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use nueva_playback::cli::{commands, Cli, Commands};
use nueva_playback::{CancelToken, PlaybackError, Result};

/// Conventional exit status after SIGINT
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Nueva Play v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, stopping playback...");
        handler_token.cancel();
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    match handle_command(cli.command, &cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(PlaybackError::Cancelled) => ExitCode::from(EXIT_INTERRUPTED),
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  - {}", suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

fn handle_command(cmd: Commands, cancel: &CancelToken) -> Result<()> {
    match cmd {
        Commands::Play { path, playback } => commands::play_file(&path, &playback, cancel),
        Commands::Tone {
            freq,
            secs,
            rate,
            channels,
            playback,
        } => commands::play_tone(freq, secs, rate, channels, &playback, cancel),
        Commands::Backends { json, player } => commands::show_backends(json, player.as_deref()),
    }
}
