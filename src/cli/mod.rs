//! CLI Module
//!
//! Command-line interface for playing WAV files and test tones.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::backend::{BackendKind, DeviceId};
use crate::config::PlaybackConfig;

/// Nueva Play - play PCM audio through the best available backend
#[derive(Parser, Debug)]
#[command(name = "nueva-play")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that plays audio
#[derive(Args, Debug, Clone, Default)]
pub struct PlaybackArgs {
    /// Output device index (native backend only)
    #[arg(short, long)]
    pub device: Option<DeviceId>,

    /// External player for the fallback backend (overrides $PLAYER)
    #[arg(long)]
    pub player: Option<PathBuf>,

    /// Backends to try, in order (repeatable)
    #[arg(short, long = "backend", value_enum)]
    pub backends: Vec<BackendKind>,
}

impl PlaybackArgs {
    /// Environment config with command-line overrides applied
    pub fn config(&self) -> PlaybackConfig {
        let mut config = PlaybackConfig::from_env();
        if let Some(player) = &self.player {
            config = config.with_player(player.clone());
        }
        if !self.backends.is_empty() {
            config = config.with_backends(self.backends.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a WAV file
    #[command(name = "play")]
    Play {
        /// Path to an integer PCM WAV file
        path: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Play a sine test tone
    #[command(name = "tone")]
    Tone {
        /// Frequency in Hz
        #[arg(long, default_value_t = 440.0)]
        freq: f32,

        /// Duration in seconds
        #[arg(long, default_value_t = 1.0)]
        secs: f32,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 44100)]
        rate: u32,

        /// Channel count
        #[arg(long, default_value_t = 2)]
        channels: u16,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Show compiled-in backends and the resolved external player
    #[command(name = "backends")]
    Backends {
        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// External player to resolve instead of $PLAYER
        #[arg(long)]
        player: Option<PathBuf>,
    },
}
