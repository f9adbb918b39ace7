//! CLI Command Implementations

use std::path::Path;

use log::info;
use serde::Serialize;

use crate::backend::BackendKind;
use crate::cli::PlaybackArgs;
use crate::config::{resolve_player, PlaybackConfig};
use crate::engine::{generate_test_tone, import_wav, AudioSegment, CancelToken};
use crate::error::Result;
use crate::player::Player;

/// Play a WAV file.
pub fn play_file(path: &Path, args: &PlaybackArgs, cancel: &CancelToken) -> Result<()> {
    info!("Loading {}", path.display());
    let segment = import_wav(path)?;
    println!("Playing {} ({})", path.display(), segment);
    play_segment(&segment, args, cancel)
}

/// Play a generated sine tone.
pub fn play_tone(
    freq: f32,
    secs: f32,
    rate: u32,
    channels: u16,
    args: &PlaybackArgs,
    cancel: &CancelToken,
) -> Result<()> {
    let segment = generate_test_tone(freq, secs, rate, channels)?;
    println!("Playing {} Hz tone ({})", freq, segment);
    play_segment(&segment, args, cancel)
}

fn play_segment(segment: &AudioSegment, args: &PlaybackArgs, cancel: &CancelToken) -> Result<()> {
    let player = Player::new(&args.config());
    let used = player.play(segment, args.device.as_ref(), cancel)?;
    info!("Finished via {} backend", used);
    Ok(())
}

#[derive(Debug, Serialize)]
struct BackendReport {
    backends: Vec<BackendStatus>,
    config: PlaybackConfig,
    player: Option<String>,
    player_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct BackendStatus {
    kind: BackendKind,
    compiled_in: bool,
}

/// Show which backends this build has and which player would be used.
pub fn show_backends(json: bool, player_override: Option<&Path>) -> Result<()> {
    let mut config = PlaybackConfig::from_env();
    if let Some(player) = player_override {
        config = config.with_player(player);
    }

    let resolved = resolve_player(config.player.as_deref());
    let report = BackendReport {
        backends: config
            .backends
            .iter()
            .map(|&kind| BackendStatus {
                kind,
                compiled_in: kind.is_compiled_in(),
            })
            .collect(),
        player: resolved.as_ref().ok().map(|p| p.display().to_string()),
        player_error: resolved.as_ref().err().map(|e| e.to_string()),
        config,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        println!("{}", out);
        return Ok(());
    }

    println!("Backends (in priority order):");
    for status in &report.backends {
        let mark = if status.compiled_in { "yes" } else { "no" };
        println!("  {:<11} available: {}", status.kind, mark);
    }
    match (&report.player, &report.player_error) {
        (Some(player), _) => println!("External player: {}", player),
        (None, Some(err)) => println!("External player: none ({})", err),
        (None, None) => {}
    }
    println!("Native chunk length: {} ms", report.config.chunk_ms);

    Ok(())
}
