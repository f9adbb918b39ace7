//! Playback configuration
//!
//! Values come from the environment (`PLAYER`, `NUEVA_PLAYBACK_CHUNK_MS`)
//! and can be overridden by the CLI. The external player is resolved on
//! every fallback invocation, not cached.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;

use crate::backend::BackendKind;
use crate::engine::DEFAULT_CHUNK_MS;
use crate::error::{PlaybackError, Result};

/// Environment variable naming the external player
pub const PLAYER_ENV: &str = "PLAYER";

/// Environment variable overriding the native chunk length
pub const CHUNK_MS_ENV: &str = "NUEVA_PLAYBACK_CHUNK_MS";

/// Players searched for on `PATH`, in order, when no override is set
pub const DEFAULT_PLAYERS: &[&str] = &["ffplay", "avplay"];

/// Backends tried by default, in priority order
pub const DEFAULT_BACKENDS: &[BackendKind] = &[
    BackendKind::Native,
    BackendKind::Buffered,
    BackendKind::Subprocess,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackConfig {
    /// External player override (name or path)
    pub player: Option<PathBuf>,
    /// Chunk length for the native backend
    pub chunk_ms: u64,
    /// Backends to try, in order
    pub backends: Vec<BackendKind>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            player: None,
            chunk_ms: DEFAULT_CHUNK_MS,
            backends: DEFAULT_BACKENDS.to_vec(),
        }
    }
}

impl PlaybackConfig {
    /// Defaults, then whatever the environment sets
    pub fn from_env() -> Self {
        let mut config = PlaybackConfig::default();

        if let Some(player) = env::var_os(PLAYER_ENV).filter(|p| !p.is_empty()) {
            config.player = Some(PathBuf::from(player));
        }

        if let Some(ms) = parse_chunk_ms(env::var(CHUNK_MS_ENV).ok()) {
            config.chunk_ms = ms;
        }

        config
    }

    pub fn with_player(mut self, player: impl Into<PathBuf>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn with_backends(mut self, backends: Vec<BackendKind>) -> Self {
        self.backends = backends;
        self
    }
}

/// Parse a chunk length setting; anything but a positive integer is ignored
fn parse_chunk_ms(raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(ms),
        _ => {
            warn!("Ignoring {}={:?}: expected a positive integer", CHUNK_MS_ENV, raw);
            None
        }
    }
}

/// Find the external player executable
///
/// An override containing a path separator must point at an existing file;
/// a bare name is looked up on `PATH`. Without an override, the default
/// players are searched in order.
///
/// # Errors
/// * `PlayerNotFound` - nothing resolvable
pub fn resolve_player(player_override: Option<&Path>) -> Result<PathBuf> {
    let path_var = env::var_os("PATH");
    resolve_player_in(player_override, path_var.as_deref())
}

/// `resolve_player` against an explicit `PATH` value
pub fn resolve_player_in(player_override: Option<&Path>, path_var: Option<&OsStr>) -> Result<PathBuf> {
    let candidates: Vec<&Path> = match player_override {
        Some(player) => vec![player],
        None => DEFAULT_PLAYERS.iter().map(Path::new).collect(),
    };

    for candidate in &candidates {
        if let Some(found) = find_executable(candidate, path_var) {
            return Ok(found);
        }
    }

    Err(PlaybackError::PlayerNotFound {
        searched: candidates
            .iter()
            .map(|c| c.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn find_executable(candidate: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let dirs = path_var?;
    env::split_paths(dirs).find_map(|dir| {
        let full = dir.join(candidate);
        if is_executable(&full) {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if is_executable(&exe) {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
