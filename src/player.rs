//! Playback Orchestrator
//!
//! Tries backends strictly in order: native, then buffered, then the
//! external player. Only `BackendUnavailable` moves on to the next one;
//! any other failure is a real runtime problem and goes to the caller.

use log::{debug, info};

use crate::backend::{self, Backend, BackendKind, DeviceId, SubprocessDriver};
use crate::config::PlaybackConfig;
use crate::engine::{AudioSegment, CancelToken};
use crate::error::{PlaybackError, Result};

pub struct Player {
    backends: Vec<Box<dyn Backend>>,
}

impl Player {
    /// Build the backend chain a config asks for
    pub fn new(config: &PlaybackConfig) -> Self {
        let backends = config
            .backends
            .iter()
            .map(|kind| -> Box<dyn Backend> {
                match kind {
                    BackendKind::Native => backend::native::system_driver(config.chunk_ms),
                    BackendKind::Buffered => backend::buffered::system_driver(),
                    BackendKind::Subprocess => {
                        Box::new(SubprocessDriver::new(config.player.clone()))
                    }
                }
            })
            .collect();

        Player { backends }
    }

    pub fn with_backends(backends: Vec<Box<dyn Backend>>) -> Self {
        Player { backends }
    }

    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Play a segment on the first backend that is present
    ///
    /// `device` is used only by the native backend; the others ignore it.
    /// Returns the backend that played the segment.
    ///
    /// # Errors
    /// * `InvalidArgument` - e.g. a device that is not an integer index
    /// * `DeviceError` - a present backend failed to open or write
    /// * `PlayerNotFound` - the external-player fallback found no player
    /// * `Cancelled` - the token fired; resources are already released
    /// * `NoBackendAvailable` - every configured backend was unavailable
    pub fn play(
        &self,
        segment: &AudioSegment,
        device: Option<&DeviceId>,
        cancel: &CancelToken,
    ) -> Result<BackendKind> {
        let mut skipped = 0;
        for backend in &self.backends {
            let kind = backend.kind();
            if kind == BackendKind::Subprocess && skipped > 0 {
                info!(
                    "No native playback backend available, falling back to an external player. \
                     Build with the `native` feature for better playback."
                );
            }

            match backend.play(segment, device, cancel) {
                Ok(()) => {
                    debug!("Played {} via {} backend", segment, kind);
                    return Ok(kind);
                }
                Err(e) if e.is_unavailable() => {
                    debug!("{}", e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Err(PlaybackError::NoBackendAvailable)
    }
}

impl Default for Player {
    fn default() -> Self {
        Player::new(&PlaybackConfig::default())
    }
}

/// Play a segment with the environment's configuration
///
/// Blocks until playback finishes. Equivalent to
/// `Player::new(&PlaybackConfig::from_env()).play(..)` with a fresh token.
pub fn play(segment: &AudioSegment, device: Option<&DeviceId>) -> Result<()> {
    Player::new(&PlaybackConfig::from_env())
        .play(segment, device, &CancelToken::new())
        .map(|_| ())
}
