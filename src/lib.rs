//! Nueva Playback - PCM buffer playback
//!
//! Plays a fully decoded, in-memory PCM buffer through the best backend
//! present on the machine:
//! 1. Native - chunked writes to an output device (`native` feature, cpal)
//! 2. Buffered - one-shot buffer playback (`buffered` feature, rodio)
//! 3. Subprocess - temp WAV file played by an external player (ffplay/avplay)
//!
//! A backend that is missing is skipped; any other failure is returned.
//! Device streams, player processes and temp files are released on every
//! exit path, including cancellation.

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod player;

pub use backend::{Backend, BackendKind, DeviceId};
pub use config::PlaybackConfig;
pub use engine::{make_chunks, AudioSegment, CancelToken};
pub use error::{PlaybackError, Result};
pub use player::{play, Player};
