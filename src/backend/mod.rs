//! Playback Backends
//!
//! Three interchangeable strategies for getting a segment to a speaker:
//! - Native: chunked writes to a low-level device stream (cpal)
//! - Buffered: hand the whole buffer to a playback facility (rodio)
//! - Subprocess: export to a temp WAV and run an external player (ffplay)
//!
//! Each one reports `BackendUnavailable` when its dependency is missing so
//! the orchestrator can move on.

pub mod buffered;
#[cfg(feature = "native")]
pub mod cpal_host;
pub mod native;
pub mod subprocess;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::{AudioSegment, CancelToken};
use crate::error::{PlaybackError, Result};

pub use buffered::{BufferedDriver, BufferedFacility, PlaybackHandle};
pub use native::{DeviceHost, NativeDriver, OutputStream, SampleFormat, StreamFormat};
pub use subprocess::{Exporter, ProcessRunner, SubprocessDriver, SystemRunner, WavExporter};

/// Which backend strategy an implementation provides
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Native,
    Buffered,
    Subprocess,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Buffered => "buffered",
            BackendKind::Subprocess => "subprocess",
        }
    }

    /// Whether this kind was compiled into the crate
    pub fn is_compiled_in(&self) -> bool {
        match self {
            BackendKind::Native => cfg!(feature = "native"),
            BackendKind::Buffered => cfg!(feature = "buffered"),
            BackendKind::Subprocess => true,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output device selector
///
/// Only the native backend understands devices, and only by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceId {
    Index(usize),
    Name(String),
}

impl FromStr for DeviceId {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<usize>() {
            Ok(index) => DeviceId::Index(index),
            Err(_) => DeviceId::Name(trimmed.to_string()),
        })
    }
}

impl From<usize> for DeviceId {
    fn from(index: usize) -> Self {
        DeviceId::Index(index)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Index(i) => write!(f, "#{}", i),
            DeviceId::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// A playback strategy the orchestrator can try
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Play the whole segment, blocking until it finishes or is cancelled
    ///
    /// Every device, process or file acquired here is released before this
    /// returns, whatever the outcome.
    fn play(
        &self,
        segment: &AudioSegment,
        device: Option<&DeviceId>,
        cancel: &CancelToken,
    ) -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn play(
        &self,
        segment: &AudioSegment,
        device: Option<&DeviceId>,
        cancel: &CancelToken,
    ) -> Result<()> {
        (**self).play(segment, device, cancel)
    }
}

/// Stand-in for a backend whose library is not present in this build
#[derive(Debug, Clone)]
pub struct Unavailable {
    kind: BackendKind,
    reason: String,
}

impl Unavailable {
    pub fn new(kind: BackendKind, reason: impl Into<String>) -> Self {
        Unavailable {
            kind,
            reason: reason.into(),
        }
    }
}

impl Backend for Unavailable {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn play(&self, _: &AudioSegment, _: Option<&DeviceId>, _: &CancelToken) -> Result<()> {
        Err(PlaybackError::BackendUnavailable {
            backend: self.kind.as_str(),
            reason: self.reason.clone(),
        })
    }
}
