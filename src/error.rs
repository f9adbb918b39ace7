//! Error handling for Nueva playback
//!
//! Only `BackendUnavailable` is consumed by the orchestrator; everything else
//! reaches the caller after device, process and temp-file resources are released.

use thiserror::Error;

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Main error type for playback operations
#[derive(Error, Debug)]
pub enum PlaybackError {
    // Backend selection
    #[error("Backend '{backend}' unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("No playback backend available")]
    NoBackendAvailable,

    // Input Errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Device Errors
    #[error("Audio device error: {reason}")]
    DeviceError {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // External player Errors
    #[error("No external player found (searched: {searched})")]
    PlayerNotFound { searched: String },

    #[error("External player '{player}' exited with {code:?}")]
    SubprocessFailure { player: String, code: Option<i32> },

    #[error("Playback cancelled")]
    Cancelled,

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl PlaybackError {
    /// Shorthand for a device failure without an underlying source
    pub fn device(reason: impl Into<String>) -> Self {
        PlaybackError::DeviceError {
            reason: reason.into(),
            source: None,
        }
    }

    /// Wrap a backend library error as a device failure
    pub fn device_from<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PlaybackError::DeviceError {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        PlaybackError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PlaybackError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            PlaybackError::NoBackendAvailable => "NO_BACKEND_AVAILABLE",
            PlaybackError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            PlaybackError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            PlaybackError::DeviceError { .. } => "DEVICE_ERROR",
            PlaybackError::PlayerNotFound { .. } => "PLAYER_NOT_FOUND",
            PlaybackError::SubprocessFailure { .. } => "SUBPROCESS_FAILURE",
            PlaybackError::Cancelled => "CANCELLED",
            PlaybackError::Io(_) => "IO_ERROR",
            PlaybackError::Wav(_) => "WAV_ERROR",
        }
    }

    /// True when the orchestrator should move on to the next backend
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PlaybackError::BackendUnavailable { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PlaybackError::NoBackendAvailable => vec![
                "Build with the `native` or `buffered` feature",
                "Install ffplay (part of FFmpeg) for the fallback path",
            ],
            PlaybackError::InvalidArgument { .. } => vec![
                "Output devices are selected by integer index",
                "Run 'nueva-play backends' to see what is available",
            ],
            PlaybackError::DeviceError { .. } => vec![
                "Check that the output device is connected",
                "Another application may hold the device exclusively",
                "Try a different device index or sample rate",
            ],
            PlaybackError::PlayerNotFound { .. } => vec![
                "Install ffplay (part of FFmpeg) or avplay",
                "Set the PLAYER environment variable to the player executable",
            ],
            PlaybackError::UnsupportedFormat { .. } => vec![
                "Convert the file to 8, 16, 24 or 32-bit integer PCM WAV",
            ],
            _ => vec![],
        }
    }
}
