//! Native Device Driver
//!
//! Opens a low-level output stream in the segment's own format and writes it
//! in half-second chunks, checking for cancellation between chunks. The
//! stream and the host context are released by a scope guard, so a failed
//! or interrupted call never leaves the device held.

use log::{debug, warn};

use crate::backend::{Backend, BackendKind, DeviceId};
use crate::engine::{make_chunks, AudioSegment, CancelToken, DEFAULT_CHUNK_MS};
use crate::error::{PlaybackError, Result};

/// Sample encodings of segment data
///
/// 8-bit PCM is unsigned with 128 as silence, the WAV convention. Wider
/// samples are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    I16,
    I24,
    I32,
}

impl SampleFormat {
    /// Map a sample width in bytes to a stream format
    pub fn from_width(sample_width: u16) -> Result<Self> {
        match sample_width {
            1 => Ok(SampleFormat::U8),
            2 => Ok(SampleFormat::I16),
            3 => Ok(SampleFormat::I24),
            4 => Ok(SampleFormat::I32),
            other => Err(PlaybackError::invalid(format!(
                "no stream format for {}-byte samples",
                other
            ))),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I24 => 3,
            SampleFormat::I32 => 4,
        }
    }
}

/// Parameters an output stream is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub channels: u16,
    pub sample_format: SampleFormat,
    pub frame_rate: u32,
}

impl StreamFormat {
    pub fn for_segment(segment: &AudioSegment) -> Result<Self> {
        Ok(StreamFormat {
            channels: segment.channels(),
            sample_format: SampleFormat::from_width(segment.sample_width())?,
            frame_rate: segment.frame_rate(),
        })
    }
}

/// An initialised audio host (one per playback call)
pub trait DeviceHost {
    type Stream: OutputStream;

    /// Index of the system default output device, looked up now
    fn default_output_index(&self) -> Result<usize>;

    fn open(&self, index: usize, format: &StreamFormat) -> Result<Self::Stream>;

    /// Release the host context. Called once, after the stream is closed.
    fn terminate(&mut self) {}
}

/// An exclusively owned, open output stream
pub trait OutputStream {
    /// Queue raw frames, blocking until the device has accepted them
    fn write(&mut self, frames: &[u8]) -> Result<()>;

    /// Block until queued audio has been played, or the token is cancelled
    fn drain(&mut self, cancel: &CancelToken) -> Result<()>;

    /// Halt output immediately
    fn stop(&mut self) -> Result<()>;

    fn close(&mut self);
}

/// Owns the host and its stream for the duration of one call
struct DeviceSession<H: DeviceHost> {
    host: H,
    stream: Option<H::Stream>,
}

impl<H: DeviceHost> DeviceSession<H> {
    fn stream(&mut self) -> Result<&mut H::Stream> {
        self.stream
            .as_mut()
            .ok_or_else(|| PlaybackError::device("output stream is not open"))
    }
}

impl<H: DeviceHost> Drop for DeviceSession<H> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!("Failed to stop output stream: {}", e);
            }
            stream.close();
            debug!("Output stream closed");
        }
        self.host.terminate();
    }
}

/// Backend that streams chunks straight to an output device
///
/// `connect` initialises the host on every call, so a device plugged in
/// after startup is seen by the next playback.
pub struct NativeDriver<F> {
    connect: F,
    chunk_ms: u64,
}

impl<F, H> NativeDriver<F>
where
    F: Fn() -> Result<H>,
    H: DeviceHost,
{
    pub fn new(connect: F) -> Self {
        NativeDriver {
            connect,
            chunk_ms: DEFAULT_CHUNK_MS,
        }
    }

    pub fn with_chunk_ms(mut self, chunk_ms: u64) -> Self {
        self.chunk_ms = chunk_ms;
        self
    }

    /// The caller's device choice, if any. Only integer indices are valid.
    fn requested_index(device: Option<&DeviceId>) -> Result<Option<usize>> {
        match device {
            None => Ok(None),
            Some(DeviceId::Index(index)) => Ok(Some(*index)),
            Some(DeviceId::Name(name)) => Err(PlaybackError::invalid(format!(
                "output device must be an integer index, got '{}'",
                name
            ))),
        }
    }
}

impl<F, H> Backend for NativeDriver<F>
where
    F: Fn() -> Result<H>,
    H: DeviceHost,
{
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn play(
        &self,
        segment: &AudioSegment,
        device: Option<&DeviceId>,
        cancel: &CancelToken,
    ) -> Result<()> {
        // Reject bad input before touching any device
        let requested = Self::requested_index(device)?;
        let format = StreamFormat::for_segment(segment)?;
        let chunks = make_chunks(segment, self.chunk_ms)?;

        let host = (self.connect)()?;
        let mut session = DeviceSession { host, stream: None };

        let index = match requested {
            Some(index) => index,
            None => session.host.default_output_index()?,
        };
        debug!("Opening output device #{} ({:?})", index, format);
        session.stream = Some(session.host.open(index, &format)?);

        for chunk in chunks {
            cancel.check()?;
            session.stream()?.write(chunk.bytes())?;
        }
        session.stream()?.drain(cancel)?;

        Ok(())
    }
}

/// The native backend for this build
///
/// Without the `native` feature there is no device library to load.
pub fn system_driver(chunk_ms: u64) -> Box<dyn Backend> {
    #[cfg(feature = "native")]
    {
        Box::new(
            NativeDriver::new(crate::backend::cpal_host::CpalHost::connect).with_chunk_ms(chunk_ms),
        )
    }
    #[cfg(not(feature = "native"))]
    {
        let _ = chunk_ms;
        Box::new(crate::backend::Unavailable::new(
            BackendKind::Native,
            "built without the `native` feature",
        ))
    }
}
