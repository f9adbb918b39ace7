//! Audio Segment
//!
//! Raw interleaved little-endian PCM plus the format needed to play it.
//! Segments are produced upstream (decoder, WAV import, tone generator) and
//! only ever borrowed by the playback backends.

use std::fmt;
use std::ops::Range;
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Widest supported sample, in bytes
pub const MAX_SAMPLE_WIDTH: u16 = 4;

/// A decoded PCM buffer with known channel count, sample width and frame rate
#[derive(Clone, PartialEq, Eq)]
pub struct AudioSegment {
    samples: Vec<u8>,
    channels: u16,
    sample_width: u16,
    frame_rate: u32,
}

impl AudioSegment {
    /// Create a segment from raw interleaved PCM bytes
    ///
    /// # Errors
    /// * `InvalidArgument` - zero channels/rate, a width outside 1..=4, or a
    ///   byte length that is not a whole number of frames
    pub fn new(samples: Vec<u8>, channels: u16, sample_width: u16, frame_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(PlaybackError::invalid("channel count must be positive"));
        }
        if sample_width == 0 || sample_width > MAX_SAMPLE_WIDTH {
            return Err(PlaybackError::invalid(format!(
                "sample width must be 1..={} bytes, got {}",
                MAX_SAMPLE_WIDTH, sample_width
            )));
        }
        if frame_rate == 0 {
            return Err(PlaybackError::invalid("frame rate must be positive"));
        }

        let frame_width = channels as usize * sample_width as usize;
        if samples.len() % frame_width != 0 {
            return Err(PlaybackError::invalid(format!(
                "{} bytes is not a whole number of {}-byte frames",
                samples.len(),
                frame_width
            )));
        }

        Ok(AudioSegment {
            samples,
            channels,
            sample_width,
            frame_rate,
        })
    }

    /// A zero-length segment in the given format
    pub fn silent(channels: u16, sample_width: u16, frame_rate: u32) -> Result<Self> {
        Self::new(Vec::new(), channels, sample_width, frame_rate)
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes per sample per channel
    pub fn sample_width(&self) -> u16 {
        self.sample_width
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Bytes per frame (`channels * sample_width`)
    pub fn frame_width(&self) -> usize {
        self.channels as usize * self.sample_width as usize
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.frame_width()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.frame_rate as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    /// Bytes covering a range of frames
    ///
    /// The range is clamped to the segment, so the result is always frame aligned.
    pub fn frame_bytes(&self, frames: Range<usize>) -> &[u8] {
        let total = self.frame_count();
        let start = frames.start.min(total);
        let end = frames.end.clamp(start, total);
        let width = self.frame_width();
        &self.samples[start * width..end * width]
    }

    /// Copy a range of frames into a new segment with the same format
    pub fn slice_frames(&self, frames: Range<usize>) -> AudioSegment {
        AudioSegment {
            samples: self.frame_bytes(frames).to_vec(),
            channels: self.channels,
            sample_width: self.sample_width,
            frame_rate: self.frame_rate,
        }
    }
}

impl fmt::Debug for AudioSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSegment")
            .field("bytes", &self.samples.len())
            .field("channels", &self.channels)
            .field("sample_width", &self.sample_width)
            .field("frame_rate", &self.frame_rate)
            .finish()
    }
}

impl fmt::Display for AudioSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}s, {} ch, {}-bit, {} Hz",
            self.duration_secs(),
            self.channels,
            self.sample_width * 8,
            self.frame_rate
        )
    }
}
