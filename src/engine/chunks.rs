//! Chunked Writer
//!
//! Splits a segment into fixed-duration, frame-aligned pieces so a long write
//! can be interrupted between pieces.

use crate::engine::segment::AudioSegment;
use crate::error::{PlaybackError, Result};

/// Chunk length used by the native backend (half a second)
pub const DEFAULT_CHUNK_MS: u64 = 500;

/// A frame-aligned slice of a segment's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    segment: &'a AudioSegment,
    bytes: &'a [u8],
    frame_offset: usize,
    frame_count: usize,
}

impl<'a> Chunk<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Index of the first frame of this chunk within the segment
    pub fn frame_offset(&self) -> usize {
        self.frame_offset
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy this chunk out as a standalone segment in the parent's format
    pub fn to_segment(&self) -> AudioSegment {
        self.segment
            .slice_frames(self.frame_offset..self.frame_offset + self.frame_count)
    }
}

/// Lazy iterator over the chunks of a segment
///
/// Cloning yields an independent iterator from the same position, so the
/// sequence can be restarted by keeping an unconsumed clone.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    segment: &'a AudioSegment,
    frames_per_chunk: usize,
    next_frame: usize,
}

impl<'a> Chunks<'a> {
    pub fn frames_per_chunk(&self) -> usize {
        self.frames_per_chunk
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.segment.frame_count();
        if self.next_frame >= total {
            return None;
        }

        let start = self.next_frame;
        let end = (start + self.frames_per_chunk).min(total);
        self.next_frame = end;

        Some(Chunk {
            segment: self.segment,
            bytes: self.segment.frame_bytes(start..end),
            frame_offset: start,
            frame_count: end - start,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.segment.frame_count().saturating_sub(self.next_frame);
        let n = remaining.div_ceil(self.frames_per_chunk);
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for Chunks<'a> {}

/// Frames in one chunk of `duration_ms` at `frame_rate`
///
/// Rounded to the nearest frame; never less than one.
pub fn frames_per_chunk(duration_ms: u64, frame_rate: u32) -> usize {
    let frames = (duration_ms as f64 / 1000.0 * frame_rate as f64).round() as usize;
    frames.max(1)
}

/// Split a segment into chunks of `duration_ms`
///
/// The last chunk holds whatever remains and may be shorter. An empty
/// segment produces no chunks.
///
/// # Errors
/// * `InvalidArgument` - if `duration_ms` is zero
pub fn make_chunks(segment: &AudioSegment, duration_ms: u64) -> Result<Chunks<'_>> {
    if duration_ms == 0 {
        return Err(PlaybackError::invalid("chunk duration must be positive"));
    }

    Ok(Chunks {
        segment,
        frames_per_chunk: frames_per_chunk(duration_ms, segment.frame_rate()),
        next_frame: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(frames: usize, channels: u16, width: u16, rate: u32) -> AudioSegment {
        let len = frames * channels as usize * width as usize;
        let bytes = (0..len).map(|i| (i % 251) as u8).collect();
        AudioSegment::new(bytes, channels, width, rate).unwrap()
    }

    #[test]
    fn test_two_seconds_mono_16bit() {
        let seg = segment(88200, 1, 2, 44100);
        let chunks: Vec<_> = make_chunks(&seg, 500).unwrap().collect();

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert_eq!(chunk.len(), 44100);
            assert_eq!(chunk.frame_count(), 22050);
        }
        assert_eq!(chunks.iter().map(Chunk::len).sum::<usize>(), seg.raw_data().len());
    }

    #[test]
    fn test_remainder_chunk() {
        let seg = segment(1000, 2, 3, 1000);
        let chunks: Vec<_> = make_chunks(&seg, 300).unwrap().collect();

        let counts: Vec<_> = chunks.iter().map(Chunk::frame_count).collect();
        assert_eq!(counts, vec![300, 300, 300, 100]);
        assert_eq!(chunks[3].frame_offset(), 900);
    }

    #[test]
    fn test_concat_reconstructs_buffer() {
        for &(channels, width, rate) in &[(1u16, 1u16, 8000u32), (2, 2, 44100), (6, 3, 48000), (2, 4, 22050)] {
            let seg = segment(12345, channels, width, rate);
            for &ms in &[1u64, 7, 250, 500, 10_000] {
                let joined: Vec<u8> = make_chunks(&seg, ms)
                    .unwrap()
                    .flat_map(|c| c.bytes().iter().copied())
                    .collect();
                assert_eq!(joined, seg.raw_data(), "ch={} w={} ms={}", channels, width, ms);
            }
        }
    }

    #[test]
    fn test_chunks_are_frame_aligned() {
        let seg = segment(5000, 2, 3, 44100);
        for chunk in make_chunks(&seg, 33).unwrap() {
            assert_eq!(chunk.len() % seg.frame_width(), 0);
        }
    }

    #[test]
    fn test_empty_segment_yields_nothing() {
        let seg = AudioSegment::silent(2, 2, 44100).unwrap();
        let mut chunks = make_chunks(&seg, 500).unwrap();
        assert_eq!(chunks.len(), 0);
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let seg = segment(10, 1, 2, 44100);
        assert!(make_chunks(&seg, 0).is_err());
    }

    #[test]
    fn test_restartable() {
        let seg = segment(3000, 1, 2, 1000);
        let chunks = make_chunks(&seg, 1000).unwrap();
        let first: Vec<_> = chunks.clone().collect();
        let second: Vec<_> = chunks.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_to_segment() {
        let seg = segment(2500, 2, 2, 1000);
        let last = make_chunks(&seg, 1000).unwrap().last().unwrap();
        let part = last.to_segment();
        assert_eq!(part.frame_count(), 500);
        assert_eq!(part.channels(), 2);
        assert_eq!(part.raw_data(), last.bytes());
    }

    #[test]
    fn test_tiny_duration_still_progresses() {
        assert_eq!(frames_per_chunk(1, 100), 1);
        assert_eq!(frames_per_chunk(500, 44100), 22050);
    }
}
