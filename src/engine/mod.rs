//! Audio Engine Module
//!
//! Data and helpers shared by every backend:
//! - PCM segment descriptor
//! - Chunked writer
//! - Cancellation token
//! - WAV I/O and sample conversion

pub mod cancel;
pub mod chunks;
pub mod io;
pub mod segment;

pub use cancel::CancelToken;
pub use chunks::{make_chunks, Chunk, Chunks, DEFAULT_CHUNK_MS};
pub use io::{decode_sample, export_wav, generate_test_tone, import_wav, samples_to_f32};
pub use segment::AudioSegment;
