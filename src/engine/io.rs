//! Audio file I/O and PCM sample conversion
//!
//! WAV export is what the external-player fallback hands to the player.
//! Import exists for the CLI. Segments hold little-endian integer PCM in the
//! WAV convention: 8-bit samples are unsigned around 128, wider ones signed.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::segment::AudioSegment;
use crate::error::{PlaybackError, Result};

/// Decode one little-endian sample of `bytes.len()` (1..=4) bytes to a
/// signed value centred on zero
///
/// 8-bit samples lose their 128 offset; 24-bit samples are sign extended.
#[inline]
pub fn decode_sample(bytes: &[u8]) -> i32 {
    match bytes.len() {
        1 => bytes[0] as i32 - 128,
        2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
        3 => i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8,
        4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => 0,
    }
}

/// Full-scale value for a sample width, used for float normalisation
#[inline]
fn full_scale(sample_width: u16) -> f32 {
    match sample_width {
        1 => 128.0,
        2 => 32768.0,
        3 => 8388608.0,
        _ => 2147483648.0,
    }
}

/// Convert raw PCM bytes to interleaved f32 in [-1.0, 1.0)
pub fn samples_to_f32(raw: &[u8], sample_width: u16) -> Vec<f32> {
    let scale = full_scale(sample_width);
    raw.chunks_exact(sample_width as usize)
        .map(|s| decode_sample(s) as f32 / scale)
        .collect()
}

/// Export a segment to a WAV file, keeping its channels, rate and width
///
/// # Arguments
/// * `segment` - The audio to write
/// * `path` - Destination; an existing file is truncated
///
/// # Errors
/// * `Wav` - if hound cannot create or finalize the file
pub fn export_wav(segment: &AudioSegment, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: segment.channels(),
        sample_rate: segment.frame_rate(),
        bits_per_sample: segment.sample_width() * 8,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    let width = segment.sample_width() as usize;

    for raw in segment.raw_data().chunks_exact(width) {
        let value = decode_sample(raw);
        // hound stores i8 as unsigned on disk
        match width {
            1 => writer.write_sample(value as i8)?,
            2 => writer.write_sample(value as i16)?,
            _ => writer.write_sample(value)?,
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Import a WAV file into a raw PCM segment
///
/// # Errors
/// * `Io` - if the file does not exist
/// * `Wav` - if the file is not a valid WAV file
/// * `UnsupportedFormat` - float WAVs or bit depths that are not whole bytes
pub fn import_wav(path: &Path) -> Result<AudioSegment> {
    if !path.exists() {
        return Err(PlaybackError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_format == SampleFormat::Float {
        return Err(PlaybackError::UnsupportedFormat {
            format: "floating-point WAV (only integer PCM can be played)".to_string(),
        });
    }

    let width = match spec.bits_per_sample {
        8 => 1usize,
        16 => 2,
        24 => 3,
        32 => 4,
        bits => {
            return Err(PlaybackError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits),
            })
        }
    };

    let mut samples = Vec::with_capacity(reader.len() as usize * width);
    for sample in reader.samples::<i32>() {
        let value = sample?;
        if width == 1 {
            samples.push((value + 128) as u8);
        } else {
            samples.extend_from_slice(&value.to_le_bytes()[..width]);
        }
    }

    AudioSegment::new(samples, spec.channels, width as u16, spec.sample_rate)
}

/// Generate a 16-bit sine tone, the same signal on every channel
///
/// Useful for checking an output device.
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `duration_secs` - Duration of the tone in seconds
/// * `frame_rate` - Sample rate in Hz
/// * `channels` - Number of interleaved channels
pub fn generate_test_tone(
    frequency: f32,
    duration_secs: f32,
    frame_rate: u32,
    channels: u16,
) -> Result<AudioSegment> {
    let frames = (duration_secs * frame_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / frame_rate as f32;

    let mut samples = Vec::with_capacity(frames * channels as usize * 2);
    for i in 0..frames {
        // -6 dBFS so a test tone is not painful
        let value = ((angular_freq * i as f32).sin() * 0.5 * 32767.0) as i16;
        for _ in 0..channels {
            samples.extend_from_slice(&value.to_le_bytes());
        }
    }

    AudioSegment::new(samples, channels, 2, frame_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn test_decode_sample_widths() {
        assert_eq!(decode_sample(&[0x80]), 0);
        assert_eq!(decode_sample(&[0x00]), -128);
        assert_eq!(decode_sample(&[0xff]), 127);
        assert_eq!(decode_sample(&[0x00, 0x80]), -32768);
        assert_eq!(decode_sample(&[0xff, 0xff, 0xff]), -1);
        assert_eq!(decode_sample(&[0xff, 0xff, 0x7f]), 8388607);
        assert_eq!(decode_sample(&[0x00, 0x00, 0x00, 0x80]), i32::MIN);
    }

    #[test]
    fn test_samples_to_f32() {
        let raw: Vec<u8> = [0i16, 16384, -32768]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let out = samples_to_f32(&raw, 2);
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 0.0);
        assert_abs_diff_eq!(out[1], 0.5);
        assert_abs_diff_eq!(out[2], -1.0);
    }

    #[test]
    fn test_8bit_midpoint_is_silence() {
        let out = samples_to_f32(&[0x80; 4], 1);
        assert!(out.iter().all(|&s| s == 0.0));

        let out = samples_to_f32(&[0x00, 0xc0], 1);
        assert_abs_diff_eq!(out[0], -1.0);
        assert_abs_diff_eq!(out[1], 0.5);
    }

    #[test]
    fn test_8bit_wav_bytes_kept_unsigned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("unsigned.wav");

        // hound hands 8-bit samples back as signed, centred on zero
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for value in [0i8, -128, 127] {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let seg = import_wav(&path).unwrap();
        assert_eq!(seg.raw_data(), &[0x80u8, 0x00, 0xff]);
    }

    #[test]
    fn test_generate_test_tone() {
        let tone = generate_test_tone(440.0, 0.5, 44100, 2).unwrap();
        assert_eq!(tone.frame_count(), 22050);
        assert_eq!(tone.channels(), 2);
        assert_eq!(tone.sample_width(), 2);

        // both channels carry the same sample
        let frame = &tone.raw_data()[400..404];
        assert_eq!(frame[..2], frame[2..]);
    }

    #[test]
    fn test_round_trip_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let original = generate_test_tone(440.0, 0.25, 22050, 1).unwrap();
        export_wav(&original, &path).unwrap();
        let imported = import_wav(&path).unwrap();

        assert_eq!(imported, original);
    }

    #[test]
    fn test_round_trip_8_and_24_bit() {
        let dir = tempdir().unwrap();

        let eight = AudioSegment::new(vec![0x80, 0xff, 0x00, 0x7f], 2, 1, 8000).unwrap();
        let path = dir.path().join("eight.wav");
        export_wav(&eight, &path).unwrap();
        assert_eq!(import_wav(&path).unwrap(), eight);

        let wide = AudioSegment::new(vec![0x01, 0x02, 0x83, 0xff, 0xff, 0x7f], 1, 3, 48000).unwrap();
        let path = dir.path().join("wide.wav");
        export_wav(&wide, &path).unwrap();
        assert_eq!(import_wav(&path).unwrap(), wide);
    }

    #[test]
    fn test_export_writes_wav_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header.wav");
        let seg = generate_test_tone(1000.0, 0.1, 8000, 1).unwrap();
        export_wav(&seg, &path).unwrap();

        let spec = WavReader::open(&path).unwrap().spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
    }

    #[test]
    fn test_import_nonexistent_file() {
        let err = import_wav(Path::new("/nonexistent/file.wav")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_import_float_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.25f32).unwrap();
        writer.finalize().unwrap();

        let err = import_wav(&path).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }
}
