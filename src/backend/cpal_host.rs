//! Native output through cpal
//!
//! The audio callback pulls normalised samples from a lock-free ring that
//! `write` fills, so writes block only while the ring is full. The device is
//! opened in the segment's own sample format when it supports it, otherwise
//! in a format it does support, converting each sample in the callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample, Stream, StreamConfig};
use log::{debug, error};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::backend::native::{DeviceHost, OutputStream, SampleFormat, StreamFormat};
use crate::engine::{samples_to_f32, CancelToken};
use crate::error::{PlaybackError, Result};

/// Ring capacity in seconds of audio
const RING_SECONDS: f32 = 0.5;
const MIN_RING_SAMPLES: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// A callback that stops consuming for this long means the device is gone
const STALL_TIMEOUT: Duration = Duration::from_secs(2);
/// Time left for the device's own buffer after the ring empties
const TAIL: Duration = Duration::from_millis(50);

/// Device formats tried when the segment's own is not supported, in order
const FALLBACK_FORMATS: &[cpal::SampleFormat] = &[
    cpal::SampleFormat::F32,
    cpal::SampleFormat::I16,
    cpal::SampleFormat::I32,
];

/// One supported output configuration, reduced to what format selection needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigRange {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    sample_format: cpal::SampleFormat,
}

impl From<&cpal::SupportedStreamConfigRange> for ConfigRange {
    fn from(range: &cpal::SupportedStreamConfigRange) -> Self {
        ConfigRange {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            sample_format: range.sample_format(),
        }
    }
}

impl ConfigRange {
    fn accepts(&self, format: &StreamFormat, sample_format: cpal::SampleFormat) -> bool {
        self.sample_format == sample_format
            && self.channels == format.channels
            && (self.min_rate..=self.max_rate).contains(&format.frame_rate)
    }
}

/// The cpal format matching a segment's samples
///
/// cpal has no packed 24-bit output, so I24 is carried in i32.
fn device_format(sample_format: SampleFormat) -> cpal::SampleFormat {
    match sample_format {
        SampleFormat::U8 => cpal::SampleFormat::U8,
        SampleFormat::I16 => cpal::SampleFormat::I16,
        SampleFormat::I24 | SampleFormat::I32 => cpal::SampleFormat::I32,
    }
}

/// Pick the device sample format for a stream
///
/// The segment's own format wins when the device lists it at the segment's
/// channel count and rate; otherwise the first fallback it lists. `None`
/// when nothing matches the channel count and rate.
fn select_sample_format(
    format: &StreamFormat,
    supported: &[ConfigRange],
) -> Option<cpal::SampleFormat> {
    std::iter::once(device_format(format.sample_format))
        .chain(FALLBACK_FORMATS.iter().copied())
        .find(|&candidate| supported.iter().any(|range| range.accepts(format, candidate)))
}

pub struct CpalHost {
    host: cpal::Host,
}

impl CpalHost {
    pub fn connect() -> Result<Self> {
        Ok(CpalHost {
            host: cpal::default_host(),
        })
    }

    fn output_devices(&self) -> Result<Vec<cpal::Device>> {
        self.host
            .output_devices()
            .map(|devices| devices.collect())
            .map_err(|e| PlaybackError::device_from("Failed to enumerate output devices", e))
    }
}

impl DeviceHost for CpalHost {
    type Stream = CpalStream;

    fn default_output_index(&self) -> Result<usize> {
        let default = self
            .host
            .default_output_device()
            .ok_or_else(|| PlaybackError::device("No default output device available"))?;
        let default_name = default
            .name()
            .map_err(|e| PlaybackError::device_from("Failed to read device name", e))?;

        self.output_devices()?
            .iter()
            .position(|d| d.name().map(|n| n == default_name).unwrap_or(false))
            .ok_or_else(|| {
                PlaybackError::device(format!(
                    "Default device '{}' is not among the output devices",
                    default_name
                ))
            })
    }

    fn open(&self, index: usize, format: &StreamFormat) -> Result<CpalStream> {
        let device = self
            .output_devices()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| PlaybackError::device(format!("No output device at index {}", index)))?;

        if let Ok(name) = device.name() {
            debug!("Using output device #{}: {}", index, name);
        }

        let sample_format = match device.supported_output_configs() {
            Ok(ranges) => {
                let supported: Vec<ConfigRange> = ranges.map(|r| ConfigRange::from(&r)).collect();
                select_sample_format(format, &supported).ok_or_else(|| {
                    PlaybackError::device(format!(
                        "Output device #{} does not support {} channel(s) at {} Hz",
                        index, format.channels, format.frame_rate
                    ))
                })?
            }
            Err(e) => {
                debug!("Could not list supported output configs: {}", e);
                device_format(format.sample_format)
            }
        };
        if sample_format != device_format(format.sample_format) {
            debug!(
                "Device has no {:?} output, converting to {:?}",
                format.sample_format, sample_format
            );
        }

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.frame_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capacity = ((format.frame_rate as f32 * RING_SECONDS) as usize
            * format.channels as usize)
            .max(MIN_RING_SAMPLES);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let failed = Arc::new(AtomicBool::new(false));

        let errors = failed.clone();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, consumer, errors)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, consumer, errors)?,
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, consumer, errors)?,
            cpal::SampleFormat::U8 => build_stream::<u8>(&device, &config, consumer, errors)?,
            other => {
                return Err(PlaybackError::device(format!(
                    "No output conversion to {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| PlaybackError::device_from("Failed to start output stream", e))?;

        Ok(CpalStream {
            stream: Some(stream),
            producer,
            failed,
            sample_width: format.sample_format.width() as u16,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<f32>,
    failed: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    *sample = match consumer.try_pop() {
                        Some(value) => T::from_sample(value),
                        None => T::EQUILIBRIUM,
                    };
                }
            },
            move |err| {
                error!("Audio output error: {}", err);
                failed.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| PlaybackError::device_from("Failed to build output stream", e))
}

pub struct CpalStream {
    stream: Option<Stream>,
    producer: HeapProd<f32>,
    failed: Arc<AtomicBool>,
    sample_width: u16,
}

impl CpalStream {
    fn check_failed(&self) -> Result<()> {
        if self.failed.load(Ordering::SeqCst) {
            Err(PlaybackError::device("Output stream reported an error"))
        } else {
            Ok(())
        }
    }
}

impl OutputStream for CpalStream {
    fn write(&mut self, frames: &[u8]) -> Result<()> {
        let samples = samples_to_f32(frames, self.sample_width);

        let mut remaining = &samples[..];
        let mut last_progress = Instant::now();

        while !remaining.is_empty() {
            self.check_failed()?;
            let pushed = self.producer.push_slice(remaining);
            if pushed > 0 {
                remaining = &remaining[pushed..];
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(PlaybackError::device("Output device stopped consuming audio"));
            } else {
                thread::sleep(POLL_INTERVAL);
            }
        }

        Ok(())
    }

    fn drain(&mut self, cancel: &CancelToken) -> Result<()> {
        while self.producer.occupied_len() > 0 {
            cancel.check()?;
            self.check_failed()?;
            thread::sleep(POLL_INTERVAL);
        }
        thread::sleep(TAIL);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        match &self.stream {
            Some(stream) => stream
                .pause()
                .map_err(|e| PlaybackError::device_from("Failed to stop output stream", e)),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        // dropping the cpal stream releases the device
        self.stream.take();
    }
}
