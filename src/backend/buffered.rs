//! Buffered Playback Driver
//!
//! Hands the whole PCM buffer to a playback facility that does its own
//! buffering, then waits for it to finish. Playback is synchronous: a
//! cancelled wait stops the sound instead of leaving it running detached.
//! Callers that want fire-and-forget can use [`BufferedDriver::start`].

use std::thread;
use std::time::Duration;

use log::debug;

use crate::backend::{Backend, BackendKind, DeviceId};
use crate::engine::{AudioSegment, CancelToken};
use crate::error::{PlaybackError, Result};

/// How often a waiting caller looks at the cancel token
const WAIT_POLL: Duration = Duration::from_millis(20);

/// An in-progress, asynchronous playback
pub trait PlaybackHandle {
    fn is_playing(&self) -> bool;

    /// Stop playback now. Safe to call after it has finished.
    fn stop(&mut self);

    /// Block until playback ends
    ///
    /// # Errors
    /// * `Cancelled` - the token fired first; playback has been stopped
    fn wait_done(&mut self, cancel: &CancelToken) -> Result<()> {
        while self.is_playing() {
            if cancel.is_cancelled() {
                self.stop();
                return Err(PlaybackError::Cancelled);
            }
            thread::sleep(WAIT_POLL);
        }
        Ok(())
    }
}

/// Something that can play a raw buffer in one call
pub trait BufferedFacility {
    type Handle: PlaybackHandle;

    fn play_buffer(
        &self,
        samples: &[u8],
        channels: u16,
        bytes_per_sample: u16,
        sample_rate: u32,
    ) -> Result<Self::Handle>;
}

pub struct BufferedDriver<F> {
    facility: F,
}

impl<F: BufferedFacility> BufferedDriver<F> {
    pub fn new(facility: F) -> Self {
        BufferedDriver { facility }
    }

    /// Start playback and return immediately
    pub fn start(&self, segment: &AudioSegment) -> Result<F::Handle> {
        self.facility.play_buffer(
            segment.raw_data(),
            segment.channels(),
            segment.sample_width(),
            segment.frame_rate(),
        )
    }
}

impl<F: BufferedFacility> Backend for BufferedDriver<F> {
    fn kind(&self) -> BackendKind {
        BackendKind::Buffered
    }

    fn play(
        &self,
        segment: &AudioSegment,
        device: Option<&DeviceId>,
        cancel: &CancelToken,
    ) -> Result<()> {
        if let Some(device) = device {
            debug!("Buffered playback ignores output device {}", device);
        }
        cancel.check()?;

        let mut handle = self.start(segment)?;
        handle.wait_done(cancel)
    }
}

/// The buffered backend for this build
pub fn system_driver() -> Box<dyn Backend> {
    #[cfg(feature = "buffered")]
    {
        Box::new(BufferedDriver::new(rodio_facility::RodioFacility))
    }
    #[cfg(not(feature = "buffered"))]
    {
        Box::new(crate::backend::Unavailable::new(
            BackendKind::Buffered,
            "built without the `buffered` feature",
        ))
    }
}

#[cfg(feature = "buffered")]
pub mod rodio_facility {
    //! rodio-backed facility: decodes to f32 and appends to a `Sink`.

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};

    use super::{BufferedFacility, PlaybackHandle};
    use crate::engine::samples_to_f32;
    use crate::error::{PlaybackError, Result};

    pub struct RodioFacility;

    /// Keeps the output stream alive for as long as the sink plays
    pub struct RodioHandle {
        sink: Sink,
        _stream: OutputStream,
    }

    impl BufferedFacility for RodioFacility {
        type Handle = RodioHandle;

        fn play_buffer(
            &self,
            samples: &[u8],
            channels: u16,
            bytes_per_sample: u16,
            sample_rate: u32,
        ) -> Result<RodioHandle> {
            let (stream, stream_handle) = OutputStream::try_default()
                .map_err(|e| PlaybackError::device_from("Failed to open audio output", e))?;
            let sink = Sink::try_new(&stream_handle)
                .map_err(|e| PlaybackError::device_from("Failed to create audio sink", e))?;

            let data = samples_to_f32(samples, bytes_per_sample);
            sink.append(SamplesBuffer::new(channels, sample_rate, data));

            Ok(RodioHandle {
                sink,
                _stream: stream,
            })
        }
    }

    impl PlaybackHandle for RodioHandle {
        fn is_playing(&self) -> bool {
            !self.sink.empty()
        }

        fn stop(&mut self) {
            self.sink.stop();
        }
    }

    impl Drop for RodioHandle {
        fn drop(&mut self) {
            if !self.sink.empty() {
                self.sink.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        started: Cell<usize>,
        stopped: Cell<usize>,
        args: RefCell<Option<(usize, u16, u16, u32)>>,
    }

    struct MockFacility {
        calls: Rc<Calls>,
        polls: usize,
        cancel_on_poll: Option<CancelToken>,
    }

    struct MockHandle {
        calls: Rc<Calls>,
        polls_left: Cell<usize>,
        cancel_on_poll: Option<CancelToken>,
    }

    impl BufferedFacility for MockFacility {
        type Handle = MockHandle;

        fn play_buffer(
            &self,
            samples: &[u8],
            channels: u16,
            bytes_per_sample: u16,
            sample_rate: u32,
        ) -> Result<MockHandle> {
            self.calls.started.set(self.calls.started.get() + 1);
            *self.calls.args.borrow_mut() =
                Some((samples.len(), channels, bytes_per_sample, sample_rate));
            Ok(MockHandle {
                calls: self.calls.clone(),
                polls_left: Cell::new(self.polls),
                cancel_on_poll: self.cancel_on_poll.clone(),
            })
        }
    }

    impl PlaybackHandle for MockHandle {
        fn is_playing(&self) -> bool {
            if let Some(token) = &self.cancel_on_poll {
                token.cancel();
            }
            let left = self.polls_left.get();
            if left == 0 {
                return false;
            }
            self.polls_left.set(left - 1);
            true
        }

        fn stop(&mut self) {
            self.calls.stopped.set(self.calls.stopped.get() + 1);
            self.polls_left.set(0);
        }
    }

    fn segment() -> AudioSegment {
        AudioSegment::new(vec![0u8; 4800], 2, 2, 48000).unwrap()
    }

    #[test]
    fn test_hands_over_whole_buffer() {
        let calls = Rc::new(Calls::default());
        let driver = BufferedDriver::new(MockFacility {
            calls: calls.clone(),
            polls: 3,
            cancel_on_poll: None,
        });

        driver
            .play(&segment(), Some(&DeviceId::Index(4)), &CancelToken::new())
            .unwrap();

        assert_eq!(calls.started.get(), 1);
        assert_eq!(calls.stopped.get(), 0);
        assert_eq!(*calls.args.borrow(), Some((4800, 2, 2, 48000)));
    }

    #[test]
    fn test_cancelled_wait_stops_playback() {
        let calls = Rc::new(Calls::default());
        let token = CancelToken::new();
        let driver = BufferedDriver::new(MockFacility {
            calls: calls.clone(),
            polls: 100,
            cancel_on_poll: Some(token.clone()),
        });

        let err = driver.play(&segment(), None, &token).unwrap_err();

        assert!(matches!(err, PlaybackError::Cancelled));
        assert_eq!(calls.stopped.get(), 1);
    }

    #[test]
    fn test_start_returns_running_handle() {
        let calls = Rc::new(Calls::default());
        let driver = BufferedDriver::new(MockFacility {
            calls: calls.clone(),
            polls: 1,
            cancel_on_poll: None,
        });

        let mut handle = driver.start(&segment()).unwrap();
        assert!(handle.is_playing());
        handle.wait_done(&CancelToken::new()).unwrap();
        assert!(!handle.is_playing());
    }
}
