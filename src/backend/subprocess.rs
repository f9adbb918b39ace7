//! Subprocess Fallback Driver
//!
//! Last resort: write the segment to a temporary WAV file and run an
//! external player on it, blocking until the player exits. The temp file is
//! deleted on every path. The player's exit status is reported but never
//! turned into an error; playback through an external tool is best effort.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::backend::{Backend, BackendKind, DeviceId};
use crate::config::resolve_player;
use crate::engine::{export_wav, AudioSegment, CancelToken};
use crate::error::{PlaybackError, Result};

/// No window, exit at end of stream, no version banner
pub const PLAYER_ARGS: &[&str] = &["-nodisp", "-autoexit", "-hide_banner"];

/// Writes a segment to a self-contained container file
pub trait Exporter {
    fn export(&self, segment: &AudioSegment, path: &Path) -> Result<()>;
}

pub struct WavExporter;

impl Exporter for WavExporter {
    fn export(&self, segment: &AudioSegment, path: &Path) -> Result<()> {
        export_wav(segment, path)
    }
}

/// Runs a program to completion
pub trait ProcessRunner {
    /// Returns the exit code, or `None` if the process was killed by a signal
    fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>>;
}

pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()?;
        Ok(status.code())
    }
}

pub struct SubprocessDriver<E = WavExporter, R = SystemRunner> {
    player: Option<PathBuf>,
    exporter: E,
    runner: R,
}

impl SubprocessDriver {
    pub fn new(player: Option<PathBuf>) -> Self {
        SubprocessDriver {
            player,
            exporter: WavExporter,
            runner: SystemRunner,
        }
    }
}

impl<E: Exporter, R: ProcessRunner> SubprocessDriver<E, R> {
    pub fn with_parts(player: Option<PathBuf>, exporter: E, runner: R) -> Self {
        SubprocessDriver {
            player,
            exporter,
            runner,
        }
    }
}

impl<E: Exporter, R: ProcessRunner> Backend for SubprocessDriver<E, R> {
    fn kind(&self) -> BackendKind {
        BackendKind::Subprocess
    }

    fn play(
        &self,
        segment: &AudioSegment,
        device: Option<&DeviceId>,
        cancel: &CancelToken,
    ) -> Result<()> {
        if let Some(device) = device {
            debug!("External player ignores output device {}", device);
        }

        let player = resolve_player(self.player.as_deref())?;
        cancel.check()?;

        // Removed when `wav` drops, whatever happens below
        let wav = tempfile::Builder::new()
            .prefix("nueva-play-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        self.exporter.export(segment, &wav)?;

        let mut args: Vec<OsString> = PLAYER_ARGS.iter().map(OsString::from).collect();
        args.push(wav.as_os_str().to_owned());

        debug!("Running {} on {}", player.display(), wav.display());
        let code = self.runner.run(&player, &args)?;

        if code != Some(0) {
            let failure = PlaybackError::SubprocessFailure {
                player: player.display().to_string(),
                code,
            };
            warn!("{}", failure);
        }

        wav.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    struct MockRunner {
        result: fn() -> Result<Option<i32>>,
        calls: RefCell<Vec<(PathBuf, Vec<OsString>, bool)>>,
    }

    impl MockRunner {
        fn new(result: fn() -> Result<Option<i32>>) -> Self {
            MockRunner {
                result,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn temp_file(&self) -> PathBuf {
            let calls = self.calls.borrow();
            PathBuf::from(calls[0].1.last().unwrap())
        }
    }

    impl ProcessRunner for MockRunner {
        fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>> {
            let file_existed = args
                .last()
                .map(|p| Path::new(p).is_file())
                .unwrap_or(false);
            self.calls
                .borrow_mut()
                .push((program.to_path_buf(), args.to_vec(), file_existed));
            (self.result)()
        }
    }

    struct FailingExporter;

    impl Exporter for FailingExporter {
        fn export(&self, _: &AudioSegment, _: &Path) -> Result<()> {
            Err(PlaybackError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn fake_player(dir: &Path) -> PathBuf {
        let path = dir.join("ffplay");
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn segment() -> AudioSegment {
        AudioSegment::new(vec![0u8; 1600], 1, 2, 8000).unwrap()
    }

    #[test]
    fn test_runs_player_once_and_removes_file() {
        let dir = tempdir().unwrap();
        let player = fake_player(dir.path());
        let driver = SubprocessDriver::with_parts(
            Some(player.clone()),
            WavExporter,
            MockRunner::new(|| Ok(Some(0))),
        );

        driver
            .play(&segment(), Some(&DeviceId::Index(1)), &CancelToken::new())
            .unwrap();

        let calls = driver.runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (program, args, file_existed) = &calls[0];
        assert_eq!(program, &player);
        assert_eq!(&args[..3], &["-nodisp", "-autoexit", "-hide_banner"]);
        assert!(*file_existed, "WAV must exist while the player runs");
        drop(calls);

        let wav = driver.runner.temp_file();
        assert_eq!(wav.extension().unwrap(), "wav");
        assert!(!wav.exists());
    }

    #[test]
    fn test_nonzero_exit_is_best_effort() {
        let dir = tempdir().unwrap();
        let driver = SubprocessDriver::with_parts(
            Some(fake_player(dir.path())),
            WavExporter,
            MockRunner::new(|| Ok(Some(1))),
        );

        driver.play(&segment(), None, &CancelToken::new()).unwrap();
        assert!(!driver.runner.temp_file().exists());
    }

    #[test]
    fn test_spawn_failure_still_removes_file() {
        let dir = tempdir().unwrap();
        let driver = SubprocessDriver::with_parts(
            Some(fake_player(dir.path())),
            WavExporter,
            MockRunner::new(|| {
                Err(PlaybackError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "exec failed",
                )))
            }),
        );

        let err = driver.play(&segment(), None, &CancelToken::new()).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert_eq!(driver.runner.calls.borrow().len(), 1);
        assert!(!driver.runner.temp_file().exists());
    }

    #[test]
    fn test_missing_player_is_fatal() {
        let dir = tempdir().unwrap();
        let driver = SubprocessDriver::with_parts(
            Some(dir.path().join("missing-player")),
            WavExporter,
            MockRunner::new(|| Ok(Some(0))),
        );

        let err = driver.play(&segment(), None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PlaybackError::PlayerNotFound { .. }));
        assert!(!err.is_unavailable());
        assert!(driver.runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_export_failure_skips_player() {
        let dir = tempdir().unwrap();
        let driver = SubprocessDriver::with_parts(
            Some(fake_player(dir.path())),
            FailingExporter,
            MockRunner::new(|| Ok(Some(0))),
        );

        assert!(driver.play(&segment(), None, &CancelToken::new()).is_err());
        assert!(driver.runner.calls.borrow().is_empty());
    }
}
