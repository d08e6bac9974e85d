//! Hour-rotated append-only log file.
//!
//! Rotation is checked lazily on every write: when the local wall-clock hour
//! differs from the hour of the open file, the file is closed and the new
//! hour's file is opened. There is no background timer.
//!
//! The sink has no lock of its own. Writes and rotations are serialized by
//! the [`Logger`](crate::Logger) that owns it, so a `RotatingFile` must not be
//! shared between loggers.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Timelike};

use super::clock::{Clock, SystemClock};
use crate::error::{LogError, LogResult};
use crate::DIAGNOSTIC_TARGET;

/// Timestamp format embedded in file names: `2026-01-21-14`.
pub const HOUR_STAMP_FORMAT: &str = "%Y-%m-%d-%H";

/// Path of the file for `base` in the hour containing `at`:
/// `<base>-<YYYY>-<MM>-<DD>-<HH>.log`.
pub fn hour_path(base: &Path, at: &DateTime<Local>) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("-{}.log", at.format(HOUR_STAMP_FORMAT)));
    PathBuf::from(name)
}

fn hour_bucket(at: &DateTime<Local>) -> (NaiveDate, u32) {
    (at.date_naive(), at.hour())
}

/// Writer that appends newline-terminated records to one file per hour.
#[derive(Debug)]
pub struct RotatingFile<C: Clock = SystemClock> {
    /// Path prefix for every hour file
    base: PathBuf,

    /// Hour of the open file
    bucket: Option<(NaiveDate, u32)>,

    /// The open file and its path
    file: Option<(File, PathBuf)>,

    clock: C,
}

impl RotatingFile<SystemClock> {
    /// Open the current hour's file for `base`.
    ///
    /// Fails if the file cannot be opened or created.
    pub fn new(base: impl AsRef<Path>) -> LogResult<Self> {
        Self::with_clock(base, SystemClock)
    }
}

impl<C: Clock> RotatingFile<C> {
    /// Like [`RotatingFile::new`] with an explicit clock.
    pub fn with_clock(base: impl AsRef<Path>, clock: C) -> LogResult<Self> {
        let mut sink = Self {
            base: base.as_ref().to_path_buf(),
            bucket: None,
            file: None,
            clock,
        };
        sink.open(base)?;
        Ok(sink)
    }

    /// Switch to `base`, opening its file for the current hour.
    ///
    /// The previously open file is closed first, ignoring close errors.
    /// Existing files are appended to, never truncated.
    pub fn open(&mut self, base: impl AsRef<Path>) -> LogResult<()> {
        let now = self.clock.now();
        self.open_at(base.as_ref(), &now)
    }

    fn open_at(&mut self, base: &Path, now: &DateTime<Local>) -> LogResult<()> {
        drop(self.file.take());

        let path = hour_path(base, now);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(target: DIAGNOSTIC_TARGET, path = %path.display(), "Opened hour log file");

        self.file = Some((file, path));
        self.bucket = Some(hour_bucket(now));
        self.base = base.to_path_buf();
        Ok(())
    }

    /// Close the current file, returning any error from syncing it to disk.
    ///
    /// A later write reopens the current hour's file.
    pub fn close(&mut self) -> LogResult<()> {
        match self.file.take() {
            Some((file, _)) => file.sync_all().map_err(LogError::Close),
            None => Ok(()),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of the open file.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(_, path)| path.as_path())
    }

    /// Hour (0-23) of the open file.
    pub fn current_hour(&self) -> Option<u32> {
        self.bucket.map(|(_, hour)| hour)
    }

    fn rotate_if_needed(&mut self) -> LogResult<()> {
        let now = self.clock.now();
        if self.file.is_some() && self.bucket == Some(hour_bucket(&now)) {
            return Ok(());
        }
        let base = self.base.clone();
        self.open_at(&base, &now)
    }
}

impl<C: Clock> Write for RotatingFile<C> {
    /// Write `buf` and a trailing newline, rotating first if the hour changed.
    ///
    /// Reports `buf.len()` on success; the newline is not counted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed().map_err(LogError::into_io)?;

        let (file, _) = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no open log file"))?;
        file.write_all(buf)?;
        file.write_all(b"\n")?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some((file, _)) => file.flush(),
            None => Ok(()),
        }
    }
}
