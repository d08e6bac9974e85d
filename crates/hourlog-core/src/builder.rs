//! Builder for configuring a [`Logger`] destination.

use std::io::Write;
use std::path::PathBuf;

use crate::error::LogResult;
use crate::logger::Logger;
use crate::sink::{Clock, RotatingFile, SystemClock};

enum Destination {
    Stderr,
    Writer(Box<dyn Write + Send>),
    RotatingFile(PathBuf),
}

/// Builder for creating a logger.
///
/// ```ignore
/// let logger = Logger::builder().rotating_file("./logs/api").build()?;
/// ```
pub struct LoggerBuilder {
    destination: Destination,
    clock: Box<dyn Clock>,
}

impl LoggerBuilder {
    /// Create a builder targeting standard error.
    pub fn new() -> Self {
        Self {
            destination: Destination::Stderr,
            clock: Box::new(SystemClock),
        }
    }

    /// Write to standard error (the default).
    pub fn stderr(mut self) -> Self {
        self.destination = Destination::Stderr;
        self
    }

    /// Write to any byte stream.
    pub fn output(mut self, out: impl Write + Send + 'static) -> Self {
        self.destination = Destination::Writer(Box::new(out));
        self
    }

    /// Write to hour-rotated files named `<base>-<YYYY-MM-DD-HH>.log`.
    pub fn rotating_file(mut self, base: impl Into<PathBuf>) -> Self {
        self.destination = Destination::RotatingFile(base.into());
        self
    }

    /// Clock used for rotation. Only relevant with [`Self::rotating_file`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Build the logger. Fails if the first rotating file cannot be opened.
    pub fn build(self) -> LogResult<Logger> {
        let logger = match self.destination {
            Destination::Stderr => Logger::stderr(),
            Destination::Writer(out) => Logger::new(out),
            Destination::RotatingFile(base) => {
                Logger::new(RotatingFile::with_clock(base, self.clock)?)
            }
        };
        Ok(logger)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ManualClock, SharedBuffer};
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    #[test]
    fn test_build_with_output() {
        let buffer = SharedBuffer::new();
        let logger = LoggerBuilder::new().output(buffer.clone()).build().unwrap();

        logger.info("hello");
        assert!(buffer.to_string_lossy().contains("\"msg\":\"hello\""));
    }

    #[test]
    fn test_build_rotating_file() {
        let temp = TempDir::new().unwrap();
        let clock = ManualClock::new(Local.with_ymd_and_hms(2026, 1, 21, 14, 0, 0).unwrap());

        let logger = Logger::builder()
            .rotating_file(temp.path().join("api"))
            .clock(clock)
            .build()
            .unwrap();
        logger.warning("slow request");

        let content = std::fs::read_to_string(temp.path().join("api-2026-01-21-14.log")).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.contains("slow request"));
    }

    #[test]
    fn test_build_fails_on_unwritable_base() {
        let temp = TempDir::new().unwrap();
        let result = Logger::builder()
            .rotating_file(temp.path().join("nope").join("api"))
            .build();
        assert!(result.is_err());
    }
}
