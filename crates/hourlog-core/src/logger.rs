//! The logger: converts entries to JSON and writes them to a destination.
//!
//! ```text
//! Loggable
//!     → field mapping (Entry::to_fields, or {type, msg} for plain errors)
//!     → "time" stamp
//!     → serde_json bytes
//!     → destination (stderr, SharedBuffer, RotatingFile, any io::Write)
//! ```
//!
//! The whole pipeline runs under one lock, so concurrent saves land in the
//! output as whole records. Failures never reach the caller: they are
//! reported as `tracing` events under [`DIAGNOSTIC_TARGET`].

use std::any::Any;
use std::fmt;
use std::io::{self, Write};

use chrono::SecondsFormat;
use parking_lot::Mutex;

use crate::builder::LoggerBuilder;
use crate::entry::{CallSite, Entry, Fields, Severity, ToFields, MSG_KEY, TIME_KEY, TYPE_KEY};
use crate::DIAGNOSTIC_TARGET;

/// Something handed to [`Logger::save`].
pub enum Loggable<'a> {
    /// A value with its own field mapping, usually an [`Entry`]
    Structured(&'a dyn ToFields),

    /// A plain error; only its type and message are recorded
    Error(&'a (dyn std::error::Error + 'a)),

    /// Anything else, with a description for the diagnostic
    Unrecognized(String),
}

impl<'a> Loggable<'a> {
    pub fn error(err: &'a (dyn std::error::Error + 'a)) -> Self {
        Loggable::Error(err)
    }

    pub fn unrecognized(value: &dyn fmt::Debug) -> Self {
        Loggable::Unrecognized(format!("{:?}", value))
    }

    /// Classify a dynamically typed value.
    ///
    /// Recognizes [`Entry`], `io::Error`, `serde_json::Error` and boxed
    /// errors; everything else is unrecognized.
    pub fn from_any(value: &'a (dyn Any + 'static)) -> Self {
        if let Some(entry) = value.downcast_ref::<Entry>() {
            return Loggable::Structured(entry);
        }
        if let Some(err) = value.downcast_ref::<io::Error>() {
            return Loggable::Error(err);
        }
        if let Some(err) = value.downcast_ref::<serde_json::Error>() {
            return Loggable::Error(err);
        }
        if let Some(err) = value.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
            return Loggable::Error(&**err);
        }
        Loggable::Unrecognized(format!("{:?}", value))
    }
}

impl<'a> From<&'a Entry> for Loggable<'a> {
    fn from(entry: &'a Entry) -> Self {
        Loggable::Structured(entry)
    }
}

impl<'a> From<&'a io::Error> for Loggable<'a> {
    fn from(err: &'a io::Error) -> Self {
        Loggable::Error(err)
    }
}

impl<'a> From<&'a (dyn std::error::Error + Send + Sync + 'static)> for Loggable<'a> {
    fn from(err: &'a (dyn std::error::Error + Send + Sync + 'static)) -> Self {
        Loggable::Error(err)
    }
}

/// Marker written to the logger's buffer, and nowhere else, when a record
/// cannot be serialized.
pub fn fallback_record(err: &serde_json::Error) -> String {
    format!("{{ type=\"logerror\" msg=\"{}\"}}", err)
}

/// Current local time as RFC 3339.
fn timestamp() -> String {
    chrono::Local::now().to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// What happened to one record.
enum SaveOutcome {
    Written,
    Unrecognized(String),
    Serialization(serde_json::Error),
    Write(io::Error),
}

struct LoggerState {
    out: Box<dyn Write + Send>,

    /// Bytes of the last record, or the fallback marker after a failure
    buf: Vec<u8>,
}

impl LoggerState {
    fn save(&mut self, item: Loggable<'_>) -> SaveOutcome {
        let mut fields = match item {
            Loggable::Structured(value) => value.to_fields(),
            Loggable::Error(err) => Fields::new()
                .with(TYPE_KEY, Severity::Error.as_str())
                .with(MSG_KEY, &err.to_string()),
            Loggable::Unrecognized(desc) => return SaveOutcome::Unrecognized(desc),
        };

        fields.insert(TIME_KEY, &timestamp());

        match serde_json::to_vec(&fields) {
            Ok(bytes) => self.buf = bytes,
            Err(e) => {
                self.buf = fallback_record(&e).into_bytes();
                return SaveOutcome::Serialization(e);
            }
        }

        match self.out.write_all(&self.buf).and_then(|_| self.out.flush()) {
            Ok(()) => SaveOutcome::Written,
            Err(e) => SaveOutcome::Write(e),
        }
    }
}

fn report(outcome: SaveOutcome) {
    match outcome {
        SaveOutcome::Written => {}
        SaveOutcome::Unrecognized(value) => {
            tracing::warn!(target: DIAGNOSTIC_TARGET, %value, "Unrecognized loggable type, record dropped");
        }
        SaveOutcome::Serialization(error) => {
            tracing::error!(target: DIAGNOSTIC_TARGET, %error, "Failed to serialize log record");
        }
        SaveOutcome::Write(error) => {
            tracing::error!(target: DIAGNOSTIC_TARGET, %error, "Failed to write log record");
        }
    }
}

/// A synchronous JSON logger.
pub struct Logger {
    state: Mutex<LoggerState>,
}

impl Logger {
    /// Create a logger writing to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            state: Mutex::new(LoggerState {
                out: Box::new(out),
                buf: Vec::new(),
            }),
        }
    }

    /// Create a logger writing to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Replace the destination. Waits for any save in progress.
    pub fn set_output(&self, out: impl Write + Send + 'static) {
        self.state.lock().out = Box::new(out);
    }

    /// Bytes of the last record produced, or the fallback marker if the last
    /// record failed to serialize.
    pub fn last_output(&self) -> Vec<u8> {
        self.state.lock().buf.clone()
    }

    /// Serialize and write one record.
    ///
    /// Never fails: unrecognized input, serialization errors and write errors
    /// are reported as diagnostics and the call returns normally.
    pub fn save<'a>(&self, item: impl Into<Loggable<'a>>) {
        let item = item.into();
        let outcome = self.state.lock().save(item);
        // Lock must be released here: an EntryLayer bound to this logger re-enters save
        report(outcome);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.save(&Entry::at(Severity::Error, message, CallSite::caller()));
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.save(&Entry::at(Severity::Error, fmt::format(args), CallSite::caller()));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.save(&Entry::warning(message));
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.save(&Entry::warningf(args));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.save(&Entry::info(message));
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.save(&Entry::infof(args));
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.save(&Entry::debug(message));
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.save(&Entry::debugf(args));
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
