//! hourlog core library
//!
//! Synchronous structured logging: entries with call-site metadata,
//! serialized as one JSON object per record, written to standard error, an
//! in-memory buffer, or hour-rotated files.
//!
//! ## Architecture
//!
//! ```text
//! Entry::errorf(..)              captures file:line and stack trace
//!     → add_fields(..)           last write wins
//!     → Logger::save(&entry)     to_fields + "time", serde_json, under lock
//!     → destination              RotatingFile rolls over on hour change
//!
//! logs/
//! ├── api-2026-01-21-14.log      one JSON record per line
//! └── api-2026-01-21-15.log
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use hourlog_core::{Entry, Fields, Logger};
//!
//! let logger = Logger::builder().rotating_file("./logs/api").build()?;
//!
//! let mut entry = Entry::errorf(format_args!("charge {} declined", charge_id));
//! entry.add_fields(Fields::new().with("charge_id", &charge_id));
//! logger.save(&entry);
//!
//! // Or through the process-wide logger on stderr
//! hourlog_core::infof!("listening on {}", addr);
//! ```
//!
//! ### Querying logs with jq
//!
//! ```bash
//! jq 'select(.type == "error") | .stack' logs/api-*.log
//! ```
//!
//! Logging never fails the caller. Problems inside the logger are reported
//! as `tracing` events with target [`DIAGNOSTIC_TARGET`].

pub mod builder;
pub mod entry;
pub mod error;
pub mod global;
pub mod layer;
pub mod logger;
pub mod reader;
pub mod sink;

/// `tracing` target of the logger's own diagnostics.
pub const DIAGNOSTIC_TARGET: &str = "hourlog::diagnostic";

// Re-exports
pub use builder::LoggerBuilder;
pub use entry::{CallSite, Entry, ErrorInput, FieldValue, Fields, Severity, ToFields};
pub use error::{LogError, LogResult};
pub use layer::EntryLayer;
pub use logger::{Loggable, Logger};
pub use reader::Record;
pub use sink::{RotatingFile, SharedBuffer};

/// Log a formatted error through the default logger, recording the call site.
#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => {
        $crate::global::errorf(format_args!($($arg)+))
    };
}

/// Log a formatted warning through the default logger.
#[macro_export]
macro_rules! warningf {
    ($($arg:tt)+) => {
        $crate::global::warningf(format_args!($($arg)+))
    };
}

/// Log a formatted info message through the default logger.
#[macro_export]
macro_rules! infof {
    ($($arg:tt)+) => {
        $crate::global::infof(format_args!($($arg)+))
    };
}

/// Log a formatted debug message through the default logger, recording the call site.
#[macro_export]
macro_rules! debugf {
    ($($arg:tt)+) => {
        $crate::global::debugf(format_args!($($arg)+))
    };
}

/// Build an error [`Entry`] from a format string, recording the call site and stack.
///
/// ```ignore
/// let entry = hourlog_core::new_errorf!("charge {} declined", charge_id);
/// ```
#[macro_export]
macro_rules! new_errorf {
    ($($arg:tt)+) => {
        $crate::Entry::errorf(format_args!($($arg)+))
    };
}

/// Build a warning [`Entry`] from a format string.
#[macro_export]
macro_rules! new_warningf {
    ($($arg:tt)+) => {
        $crate::Entry::warningf(format_args!($($arg)+))
    };
}

/// Build an info [`Entry`] from a format string.
#[macro_export]
macro_rules! new_infof {
    ($($arg:tt)+) => {
        $crate::Entry::infof(format_args!($($arg)+))
    };
}

/// Build a debug [`Entry`] from a format string, recording the call site.
#[macro_export]
macro_rules! new_debugf {
    ($($arg:tt)+) => {
        $crate::Entry::debugf(format_args!($($arg)+))
    };
}
