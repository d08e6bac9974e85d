//! Log entries: one captured log event before serialization.
//!
//! An [`Entry`] carries a severity, a message, the call-site location, an
//! optional stack trace and a set of user fields. Error entries can also wrap
//! an underlying error as their cause.
//!
//! ```ignore
//! use hourlog_core::{Entry, Fields};
//!
//! let mut entry = Entry::errorf(format_args!("settlement failed for {}", order_id));
//! entry.add_fields(Fields::new().with("order_id", &order_id));
//! logger.save(&entry);
//! ```
//!
//! Error and debug constructors record where they were called from. Info and
//! warning constructors skip it, and only error constructors walk the stack.

pub mod caller;
pub mod fields;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use caller::{capture_stack, CallSite, MAX_STACK_DEPTH};
pub use fields::{FieldValue, Fields};

/// Reserved key holding the severity
pub const TYPE_KEY: &str = "type";
/// Reserved key holding the message
pub const MSG_KEY: &str = "msg";
/// Reserved key holding `path:line`
pub const FILE_KEY: &str = "file";
/// Reserved key holding the stack trace
pub const STACK_KEY: &str = "stack";
/// Key stamped by the logger at save time
pub const TIME_KEY: &str = "time";

/// Message used when an error entry is built from an unsupported value.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Can't create new error!";

/// Severity of an entry. Closed set, no custom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion into a field mapping ready for serialization.
pub trait ToFields {
    fn to_fields(&self) -> Fields;
}

/// A log event with call-site metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    severity: Severity,
    message: String,
    location: CallSite,
    stack: Vec<String>,
    fields: Fields,
    cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

/// Inputs accepted by [`Entry::new_error`].
#[derive(Debug)]
pub enum ErrorInput {
    /// An existing entry; only its location is refreshed
    Entry(Entry),

    /// An error value, kept as the cause
    Error(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A plain message
    Message(String),

    /// Anything else
    Other,
}

impl ErrorInput {
    /// Classify a dynamically typed value, such as a panic payload.
    pub fn from_any(value: Box<dyn Any + Send>) -> Self {
        let value = match value.downcast::<Entry>() {
            Ok(entry) => return ErrorInput::Entry(*entry),
            Err(value) => value,
        };
        let value = match value.downcast::<String>() {
            Ok(msg) => return ErrorInput::Message(*msg),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static str>() {
            Ok(msg) => return ErrorInput::Message((*msg).to_string()),
            Err(value) => value,
        };
        let value = match value.downcast::<Box<dyn std::error::Error + Send + Sync>>() {
            Ok(err) => return ErrorInput::Error(*err),
            Err(value) => value,
        };
        match value.downcast::<std::io::Error>() {
            Ok(err) => ErrorInput::Error(err),
            Err(_) => ErrorInput::Other,
        }
    }
}

impl From<Entry> for ErrorInput {
    fn from(entry: Entry) -> Self {
        ErrorInput::Entry(entry)
    }
}

impl From<String> for ErrorInput {
    fn from(msg: String) -> Self {
        ErrorInput::Message(msg)
    }
}

impl From<&str> for ErrorInput {
    fn from(msg: &str) -> Self {
        ErrorInput::Message(msg.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync + 'static>> for ErrorInput {
    fn from(err: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        ErrorInput::Error(err)
    }
}

impl From<std::io::Error> for ErrorInput {
    fn from(err: std::io::Error) -> Self {
        ErrorInput::Error(Box::new(err))
    }
}

impl Entry {
    fn bare(severity: Severity, message: String) -> Self {
        Self {
            severity,
            message,
            location: CallSite::UNKNOWN,
            stack: Vec::new(),
            fields: Fields::new(),
            cause: None,
        }
    }

    /// Build an entry at an already known location, without a stack trace.
    pub(crate) fn at(severity: Severity, message: impl Into<String>, location: CallSite) -> Self {
        let mut entry = Self::bare(severity, message.into());
        entry.location = location;
        entry
    }

    /// Create an error entry from any supported input.
    ///
    /// Passing an existing entry back in refreshes its location and returns
    /// it otherwise untouched. All other inputs produce a new entry with a
    /// location and a stack trace.
    #[track_caller]
    pub fn new_error(input: impl Into<ErrorInput>) -> Self {
        let mut entry = match input.into() {
            ErrorInput::Entry(mut existing) => {
                existing.location = CallSite::caller();
                return existing;
            }
            ErrorInput::Error(err) => {
                let mut entry = Self::bare(Severity::Error, err.to_string());
                entry.cause = Some(Arc::from(err));
                entry
            }
            ErrorInput::Message(msg) => Self::bare(Severity::Error, msg),
            ErrorInput::Other => Self::bare(Severity::Error, UNKNOWN_ERROR_MESSAGE.to_string()),
        };

        entry.location = CallSite::caller();
        entry.stack = capture_stack(entry.location);
        entry
    }

    /// Error entry with a plain message.
    #[track_caller]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new_error(ErrorInput::Message(message.into()))
    }

    /// Error entry with a formatted message: `Entry::errorf(format_args!(..))`.
    #[track_caller]
    pub fn errorf(args: fmt::Arguments<'_>) -> Self {
        Self::new_error(ErrorInput::Message(fmt::format(args)))
    }

    /// Error entry wrapping `err` as its cause.
    #[track_caller]
    pub fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new_error(ErrorInput::Error(Box::new(err)))
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::bare(Severity::Warning, message.into())
    }

    pub fn warningf(args: fmt::Arguments<'_>) -> Self {
        Self::bare(Severity::Warning, fmt::format(args))
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::bare(Severity::Info, message.into())
    }

    pub fn infof(args: fmt::Arguments<'_>) -> Self {
        Self::bare(Severity::Info, fmt::format(args))
    }

    #[track_caller]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::at(Severity::Debug, message, CallSite::caller())
    }

    #[track_caller]
    pub fn debugf(args: fmt::Arguments<'_>) -> Self {
        Self::at(Severity::Debug, fmt::format(args), CallSite::caller())
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> CallSite {
        self.location
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// The wrapped error, if this entry was built from one.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Merge `fields` into the entry's fields. Later values win on duplicate keys.
    pub fn add_fields(&mut self, fields: impl Into<Fields>) -> &mut Self {
        self.fields.merge(fields.into());
        self
    }

    /// Add a single field.
    pub fn add_field<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> &mut Self {
        self.fields.insert(key, value);
        self
    }

    /// By-value form of [`Entry::add_fields`].
    pub fn with_fields(mut self, fields: impl Into<Fields>) -> Self {
        self.add_fields(fields);
        self
    }
}

impl ToFields for Entry {
    fn to_fields(&self) -> Fields {
        let mut res = self.fields.clone();

        // Reserved keys go in last and overwrite user fields of the same name
        res.insert(TYPE_KEY, self.severity.as_str());
        res.insert(MSG_KEY, &self.message);
        res.insert(FILE_KEY, &self.location.to_string());
        res.insert(STACK_KEY, &self.stack);
        res
    }
}

/// The message for error entries, empty for every other severity.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => f.write_str(&self.message),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for Entry {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
