//! Process-wide default logger.
//!
//! Created on first use, bound to standard error, and never torn down. Every
//! function here forwards to the matching [`Logger`] method, under the same
//! lock as direct use of [`default_logger`].

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;

use crate::logger::{Loggable, Logger};

static DEFAULT: OnceLock<Logger> = OnceLock::new();

/// The process-wide logger.
pub fn default_logger() -> &'static Logger {
    DEFAULT.get_or_init(Logger::stderr)
}

/// Replace the default logger's destination.
pub fn set_output(out: impl Write + Send + 'static) {
    default_logger().set_output(out);
}

pub fn save<'a>(item: impl Into<Loggable<'a>>) {
    default_logger().save(item);
}

#[track_caller]
pub fn error(message: impl Into<String>) {
    default_logger().error(message);
}

#[track_caller]
pub fn errorf(args: fmt::Arguments<'_>) {
    default_logger().errorf(args);
}

pub fn warning(message: impl Into<String>) {
    default_logger().warning(message);
}

pub fn warningf(args: fmt::Arguments<'_>) {
    default_logger().warningf(args);
}

pub fn info(message: impl Into<String>) {
    default_logger().info(message);
}

pub fn infof(args: fmt::Arguments<'_>) {
    default_logger().infof(args);
}

#[track_caller]
pub fn debug(message: impl Into<String>) {
    default_logger().debug(message);
}

#[track_caller]
pub fn debugf(args: fmt::Arguments<'_>) {
    default_logger().debugf(args);
}
