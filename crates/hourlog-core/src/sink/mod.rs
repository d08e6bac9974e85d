//! Output destinations.
//!
//! A logger accepts any `io::Write + Send`. This module provides the two
//! destinations that need more than the standard library offers:
//!
//! - [`RotatingFile`]: one append-only file per local hour,
//!   `<base>-<YYYY>-<MM>-<DD>-<HH>.log`, newline after every record
//! - [`SharedBuffer`]: cloneable in-memory bytes, for tests and capture

pub mod buffer;
pub mod clock;
pub mod rotating;

pub use buffer::SharedBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use rotating::{hour_path, RotatingFile, HOUR_STAMP_FORMAT};
