//! Call-site and stack trace capture.
//!
//! Call-site location comes from `#[track_caller]`: every constructor that
//! records a location is annotated, so any number of annotated wrapper layers
//! stay transparent and the location points at the first caller outside them.
//!
//! Stack traces come from `std::backtrace`. The rendered trace is parsed into
//! frames; leading frames that belong to this crate or the standard library
//! are skipped so the trace starts at the caller, and runtime frames are
//! dropped wherever they appear.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::env;
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// Maximum number of frames kept in a stack trace.
pub const MAX_STACK_DEPTH: usize = 50;

/// Symbol prefixes of frames skipped at the top of a trace.
///
/// These are the layers between the backtrace call and the user's code.
pub const INTERNAL_FRAME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "hourlog_core::",
    "<hourlog_core::",
];

/// Symbol prefixes of runtime frames, dropped anywhere in a trace.
///
/// `test::` is the libtest harness.
pub const RUNTIME_FRAME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "__libc",
    "_start",
    "rust_begin_unwind",
    "test::",
    "<test::",
];

/// Source paths of the toolchain's own library sources.
const RUNTIME_PATH_MARKERS: &[&str] = &["/rustc/", "\\rustc\\"];

/// File and line of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    file: &'static str,
    line: u32,
}

impl CallSite {
    /// Placeholder used when the location is unknown or was not captured.
    pub const UNKNOWN: CallSite = CallSite {
        file: "???",
        line: 0,
    };

    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller, looking through `#[track_caller]` layers.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Default for CallSite {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Capture the current stack as `"file:line - function"` strings.
///
/// `caller` is the location recorded for the same call. Frame paths under
/// the directory `caller.file()` is relative to are rewritten relative to
/// it, so the first frame and the `file` key agree; other paths are left
/// absolute. Returns an empty trace on platforms without backtrace support.
pub fn capture_stack(caller: CallSite) -> Vec<String> {
    let trace = Backtrace::force_capture();
    if trace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    let cwd = env::current_dir().ok();
    stack_from_rendered(&trace.to_string(), cwd.as_deref(), caller)
}

/// Build a stack trace from the rendered form of a `std::backtrace::Backtrace`.
///
/// `cwd` is the directory `./`-relative paths in the rendering are relative to.
pub fn stack_from_rendered(rendered: &str, cwd: Option<&Path>, caller: CallSite) -> Vec<String> {
    let mut frames: Vec<Frame> = parse_frames(rendered)
        .into_iter()
        .skip_while(Frame::is_internal)
        .filter(|frame| !frame.is_runtime())
        .take(MAX_STACK_DEPTH)
        .collect();

    if let Some(cwd) = cwd {
        frames.iter_mut().for_each(|frame| frame.resolve_against(cwd));
    }
    if let Some(root) = source_root(&frames, caller) {
        frames.iter_mut().for_each(|frame| frame.strip_root(&root));
    }

    frames.iter().map(Frame::to_string).collect()
}

/// Directory the caller's `file!()`-style path is relative to, found from
/// the first frame whose path ends with it.
fn source_root(frames: &[Frame], caller: CallSite) -> Option<PathBuf> {
    let relative = Path::new(caller.file());
    if caller == CallSite::UNKNOWN || relative.is_absolute() {
        return None;
    }
    let depth = relative.components().count();

    frames
        .iter()
        .filter_map(|frame| frame.location.as_ref())
        .find(|(path, _)| path.is_absolute() && path.ends_with(relative))
        .and_then(|(path, _)| path.ancestors().nth(depth))
        .map(Path::to_path_buf)
}

#[derive(Debug)]
struct Frame {
    function: String,
    location: Option<(PathBuf, u32)>,
}

impl Frame {
    fn is_internal(&self) -> bool {
        // Unit tests live inside the crate but are user code for this purpose
        !self.function.contains("::tests::")
            && INTERNAL_FRAME_PREFIXES
                .iter()
                .any(|prefix| self.function.starts_with(prefix))
    }

    fn is_runtime(&self) -> bool {
        if RUNTIME_FRAME_PREFIXES
            .iter()
            .any(|prefix| self.function.starts_with(prefix))
        {
            return true;
        }
        match &self.location {
            Some((file, _)) => {
                let file = file.to_string_lossy();
                RUNTIME_PATH_MARKERS.iter().any(|m| file.contains(m))
            }
            // C runtime symbols (thread start, libc main) carry no path
            None => !self.function.contains("::"),
        }
    }

    /// Make a `./`-relative path absolute.
    fn resolve_against(&mut self, cwd: &Path) {
        if let Some((path, _)) = &mut self.location {
            if let Ok(rest) = path.strip_prefix(".") {
                *path = cwd.join(rest);
            }
        }
    }

    fn strip_root(&mut self, root: &Path) {
        if let Some((path, _)) = &mut self.location {
            if let Ok(rest) = path.strip_prefix(root) {
                *path = rest.to_path_buf();
            }
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some((file, line)) => write!(f, "{}:{} - {}", file.display(), line, self.function),
            None => write!(f, "{} - {}", CallSite::UNKNOWN, self.function),
        }
    }
}

/// Parse the rendered backtrace.
///
/// Frame lines look like `  3: crate::module::function`, inlined symbols
/// repeat without the index, and each symbol may be followed by an
/// `at path:line:column` line.
fn parse_frames(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in rendered.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.location.is_none() {
                    frame.location = parse_location(location);
                }
            }
            continue;
        }

        let function = match line.split_once(": ") {
            Some((index, name)) if index.chars().all(|c| c.is_ascii_digit()) => name,
            _ => line,
        };
        frames.push(Frame {
            function: function.to_string(),
            location: None,
        });
    }

    frames
}

/// Parse `path:line:column` or `path:line`.
fn parse_location(text: &str) -> Option<(PathBuf, u32)> {
    fn split_number(s: &str) -> Option<(&str, u32)> {
        let (head, tail) = s.rsplit_once(':')?;
        Some((head, tail.parse().ok()?))
    }

    let (rest, last) = split_number(text)?;
    let (path, line) = split_number(rest).unwrap_or((rest, last));
    Some((PathBuf::from(path), line))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = "   0: hourlog_core::entry::caller::capture_stack
             at ./crates/hourlog-core/src/entry/caller.rs:98:17
   1: hourlog_core::entry::Entry::errorf
             at ./crates/hourlog-core/src/entry/mod.rs:140:21
   2: payments::settle
             at ./src/payments.rs:42:9
   3: core::ops::function::FnOnce::call_once
             at /rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/core/src/ops/function.rs:250:5
   4: payments::main
             at ./src/main.rs:7:5
   5: std::rt::lang_start_internal
             at /rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/std/src/rt.rs:141:48
   6: main
   7: __libc_start_main
   8: _start
";

    #[test]
    fn test_skips_internal_and_runtime_frames() {
        let stack = stack_from_rendered(RENDERED, None, CallSite::UNKNOWN);
        assert_eq!(
            stack,
            vec![
                "./src/payments.rs:42 - payments::settle".to_string(),
                "./src/main.rs:7 - payments::main".to_string(),
            ]
        );
    }

    #[test]
    fn test_inlined_symbols_and_missing_locations() {
        let rendered = "   0: app::outer
             at src/lib.rs:10:1
      app::inlined_helper
             at src/helper.rs:3:5
   1: app::unresolved
";
        let stack = stack_from_rendered(rendered, None, CallSite::UNKNOWN);
        assert_eq!(
            stack,
            vec![
                "src/lib.rs:10 - app::outer".to_string(),
                "src/helper.rs:3 - app::inlined_helper".to_string(),
                "???:0 - app::unresolved".to_string(),
            ]
        );
    }

    #[test]
    fn test_paths_rebased_onto_call_site() {
        let rendered = "   0: payments::settle
             at ./tests/settle.rs:3:5
   1: payments::helpers::retry
             at ./src/helpers.rs:20:9
   2: serde_json::de::from_str
             at /home/dev/.cargo/registry/src/serde_json-1.0/src/de.rs:2670:5
";
        let caller = CallSite::new("crates/payments/tests/settle.rs", 3);
        let stack = stack_from_rendered(rendered, Some(Path::new("/work/crates/payments")), caller);

        assert_eq!(
            stack,
            vec![
                "crates/payments/tests/settle.rs:3 - payments::settle".to_string(),
                "crates/payments/src/helpers.rs:20 - payments::helpers::retry".to_string(),
                "/home/dev/.cargo/registry/src/serde_json-1.0/src/de.rs:2670 - serde_json::de::from_str"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_paths_left_alone_without_matching_frame() {
        let rendered = "   0: app::run
             at ./src/run.rs:8:1
";
        let caller = CallSite::new("elsewhere/main.rs", 8);
        let stack = stack_from_rendered(rendered, Some(Path::new("/srv/app")), caller);
        assert_eq!(stack, vec!["/srv/app/src/run.rs:8 - app::run".to_string()]);
    }

    #[test]
    fn test_release_build_harness_frames_dropped() {
        // Release builds without debug info carry no paths
        let rendered = "   0: hourlog_core::entry::caller::capture_stack
   1: billing::charge
   2: core::ops::function::FnOnce::call_once
   3: test::__rust_begin_short_backtrace::<fn()>
   4: <test::TestDesc as core::fmt::Debug>::fmt
   5: std::sys::backtrace::__rust_begin_short_backtrace
";
        let stack = stack_from_rendered(rendered, None, CallSite::new("tests/billing.rs", 4));
        assert_eq!(stack, vec!["???:0 - billing::charge".to_string()]);
    }

    #[test]
    fn test_parse_location_windows_paths() {
        assert_eq!(
            parse_location(r"C:\work\src\lib.rs:12:5"),
            Some((PathBuf::from(r"C:\work\src\lib.rs"), 12))
        );
        assert_eq!(
            parse_location(r"C:\work\src\lib.rs:12"),
            Some((PathBuf::from(r"C:\work\src\lib.rs"), 12))
        );
        assert_eq!(parse_location("no-line-here"), None);
    }

    #[test]
    fn test_depth_is_capped() {
        let mut rendered = String::new();
        for i in 0..(MAX_STACK_DEPTH + 20) {
            rendered.push_str(&format!("  {}: app::frame_{}\n      at src/lib.rs:{}:1\n", i, i, i));
        }
        assert_eq!(
            stack_from_rendered(&rendered, None, CallSite::UNKNOWN).len(),
            MAX_STACK_DEPTH
        );
    }

    #[test]
    fn test_capture_stack_starts_at_caller() {
        let here = CallSite::caller();
        let stack = capture_stack(here);
        assert!(!stack.is_empty());
        assert!(stack[0].contains("test_capture_stack_starts_at_caller"));
        assert!(stack[0].starts_with(here.file()));
    }

    #[test]
    fn test_call_site_caller() {
        let here = CallSite::caller();
        assert!(here.file().ends_with("caller.rs"));
        assert!(here.line() > 0);
        assert_eq!(CallSite::default().to_string(), "???:0");
    }
}
