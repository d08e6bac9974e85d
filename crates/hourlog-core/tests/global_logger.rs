//! The process-wide default logger
//!
//! Kept in its own test binary, with a single test, because the default
//! logger is shared by everything in the process.

use hourlog_core::{global, Entry, SharedBuffer};
use serde_json::Value;

#[test]
fn test_default_logger_forwarding() {
    let buffer = SharedBuffer::new();
    global::set_output(buffer.clone());

    let line = line!() + 1;
    hourlog_core::errorf!("payment {} failed", "p-1");
    hourlog_core::warningf!("retry {} of {}", 1, 3);
    global::info("recovered");
    hourlog_core::debugf!("state={}", "idle");
    global::save(&Entry::error("explicit"));

    let records: Vec<Value> = serde_json::Deserializer::from_slice(&buffer.contents())
        .into_iter::<Value>()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(records.len(), 5);

    assert_eq!(records[0]["type"], "error");
    assert_eq!(records[0]["msg"], "payment p-1 failed");
    assert_eq!(records[0]["file"], format!("{}:{}", file!(), line));

    assert_eq!(records[1]["msg"], "retry 1 of 3");
    assert_eq!(records[1]["file"], "???:0");

    assert_eq!(records[2]["type"], "info");

    assert_eq!(records[3]["type"], "debug");
    assert_eq!(records[3]["file"], format!("{}:{}", file!(), line + 3));

    assert!(!records[4]["stack"].as_array().unwrap().is_empty());
}
