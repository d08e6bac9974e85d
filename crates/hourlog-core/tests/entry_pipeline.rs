//! End-to-end tests for entry construction and the save pipeline
//!
//! Entries are saved into an in-memory buffer and the JSON output is
//! checked field by field.

use std::error::Error as _;

use hourlog_core::{CallSite, Entry, ErrorInput, Fields, Logger, Loggable, Severity, SharedBuffer};
use serde_json::{json, Map, Value};

fn buffered() -> (Logger, SharedBuffer) {
    let buffer = SharedBuffer::new();
    (Logger::new(buffer.clone()), buffer)
}

/// Parse every JSON object in the buffer (records are back to back).
fn records(buffer: &SharedBuffer) -> Vec<Map<String, Value>> {
    serde_json::Deserializer::from_slice(&buffer.contents())
        .into_iter::<Value>()
        .map(|r| r.unwrap().as_object().cloned().unwrap())
        .collect()
}

// ============================================================================
// Example Scenarios
// ============================================================================

/// A formatted error entry records message, stack and this file's location
#[test]
fn test_errorf_saved_to_buffer() {
    let (logger, buffer) = buffered();

    let line = line!() + 1;
    let entry = Entry::errorf(format_args!("boom {}", 7));
    logger.save(&entry);

    let records = records(&buffer);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["type"], "error");
    assert_eq!(record["msg"], "boom 7");
    assert_eq!(record["file"], format!("{}:{}", file!(), line));

    let stack = record["stack"].as_array().unwrap();
    assert!(!stack.is_empty());
    assert!(stack[0].as_str().unwrap().contains("test_errorf_saved_to_buffer"));
    // The first frame uses the same path as "file"
    assert!(stack[0]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}:{} - ", file!(), line)));
    assert!(stack.iter().all(|frame| frame.as_str().unwrap().contains(" - ")));
}

/// Saving something that is neither an entry nor an error writes nothing
#[test]
fn test_unrecognized_value_leaves_buffer_empty() {
    let (logger, buffer) = buffered();

    logger.save(Loggable::from_any(&"not an entry or error"));
    logger.save(Loggable::from_any(&vec![1, 2, 3]));

    assert!(buffer.is_empty());
}

// ============================================================================
// Field Mapping Properties
// ============================================================================

/// Every severity produces type, msg, file and time; only errors carry a stack
#[test]
fn test_all_severities_have_core_keys() {
    let (logger, buffer) = buffered();

    let entries = [
        Entry::error("e"),
        Entry::warning("w"),
        Entry::info("i"),
        Entry::debug("d"),
    ];
    for entry in &entries {
        logger.save(entry);
    }

    let records = records(&buffer);
    assert_eq!(records.len(), 4);

    for record in &records {
        for key in ["type", "msg", "file", "time", "stack"] {
            assert!(record.contains_key(key), "missing {} in {:?}", key, record);
        }
        let stack = record["stack"].as_array().unwrap();
        if record["type"] == "error" {
            assert!(!stack.is_empty());
        } else {
            assert!(stack.is_empty());
        }
    }

    let types: Vec<_> = records.iter().map(|r| r["type"].clone()).collect();
    assert_eq!(types, vec![json!("error"), json!("warning"), json!("info"), json!("debug")]);
}

/// Merging fields is last-write-wins
#[test]
fn test_add_fields_merge() {
    let (logger, buffer) = buffered();

    let mut entry = Entry::info("merge");
    entry.add_fields(Fields::new().with("a", &1));
    entry.add_fields(Fields::new().with("a", &2).with("b", &3));
    logger.save(&entry);

    let record = &records(&buffer)[0];
    assert_eq!(record["a"], 2);
    assert_eq!(record["b"], 3);
}

/// Reserved keys always beat user fields
#[test]
fn test_reserved_keys_win() {
    let (logger, buffer) = buffered();

    let entry = Entry::info("y").with_fields(
        Fields::new()
            .with("msg", "x")
            .with("file", "forged.rs:1")
            .with("stack", &["forged"]),
    );
    logger.save(&entry);

    let record = &records(&buffer)[0];
    assert_eq!(record["msg"], "y");
    assert_eq!(record["file"], "???:0");
    assert_eq!(record["stack"], json!([]));
}

/// User fields from a JSON object end up at the top level
#[test]
fn test_json_object_fields() {
    let (logger, buffer) = buffered();

    let fields = json!({ "peer_id": "abc123", "message_size": 1024 });
    let entry = Entry::debug("Received message")
        .with_fields(fields.as_object().cloned().unwrap());
    logger.save(&entry);

    let record = &records(&buffer)[0];
    assert_eq!(record["peer_id"], "abc123");
    assert_eq!(record["message_size"], 1024);
}

// ============================================================================
// Error Constructor Forms
// ============================================================================

/// Passing an error entry back in refreshes only its location, every time
#[test]
fn test_rethrown_entry_refreshes_location() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such user");
    let mut entry = Entry::wrap(io);
    entry.add_field("user", "u-9");

    let first = line!() + 1;
    let entry = Entry::new_error(entry);
    assert_eq!(entry.location().line(), first);

    let second = line!() + 1;
    let entry = Entry::new_error(entry);
    assert_eq!(entry.location().line(), second);
    assert_eq!(entry.location().file(), file!());

    assert_eq!(entry.fields().len(), 1);
    assert_eq!(entry.message(), "no such user");
    assert_eq!(entry.cause().unwrap().to_string(), "no such user");
}

/// The entry macros build entries without saving them
#[test]
fn test_entry_macros_record_call_site() {
    let (logger, buffer) = buffered();

    let line = line!() + 1;
    let mut entry = hourlog_core::new_errorf!("order {} rejected", 12);
    entry.add_field("order", &12);
    assert!(buffer.is_empty());

    assert_eq!(entry.severity(), Severity::Error);
    assert_eq!(entry.message(), "order 12 rejected");
    assert_eq!(entry.location().file(), file!());
    assert_eq!(entry.location().line(), line);
    assert!(!entry.stack().is_empty());

    let line = line!() + 1;
    let debug = hourlog_core::new_debugf!("cache {}", "warm");
    assert_eq!(debug.location().line(), line);
    assert!(debug.stack().is_empty());

    let warning = hourlog_core::new_warningf!("{}% full", 91);
    let info = hourlog_core::new_infof!("{} peers", 3);
    assert_eq!(warning.severity(), Severity::Warning);
    assert_eq!(info.message(), "3 peers");
    assert_eq!(info.location(), CallSite::UNKNOWN);

    logger.save(&entry);
    assert_eq!(records(&buffer)[0]["order"], 12);
}

/// Foreign error types are wrapped and kept as the cause
#[test]
fn test_wrap_anyhow_error() {
    let err = anyhow::anyhow!("db unreachable").context("loading user");
    let boxed: Box<dyn std::error::Error + Send + Sync> = err.into();

    let entry = Entry::new_error(boxed);
    assert_eq!(entry.message(), "loading user");
    assert!(entry.source().is_some());
    assert!(!entry.stack().is_empty());
}

/// Unsupported dynamic values fall back to a fixed message
#[test]
fn test_unsupported_input_falls_back() {
    let entry = Entry::new_error(ErrorInput::from_any(Box::new(3.5f64)));
    assert_eq!(entry.message(), "Can't create new error!");
    assert!(entry.cause().is_none());
}

/// Panic payloads can be logged as error entries
#[test]
fn test_panic_payload_entry() {
    let (logger, buffer) = buffered();

    let payload = std::panic::catch_unwind(|| panic!("worker {} crashed", 3)).unwrap_err();
    logger.save(&Entry::new_error(ErrorInput::from_any(payload)));

    let record = &records(&buffer)[0];
    assert_eq!(record["msg"], "worker 3 crashed");
}

// ============================================================================
// Degraded Output
// ============================================================================

/// A field that cannot become JSON suppresses the write
#[test]
fn test_unserializable_field_suppresses_write() {
    let (logger, buffer) = buffered();

    let mut weights = std::collections::BTreeMap::new();
    weights.insert(vec![1u8], 0.5f64);
    let mut entry = Entry::error("bad weights");
    entry.add_field("weights", &weights);
    logger.save(&entry);

    assert!(buffer.is_empty());
    let marker = String::from_utf8(logger.last_output()).unwrap();
    assert!(marker.starts_with("{ type=\"logerror\""));

    // The logger keeps working afterwards
    logger.info("next");
    assert_eq!(records(&buffer).len(), 1);
}
