//! Reading hour files back.
//!
//! Every line of a rotated file is one self-contained JSON record, so files
//! can be read independently and concatenated in name order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::entry::Severity;
use crate::error::LogResult;
use crate::DIAGNOSTIC_TARGET;

/// One serialized log record.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub severity: Severity,

    pub msg: String,

    /// `path:line`; absent for records saved from a plain error
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub stack: Vec<String>,

    /// RFC 3339 timestamp stamped at save time
    pub time: String,

    /// User fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Parse from a JSON line.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.time).ok()
    }
}

/// Read every record of one JSONL file. Unparseable lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> LogResult<Vec<Record>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let mut records = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Record::from_json_line(line) {
            Ok(record) => records.push(record),
            Err(error) => {
                tracing::warn!(
                    target: DIAGNOSTIC_TARGET,
                    path = %path.display(),
                    %error,
                    "Skipping unparseable log line"
                );
            }
        }
    }

    Ok(records)
}

fn is_hour_stamp(stamp: &str) -> bool {
    match (stamp.get(..10), stamp.get(10..11), stamp.get(11..)) {
        (Some(date), Some("-"), Some(hour)) => {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
                && hour.len() == 2
                && hour.parse::<u32>().map(|h| h < 24).unwrap_or(false)
        }
        _ => false,
    }
}

/// All hour files written for `base`, oldest first.
pub fn hour_files(base: impl AsRef<Path>) -> LogResult<Vec<PathBuf>> {
    let base = base.as_ref();
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = match base.file_name().and_then(|name| name.to_str()) {
        Some(name) => format!("{}-", name),
        None => return Ok(Vec::new()),
    };

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let stamp = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".log"));
        if stamp.map(is_hour_stamp).unwrap_or(false) {
            files.push(path);
        }
    }

    // The stamp sorts chronologically
    files.sort();
    Ok(files)
}

/// Records from every hour file of `base`, in file order.
pub fn read_all(base: impl AsRef<Path>) -> LogResult<Vec<Record>> {
    let mut records = Vec::new();
    for path in hour_files(base)? {
        records.extend(read_records(&path)?);
    }
    Ok(records)
}
