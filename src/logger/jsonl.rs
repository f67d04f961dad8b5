//! JSONL activity log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! concurrent `tail -f` never sees a partial line.
//!
//! Fallback chain:
//! 1. Primary file path
//! 2. Fallback path
//! 3. stderr with `[MPE-JSONL]` prefix
//! 4. Silent discard (an edit session never fails because of logging)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::LogConfig;
use crate::core::errors::{MpeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Event identifiers written to the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProfileLoaded,
    LoadFailed,
    RowInserted,
    RowRemoved,
    FieldEdited,
    SearchApplied,
    ValidationFailed,
    ProfileAdded,
    ProfileChanged,
    ProfileDeleted,
    UpstreamRejected,
    InternalRejected,
}

/// A single log line. Everything but `ts`, `event`, and `severity` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Visible rank of the affected row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// HTTP-like status of a rejected request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            profile: None,
            service: None,
            metric: None,
            row: None,
            status: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Fallback,
    Stderr,
    Discard,
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Size at which the current file is rotated.
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl From<&LogConfig> for JsonlConfig {
    fn from(config: &LogConfig) -> Self {
        Self {
            path: config.jsonl_path.clone(),
            fallback_path: config.fallback_path.clone(),
            max_size_bytes: config.max_size_bytes,
            max_rotated_files: config.max_rotated_files,
        }
    }
}

/// Append-only JSONL writer with size rotation and fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the log file, falling through the chain on failure.
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        w.try_open_primary();
        w
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[MPE-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        if self.bytes_written + line.len() as u64 > self.config.max_size_bytes
            && matches!(self.state, WriterState::Normal | WriterState::Fallback)
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal | WriterState::Fallback => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        self.write_line(line);
                        return;
                    }
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[MPE-JSONL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn try_open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
                self.bytes_written = size;
            }
            Err(_) => self.try_open_fallback(),
        }
    }

    fn try_open_fallback(&mut self) {
        let Some(fb) = &self.config.fallback_path else {
            self.state = WriterState::Stderr;
            return;
        };
        match open_append(fb) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Fallback;
                self.bytes_written = size;
            }
            Err(_) => {
                self.state = WriterState::Stderr;
                let _ = writeln!(
                    io::stderr(),
                    "[MPE-JSONL] primary and fallback paths failed, using stderr"
                );
            }
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Normal => self.try_open_fallback(),
            WriterState::Fallback => self.state = WriterState::Stderr,
            WriterState::Stderr => self.state = WriterState::Discard,
            WriterState::Discard => {}
        }
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let base = match self.state {
            WriterState::Normal => self.config.path.clone(),
            WriterState::Fallback => match &self.config.fallback_path {
                Some(p) => p.clone(),
                None => return,
            },
            _ => return,
        };

        // .N is dropped, .N-1 -> .N, ..., current -> .1
        let _ = fs::remove_file(rotated_name(&base, self.config.max_rotated_files));
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| MpeError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| MpeError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `foo.jsonl` -> `foo.jsonl.3`
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Current UTC time as ISO 8601 with milliseconds.
#[must_use]
pub fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes,
            max_rotated_files: 3,
        }
    }

    #[test]
    fn entries_are_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone(), 1024 * 1024));

        let mut entry = LogEntry::new(EventType::RowInserted, Severity::Info);
        entry.profile = Some("ARGO_MON".to_string());
        entry.row = Some(2);
        writer.write_entry(&entry);
        writer.write_entry(&LogEntry::new(EventType::ProfileChanged, Severity::Info));
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "row_inserted");
        assert_eq!(first["severity"], "info");
        assert_eq!(first["row"], 2);
        assert!(first.get("status").is_none());
    }

    #[test]
    fn rotation_keeps_bounded_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone(), 100));
        for _ in 0..12 {
            writer.write_entry(&LogEntry::new(EventType::SearchApplied, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn fallback_used_when_primary_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            path: blocker.join("primary.jsonl"),
            fallback_path: Some(fallback.clone()),
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 3,
        });

        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&LogEntry::new(EventType::LoadFailed, Severity::Error));
        writer.flush();
        assert!(!fs::read_to_string(&fallback).unwrap().is_empty());
    }

    #[test]
    fn missing_fallback_degrades_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let writer = JsonlWriter::open(config_at(blocker.join("a.jsonl"), 1024));
        assert_eq!(writer.state(), "stderr");
    }
}
