//! Activity events emitted by the flows and the shared handle that writes them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::config::LogConfig;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

// ──────────────────── public event type ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    ProfileLoaded {
        profile: String,
        mode: &'static str,
        rows: usize,
    },
    LoadFailed {
        profile: Option<String>,
        code: &'static str,
        message: String,
    },
    RowInserted {
        profile: String,
        row: usize,
    },
    RowRemoved {
        profile: String,
        row: usize,
        service: String,
        metric: String,
    },
    FieldEdited {
        profile: String,
        row: usize,
        field: &'static str,
        value: String,
    },
    SearchApplied {
        profile: String,
        field: &'static str,
        query: String,
        visible: usize,
    },
    ValidationFailed {
        profile: String,
        errors: usize,
    },
    ProfileAdded {
        profile: String,
        id: String,
    },
    ProfileChanged {
        profile: String,
    },
    ProfileDeleted {
        profile: String,
    },
    UpstreamRejected {
        profile: String,
        status: u16,
        message: String,
    },
    InternalRejected {
        profile: String,
        status: u16,
        message: String,
    },
}

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::ProfileLoaded { profile, mode, rows } => {
            let mut e = LogEntry::new(EventType::ProfileLoaded, Severity::Info);
            e.profile = Some(profile.clone());
            e.details = Some(format!("mode={mode} rows={rows}"));
            e
        }
        ActivityEvent::LoadFailed {
            profile,
            code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::LoadFailed, Severity::Error);
            e.profile.clone_from(profile);
            e.error_code = Some((*code).to_string());
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::RowInserted { profile, row } => {
            let mut e = LogEntry::new(EventType::RowInserted, Severity::Info);
            e.profile = Some(profile.clone());
            e.row = Some(*row);
            e
        }
        ActivityEvent::RowRemoved {
            profile,
            row,
            service,
            metric,
        } => {
            let mut e = LogEntry::new(EventType::RowRemoved, Severity::Info);
            e.profile = Some(profile.clone());
            e.row = Some(*row);
            e.service = Some(service.clone());
            e.metric = Some(metric.clone());
            e
        }
        ActivityEvent::FieldEdited {
            profile,
            row,
            field,
            value,
        } => {
            let mut e = LogEntry::new(EventType::FieldEdited, Severity::Info);
            e.profile = Some(profile.clone());
            e.row = Some(*row);
            e.details = Some(format!("{field}={value}"));
            e
        }
        ActivityEvent::SearchApplied {
            profile,
            field,
            query,
            visible,
        } => {
            let mut e = LogEntry::new(EventType::SearchApplied, Severity::Info);
            e.profile = Some(profile.clone());
            e.details = Some(format!("{field}={query:?} visible={visible}"));
            e
        }
        ActivityEvent::ValidationFailed { profile, errors } => {
            let mut e = LogEntry::new(EventType::ValidationFailed, Severity::Warning);
            e.profile = Some(profile.clone());
            e.details = Some(format!("{errors} validation errors"));
            e
        }
        ActivityEvent::ProfileAdded { profile, id } => {
            let mut e = LogEntry::new(EventType::ProfileAdded, Severity::Info);
            e.profile = Some(profile.clone());
            e.details = Some(format!("apiid={id}"));
            e
        }
        ActivityEvent::ProfileChanged { profile } => {
            let mut e = LogEntry::new(EventType::ProfileChanged, Severity::Info);
            e.profile = Some(profile.clone());
            e
        }
        ActivityEvent::ProfileDeleted { profile } => {
            let mut e = LogEntry::new(EventType::ProfileDeleted, Severity::Info);
            e.profile = Some(profile.clone());
            e
        }
        ActivityEvent::UpstreamRejected {
            profile,
            status,
            message,
        } => {
            let mut e = LogEntry::new(EventType::UpstreamRejected, Severity::Error);
            e.profile = Some(profile.clone());
            e.status = Some(*status);
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::InternalRejected {
            profile,
            status,
            message,
        } => {
            let mut e = LogEntry::new(EventType::InternalRejected, Severity::Error);
            e.profile = Some(profile.clone());
            e.status = Some(*status);
            e.error_message = Some(message.clone());
            e.details = Some("upstream already updated".to_string());
            e
        }
    }
}

// ──────────────────── public handle ────────────────────

/// Cheaply cloneable activity log. A disabled log drops every event.
#[derive(Clone, Default)]
pub struct ActivityLog {
    writer: Option<Arc<Mutex<JsonlWriter>>>,
}

impl ActivityLog {
    #[must_use]
    pub fn open(config: &LogConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            writer: Some(Arc::new(Mutex::new(JsonlWriter::open(JsonlConfig::from(
                config,
            ))))),
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { writer: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn record(&self, event: &ActivityEvent) {
        if let Some(writer) = &self.writer {
            let mut w = writer.lock();
            w.write_entry(&event_to_log_entry(event));
            w.flush();
        }
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_config(dir: &std::path::Path) -> LogConfig {
        LogConfig {
            jsonl_path: dir.join("activity.jsonl"),
            ..LogConfig::default()
        }
    }

    #[test]
    fn record_appends_mapped_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = log_config(dir.path());
        let log = ActivityLog::open(&config);
        log.record(&ActivityEvent::UpstreamRejected {
            profile: "ARGO_MON".to_string(),
            status: 409,
            message: "name taken".to_string(),
        });
        log.record(&ActivityEvent::ProfileChanged {
            profile: "ARGO_MON".to_string(),
        });

        let contents = std::fs::read_to_string(&config.jsonl_path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "upstream_rejected");
        assert_eq!(lines[0]["severity"], "error");
        assert_eq!(lines[0]["status"], 409);
        assert_eq!(lines[1]["event"], "profile_changed");
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            enabled: false,
            ..log_config(dir.path())
        };
        let log = ActivityLog::open(&config);
        assert!(!log.is_enabled());
        log.record(&ActivityEvent::ProfileDeleted {
            profile: "P".to_string(),
        });
        assert!(!config.jsonl_path.exists());
    }
}
