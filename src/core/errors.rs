//! MPE-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, MpeError>;

/// Top-level error type for the metric profile editor.
#[derive(Debug, Error)]
pub enum MpeError {
    #[error("[MPE-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MPE-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MPE-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MPE-2001] no active session")]
    SessionInactive,

    #[error("[MPE-2002] fetch of {path} failed: {details}")]
    Fetch { path: String, details: String },

    #[error("[MPE-2003] {what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("[MPE-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MPE-3001] Web API error: {status} {status_text}: {message}")]
    UpstreamRejected {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("[MPE-3002] Internal API error: {status} {status_text}: {message}")]
    InternalRejected {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("[MPE-3003] no write permission for group {group:?}")]
    PermissionDenied { group: String },

    #[error("[MPE-9001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MPE-9900] runtime failure: {details}")]
    Runtime { details: String },
}

impl MpeError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MPE-1001",
            Self::MissingConfig { .. } => "MPE-1002",
            Self::ConfigParse { .. } => "MPE-1003",
            Self::SessionInactive => "MPE-2001",
            Self::Fetch { .. } => "MPE-2002",
            Self::NotFound { .. } => "MPE-2003",
            Self::Serialization { .. } => "MPE-2101",
            Self::UpstreamRejected { .. } => "MPE-3001",
            Self::InternalRejected { .. } => "MPE-3002",
            Self::PermissionDenied { .. } => "MPE-3003",
            Self::Io { .. } => "MPE-9001",
            Self::Runtime { .. } => "MPE-9900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::Io { .. }
                | Self::UpstreamRejected { .. }
                | Self::InternalRejected { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for a failed fetch.
    #[must_use]
    pub fn fetch(path: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Fetch {
            path: path.into(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for MpeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for MpeError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<MpeError> {
        vec![
            MpeError::InvalidConfig {
                details: String::new(),
            },
            MpeError::MissingConfig {
                path: PathBuf::new(),
            },
            MpeError::ConfigParse {
                context: "",
                details: String::new(),
            },
            MpeError::SessionInactive,
            MpeError::fetch("", ""),
            MpeError::NotFound {
                what: "profile",
                name: String::new(),
            },
            MpeError::Serialization {
                context: "",
                details: String::new(),
            },
            MpeError::UpstreamRejected {
                status: 400,
                status_text: String::new(),
                message: String::new(),
            },
            MpeError::InternalRejected {
                status: 500,
                status_text: String::new(),
                message: String::new(),
            },
            MpeError::PermissionDenied {
                group: String::new(),
            },
            MpeError::io("/tmp", std::io::Error::other("test")),
            MpeError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(MpeError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_includes_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
        }
    }

    #[test]
    fn rejections_are_retryable_but_config_is_not() {
        assert!(
            MpeError::UpstreamRejected {
                status: 400,
                status_text: "Bad Request".to_string(),
                message: String::new(),
            }
            .is_retryable()
        );
        assert!(MpeError::fetch("/x", "timeout").is_retryable());
        assert!(
            !MpeError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(!MpeError::SessionInactive.is_retryable());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: MpeError = json_err.into();
        assert_eq!(err.code(), "MPE-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: MpeError = toml_err.into();
        assert_eq!(err.code(), "MPE-1003");
    }
}
