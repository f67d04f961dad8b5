//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{MpeError, Result};
use crate::editor::state::IndexPolicy;

/// Full editor configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub editor: EditorConfig,
    pub log: LogConfig,
    pub paths: PathsConfig,
}

/// Route layout of the internal store and the UI list view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix shared by every internal store path.
    pub internal_prefix: String,
    /// UI route the user is sent back to after a successful submit or delete.
    pub list_route: String,
}

/// Editing behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// How a visible row finds its counterpart in the full set.
    pub index_policy: IndexPolicy,
    /// Leave rows whose service and metric are both empty out of the payload.
    pub skip_blank_rows: bool,
}

/// JSONL activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    pub jsonl_path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// Filesystem paths used by mpe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// JSON snapshot served by the file backend.
    pub data_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            internal_prefix: "/api/v2/internal".to_string(),
            list_route: "/ui/metricprofiles".to_string(),
        }
    }
}

impl ApiConfig {
    fn join(&self, tail: &str) -> String {
        format!("{}/{tail}", self.internal_prefix.trim_end_matches('/'))
    }

    /// Collection path of group-owned profiles.
    #[must_use]
    pub fn metricprofiles(&self) -> String {
        self.join("metricprofiles")
    }

    #[must_use]
    pub fn metricprofile(&self, name: &str) -> String {
        self.join(&format!("metricprofiles/{name}"))
    }

    #[must_use]
    pub fn public_metricprofiles(&self) -> String {
        self.join("public_metricprofiles")
    }

    #[must_use]
    pub fn public_metricprofile(&self, name: &str) -> String {
        self.join(&format!("public_metricprofiles/{name}"))
    }

    #[must_use]
    pub fn serviceflavoursall(&self) -> String {
        self.join("serviceflavoursall")
    }

    #[must_use]
    pub fn metricsall(&self) -> String {
        self.join("metricsall")
    }

    #[must_use]
    pub fn profile_versions(&self, name: &str) -> String {
        self.join(&format!("tenantversion/metricprofile/{name}"))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            index_policy: IndexPolicy::Positional,
            skip_blank_rows: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jsonl_path: data_dir().join("activity.jsonl"),
            fallback_path: None,
            max_size_bytes: 16 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        Self {
            config_file: home_dir.join(".config").join("mpe").join("config.toml"),
            data_file: data_dir().join("snapshot.json"),
        }
    }
}

fn data_dir() -> PathBuf {
    env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".local")
        .join("share")
        .join("mpe")
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| MpeError::io(&path_buf, source))?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(MpeError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MPE_API_INTERNAL_PREFIX") {
            self.api.internal_prefix = raw;
        }
        if let Some(raw) = lookup("MPE_API_LIST_ROUTE") {
            self.api.list_route = raw;
        }
        if let Some(raw) = lookup("MPE_EDITOR_INDEX_POLICY") {
            self.editor.index_policy = raw.parse()?;
        }
        if let Some(raw) = lookup("MPE_EDITOR_SKIP_BLANK_ROWS") {
            self.editor.skip_blank_rows = parse_env_bool("MPE_EDITOR_SKIP_BLANK_ROWS", &raw)?;
        }
        if let Some(raw) = lookup("MPE_LOG_ENABLED") {
            self.log.enabled = parse_env_bool("MPE_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("MPE_LOG_JSONL_PATH") {
            self.log.jsonl_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MPE_LOG_MAX_SIZE_BYTES") {
            self.log.max_size_bytes = parse_env_u64("MPE_LOG_MAX_SIZE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("MPE_DATA_FILE") {
            self.paths.data_file = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Check cross-field constraints of the effective config.
    pub fn validate(&self) -> Result<()> {
        let prefix = self.api.internal_prefix.trim();
        if prefix.is_empty() || !prefix.starts_with('/') {
            return Err(MpeError::InvalidConfig {
                details: format!(
                    "api.internal_prefix must be an absolute path, got {:?}",
                    self.api.internal_prefix
                ),
            });
        }
        if !self.api.list_route.starts_with('/') {
            return Err(MpeError::InvalidConfig {
                details: format!(
                    "api.list_route must be an absolute route, got {:?}",
                    self.api.list_route
                ),
            });
        }
        if self.log.enabled {
            if self.log.max_rotated_files == 0 {
                return Err(MpeError::InvalidConfig {
                    details: "log.max_rotated_files must be > 0".to_string(),
                });
            }
            if self.log.max_size_bytes < 1024 {
                return Err(MpeError::InvalidConfig {
                    details: format!(
                        "log.max_size_bytes must be >= 1024, got {}",
                        self.log.max_size_bytes
                    ),
                });
            }
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|error| MpeError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| MpeError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
