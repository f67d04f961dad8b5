//! File-backed backend: a JSON [`Snapshot`] loaded at open and written back
//! atomically after every mutating request.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::api::backend::{ApiResponse, InternalStore, ProfileApi, SessionProvider};
use crate::api::memory::{InMemoryBackend, Snapshot};
use crate::core::config::ApiConfig;
use crate::core::errors::{MpeError, Result};
use crate::profile::access::Session;
use crate::profile::wire::{MetricProfile, ProfileBody};

#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: InMemoryBackend,
}

impl FileBackend {
    /// Load the snapshot at `path`. The file must exist.
    pub fn open(path: &Path, api: ApiConfig) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| MpeError::io(path, source))?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| MpeError::Serialization {
            context: "data snapshot",
            details: format!("{}: {e}", path.display()),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryBackend::new(api, snapshot),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    fn persist(&self) -> Result<()> {
        save_snapshot(&self.inner.snapshot(), &self.path)
    }

    fn persisted(&self, resp: Result<ApiResponse>) -> Result<ApiResponse> {
        let resp = resp?;
        self.persist()?;
        Ok(resp)
    }
}

/// Atomic save: serialize, write a temp file, fsync, rename over `path`.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| MpeError::io(parent, source))?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp_path = path.with_extension("json.tmp");
    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };
    write().map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        MpeError::io(path, source)
    })
}

impl SessionProvider for FileBackend {
    fn is_active_session(&self) -> Result<Session> {
        self.inner.is_active_session()
    }
}

impl InternalStore for FileBackend {
    fn fetch_data(&self, path: &str) -> Result<Value> {
        self.inner.fetch_data(path)
    }

    fn fetch_list_of_names(&self, path: &str) -> Result<Vec<String>> {
        self.inner.fetch_list_of_names(path)
    }

    fn add_object(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.persisted(self.inner.add_object(path, body))
    }

    fn change_object(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.persisted(self.inner.change_object(path, body))
    }

    fn delete_object(&self, path: &str) -> Result<ApiResponse> {
        self.persisted(self.inner.delete_object(path))
    }
}

impl ProfileApi for FileBackend {
    fn fetch_metric_profile(&self, id: &str) -> Result<MetricProfile> {
        self.inner.fetch_metric_profile(id)
    }

    fn add_metric_profile(&self, body: &ProfileBody) -> Result<ApiResponse> {
        self.persisted(self.inner.add_metric_profile(body))
    }

    fn change_metric_profile(&self, body: &ProfileBody) -> Result<ApiResponse> {
        self.persisted(self.inner.change_metric_profile(body))
    }

    fn delete_metric_profile(&self, id: &str) -> Result<ApiResponse> {
        self.persisted(self.inner.delete_metric_profile(id))
    }
}
