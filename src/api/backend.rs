//! Contracts of the three collaborators the editor talks to: the session
//! provider, the internal store, and the upstream profile API.
//!
//! `Err` from any method means the request could not be made or answered at
//! all. A request that reached the other side and was refused comes back as an
//! [`ApiResponse`] with `ok == false`.

#![allow(missing_docs)]

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{MpeError, Result};
use crate::profile::access::Session;
use crate::profile::wire::{MetricProfile, ProfileBody};

/// Answer to a mutating request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ApiResponse {
    #[must_use]
    pub fn success(status: u16, status_text: &str, body: Option<Value>) -> Self {
        Self {
            ok: true,
            status,
            status_text: status_text.to_string(),
            body,
        }
    }

    #[must_use]
    pub fn failure(status: u16, status_text: &str, body: Option<Value>) -> Self {
        Self {
            ok: false,
            status,
            status_text: status_text.to_string(),
            body,
        }
    }

    /// Decode the body. A missing body is a decode failure, like an empty
    /// HTTP response handed to a JSON parser.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.clone().ok_or_else(|| MpeError::Serialization {
            context: "response body",
            details: format!("{} {} carried no body", self.status, self.status_text),
        })?;
        serde_json::from_value(body).map_err(|e| MpeError::Serialization {
            context: "response body",
            details: e.to_string(),
        })
    }
}

pub trait SessionProvider {
    fn is_active_session(&self) -> Result<Session>;
}

/// Tenant-local store addressed by path under the internal API prefix.
pub trait InternalStore {
    fn fetch_data(&self, path: &str) -> Result<Value>;
    fn fetch_list_of_names(&self, path: &str) -> Result<Vec<String>>;
    fn add_object(&self, path: &str, body: &Value) -> Result<ApiResponse>;
    fn change_object(&self, path: &str, body: &Value) -> Result<ApiResponse>;
    fn delete_object(&self, path: &str) -> Result<ApiResponse>;
}

/// Authoritative profile service.
pub trait ProfileApi {
    fn fetch_metric_profile(&self, id: &str) -> Result<MetricProfile>;
    fn add_metric_profile(&self, body: &ProfileBody) -> Result<ApiResponse>;
    fn change_metric_profile(&self, body: &ProfileBody) -> Result<ApiResponse>;
    fn delete_metric_profile(&self, id: &str) -> Result<ApiResponse>;
}

/// Everything a full edit session needs.
pub trait Backend: SessionProvider + InternalStore + ProfileApi {}

impl<T: SessionProvider + InternalStore + ProfileApi + ?Sized> Backend for T {}
