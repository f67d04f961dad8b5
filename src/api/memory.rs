//! In-memory backend implementing all three collaborator contracts over one
//! serializable [`Snapshot`].
//!
//! Routes are resolved relative to the configured internal prefix. Every
//! internal add or change appends a version to the profile history. One-shot
//! rejections can be armed in [`Faults`] to exercise the error paths.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::backend::{ApiResponse, InternalStore, ProfileApi, SessionProvider};
use crate::api::versions::{ProfileVersion, VersionFields};
use crate::core::config::ApiConfig;
use crate::core::errors::{MpeError, Result};
use crate::profile::access::Session;
use crate::profile::wire::{
    FlatPair, InternalProfileRecord, MetricProfile, ProfileBody, ServiceEntry,
};

// ──────────────────── snapshot ────────────────────

/// A refusal returned by the next matching request instead of handling it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub status: u16,
    pub status_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Rejection {
    fn into_response(self) -> ApiResponse {
        ApiResponse::failure(self.status, &self.status_text, self.body)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faults {
    /// Consumed by the next upstream add, change, or delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Rejection>,
    /// Consumed by the next internal add, change, or delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal: Option<Rejection>,
}

/// Complete state of both stores plus the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub session: Session,
    pub service_flavours: Vec<String>,
    pub metrics: Vec<String>,
    /// Upstream profiles.
    pub profiles: Vec<MetricProfile>,
    /// Internal records, one per upstream profile known to this tenant.
    pub records: Vec<InternalProfileRecord>,
    /// Version history keyed by upstream id, newest first.
    pub history: BTreeMap<String, Vec<ProfileVersion>>,
    pub next_id: u64,
    pub faults: Faults,
}

impl Snapshot {
    /// Register a profile in both stores with an initial version.
    pub fn seed_profile(
        &mut self,
        name: &str,
        description: &str,
        groupname: &str,
        services: Vec<ServiceEntry>,
    ) -> String {
        let id = self.issue_id();
        let record = InternalProfileRecord {
            apiid: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            groupname: groupname.to_string(),
            services: flat_pairs(&services),
        };
        self.profiles.push(MetricProfile {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            services,
        });
        self.push_version(&record, "Initial version.");
        self.records.push(record);
        id
    }

    fn issue_id(&mut self) -> String {
        self.next_id += 1;
        format!("00000000-0000-4000-8000-{:012x}", self.next_id)
    }

    fn record_by_name(&self, name: &str) -> Option<&InternalProfileRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    fn push_version(&mut self, record: &InternalProfileRecord, comment: &str) {
        let user = self.session.userdetails.username.clone();
        let versions = self.history.entry(record.apiid.clone()).or_default();
        let version = ProfileVersion {
            version: (versions.len() + 1).to_string(),
            date_created: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            user,
            comment: comment.to_string(),
            fields: VersionFields {
                name: record.name.clone(),
                groupname: record.groupname.clone(),
                description: record.description.clone(),
                metricinstances: record.services.clone(),
            },
        };
        versions.insert(0, version);
    }
}

fn flat_pairs(services: &[ServiceEntry]) -> Vec<FlatPair> {
    services
        .iter()
        .flat_map(|s| {
            s.metrics.iter().map(move |m| FlatPair {
                service: s.service.clone(),
                metric: m.clone(),
            })
        })
        .collect()
}

// ──────────────────── routing ────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Profiles,
    Profile(String),
    PublicProfiles,
    PublicProfile(String),
    ServiceFlavours,
    Metrics,
    Versions(String),
}

fn route(api: &ApiConfig, path: &str) -> Result<Route> {
    let prefix = api.internal_prefix.trim_end_matches('/');
    let rest = path
        .strip_prefix(prefix)
        .ok_or_else(|| MpeError::fetch(path, "outside the internal API"))?
        .trim_matches('/');
    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        ["metricprofiles"] => Ok(Route::Profiles),
        ["metricprofiles", name] => Ok(Route::Profile((*name).to_string())),
        ["public_metricprofiles"] => Ok(Route::PublicProfiles),
        ["public_metricprofiles", name] => Ok(Route::PublicProfile((*name).to_string())),
        ["serviceflavoursall"] => Ok(Route::ServiceFlavours),
        ["metricsall"] => Ok(Route::Metrics),
        ["tenantversion", "metricprofile", name] => Ok(Route::Versions((*name).to_string())),
        _ => Err(MpeError::fetch(path, "unknown route")),
    }
}

fn detail(status: u16, status_text: &str, message: &str) -> ApiResponse {
    ApiResponse::failure(status, status_text, Some(json!({ "detail": message })))
}

fn upstream_error(status: u16, status_text: &str, message: &str) -> ApiResponse {
    ApiResponse::failure(
        status,
        status_text,
        Some(json!({
            "status": { "message": status_text, "code": status.to_string() },
            "errors": [{ "message": status_text, "code": status.to_string(), "details": message }]
        })),
    )
}

// ──────────────────── backend ────────────────────

#[derive(Debug)]
pub struct InMemoryBackend {
    api: ApiConfig,
    snapshot: Mutex<Snapshot>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new(api: ApiConfig, snapshot: Snapshot) -> Self {
        Self {
            api,
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    pub fn reject_upstream_next(&self, status: u16, status_text: &str, body: Option<Value>) {
        self.snapshot.lock().faults.upstream = Some(Rejection {
            status,
            status_text: status_text.to_string(),
            body,
        });
    }

    pub fn reject_internal_next(&self, status: u16, status_text: &str, body: Option<Value>) {
        self.snapshot.lock().faults.internal = Some(Rejection {
            status,
            status_text: status_text.to_string(),
            body,
        });
    }

    fn decode_record(body: &Value) -> std::result::Result<InternalProfileRecord, ApiResponse> {
        serde_json::from_value(body.clone())
            .map_err(|e| detail(400, "Bad Request", &format!("malformed record: {e}")))
    }
}

impl SessionProvider for InMemoryBackend {
    fn is_active_session(&self) -> Result<Session> {
        Ok(self.snapshot.lock().session.clone())
    }
}

impl InternalStore for InMemoryBackend {
    fn fetch_data(&self, path: &str) -> Result<Value> {
        let snap = self.snapshot.lock();
        match route(&self.api, path)? {
            Route::Profiles | Route::PublicProfiles => Ok(serde_json::to_value(&snap.records)?),
            Route::Profile(name) | Route::PublicProfile(name) => {
                let record = snap.record_by_name(&name).ok_or(MpeError::NotFound {
                    what: "metric profile",
                    name,
                })?;
                Ok(serde_json::to_value(record)?)
            }
            Route::Versions(name) => {
                let record = snap.record_by_name(&name).ok_or_else(|| MpeError::NotFound {
                    what: "metric profile",
                    name: name.clone(),
                })?;
                let versions = snap.history.get(&record.apiid).cloned().unwrap_or_default();
                Ok(serde_json::to_value(versions)?)
            }
            Route::ServiceFlavours | Route::Metrics => {
                Err(MpeError::fetch(path, "route serves a list of names"))
            }
        }
    }

    fn fetch_list_of_names(&self, path: &str) -> Result<Vec<String>> {
        let snap = self.snapshot.lock();
        match route(&self.api, path)? {
            Route::ServiceFlavours => Ok(snap.service_flavours.clone()),
            Route::Metrics => Ok(snap.metrics.clone()),
            Route::Profiles | Route::PublicProfiles => {
                Ok(snap.records.iter().map(|r| r.name.clone()).collect())
            }
            _ => Err(MpeError::fetch(path, "route does not serve names")),
        }
    }

    fn add_object(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        if route(&self.api, path)? != Route::Profiles {
            return Err(MpeError::fetch(path, "objects are added to metricprofiles"));
        }
        let mut snap = self.snapshot.lock();
        if let Some(rejection) = snap.faults.internal.take() {
            return Ok(rejection.into_response());
        }
        let record = match Self::decode_record(body) {
            Ok(record) => record,
            Err(resp) => return Ok(resp),
        };
        if snap.record_by_name(&record.name).is_some() {
            return Ok(detail(
                400,
                "Bad Request",
                "Metric profile with this name already exists.",
            ));
        }
        snap.push_version(&record, "Initial version.");
        snap.records.push(record);
        Ok(ApiResponse::success(201, "Created", None))
    }

    fn change_object(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        if route(&self.api, path)? != Route::Profiles {
            return Err(MpeError::fetch(path, "objects are changed through metricprofiles"));
        }
        let mut snap = self.snapshot.lock();
        if let Some(rejection) = snap.faults.internal.take() {
            return Ok(rejection.into_response());
        }
        let record = match Self::decode_record(body) {
            Ok(record) => record,
            Err(resp) => return Ok(resp),
        };
        let Some(pos) = snap.records.iter().position(|r| r.apiid == record.apiid) else {
            return Ok(detail(404, "Not Found", "Metric profile not found."));
        };
        snap.push_version(&record, "Changed profile.");
        snap.records[pos] = record;
        Ok(ApiResponse::success(201, "Created", None))
    }

    fn delete_object(&self, path: &str) -> Result<ApiResponse> {
        let Route::Profile(apiid) = route(&self.api, path)? else {
            return Err(MpeError::fetch(path, "objects are deleted by metricprofiles id"));
        };
        let mut snap = self.snapshot.lock();
        if let Some(rejection) = snap.faults.internal.take() {
            return Ok(rejection.into_response());
        }
        let Some(pos) = snap.records.iter().position(|r| r.apiid == apiid) else {
            return Ok(detail(404, "Not Found", "Metric profile not found."));
        };
        snap.records.remove(pos);
        snap.history.remove(&apiid);
        Ok(ApiResponse::success(204, "No Content", None))
    }
}

impl ProfileApi for InMemoryBackend {
    fn fetch_metric_profile(&self, id: &str) -> Result<MetricProfile> {
        self.snapshot
            .lock()
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| MpeError::NotFound {
                what: "upstream metric profile",
                name: id.to_string(),
            })
    }

    fn add_metric_profile(&self, body: &ProfileBody) -> Result<ApiResponse> {
        let mut snap = self.snapshot.lock();
        if let Some(rejection) = snap.faults.upstream.take() {
            return Ok(rejection.into_response());
        }
        if snap.profiles.iter().any(|p| p.name == body.name) {
            return Ok(upstream_error(
                409,
                "Conflict",
                "Metric profile with the same name already exists",
            ));
        }
        let id = snap.issue_id();
        snap.profiles.push(MetricProfile {
            id: id.clone(),
            name: body.name.clone(),
            description: body.description.clone(),
            services: body.services.clone(),
        });
        Ok(ApiResponse::success(
            201,
            "Created",
            Some(json!({
                "status": { "message": "Metric Profile successfully created", "code": "201" },
                "data": { "id": id }
            })),
        ))
    }

    fn change_metric_profile(&self, body: &ProfileBody) -> Result<ApiResponse> {
        let mut snap = self.snapshot.lock();
        if let Some(rejection) = snap.faults.upstream.take() {
            return Ok(rejection.into_response());
        }
        let id = body.id.clone().unwrap_or_default();
        let Some(pos) = snap.profiles.iter().position(|p| p.id == id) else {
            return Ok(upstream_error(404, "Not Found", "item with the specific id not found"));
        };
        if snap.profiles.iter().any(|p| p.id != id && p.name == body.name) {
            return Ok(upstream_error(
                409,
                "Conflict",
                "Metric profile with the same name already exists",
            ));
        }
        let profile = &mut snap.profiles[pos];
        profile.name.clone_from(&body.name);
        profile.description.clone_from(&body.description);
        profile.services.clone_from(&body.services);
        Ok(ApiResponse::success(
            200,
            "OK",
            Some(json!({ "status": { "message": "Metric Profile successfully updated", "code": "200" } })),
        ))
    }

    fn delete_metric_profile(&self, id: &str) -> Result<ApiResponse> {
        let mut snap = self.snapshot.lock();
        if let Some(rejection) = snap.faults.upstream.take() {
            return Ok(rejection.into_response());
        }
        let Some(pos) = snap.profiles.iter().position(|p| p.id == id) else {
            return Ok(upstream_error(404, "Not Found", "item with the specific id not found"));
        };
        snap.profiles.remove(pos);
        Ok(ApiResponse::success(
            200,
            "OK",
            Some(json!({ "status": { "message": "Metric Profile Successfully Deleted", "code": "200" } })),
        ))
    }
}
