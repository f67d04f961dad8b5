//! Flows that talk to the backend: loading a session, listing profiles,
//! submitting and deleting, plus [`EditorSession`], which feeds messages
//! through the pure update function and executes the commands it returns.
//!
//! A refused request becomes an error [`Notification`] and leaves the editor
//! state untouched so the user can retry. Only failures to reach the backend
//! at all surface as `Err`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::backend::{ApiResponse, Backend, InternalStore, SessionProvider};
use crate::core::config::{ApiConfig, Config};
use crate::core::errors::{MpeError, Result};
use crate::editor::model::{EditorCmd, EditorMode, EditorModel, EditorMsg, Notification};
use crate::editor::state::{EditorState, Vocabularies};
use crate::editor::update::update;
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::profile::access::ProfileMetadata;
use crate::profile::tuple::ServiceTuple;
use crate::profile::wire::{
    FlatPair, InternalProfileRecord, ProfileBody, flatten, group_by_service,
};

// ──────────────────── listing ────────────────────

/// One row of the profile list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub groupname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileList {
    pub profiles: Vec<ProfileSummary>,
    /// Whether the "add" action is offered.
    pub can_add: bool,
}

pub fn list_profiles<B>(backend: &B, api: &ApiConfig, public: bool) -> Result<ProfileList>
where
    B: SessionProvider + InternalStore + ?Sized,
{
    if public {
        let raw = backend.fetch_data(&api.public_metricprofiles())?;
        return Ok(ProfileList {
            profiles: serde_json::from_value(raw)?,
            can_add: false,
        });
    }
    let session = backend.is_active_session()?;
    if !session.active {
        return Err(MpeError::SessionInactive);
    }
    let raw = backend.fetch_data(&api.metricprofiles())?;
    Ok(ProfileList {
        profiles: serde_json::from_value(raw)?,
        can_add: session.can_add(),
    })
}

// ──────────────────── loading ────────────────────

#[derive(Debug, Deserialize)]
struct RecordRef {
    apiid: String,
    #[serde(default)]
    groupname: String,
}

/// Open an edit session. `name` is required for every mode except `Add`.
pub fn load_editor<B>(
    backend: &B,
    config: &Config,
    mode: EditorMode,
    name: Option<&str>,
) -> Result<EditorModel>
where
    B: Backend + ?Sized,
{
    let api = &config.api;
    let policy = config.editor.index_policy;
    let required_name = || {
        name.ok_or_else(|| MpeError::Runtime {
            details: format!("{} mode needs a profile name", mode.label()),
        })
    };

    if mode == EditorMode::Public {
        let name = required_name()?;
        let record: RecordRef =
            serde_json::from_value(backend.fetch_data(&api.public_metricprofile(name))?)?;
        let profile = backend.fetch_metric_profile(&record.apiid)?;
        let metadata = ProfileMetadata {
            id: profile.id.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            group_owner: record.groupname,
            ..ProfileMetadata::default()
        };
        let state = EditorState::from_rows(
            flatten(&profile.services),
            metadata,
            Vocabularies::default(),
            policy,
        );
        return Ok(EditorModel::new(mode, state));
    }

    let session = backend.is_active_session()?;
    if !session.active {
        return Err(MpeError::SessionInactive);
    }
    let vocabularies = Vocabularies::new(
        backend.fetch_list_of_names(&api.serviceflavoursall())?,
        backend.fetch_list_of_names(&api.metricsall())?,
    );

    if mode == EditorMode::Add {
        let metadata = ProfileMetadata {
            permitted_groups: session.permitted_groups(),
            has_write_permission: session.can_add(),
            any_group: session.userdetails.is_superuser,
            ..ProfileMetadata::default()
        };
        let state = EditorState::new_profile(metadata, vocabularies, policy);
        return Ok(EditorModel::new(mode, state));
    }

    let name = required_name()?;
    let record: RecordRef = serde_json::from_value(backend.fetch_data(&api.metricprofile(name))?)?;
    let profile = backend.fetch_metric_profile(&record.apiid)?;
    // A clone is created as a new profile under a new name.
    let (id, name) = if mode == EditorMode::Clone {
        (String::new(), format!("Cloned {}", profile.name))
    } else {
        (profile.id.clone(), profile.name.clone())
    };
    let metadata = ProfileMetadata {
        id,
        name,
        description: profile.description.clone(),
        has_write_permission: session.can_write_group(&record.groupname),
        group_owner: record.groupname,
        permitted_groups: session.permitted_groups(),
        any_group: session.userdetails.is_superuser,
    };
    let state = EditorState::from_rows(flatten(&profile.services), metadata, vocabularies, policy);
    Ok(EditorModel::new(mode, state))
}

// ──────────────────── submit / delete ────────────────────

const ADDED: (&str, &str) = ("Added", "Metric profile successfully added");
const CHANGED: (&str, &str) = ("Changed", "Metric profile successfully changed");
const DELETED: (&str, &str) = ("Deleted", "Metric profile successfully deleted");

#[derive(Debug, Deserialize)]
struct Created {
    data: CreatedId,
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: String,
}

/// Joined `errors[].details` of an upstream refusal, or `fallback` when
/// there are none.
fn upstream_message(resp: &ApiResponse, fallback: &str) -> String {
    let joined = resp
        .body
        .as_ref()
        .and_then(|body| body.get("errors"))
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("details").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    if joined.trim().is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

/// `detail` of an internal refusal, or `fallback`.
fn internal_message(resp: &ApiResponse, fallback: &str) -> String {
    resp.body
        .as_ref()
        .and_then(|body| body.get("detail"))
        .and_then(Value::as_str)
        .map_or_else(|| fallback.to_string(), str::to_string)
}

fn upstream_refused(resp: &ApiResponse, fallback: &str, profile: &str, log: &ActivityLog) -> Notification {
    let message = upstream_message(resp, fallback);
    log.record(&ActivityEvent::UpstreamRejected {
        profile: profile.to_string(),
        status: resp.status,
        message: message.clone(),
    });
    Notification::error(
        format!("Web API error: {} {}", resp.status, resp.status_text),
        message,
    )
}

fn internal_refused(resp: &ApiResponse, fallback: &str, profile: &str, log: &ActivityLog) -> Notification {
    let message = internal_message(resp, fallback);
    log.record(&ActivityEvent::InternalRejected {
        profile: profile.to_string(),
        status: resp.status,
        message: message.clone(),
    });
    Notification::error(
        format!("Internal API error: {} {}", resp.status, resp.status_text),
        message,
    )
    .partial()
}

fn ensure_writable(model: &EditorModel) -> Result<()> {
    if model.is_editable() {
        Ok(())
    } else {
        Err(MpeError::PermissionDenied {
            group: model.state.metadata.group_owner.clone(),
        })
    }
}

/// Rows that go out with a submission.
fn submitted_rows<'a>(model: &'a EditorModel, config: &Config) -> Vec<&'a ServiceTuple> {
    model
        .state
        .full
        .iter()
        .filter(|row| !(config.editor.skip_blank_rows && row.is_blank()))
        .collect()
}

/// Send the form upstream, then mirror it into the internal store.
pub fn submit<B>(backend: &B, config: &Config, model: &EditorModel, log: &ActivityLog) -> Result<Notification>
where
    B: Backend + ?Sized,
{
    ensure_writable(model)?;
    let meta = &model.state.metadata;
    let rows = submitted_rows(model, config);
    let services = group_by_service(rows.iter().copied());
    let pairs: Vec<FlatPair> = rows.iter().map(|row| FlatPair::from(*row)).collect();
    let list_route = config.api.list_route.as_str();

    if model.mode.creates() {
        let body = ProfileBody {
            id: None,
            name: meta.name.clone(),
            description: meta.description.clone(),
            services,
        };
        let resp = backend.add_metric_profile(&body)?;
        if !resp.ok {
            return Ok(upstream_refused(&resp, "Web API error adding metric profile", &meta.name, log));
        }
        let created: Created = resp.json()?;
        let record = InternalProfileRecord {
            apiid: created.data.id.clone(),
            name: meta.name.clone(),
            description: meta.description.clone(),
            groupname: meta.group_owner.clone(),
            services: pairs,
        };
        let r = backend.add_object(&config.api.metricprofiles(), &serde_json::to_value(&record)?)?;
        if !r.ok {
            return Ok(internal_refused(&r, "Internal API error adding metric profile", &meta.name, log));
        }
        log.record(&ActivityEvent::ProfileAdded {
            profile: meta.name.clone(),
            id: created.data.id,
        });
        return Ok(Notification::success(ADDED.0, ADDED.1, list_route));
    }

    let body = ProfileBody {
        id: Some(meta.id.clone()),
        name: meta.name.clone(),
        description: meta.description.clone(),
        services,
    };
    let resp = backend.change_metric_profile(&body)?;
    if !resp.ok {
        return Ok(upstream_refused(&resp, "Web API error changing metric profile", &meta.name, log));
    }
    let record = InternalProfileRecord {
        apiid: meta.id.clone(),
        name: meta.name.clone(),
        description: meta.description.clone(),
        groupname: meta.group_owner.clone(),
        services: pairs,
    };
    let r = backend.change_object(&config.api.metricprofiles(), &serde_json::to_value(&record)?)?;
    if !r.ok {
        return Ok(internal_refused(&r, "Internal API error changing metric profile", &meta.name, log));
    }
    log.record(&ActivityEvent::ProfileChanged {
        profile: meta.name.clone(),
    });
    Ok(Notification::success(CHANGED.0, CHANGED.1, list_route))
}

/// Delete the profile upstream, then from the internal store.
pub fn delete<B>(backend: &B, config: &Config, model: &EditorModel, log: &ActivityLog) -> Result<Notification>
where
    B: Backend + ?Sized,
{
    ensure_writable(model)?;
    let meta = &model.state.metadata;
    if model.mode.creates() || meta.id.is_empty() {
        return Err(MpeError::Runtime {
            details: "only a saved profile can be deleted".to_string(),
        });
    }

    let resp = backend.delete_metric_profile(&meta.id)?;
    if !resp.ok {
        return Ok(upstream_refused(&resp, "Web API error deleting metric profile", &meta.name, log));
    }
    let r = backend.delete_object(&config.api.metricprofile(&meta.id))?;
    if !r.ok {
        return Ok(internal_refused(&r, "Internal API error deleting metric profile", &meta.name, log));
    }
    log.record(&ActivityEvent::ProfileDeleted {
        profile: meta.name.clone(),
    });
    Ok(Notification::success(DELETED.0, DELETED.1, config.api.list_route.as_str()))
}

// ──────────────────── session ────────────────────

/// One open edit session bound to a backend.
pub struct EditorSession<'a, B: Backend + ?Sized> {
    backend: &'a B,
    config: &'a Config,
    log: ActivityLog,
    model: EditorModel,
}

impl<'a, B: Backend + ?Sized> EditorSession<'a, B> {
    /// Load the profile and log the outcome.
    pub fn open(
        backend: &'a B,
        config: &'a Config,
        log: ActivityLog,
        mode: EditorMode,
        name: Option<&str>,
    ) -> Result<Self> {
        match load_editor(backend, config, mode, name) {
            Ok(model) => {
                log.record(&ActivityEvent::ProfileLoaded {
                    profile: model.state.metadata.name.clone(),
                    mode: mode.label(),
                    rows: model.state.full.len(),
                });
                Ok(Self {
                    backend,
                    config,
                    log,
                    model,
                })
            }
            Err(err) => {
                log.record(&ActivityEvent::LoadFailed {
                    profile: name.map(str::to_string),
                    code: err.code(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    #[must_use]
    pub const fn model(&self) -> &EditorModel {
        &self.model
    }

    #[must_use]
    pub fn into_model(self) -> EditorModel {
        self.model
    }

    /// Apply one message and execute the resulting command. Returns the command
    /// that was executed.
    pub fn dispatch(&mut self, msg: EditorMsg) -> Result<EditorCmd> {
        let before = self.model.state.clone();
        let requested_submit = matches!(msg, EditorMsg::RequestSubmit);
        let mut event = describe(&msg, &before);

        let cmd = update(&mut self.model, msg);

        if let Some(ActivityEvent::SearchApplied { visible, .. }) = event.as_mut() {
            *visible = self.model.state.visible.len();
        }
        if self.model.state != before {
            if let Some(event) = event {
                self.log.record(&event);
            }
        }
        if requested_submit && !self.model.errors.is_empty() {
            self.log.record(&ActivityEvent::ValidationFailed {
                profile: self.model.state.metadata.name.clone(),
                errors: self.model.errors.count(),
            });
        }

        let notification = match cmd {
            EditorCmd::None => return Ok(cmd),
            EditorCmd::Submit => submit(self.backend, self.config, &self.model, &self.log)?,
            EditorCmd::Delete => delete(self.backend, self.config, &self.model, &self.log)?,
        };
        update(&mut self.model, EditorMsg::Notify(notification));
        Ok(cmd)
    }

    /// Dispatch every message in order, stopping at the first `Err`.
    pub fn run_script<I>(&mut self, msgs: I) -> Result<()>
    where
        I: IntoIterator<Item = EditorMsg>,
    {
        for msg in msgs {
            self.dispatch(msg)?;
        }
        Ok(())
    }
}

/// Activity event for an edit, built from the state it applies to.
fn describe(msg: &EditorMsg, state: &EditorState) -> Option<ActivityEvent> {
    let profile = state.metadata.name.clone();
    match msg {
        EditorMsg::Insert { after_row } => Some(ActivityEvent::RowInserted {
            profile,
            row: after_row.saturating_add(1),
        }),
        EditorMsg::Remove { row } => state.visible.get(*row).map(|target| ActivityEvent::RowRemoved {
            profile,
            row: *row,
            service: target.service.clone(),
            metric: target.metric.clone(),
        }),
        EditorMsg::Select { row, field, value } => Some(ActivityEvent::FieldEdited {
            profile,
            row: *row,
            field: field.label(),
            value: value.clone(),
        }),
        EditorMsg::Search { field, query } => Some(ActivityEvent::SearchApplied {
            profile,
            field: field.label(),
            query: query.clone(),
            visible: 0,
        }),
        _ => None,
    }
}
