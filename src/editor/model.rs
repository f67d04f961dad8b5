//! Elm-style model for one metric-profile edit session.
//!
//! All session state lives in [`EditorModel`]. Form events arrive as
//! [`EditorMsg`] values; side-effects are described by [`EditorCmd`] values
//! returned from [`crate::editor::update::update`]. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::editor::state::{EditorState, MetadataFields};
use crate::editor::validate::ErrorMap;
use crate::profile::tuple::TupleField;

// ──────────────────── modes ────────────────────

/// What the session was opened for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    /// New profile from scratch.
    Add,
    /// Existing profile, saved back under the same id.
    #[default]
    Change,
    /// Existing profile used as a template for a new one.
    Clone,
    /// Read-only view served from the public endpoints.
    Public,
}

impl EditorMode {
    /// Modes whose submission creates a new upstream profile.
    #[must_use]
    pub const fn creates(self) -> bool {
        matches!(self, Self::Add | Self::Clone)
    }

    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Public)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Clone => "clone",
            Self::Public => "public",
        }
    }
}

// ──────────────────── confirmation ────────────────────

/// Mutating actions that wait for an explicit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmAction {
    Submit,
    Delete,
}

/// Text of the confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub title: &'static str,
    pub question: &'static str,
}

impl ConfirmAction {
    #[must_use]
    pub const fn prompt(self, mode: EditorMode) -> Prompt {
        match self {
            Self::Delete => Prompt {
                title: "Delete metric profile",
                question: "Are you sure you want to delete Metric profile?",
            },
            Self::Submit if mode.creates() => Prompt {
                title: "Add metric profile",
                question: "Are you sure you want to add Metric profile?",
            },
            Self::Submit => Prompt {
                title: "Change metric profile",
                question: "Are you sure you want to change Metric profile?",
            },
        }
    }
}

// ──────────────────── notifications ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// User-visible outcome of a flow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    /// Route to navigate to once the notification is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Set when an earlier step already mutated the upstream store.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl Notification {
    #[must_use]
    pub fn success(
        title: impl Into<String>,
        message: impl Into<String>,
        redirect: impl Into<String>,
    ) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            message: message.into(),
            redirect: Some(redirect.into()),
            partial: false,
        }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
            redirect: None,
            partial: false,
        }
    }

    #[must_use]
    pub const fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.level, NotificationLevel::Error)
    }
}

// ──────────────────── model ────────────────────

/// Complete state of an open edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorModel {
    pub mode: EditorMode,
    pub state: EditorState,
    /// Validator output for the current form values.
    pub errors: ErrorMap,
    /// Action awaiting confirmation, if a dialog is open.
    pub pending: Option<ConfirmAction>,
    pub notifications: Vec<Notification>,
}

impl EditorModel {
    #[must_use]
    pub fn new(mode: EditorMode, state: EditorState) -> Self {
        let errors = state.validate();
        Self {
            mode,
            state,
            errors,
            pending: None,
            notifications: Vec::new(),
        }
    }

    /// Whether edits other than searching are accepted.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !self.mode.is_read_only() && self.state.metadata.has_write_permission
    }

    /// Metadata as the form currently shows it.
    #[must_use]
    pub fn fields(&self) -> MetadataFields {
        MetadataFields::from(&self.state.metadata)
    }

    /// Prompt for the pending action, if any.
    #[must_use]
    pub fn prompt(&self) -> Option<Prompt> {
        self.pending.map(|action| action.prompt(self.mode))
    }

    #[must_use]
    pub fn last_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }
}

// ──────────────────── messages ────────────────────

/// Form events. Rows are addressed by their rank in the visible set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditorMsg {
    SetName { value: String },
    SetDescription { value: String },
    SetGroup { value: String },
    Search { field: TupleField, query: String },
    /// Add an empty row right after `after_row`.
    Insert { after_row: usize },
    Remove { row: usize },
    Select {
        row: usize,
        field: TupleField,
        value: String,
    },
    RequestSubmit,
    RequestDelete,
    Confirm,
    Cancel,
    Notify(Notification),
}

impl EditorMsg {
    /// Messages a read-only session still accepts.
    #[must_use]
    pub const fn is_read_only_safe(&self) -> bool {
        matches!(
            self,
            Self::Search { .. } | Self::Cancel | Self::Notify(_)
        )
    }
}

// ──────────────────── commands ────────────────────

/// Side-effects for the runtime to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCmd {
    None,
    /// Send the form to the upstream API, then the internal store.
    Submit,
    /// Delete the profile upstream, then from the internal store.
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_follow_mode() {
        assert_eq!(
            ConfirmAction::Submit.prompt(EditorMode::Clone).title,
            "Add metric profile"
        );
        assert_eq!(
            ConfirmAction::Submit.prompt(EditorMode::Change).question,
            "Are you sure you want to change Metric profile?"
        );
        assert_eq!(
            ConfirmAction::Delete.prompt(EditorMode::Change).title,
            "Delete metric profile"
        );
    }

    #[test]
    fn messages_parse_from_script_json() {
        let msgs: Vec<EditorMsg> = serde_json::from_str(
            r#"[
                {"op": "set_name", "value": "ARGO_MON"},
                {"op": "insert", "after_row": 0},
                {"op": "select", "row": 1, "field": "metric", "value": "org.x"},
                {"op": "search", "field": "service", "query": "srm"},
                {"op": "request_submit"},
                {"op": "confirm"}
            ]"#,
        )
        .unwrap();
        assert_eq!(msgs.len(), 6);
        assert_eq!(
            msgs[2],
            EditorMsg::Select {
                row: 1,
                field: TupleField::Metric,
                value: "org.x".to_string()
            }
        );
        assert_eq!(msgs[5], EditorMsg::Confirm);
    }

    #[test]
    fn partial_flag_serializes_only_when_set() {
        let plain = serde_json::to_value(Notification::error("t", "m")).unwrap();
        assert!(plain.get("partial").is_none());
        let partial = serde_json::to_value(Notification::error("t", "m").partial()).unwrap();
        assert_eq!(partial["partial"], true);
    }
}
