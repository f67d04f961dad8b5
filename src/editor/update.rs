//! Pure update function for the edit session.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//! The validator is re-run after every message that changes the form.

use crate::editor::model::{ConfirmAction, EditorCmd, EditorModel, EditorMsg};
use crate::editor::state::EditorState;
use crate::profile::tuple::ServiceTuple;

/// Apply a message to the model and return the next command for the runtime.
pub fn update(model: &mut EditorModel, msg: EditorMsg) -> EditorCmd {
    if !model.is_editable() && !msg.is_read_only_safe() {
        return EditorCmd::None;
    }

    match msg {
        EditorMsg::SetName { value } => {
            model.state.metadata.name = value;
            revalidate(model);
            EditorCmd::None
        }
        EditorMsg::SetDescription { value } => {
            model.state.metadata.description = value;
            EditorCmd::None
        }
        EditorMsg::SetGroup { value } => {
            if !model.state.metadata.may_own(&value) {
                return EditorCmd::None;
            }
            model.state.metadata.group_owner = value;
            revalidate(model);
            EditorCmd::None
        }

        EditorMsg::Search { field, query } => {
            edit_state(model, |state| state.search(field, &query));
            EditorCmd::None
        }

        EditorMsg::Insert { after_row } => {
            let fields = model.fields();
            let at = after_row.saturating_add(1);
            edit_state(model, |state| state.insert(ServiceTuple::new_row(at), at, fields));
            EditorCmd::None
        }

        EditorMsg::Remove { row } => {
            let Some(target) = model.state.visible.get(row).cloned() else {
                return EditorCmd::None;
            };
            let fields = model.fields();
            edit_state(model, |state| state.remove(&target, fields));
            EditorCmd::None
        }

        EditorMsg::Select { row, field, value } => {
            let Some(target) = model.state.visible.get(row).cloned() else {
                return EditorCmd::None;
            };
            edit_state(model, |state| state.select(&target, field, &value));
            EditorCmd::None
        }

        EditorMsg::RequestSubmit => {
            revalidate(model);
            if model.errors.is_empty() {
                model.pending = Some(ConfirmAction::Submit);
            }
            EditorCmd::None
        }

        EditorMsg::RequestDelete => {
            if !model.mode.creates() {
                model.pending = Some(ConfirmAction::Delete);
            }
            EditorCmd::None
        }

        EditorMsg::Confirm => match model.pending.take() {
            Some(ConfirmAction::Submit) => {
                // The form may have changed while the dialog was open.
                revalidate(model);
                if model.errors.is_empty() {
                    EditorCmd::Submit
                } else {
                    EditorCmd::None
                }
            }
            Some(ConfirmAction::Delete) => EditorCmd::Delete,
            None => EditorCmd::None,
        },

        EditorMsg::Cancel => {
            model.pending = None;
            EditorCmd::None
        }

        EditorMsg::Notify(notification) => {
            model.notifications.push(notification);
            EditorCmd::None
        }
    }
}

fn edit_state(model: &mut EditorModel, op: impl FnOnce(EditorState) -> EditorState) {
    let state = std::mem::take(&mut model.state);
    model.state = op(state);
    revalidate(model);
}

fn revalidate(model: &mut EditorModel) {
    model.errors = model.state.validate();
}
