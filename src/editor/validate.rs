//! Form validator: required metadata, duplicate rows introduced in this
//! session, and vocabulary membership of new or changed fields.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::editor::state::{EditorState, Vocabularies};
use crate::profile::tuple::{ServiceTuple, TupleField};

pub const REQUIRED: &str = "Required";
pub const DUPLICATED: &str = "Duplicated";
pub const UNKNOWN_SERVICE: &str = "Must be one of predefined service types";
pub const UNKNOWN_METRIC: &str = "Must be one of predefined metrics";

/// Errors attached to one visible row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dup: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<&'static str>,
}

impl RowErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dup.is_none() && self.service.is_none() && self.metric.is_none()
    }

    #[must_use]
    pub const fn field(&self, field: TupleField) -> Option<&'static str> {
        match field {
            TupleField::Service => self.service,
            TupleField::Metric => self.metric,
        }
    }

    fn set_field(&mut self, field: TupleField, msg: &'static str) {
        match field {
            TupleField::Service => self.service = Some(msg),
            TupleField::Metric => self.metric = Some(msg),
        }
    }
}

/// Validation outcome. Empty means the form may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    #[serde(rename = "groupname", skip_serializing_if = "Option::is_none")]
    pub group_owner: Option<&'static str>,
    /// Row errors keyed by visible row rank. Serialized as a sparse array
    /// with `null` for rows without errors.
    #[serde(
        rename = "view_services",
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_sparse"
    )]
    pub rows: BTreeMap<usize, RowErrors>,
}

fn serialize_sparse<S: Serializer>(
    rows: &BTreeMap<usize, RowErrors>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let len = rows.keys().next_back().map_or(0, |last| last + 1);
    let mut seq = serializer.serialize_seq(Some(len))?;
    for rank in 0..len {
        seq.serialize_element(&rows.get(&rank))?;
    }
    seq.end()
}

impl ErrorMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.group_owner.is_none() && self.rows.is_empty()
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&RowErrors> {
        self.rows.get(&index)
    }

    /// Number of individual messages, for summaries.
    #[must_use]
    pub fn count(&self) -> usize {
        let meta = usize::from(self.name.is_some()) + usize::from(self.group_owner.is_some());
        meta + self
            .rows
            .values()
            .map(|r| {
                usize::from(r.dup.is_some())
                    + usize::from(r.service.is_some())
                    + usize::from(r.metric.is_some())
            })
            .sum::<usize>()
    }
}

/// Validate the visible rows together with the required metadata.
#[must_use]
pub fn validate(
    visible: &[ServiceTuple],
    name: &str,
    group_owner: &str,
    vocabularies: &Vocabularies,
) -> ErrorMap {
    let mut errors = ErrorMap::default();

    if name.is_empty() {
        errors.name = Some(REQUIRED);
    }
    if group_owner.is_empty() {
        errors.group_owner = Some(REQUIRED);
    }

    for rank in duplicated_ranks(visible) {
        errors.rows.entry(rank).or_default().dup = Some(DUPLICATED);
    }

    for row in visible {
        let mut row_errors = RowErrors::default();
        for field in [TupleField::Service, TupleField::Metric] {
            let value = row.get(field);
            if value.is_empty() {
                if row.is_new {
                    row_errors.set_field(field, REQUIRED);
                }
            } else if (row.is_new || row.changed(field)) && !vocabularies.allows(field, value) {
                row_errors.set_field(
                    field,
                    match field {
                        TupleField::Service => UNKNOWN_SERVICE,
                        TupleField::Metric => UNKNOWN_METRIC,
                    },
                );
            }
        }
        if !row_errors.is_empty() {
            let slot = errors.rows.entry(row.index).or_default();
            slot.service = row_errors.service;
            slot.metric = row_errors.metric;
        }
    }

    errors
}

/// Ranks of rows sharing a pair with another row, where at least one of the
/// colliding rows is new or changed.
fn duplicated_ranks(visible: &[ServiceTuple]) -> BTreeSet<usize> {
    let mut groups: HashMap<(&str, &str), Vec<&ServiceTuple>> = HashMap::new();
    for row in visible {
        groups.entry(row.pair()).or_default().push(row);
    }
    groups
        .into_values()
        .filter(|rows| rows.len() >= 2 && rows.iter().any(|r| r.is_modified()))
        .flatten()
        .map(|r| r.index)
        .collect()
}

impl EditorState {
    /// Run the validator over this state's visible rows and metadata.
    #[must_use]
    pub fn validate(&self) -> ErrorMap {
        validate(
            &self.visible,
            &self.metadata.name,
            &self.metadata.group_owner,
            &self.vocabularies,
        )
    }
}
