//! Explicit editor state: the full row set, the visible (filtered) row set,
//! search boxes, profile metadata, and the allowed vocabularies.
//!
//! Every operation consumes the state and returns the next one, so a caller
//! can keep the previous value around for comparison or undo.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::MpeError;
use crate::profile::access::ProfileMetadata;
use crate::profile::tuple::{ServiceTuple, TupleField, reindex, sort_rows};

/// How a visible row finds its counterpart in the full set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPolicy {
    /// Counterparts are located by rank. While a filter is active the two
    /// sets rank rows independently, so edits may land on a different row.
    #[default]
    Positional,
    /// Both copies of a row share a hidden row id used for every lookup.
    Linked,
}

impl fmt::Display for IndexPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional => f.write_str("positional"),
            Self::Linked => f.write_str("linked"),
        }
    }
}

impl FromStr for IndexPolicy {
    type Err = MpeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(Self::Positional),
            "linked" => Ok(Self::Linked),
            other => Err(MpeError::ConfigParse {
                context: "index_policy",
                details: format!("expected positional or linked, got {other:?}"),
            }),
        }
    }
}

/// Allowed values for the two row fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabularies {
    pub service_flavours: BTreeSet<String>,
    pub metrics: BTreeSet<String>,
}

impl Vocabularies {
    #[must_use]
    pub fn new<S, M>(service_flavours: S, metrics: M) -> Self
    where
        S: IntoIterator<Item = String>,
        M: IntoIterator<Item = String>,
    {
        Self {
            service_flavours: service_flavours.into_iter().collect(),
            metrics: metrics.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn allows(&self, field: TupleField, value: &str) -> bool {
        match field {
            TupleField::Service => self.service_flavours.contains(value),
            TupleField::Metric => self.metrics.contains(value),
        }
    }
}

/// Contents of the two search boxes above the row table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBoxes {
    pub service: String,
    pub metric: String,
}

impl SearchBoxes {
    #[must_use]
    pub fn get(&self, field: TupleField) -> &str {
        match field {
            TupleField::Service => &self.service,
            TupleField::Metric => &self.metric,
        }
    }

    pub fn set(&mut self, field: TupleField, query: &str) {
        let slot = match field {
            TupleField::Service => &mut self.service,
            TupleField::Metric => &mut self.metric,
        };
        query.clone_into(slot);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.service.is_empty() && self.metric.is_empty()
    }
}

/// Metadata fields the form hands back with every row-level edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFields {
    pub name: String,
    pub description: String,
    #[serde(rename = "groupname")]
    pub group_owner: String,
}

impl From<&ProfileMetadata> for MetadataFields {
    fn from(meta: &ProfileMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            description: meta.description.clone(),
            group_owner: meta.group_owner.clone(),
        }
    }
}

/// One open edit session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    /// Every row of the profile.
    pub full: Vec<ServiceTuple>,
    /// Rows currently displayed after search filtering.
    pub visible: Vec<ServiceTuple>,
    pub search: SearchBoxes,
    pub metadata: ProfileMetadata,
    pub vocabularies: Vocabularies,
    pub policy: IndexPolicy,
    next_row_id: u64,
}

impl EditorState {
    /// State for an existing profile: rows sorted canonically and ranked.
    #[must_use]
    pub fn from_rows(
        rows: Vec<ServiceTuple>,
        metadata: ProfileMetadata,
        vocabularies: Vocabularies,
        policy: IndexPolicy,
    ) -> Self {
        let mut state = Self {
            full: rows,
            metadata,
            vocabularies,
            policy,
            ..Self::default()
        };
        sort_rows(&mut state.full);
        reindex(&mut state.full);
        for row in &mut state.full {
            state.next_row_id += 1;
            row.row_id = state.next_row_id;
        }
        state.visible = state.full.clone();
        state
    }

    /// State for a profile being created: a single empty new row.
    #[must_use]
    pub fn new_profile(
        metadata: ProfileMetadata,
        vocabularies: Vocabularies,
        policy: IndexPolicy,
    ) -> Self {
        Self::from_rows(vec![ServiceTuple::new_row(0)], metadata, vocabularies, policy)
    }

    /// Whether either search box narrows the visible set.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.search.is_empty()
    }

    /// Replace name, description, and owner with the values the form echoed.
    #[must_use]
    pub fn with_metadata(mut self, fields: MetadataFields) -> Self {
        self.metadata.name = fields.name;
        self.metadata.description = fields.description;
        self.metadata.group_owner = fields.group_owner;
        self
    }

    pub(crate) fn issue_row_id(&mut self) -> u64 {
        self.next_row_id += 1;
        self.next_row_id
    }
}
