//! One (service flavour, metric) row of a profile, plus the positional
//! bookkeeping shared by the full and visible row sets.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::MpeError;

/// Editable field of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TupleField {
    Service,
    Metric,
}

impl TupleField {
    /// The other field (search boxes come in pairs).
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Service => Self::Metric,
            Self::Metric => Self::Service,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Metric => "metric",
        }
    }
}

impl fmt::Display for TupleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TupleField {
    type Err = MpeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" | "serviceflavour" => Ok(Self::Service),
            "metric" => Ok(Self::Metric),
            other => Err(MpeError::Runtime {
                details: format!("unknown row field {other:?} (expected service or metric)"),
            }),
        }
    }
}

/// A (service, metric) row.
///
/// `index` is a positional rank inside whichever set holds the row, not an
/// identity. `row_id` is never serialized; it links the visible copy of a row
/// to its full-set counterpart when the editor runs with linked indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTuple {
    pub index: usize,
    pub service: String,
    pub metric: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub service_changed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub metric_changed: bool,
    #[serde(skip)]
    pub(crate) row_id: u64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl ServiceTuple {
    /// A row loaded from an existing profile.
    #[must_use]
    pub fn new(service: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            metric: metric.into(),
            ..Self::default()
        }
    }

    /// Empty row inserted during the session.
    #[must_use]
    pub fn new_row(index: usize) -> Self {
        Self {
            index,
            is_new: true,
            ..Self::default()
        }
    }

    /// Empty row left behind when the last remaining row is removed.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn get(&self, field: TupleField) -> &str {
        match field {
            TupleField::Service => &self.service,
            TupleField::Metric => &self.metric,
        }
    }

    /// Overwrite `field` and mark it as diverging from the loaded value.
    pub fn set(&mut self, field: TupleField, value: &str) {
        match field {
            TupleField::Service => {
                value.clone_into(&mut self.service);
                self.service_changed = true;
            }
            TupleField::Metric => {
                value.clone_into(&mut self.metric);
                self.metric_changed = true;
            }
        }
    }

    #[must_use]
    pub const fn changed(&self, field: TupleField) -> bool {
        match field {
            TupleField::Service => self.service_changed,
            TupleField::Metric => self.metric_changed,
        }
    }

    /// New or touched in this session.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.is_new || self.service_changed || self.metric_changed
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.service.is_empty() && self.metric.is_empty()
    }

    #[must_use]
    pub fn same_pair(&self, other: &Self) -> bool {
        self.service == other.service && self.metric == other.metric
    }

    #[must_use]
    pub fn pair(&self) -> (&str, &str) {
        (&self.service, &self.metric)
    }
}

impl fmt::Display for ServiceTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service: {}, metric: {}", self.service, self.metric)
    }
}

/// Reassign contiguous zero-based ranks in order.
pub fn reindex(rows: &mut [ServiceTuple]) {
    reindex_from(rows, 0);
}

/// Reassign contiguous ranks starting at `start`.
pub fn reindex_from(rows: &mut [ServiceTuple], start: usize) {
    for (offset, row) in rows.iter_mut().enumerate() {
        row.index = start + offset;
    }
}

/// Canonical order: service, then metric, both case-insensitive.
#[must_use]
pub fn compare(a: &ServiceTuple, b: &ServiceTuple) -> Ordering {
    a.service
        .to_lowercase()
        .cmp(&b.service.to_lowercase())
        .then_with(|| a.metric.to_lowercase().cmp(&b.metric.to_lowercase()))
}

/// Stable sort by [`compare`].
pub fn sort_rows(rows: &mut [ServiceTuple]) {
    rows.sort_by(compare);
}

/// Case-insensitive substring match.
#[must_use]
pub fn matches_query(value: &str, query: &str) -> bool {
    value.to_lowercase().contains(&query.to_lowercase())
}
