//! Session details, profile metadata, and write-permission derivation.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Group memberships per resource type; only metric profiles matter here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroups {
    #[serde(default)]
    pub metricprofiles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub groups: UserGroups,
}

/// Answer of the session provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub active: bool,
    #[serde(default)]
    pub userdetails: UserDetails,
}

impl Session {
    /// Whether the user may save a profile owned by `group`.
    #[must_use]
    pub fn can_write_group(&self, group: &str) -> bool {
        self.userdetails.is_superuser
            || self
                .userdetails
                .groups
                .metricprofiles
                .iter()
                .any(|g| g == group)
    }

    /// Whether the user may create profiles at all.
    #[must_use]
    pub fn can_add(&self) -> bool {
        self.userdetails.is_superuser || !self.userdetails.groups.metricprofiles.is_empty()
    }

    #[must_use]
    pub fn permitted_groups(&self) -> BTreeSet<String> {
        self.userdetails
            .groups
            .metricprofiles
            .iter()
            .cloned()
            .collect()
    }
}

/// Name, description, and owning group of the profile under edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// Upstream identifier; empty for profiles not created yet.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "groupname", default)]
    pub group_owner: String,
    #[serde(default)]
    pub permitted_groups: BTreeSet<String>,
    #[serde(default)]
    pub has_write_permission: bool,
    /// Superusers may hand a profile to any group, not only their own.
    #[serde(default)]
    pub any_group: bool,
}

impl ProfileMetadata {
    /// Groups offered in the owner picker: the user's groups when they may
    /// write, otherwise only the current owner.
    #[must_use]
    pub fn group_choices(&self) -> Vec<String> {
        if self.has_write_permission {
            self.permitted_groups.iter().cloned().collect()
        } else {
            vec![self.group_owner.clone()]
        }
    }

    /// Whether `group` may be set as the owner. An empty value clears the
    /// picker and is left to the required-field check.
    #[must_use]
    pub fn may_own(&self, group: &str) -> bool {
        group.is_empty()
            || (self.has_write_permission && self.any_group)
            || self.group_choices().iter().any(|g| g == group)
    }
}
