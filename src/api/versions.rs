//! Version history of a profile: listing, single-version details, and a
//! field-by-field comparison of two versions.

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::backend::InternalStore;
use crate::core::config::ApiConfig;
use crate::core::errors::{MpeError, Result};
use crate::profile::wire::FlatPair;

/// Snapshot of the profile fields stored with each version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFields {
    pub name: String,
    #[serde(default)]
    pub groupname: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metricinstances: Vec<FlatPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileVersion {
    /// Version identifier; stores emit either strings or numbers.
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub comment: String,
    pub fields: VersionFields,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// All stored versions of the profile `name`, as the store orders them.
pub fn list_versions<S>(store: &S, api: &ApiConfig, name: &str) -> Result<Vec<ProfileVersion>>
where
    S: InternalStore + ?Sized,
{
    let raw = store.fetch_data(&api.profile_versions(name))?;
    Ok(serde_json::from_value(raw)?)
}

/// One version of the profile `name`.
pub fn version_details<S>(
    store: &S,
    api: &ApiConfig,
    name: &str,
    version: &str,
) -> Result<ProfileVersion>
where
    S: InternalStore + ?Sized,
{
    find_version(&list_versions(store, api, name)?, name, version)
}

fn find_version(versions: &[ProfileVersion], name: &str, version: &str) -> Result<ProfileVersion> {
    versions
        .iter()
        .find(|v| v.version == version)
        .cloned()
        .ok_or_else(|| MpeError::NotFound {
            what: "profile version",
            name: format!("{name}@{version}"),
        })
}

// ──────────────────── comparison ────────────────────

/// A scalar field whose value differs between the two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "line", rename_all = "lowercase")]
pub enum DiffLine {
    Same(String),
    Removed(String),
    Added(String),
}

impl DiffLine {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Same(s) | Self::Removed(s) | Self::Added(s) => s,
        }
    }
}

/// Differences between `version1` (new side) and `version2` (old side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionComparison {
    pub name: String,
    pub version1: String,
    pub version2: String,
    pub fields: Vec<FieldDiff>,
    /// Line diff of the metric instances; absent when both lists are equal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_instances: Option<Vec<DiffLine>>,
}

impl VersionComparison {
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.fields.is_empty() && self.metric_instances.is_none()
    }
}

pub fn compare_versions<S>(
    store: &S,
    api: &ApiConfig,
    name: &str,
    version1: &str,
    version2: &str,
) -> Result<VersionComparison>
where
    S: InternalStore + ?Sized,
{
    let versions = list_versions(store, api, name)?;
    let new = find_version(&versions, name, version1)?;
    let old = find_version(&versions, name, version2)?;
    Ok(compare(name, &new, &old))
}

fn compare(name: &str, new: &ProfileVersion, old: &ProfileVersion) -> VersionComparison {
    let mut fields = Vec::new();
    for (field, new_value, old_value) in [
        ("name", &new.fields.name, &old.fields.name),
        ("description", &new.fields.description, &old.fields.description),
        ("groupname", &new.fields.groupname, &old.fields.groupname),
    ] {
        if new_value != old_value {
            fields.push(FieldDiff {
                field,
                old: old_value.clone(),
                new: new_value.clone(),
            });
        }
    }

    let metric_instances = (new.fields.metricinstances != old.fields.metricinstances).then(|| {
        diff_lines(
            &instance_lines(&old.fields.metricinstances),
            &instance_lines(&new.fields.metricinstances),
        )
    });

    VersionComparison {
        name: name.to_string(),
        version1: new.version.clone(),
        version2: old.version.clone(),
        fields,
        metric_instances,
    }
}

fn instance_lines(instances: &[FlatPair]) -> Vec<String> {
    instances
        .iter()
        .map(|i| format!("service: {}, metric: {}", i.service, i.metric))
        .collect()
}

/// Largest LCS table `diff_lines` builds for the differing middle of two
/// versions. Past this the middle is reported as removed then added.
pub const MAX_DIFF_CELLS: usize = 4_000_000;

/// Longest-common-subsequence line diff from `old` to `new`.
///
/// The shared prefix and suffix are matched first, so the table only covers
/// the lines in between: `(n' + 1) * (m' + 1)` cells, capped at
/// [`MAX_DIFF_CELLS`].
#[must_use]
pub fn diff_lines(old: &[String], new: &[String]) -> Vec<DiffLine> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = Vec::with_capacity(old.len().max(new.len()));
    out.extend(old[..prefix].iter().cloned().map(DiffLine::Same));
    diff_middle(
        &old[prefix..old.len() - suffix],
        &new[prefix..new.len() - suffix],
        &mut out,
    );
    out.extend(old[old.len() - suffix..].iter().cloned().map(DiffLine::Same));
    out
}

fn diff_middle(old: &[String], new: &[String], out: &mut Vec<DiffLine>) {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;
    let cells = (n + 1).saturating_mul(width);
    if n == 0 || m == 0 || cells > MAX_DIFF_CELLS {
        out.extend(old.iter().cloned().map(DiffLine::Removed));
        out.extend(new.iter().cloned().map(DiffLine::Added));
        return;
    }

    // lcs[i * width + j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![0u32; cells];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(DiffLine::Same(old[i].clone()));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            out.push(DiffLine::Removed(old[i].clone()));
            i += 1;
        } else {
            out.push(DiffLine::Added(new[j].clone()));
            j += 1;
        }
    }
    out.extend(old[i..].iter().cloned().map(DiffLine::Removed));
    out.extend(new[j..].iter().cloned().map(DiffLine::Added));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn pair(service: &str, metric: &str) -> FlatPair {
        FlatPair {
            service: service.to_string(),
            metric: metric.to_string(),
        }
    }

    fn version(v: &str, name: &str, instances: Vec<FlatPair>) -> ProfileVersion {
        ProfileVersion {
            version: v.to_string(),
            date_created: "2026-01-01 10:00:00".to_string(),
            user: "poem".to_string(),
            comment: String::new(),
            fields: VersionFields {
                name: name.to_string(),
                groupname: "EGI".to_string(),
                description: String::new(),
                metricinstances: instances,
            },
        }
    }

    #[test]
    fn diff_marks_changes_around_common_lines() {
        let diff = diff_lines(&lines(&["a", "b", "c"]), &lines(&["a", "x", "c", "d"]));
        assert_eq!(
            diff,
            vec![
                DiffLine::Same("a".to_string()),
                DiffLine::Removed("b".to_string()),
                DiffLine::Added("x".to_string()),
                DiffLine::Same("c".to_string()),
                DiffLine::Added("d".to_string()),
            ]
        );
    }

    #[test]
    fn long_versions_only_tabulate_the_changed_middle() {
        let old: Vec<String> = (0..5000).map(|i| format!("line {i}")).collect();
        let mut new = old.clone();
        new[2500] = "changed".to_string();

        let diff = diff_lines(&old, &new);
        assert_eq!(diff.len(), 5001);
        assert_eq!(diff[2500], DiffLine::Removed("line 2500".to_string()));
        assert_eq!(diff[2501], DiffLine::Added("changed".to_string()));
        assert_eq!(diff[5000], DiffLine::Same("line 4999".to_string()));
    }

    #[test]
    fn oversized_middle_is_reported_as_replaced() {
        let old: Vec<String> = (0..2500).map(|i| format!("old {i}")).collect();
        let new: Vec<String> = (0..2500).map(|i| format!("new {i}")).collect();

        let diff = diff_lines(&old, &new);
        assert_eq!(diff.len(), 5000);
        assert!(diff[..2500].iter().all(|l| matches!(l, DiffLine::Removed(_))));
        assert!(diff[2500..].iter().all(|l| matches!(l, DiffLine::Added(_))));
    }

    #[test]
    fn diff_of_empty_sides() {
        assert!(diff_lines(&[], &[]).is_empty());
        assert_eq!(
            diff_lines(&lines(&["a"]), &[]),
            vec![DiffLine::Removed("a".to_string())]
        );
    }

    #[test]
    fn compare_reports_changed_fields_and_instances() {
        let old = version("1", "P", vec![pair("SRM", "m1")]);
        let mut new = version("2", "P2", vec![pair("SRM", "m1"), pair("webdav", "m2")]);
        new.fields.groupname = "ARGO".to_string();

        let cmp = compare("P", &new, &old);
        let fields: Vec<&str> = cmp.fields.iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["name", "groupname"]);
        assert_eq!(cmp.fields[0].old, "P");
        assert_eq!(cmp.fields[0].new, "P2");
        assert_eq!(
            cmp.metric_instances,
            Some(vec![
                DiffLine::Same("service: SRM, metric: m1".to_string()),
                DiffLine::Added("service: webdav, metric: m2".to_string()),
            ])
        );
    }

    #[test]
    fn identical_versions_compare_empty() {
        let a = version("1", "P", vec![pair("SRM", "m1")]);
        let b = version("2", "P", vec![pair("SRM", "m1")]);
        assert!(compare("P", &a, &b).is_identical());
    }

    #[test]
    fn numeric_version_ids_parse() {
        let v: ProfileVersion = serde_json::from_value(serde_json::json!({
            "version": 3,
            "date_created": "2026-01-01",
            "fields": {"name": "P"}
        }))
        .unwrap();
        assert_eq!(v.version, "3");
        assert!(v.fields.metricinstances.is_empty());
    }
}
