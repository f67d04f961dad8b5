//! Grouped wire shape of a profile and the flatten / group boundary transforms.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::profile::tuple::ServiceTuple;

/// One service flavour and all metrics attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service: String,
    #[serde(default)]
    pub metrics: Vec<String>,
}

/// A metric profile as returned by the upstream Web API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricProfile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

/// Payload sent to the upstream Web API. `id` is absent on add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub services: Vec<ServiceEntry>,
}

/// Flat (service, metric) pair as stored by the internal store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatPair {
    pub service: String,
    pub metric: String,
}

impl From<&ServiceTuple> for FlatPair {
    fn from(row: &ServiceTuple) -> Self {
        Self {
            service: row.service.clone(),
            metric: row.metric.clone(),
        }
    }
}

/// Record written to the internal store after the upstream accepted a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalProfileRecord {
    pub apiid: String,
    pub name: String,
    pub description: String,
    pub groupname: String,
    pub services: Vec<FlatPair>,
}

/// Expand grouped services to one row per (service, metric), ranked in order.
#[must_use]
pub fn flatten(services: &[ServiceEntry]) -> Vec<ServiceTuple> {
    services
        .iter()
        .flat_map(|entry| {
            entry
                .metrics
                .iter()
                .map(move |metric| ServiceTuple::new(entry.service.clone(), metric.clone()))
        })
        .enumerate()
        .map(|(index, row)| row.with_index(index))
        .collect()
}

/// Collapse rows into one record per service, keeping first-seen order of
/// services and of metrics within a service.
///
/// Consecutive rows of a service form one record; a service that shows up again
/// later (rows appended while a filter was active) is folded into its earlier
/// record instead of producing a second one.
#[must_use]
pub fn group_by_service<'a, I>(rows: I) -> Vec<ServiceEntry>
where
    I: IntoIterator<Item = &'a ServiceTuple>,
{
    let mut grouped: Vec<ServiceEntry> = Vec::new();
    for row in rows {
        match grouped.iter_mut().find(|e| e.service == row.service) {
            Some(entry) => entry.metrics.push(row.metric.clone()),
            None => grouped.push(ServiceEntry {
                service: row.service.clone(),
                metrics: vec![row.metric.clone()],
            }),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(service: &str, metrics: &[&str]) -> ServiceEntry {
        ServiceEntry {
            service: service.to_string(),
            metrics: metrics.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    #[test]
    fn flatten_ranks_rows_in_order() {
        let rows = flatten(&[entry("S", &["m1", "m2"]), entry("T", &["m3"])]);
        let got: Vec<(usize, &str, &str)> = rows
            .iter()
            .map(|r| (r.index, r.service.as_str(), r.metric.as_str()))
            .collect();
        assert_eq!(got, vec![(0, "S", "m1"), (1, "S", "m2"), (2, "T", "m3")]);
        assert!(rows.iter().all(|r| !r.is_modified()));
    }

    #[test]
    fn flatten_skips_services_without_metrics() {
        let rows = flatten(&[entry("S", &[]), entry("T", &["m"])]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 0);
    }

    #[test]
    fn grouping_collapses_consecutive_rows() {
        let rows = vec![
            ServiceTuple::new("S", "m1"),
            ServiceTuple::new("S", "m2"),
            ServiceTuple::new("T", "m3"),
        ];
        assert_eq!(
            group_by_service(&rows),
            vec![entry("S", &["m1", "m2"]), entry("T", &["m3"])]
        );
    }

    #[test]
    fn grouping_folds_late_rows_into_first_record() {
        let rows = vec![
            ServiceTuple::new("S", "m1"),
            ServiceTuple::new("T", "m3"),
            ServiceTuple::new("S", "m9"),
        ];
        assert_eq!(
            group_by_service(&rows),
            vec![entry("S", &["m1", "m9"]), entry("T", &["m3"])]
        );
    }

    #[test]
    fn grouping_inverts_flatten() {
        let services = vec![entry("A", &["x", "y"]), entry("B", &["z"])];
        assert_eq!(group_by_service(&flatten(&services)), services);
    }

    #[test]
    fn body_omits_missing_id() {
        let body = ProfileBody {
            id: None,
            name: "P".to_string(),
            description: String::new(),
            services: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("id").is_none());
    }

    #[test]
    fn profile_parses_with_sparse_fields() {
        let profile: MetricProfile = serde_json::from_str(
            r#"{"name":"ARGO","services":[{"service":"SRM","metrics":["org.srm.Get"]}]}"#,
        )
        .unwrap();
        assert_eq!(profile.id, "");
        assert_eq!(profile.services[0].metrics, vec!["org.srm.Get"]);
    }
}
