//! Property-based tests for the editor core.
//!
//! Uses `proptest` to check that arbitrary row sets and edit sequences keep
//! ranks contiguous and never empty the full set. Also covers duplicate
//! flagging, insert followed by remove, and edits to rows added under a filter.

use proptest::prelude::*;

use super::model::{EditorMode, EditorModel, EditorMsg};
use super::state::{EditorState, IndexPolicy, MetadataFields, Vocabularies};
use super::update::update;
use super::validate::{DUPLICATED, validate};
use crate::profile::access::ProfileMetadata;
use crate::profile::tuple::{ServiceTuple, TupleField, reindex};

// ──────────────────── strategies ────────────────────

const SERVICES: &[&str] = &["ARC-CE", "SRM", "webdav", "srm"];
const METRICS: &[&str] = &["m1", "m2", "M1"];
const QUERIES: &[&str] = &["a", "s", "r", "w"];

fn arb_service() -> impl Strategy<Value = String> {
    prop::sample::select(SERVICES).prop_map(String::from)
}

fn arb_metric() -> impl Strategy<Value = String> {
    prop::sample::select(METRICS).prop_map(String::from)
}

fn arb_field() -> impl Strategy<Value = TupleField> {
    prop_oneof![Just(TupleField::Service), Just(TupleField::Metric)]
}

fn arb_row() -> impl Strategy<Value = ServiceTuple> {
    (arb_service(), arb_metric(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(service, metric, is_new, service_changed, metric_changed)| ServiceTuple {
            service,
            metric,
            is_new,
            service_changed,
            metric_changed,
            ..ServiceTuple::default()
        },
    )
}

fn arb_loaded_rows(max: usize) -> impl Strategy<Value = Vec<ServiceTuple>> {
    prop::collection::vec(
        (arb_service(), arb_metric()).prop_map(|(s, m)| ServiceTuple::new(s, m)),
        1..max,
    )
}

fn arb_policy() -> impl Strategy<Value = IndexPolicy> {
    prop_oneof![Just(IndexPolicy::Positional), Just(IndexPolicy::Linked)]
}

fn arb_msg() -> impl Strategy<Value = EditorMsg> {
    prop_oneof![
        (arb_field(), "[a-z]{0,3}").prop_map(|(field, query)| EditorMsg::Search { field, query }),
        (0usize..8).prop_map(|after_row| EditorMsg::Insert { after_row }),
        (0usize..8).prop_map(|row| EditorMsg::Remove { row }),
        (0usize..8, arb_field(), arb_service())
            .prop_map(|(row, field, value)| EditorMsg::Select { row, field, value }),
    ]
}

fn writable() -> ProfileMetadata {
    ProfileMetadata {
        name: "P".to_string(),
        group_owner: "G".to_string(),
        has_write_permission: true,
        ..ProfileMetadata::default()
    }
}

fn ranks(rows: &[ServiceTuple]) -> Vec<usize> {
    rows.iter().map(|r| r.index).collect()
}

fn sorted_pairs(rows: &[ServiceTuple]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = rows
        .iter()
        .map(|r| (r.service.clone(), r.metric.clone()))
        .collect();
    pairs.sort();
    pairs
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn reindex_yields_contiguous_ranks(mut rows in prop::collection::vec(arb_row(), 0..20)) {
        for (i, row) in rows.iter_mut().enumerate() {
            row.index = i * 7 + 3;
        }
        reindex(&mut rows);
        prop_assert_eq!(ranks(&rows), (0..rows.len()).collect::<Vec<_>>());
    }

    #[test]
    fn edit_sequences_keep_sets_ranked_and_non_empty(
        rows in arb_loaded_rows(8),
        policy in arb_policy(),
        msgs in prop::collection::vec(arb_msg(), 0..30),
    ) {
        let state = EditorState::from_rows(rows, writable(), Vocabularies::default(), policy);
        let mut model = EditorModel::new(EditorMode::Change, state);
        for msg in msgs {
            update(&mut model, msg);
            prop_assert!(!model.state.full.is_empty());
            // Positional rows added under a filter keep their visible rank
            // until the filter is widened.
            if policy == IndexPolicy::Linked || !model.state.is_filtered() {
                prop_assert_eq!(
                    ranks(&model.state.full),
                    (0..model.state.full.len()).collect::<Vec<_>>()
                );
            }
            prop_assert_eq!(
                ranks(&model.state.visible),
                (0..model.state.visible.len()).collect::<Vec<_>>()
            );
            prop_assert!(model.state.visible.len() <= model.state.full.len());
        }
    }

    #[test]
    fn duplicates_flagged_iff_touched(mut rows in prop::collection::vec(arb_row(), 1..12)) {
        reindex(&mut rows);
        let errors = validate(&rows, "P", "G", &Vocabularies::default());
        for row in &rows {
            let group: Vec<&ServiceTuple> = rows.iter().filter(|r| r.same_pair(row)).collect();
            let expected = group.len() >= 2 && group.iter().any(|r| r.is_modified());
            let flagged = errors.row(row.index).and_then(|e| e.dup) == Some(DUPLICATED);
            prop_assert_eq!(flagged, expected);
        }
    }

    #[test]
    fn removing_sole_row_leaves_one_blank_row(
        service in arb_service(),
        metric in arb_metric(),
        policy in arb_policy(),
    ) {
        let state = EditorState::from_rows(
            vec![ServiceTuple::new(service, metric)],
            writable(),
            Vocabularies::default(),
            policy,
        );
        let target = state.visible[0].clone();
        let state = state.remove(&target, MetadataFields::default());
        prop_assert_eq!(state.full.len(), 1);
        prop_assert_eq!(state.visible.len(), 1);
        prop_assert!(state.full[0].is_blank());
        prop_assert_eq!(state.full[0].index, 0);
    }

    #[test]
    fn insert_then_remove_restores_pairs(
        rows in arb_loaded_rows(8),
        policy in arb_policy(),
        at in 0usize..10,
        service in arb_service(),
        metric in arb_metric(),
    ) {
        let state = EditorState::from_rows(rows, writable(), Vocabularies::default(), policy);
        let before = sorted_pairs(&state.full);

        let row = ServiceTuple {
            service,
            metric,
            ..ServiceTuple::new_row(at)
        };
        let state = state.insert(row, at, MetadataFields::default());
        let inserted = state
            .visible
            .iter()
            .find(|r| r.is_new)
            .cloned();
        prop_assert!(inserted.is_some());
        if let Some(target) = inserted {
            let state = state.remove(&target, MetadataFields::default());
            prop_assert_eq!(sorted_pairs(&state.full), before);
            prop_assert!(state.full.iter().all(|r| !r.is_new));
        }
    }

    #[test]
    fn filtered_insert_then_select_edits_only_the_new_row(
        rows in arb_loaded_rows(8),
        policy in arb_policy(),
        query in prop::sample::select(QUERIES),
        after in 0usize..8,
        field in arb_field(),
        value in arb_service(),
    ) {
        let state = EditorState::from_rows(rows, writable(), Vocabularies::default(), policy)
            .search(TupleField::Service, query);
        prop_assume!(!state.visible.is_empty());
        let loaded = state.full.clone();

        let at = after.min(state.visible.len());
        let state = state.insert(ServiceTuple::new_row(at), at, MetadataFields::default());
        let target = state.visible[at].clone();
        prop_assert!(target.is_new);
        let state = state.select(&target, field, &value);

        let (old, new): (Vec<&ServiceTuple>, Vec<&ServiceTuple>) =
            state.full.iter().partition(|r| !r.is_new);
        prop_assert_eq!(old.len(), loaded.len());
        for (now, before) in old.iter().zip(&loaded) {
            prop_assert_eq!(&now.service, &before.service);
            prop_assert_eq!(&now.metric, &before.metric);
            prop_assert!(!now.is_modified());
        }
        prop_assert_eq!(new.len(), 1);
        prop_assert_eq!(new[0].get(field), value.as_str());
    }
}
