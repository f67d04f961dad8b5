//! Search-box filtering of the visible row set.

use crate::editor::state::EditorState;
use crate::profile::tuple::{ServiceTuple, TupleField, matches_query, reindex, sort_rows};

impl EditorState {
    /// Apply a new `query` typed into the `field` search box.
    ///
    /// A query shorter than the box's previous value re-filters from the full
    /// set. Any other non-empty query narrows the current visible set, so the
    /// result depends on keystroke history: replacing one character with
    /// another keeps filtering what is already shown. The other box's query is
    /// always applied on top. The full set is re-sorted and re-ranked only on
    /// the widening path, which is what reads from it.
    #[must_use]
    pub fn search(mut self, field: TupleField, query: &str) -> Self {
        let previous_len = self.search.get(field).chars().count();
        let alt_field = field.other();
        let alt_query = self.search.get(alt_field).to_owned();

        let hit = |row: &ServiceTuple| matches_query(row.get(field), query);
        let mut filtered: Vec<ServiceTuple> = if query.chars().count() < previous_len {
            sort_rows(&mut self.full);
            reindex(&mut self.full);
            self.full.iter().filter(|row| hit(row)).cloned().collect()
        } else if !query.is_empty() {
            self.visible.into_iter().filter(|row| hit(row)).collect()
        } else {
            self.full.clone()
        };

        if !alt_query.is_empty() {
            filtered.retain(|row| matches_query(row.get(alt_field), &alt_query));
        }

        sort_rows(&mut filtered);
        reindex(&mut filtered);

        self.visible = filtered;
        self.search.set(field, query);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::state::{EditorState, IndexPolicy, Vocabularies};
    use crate::profile::access::ProfileMetadata;
    use crate::profile::tuple::{ServiceTuple, TupleField};

    fn state(rows: &[(&str, &str)]) -> EditorState {
        EditorState::from_rows(
            rows.iter().map(|(s, m)| ServiceTuple::new(*s, *m)).collect(),
            ProfileMetadata::default(),
            Vocabularies::default(),
            IndexPolicy::Positional,
        )
    }

    fn visible(state: &EditorState) -> Vec<(usize, &str, &str)> {
        state
            .visible
            .iter()
            .map(|r| (r.index, r.service.as_str(), r.metric.as_str()))
            .collect()
    }

    fn sample() -> EditorState {
        state(&[
            ("ARC-CE", "org.nordugrid.ARC-CE-ARIS"),
            ("ARC-CE", "org.nordugrid.ARC-CE-IGTF"),
            ("SRM", "eu.egi.SRM-All"),
            ("webdav", "ch.cern.WebDAV"),
        ])
    }

    #[test]
    fn narrowing_is_case_insensitive() {
        let s = sample().search(TupleField::Service, "arc");
        assert_eq!(
            visible(&s),
            vec![
                (0, "ARC-CE", "org.nordugrid.ARC-CE-ARIS"),
                (1, "ARC-CE", "org.nordugrid.ARC-CE-IGTF"),
            ]
        );
        assert_eq!(s.search.service, "arc");
        assert_eq!(s.full.len(), 4);
    }

    #[test]
    fn deleting_characters_widens_from_full_set() {
        let s = sample()
            .search(TupleField::Service, "s")
            .search(TupleField::Service, "sr")
            .search(TupleField::Service, "s");
        let services: Vec<&str> = s.visible.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(services, vec!["SRM"]);

        let cleared = s.search(TupleField::Service, "");
        assert_eq!(cleared.visible.len(), 4);
        assert!(!cleared.is_filtered());
    }

    #[test]
    fn same_length_replacement_keeps_narrowing() {
        // "srm" -> "web" has equal length, so it filters the already narrowed
        // view and comes back empty even though webdav exists.
        let s = sample()
            .search(TupleField::Service, "srm")
            .search(TupleField::Service, "web");
        assert!(s.visible.is_empty());
    }

    #[test]
    fn both_boxes_combine() {
        let s = sample()
            .search(TupleField::Metric, "igtf")
            .search(TupleField::Service, "arc");
        assert_eq!(
            visible(&s),
            vec![(0, "ARC-CE", "org.nordugrid.ARC-CE-IGTF")]
        );

        let widened = s.search(TupleField::Service, "");
        assert_eq!(
            visible(&widened),
            vec![(0, "ARC-CE", "org.nordugrid.ARC-CE-IGTF")]
        );
    }

    #[test]
    fn full_set_is_resorted_only_when_widening() {
        let mut s = sample();
        s.full.push(ServiceTuple::new_row(1));

        let s = s.search(TupleField::Metric, "x");
        assert!(s.full[4].is_blank());
        assert_eq!(s.full[4].index, 1);

        let s = s.search(TupleField::Metric, "");
        assert!(s.full[0].is_blank());
        let ranks: Vec<usize> = s.full.iter().map(|r| r.index).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn no_match_yields_empty_view() {
        let s = sample().search(TupleField::Metric, "nothing-like-this");
        assert!(s.visible.is_empty());
        assert_eq!(s.full.len(), 4);
    }
}
