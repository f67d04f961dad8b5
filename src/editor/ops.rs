//! Structural row edits applied to the full and visible sets in tandem:
//! insert-after, remove, and field selection.

use crate::editor::state::{EditorState, IndexPolicy, MetadataFields, SearchBoxes};
use crate::profile::tuple::{ServiceTuple, TupleField, reindex};

impl EditorState {
    /// Insert `row` at `at` (always "current row + 1" from the table).
    ///
    /// Without an active filter the row is spliced into the full set and the
    /// visible set is reset to it. With a filter the row is spliced into the
    /// visible set and appended to the end of the full set. Under the
    /// positional policy the appended copy keeps its visible rank, so full set
    /// ranks stay out of order until the next widening search.
    #[must_use]
    pub fn insert(mut self, mut row: ServiceTuple, at: usize, fields: MetadataFields) -> Self {
        row.is_new = true;
        row.row_id = self.issue_row_id();

        if self.is_filtered() {
            let at = at.min(self.visible.len());
            row.index = at;
            self.visible.insert(at, row.clone());
            reindex(&mut self.visible);
            self.full.push(row);
            if self.policy == IndexPolicy::Linked {
                reindex(&mut self.full);
            }
        } else {
            let at = at.min(self.full.len());
            self.full.insert(at, row);
            reindex(&mut self.full);
            self.visible = self.full.clone();
        }

        self.with_metadata(fields)
    }

    /// Remove the row matching `target`.
    ///
    /// When the last row of both sets is targeted it is reset to an empty row
    /// instead. A removal that would leave the filtered view empty clears the
    /// search boxes and shows the full set again.
    #[must_use]
    pub fn remove(mut self, target: &ServiceTuple, fields: MetadataFields) -> Self {
        if self.full.len() == 1 && self.visible.len() == 1 {
            self.full = vec![ServiceTuple {
                row_id: self.full[0].row_id,
                ..ServiceTuple::blank()
            }];
            self.visible = self.full.clone();
            return self.with_metadata(fields);
        }

        let duplicated = count_pair(&self.full, target) >= 2 || count_pair(&self.visible, target) >= 2;
        let visible_pos = locate(&self.visible, target, duplicated);
        let full_pos = match self.policy {
            IndexPolicy::Linked => self
                .full
                .iter()
                .position(|row| row.row_id == target.row_id)
                .or_else(|| locate(&self.full, target, duplicated)),
            IndexPolicy::Positional => locate(&self.full, target, duplicated),
        };

        if let Some(pos) = full_pos {
            self.full.remove(pos);
        }
        if let Some(pos) = visible_pos {
            self.visible.remove(pos);
        }
        reindex(&mut self.full);
        reindex(&mut self.visible);

        if self.visible.is_empty() && !self.full.is_empty() {
            self.search = SearchBoxes::default();
            self.visible = self.full.clone();
        }

        self.with_metadata(fields)
    }

    /// Set `field` of the row `target` points at, in both sets.
    ///
    /// Positional lookup goes by rank, except that a new row is first looked
    /// up as itself so edits to it never land on a loaded row.
    #[must_use]
    pub fn select(mut self, target: &ServiceTuple, field: TupleField, value: &str) -> Self {
        match self.policy {
            IndexPolicy::Positional => {
                let pos = self
                    .full
                    .iter()
                    .position(|row| target.is_new && row.is_new && row.row_id == target.row_id)
                    .or_else(|| {
                        self.full
                            .iter()
                            .position(|row| row.index == target.index && row.is_new)
                    })
                    .or_else(|| self.full.iter().position(|row| row.index == target.index));
                if let Some(pos) = pos {
                    self.full[pos].set(field, value);
                }
                for row in self.visible.iter_mut().filter(|row| row.index == target.index) {
                    row.set(field, value);
                }
            }
            IndexPolicy::Linked => {
                for row in self
                    .full
                    .iter_mut()
                    .chain(self.visible.iter_mut())
                    .filter(|row| row.row_id == target.row_id)
                {
                    row.set(field, value);
                }
            }
        }
        self
    }
}

fn count_pair(rows: &[ServiceTuple], target: &ServiceTuple) -> usize {
    rows.iter().filter(|row| row.same_pair(target)).count()
}

/// Position of the row to remove. Duplicated pairs are disambiguated by rank;
/// among several candidates a new row wins, then the first by position.
fn locate(rows: &[ServiceTuple], target: &ServiceTuple, duplicated: bool) -> Option<usize> {
    let pick = |candidates: Vec<usize>| {
        candidates
            .iter()
            .copied()
            .find(|&i| rows[i].is_new)
            .or_else(|| candidates.first().copied())
    };

    let by_pair = || {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| row.same_pair(target))
            .map(|(i, _)| i)
            .collect::<Vec<_>>()
    };

    if duplicated {
        let by_rank: Vec<usize> = by_pair()
            .into_iter()
            .filter(|&i| rows[i].index == target.index)
            .collect();
        if !by_rank.is_empty() {
            return pick(by_rank);
        }
    }
    pick(by_pair())
}
