//! Keyed joins between typed tables.
//!
//! Every join in the pipeline has left-join semantics: rows from the left
//! table are never invented, and rows whose key finds no partner end up in
//! the unmatched partition instead of disappearing silently. Callers decide
//! whether to keep them (`into_left_rows`) or drop them
//! ([`JoinOutcome::into_matched`]), and the row-count delta is always
//! logged as a [`JoinKeyMismatch`].

use std::collections::BTreeMap;
use std::fmt;

/// Row-count delta of a join whose keys did not all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeyMismatch {
    /// Human-readable name of the join.
    pub join: String,
    /// Left rows without a partner.
    pub unmatched: usize,
    /// Left rows in total.
    pub total: usize,
}

impl fmt::Display for JoinKeyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} of {} rows had no matching key",
            self.join, self.unmatched, self.total
        )
    }
}

/// Result of a [`left_join`]: matched pairs and the unmatched left rows.
#[derive(Debug)]
pub struct JoinOutcome<L, R> {
    /// Left rows paired with every right row sharing their key.
    pub matched: Vec<(L, R)>,
    /// Left rows whose key matched nothing (or was absent).
    pub unmatched: Vec<L>,
    // Position of each output row in the original left order.
    matched_pos: Vec<usize>,
    unmatched_pos: Vec<usize>,
    left_rows: usize,
}

impl<L, R> JoinOutcome<L, R> {
    /// Number of left rows that went into the join.
    #[must_use]
    pub const fn left_rows(&self) -> usize {
        self.left_rows
    }

    /// Describes the unmatched partition, if there is one.
    #[must_use]
    pub fn mismatch(&self, join: &str) -> Option<JoinKeyMismatch> {
        if self.unmatched.is_empty() {
            return None;
        }
        Some(JoinKeyMismatch {
            join: join.to_string(),
            unmatched: self.unmatched.len(),
            total: self.left_rows,
        })
    }

    /// Logs the unmatched partition (if any) and returns `self`.
    #[must_use]
    pub fn log_mismatch(self, join: &str) -> Self {
        if let Some(mismatch) = self.mismatch(join) {
            log::warn!("JoinKeyMismatch: {mismatch}");
        } else {
            log::debug!("{join}: all {} rows matched", self.left_rows);
        }
        self
    }

    /// Keeps only matched pairs (inner-join view), in left-table order.
    #[must_use]
    pub fn into_matched(self) -> Vec<(L, R)> {
        self.matched
    }

    /// Keeps every left row, pairing unmatched ones with `None`.
    ///
    /// Output order follows the left table.
    #[must_use]
    pub fn into_left_rows(self) -> Vec<(L, Option<R>)> {
        let mut rows: Vec<(usize, L, Option<R>)> =
            Vec::with_capacity(self.matched.len() + self.unmatched.len());
        rows.extend(
            self.matched_pos
                .into_iter()
                .zip(self.matched)
                .map(|(pos, (l, r))| (pos, l, Some(r))),
        );
        rows.extend(
            self.unmatched_pos
                .into_iter()
                .zip(self.unmatched)
                .map(|(pos, l)| (pos, l, None)),
        );
        rows.sort_by_key(|(pos, _, _)| *pos);
        rows.into_iter().map(|(_, l, r)| (l, r)).collect()
    }
}

/// Joins `left` to `right` on the keys produced by the two key functions.
///
/// A left row with key `None` never matches. A left row matching several
/// right rows appears once per match, as a relational join would produce.
pub fn left_join<L, R, K, FL, FR>(
    left: Vec<L>,
    right: &[R],
    left_key: FL,
    right_key: FR,
) -> JoinOutcome<L, R>
where
    L: Clone,
    R: Clone,
    K: Ord,
    FL: Fn(&L) -> Option<K>,
    FR: Fn(&R) -> K,
{
    let mut index: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (i, row) in right.iter().enumerate() {
        index.entry(right_key(row)).or_default().push(i);
    }

    let left_rows = left.len();
    let mut matched = Vec::new();
    let mut matched_pos = Vec::new();
    let mut unmatched = Vec::new();
    let mut unmatched_pos = Vec::new();

    for (pos, row) in left.into_iter().enumerate() {
        let partners = left_key(&row).and_then(|key| index.get(&key));
        match partners {
            Some(partners) => {
                for &i in partners {
                    matched.push((row.clone(), right[i].clone()));
                    matched_pos.push(pos);
                }
            }
            None => {
                unmatched.push(row);
                unmatched_pos.push(pos);
            }
        }
    }

    JoinOutcome {
        matched,
        unmatched,
        matched_pos,
        unmatched_pos,
        left_rows,
    }
}
