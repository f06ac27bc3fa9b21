//! Static interval index with batched inserts.
//!
//! Entries are kept sorted by lower bound and viewed as an implicit balanced
//! binary tree over that array (the middle element of each index range is the
//! subtree root). Each slot carries the maximum upper bound of its subtree, so
//! an overlap query prunes whole subtrees and costs O(log n + k).
//!
//! Inserts land in a small unsorted staging buffer that queries scan linearly.
//! Once the buffer outgrows roughly the square root of the sorted part it is
//! merged in and the subtree maxima are recomputed, so n inserts cost
//! O(n sqrt n) instead of O(n^2).

use std::collections::{HashMap, HashSet};

use crate::storage::ContainerId;

/// Upper bound used for open-ended intervals.
pub(crate) const UNBOUNDED: i64 = i64::MAX;

const MIN_STAGED: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    lower: i64,
    upper: i64,
    id: ContainerId,
}

impl Entry {
    fn key(&self) -> (i64, &ContainerId) {
        (self.lower, &self.id)
    }

    fn overlaps(&self, lower: i64, upper: i64) -> bool {
        self.lower < upper && self.upper > lower
    }
}

/// Half-open `[lower, upper)` intervals over day numbers, keyed by partition.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    entries: Vec<Entry>,
    subtree_max: Vec<i64>,
    staged: Vec<Entry>,
    ids: HashSet<ContainerId>,
}

impl IntervalIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-build from `(id, lower, upper)` triples. A repeated id keeps its
    /// last interval.
    pub fn from_entries(items: impl IntoIterator<Item = (ContainerId, i64, i64)>) -> Self {
        let latest: HashMap<ContainerId, (i64, i64)> = items
            .into_iter()
            .map(|(id, lower, upper)| (id, (lower, upper)))
            .collect();
        let ids = latest.keys().cloned().collect();
        let mut entries: Vec<Entry> = latest
            .into_iter()
            .map(|(id, (lower, upper))| Entry { lower, upper, id })
            .collect();
        entries.sort_by(|a, b| a.key().cmp(&b.key()));
        let mut index = Self {
            entries,
            subtree_max: Vec::new(),
            staged: Vec::new(),
            ids,
        };
        index.recompute();
        index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Insert one interval; an existing entry for `id` is replaced.
    pub fn insert(&mut self, id: ContainerId, lower: i64, upper: i64) {
        if self.ids.contains(&id) {
            self.staged.retain(|e| e.id != id);
            let before = self.entries.len();
            self.entries.retain(|e| e.id != id);
            if self.entries.len() != before {
                self.recompute();
            }
        }
        self.ids.insert(id.clone());
        self.staged.push(Entry { lower, upper, id });
        if self.staged.len() > staging_limit(self.entries.len()) {
            self.merge_staged();
        }
    }

    /// True if `id` has an entry.
    #[must_use]
    pub fn contains(&self, id: &ContainerId) -> bool {
        self.ids.contains(id)
    }

    /// Ids of every interval overlapping `[lower, upper)`, ordered by lower bound.
    #[must_use]
    pub fn overlapping(&self, lower: i64, upper: i64) -> Vec<ContainerId> {
        let mut hits = Vec::new();
        self.visit(0, self.entries.len(), lower, upper, &mut hits);
        let mut found: Vec<&Entry> = hits.into_iter().map(|i| &self.entries[i]).collect();
        found.extend(self.staged.iter().filter(|e| e.overlaps(lower, upper)));
        found.sort_by(|a, b| a.key().cmp(&b.key()));
        found.into_iter().map(|e| e.id.clone()).collect()
    }

    fn visit(&self, from: usize, to: usize, lower: i64, upper: i64, hits: &mut Vec<usize>) {
        if from >= to {
            return;
        }
        let mid = from + (to - from) / 2;
        if self.subtree_max[mid] <= lower {
            return;
        }
        self.visit(from, mid, lower, upper, hits);
        let entry = &self.entries[mid];
        if entry.lower >= upper {
            return;
        }
        if entry.upper > lower {
            hits.push(mid);
        }
        self.visit(mid + 1, to, lower, upper, hits);
    }

    fn merge_staged(&mut self) {
        let mut staged = std::mem::take(&mut self.staged);
        staged.sort_by(|a, b| a.key().cmp(&b.key()));
        let sorted = std::mem::take(&mut self.entries);

        let mut merged = Vec::with_capacity(sorted.len() + staged.len());
        let mut left = sorted.into_iter().peekable();
        let mut right = staged.into_iter().peekable();
        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some(a), Some(b)) => a.key() <= b.key(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            merged.extend(next);
        }
        self.entries = merged;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.subtree_max = vec![i64::MIN; self.entries.len()];
        self.fill(0, self.entries.len());
    }

    fn fill(&mut self, from: usize, to: usize) -> i64 {
        if from >= to {
            return i64::MIN;
        }
        let mid = from + (to - from) / 2;
        let left = self.fill(from, mid);
        let right = self.fill(mid + 1, to);
        let max = self.entries[mid].upper.max(left).max(right);
        self.subtree_max[mid] = max;
        max
    }
}

/// Smallest power of two at least `MIN_STAGED` whose square covers `sorted`.
fn staging_limit(sorted: usize) -> usize {
    let mut limit = MIN_STAGED;
    while limit.saturating_mul(limit) < sorted {
        limit *= 2;
    }
    limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ContainerId {
        ContainerId::new(s)
    }

    fn brute_force(items: &[(ContainerId, i64, i64)], lower: i64, upper: i64) -> Vec<ContainerId> {
        let mut sorted: Vec<_> = items.to_vec();
        sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        sorted
            .into_iter()
            .filter(|(_, lo, hi)| *lo < upper && *hi > lower)
            .map(|(id, _, _)| id)
            .collect()
    }

    #[test]
    fn empty_index_answers_empty() {
        let index = IntervalIndex::new();
        assert!(index.is_empty());
        assert!(index.overlapping(0, 10).is_empty());
    }

    #[test]
    fn half_open_bounds_do_not_touch() {
        let index = IntervalIndex::from_entries([(id("a"), 0, 10), (id("b"), 10, 20)]);
        assert_eq!(index.overlapping(9, 10), vec![id("a")]);
        assert_eq!(index.overlapping(10, 11), vec![id("b")]);
        assert_eq!(index.overlapping(5, 15), vec![id("a"), id("b")]);
    }

    #[test]
    fn long_interval_found_under_short_neighbours() {
        let mut items = vec![(id("long"), 0, UNBOUNDED)];
        for i in 1..50 {
            items.push((id(&format!("p{i:02}")), i * 10, i * 10 + 5));
        }
        let index = IntervalIndex::from_entries(items.clone());
        assert_eq!(index.overlapping(1000, 1001), vec![id("long")]);
        assert_eq!(index.overlapping(252, 253), brute_force(&items, 252, 253));
    }

    #[test]
    fn incremental_insert_matches_bulk_build() {
        let items: Vec<_> = (0..40)
            .map(|i: i64| (id(&format!("p{i:02}")), (i * 37) % 101, (i * 37) % 101 + (i % 7) * 9 + 1))
            .collect();
        let bulk = IntervalIndex::from_entries(items.clone());
        let mut incremental = IntervalIndex::new();
        for (key, lo, hi) in items.iter().rev() {
            incremental.insert(key.clone(), *lo, *hi);
        }
        for point in (0..120).step_by(3) {
            let expected = brute_force(&items, point, point + 2);
            assert_eq!(bulk.overlapping(point, point + 2), expected);
            assert_eq!(incremental.overlapping(point, point + 2), expected);
        }
    }

    #[test]
    fn staged_inserts_merge_past_the_limit() {
        let mut index = IntervalIndex::new();
        let items: Vec<_> = (0..200i64).map(|i| (id(&format!("p{i:03}")), i * 5, i * 5 + 12)).collect();
        for (key, lo, hi) in &items {
            index.insert(key.clone(), *lo, *hi);
        }
        assert_eq!(index.len(), 200);
        assert!(index.staged.len() <= staging_limit(index.entries.len()));
        assert!(!index.entries.is_empty());
        for point in [0, 7, 333, 999, 1005] {
            assert_eq!(index.overlapping(point, point + 1), brute_force(&items, point, point + 1));
        }
    }

    #[test]
    fn staging_limit_grows_with_the_sorted_part() {
        assert_eq!(staging_limit(0), MIN_STAGED);
        assert_eq!(staging_limit(1024), MIN_STAGED);
        assert_eq!(staging_limit(1025), 64);
        assert_eq!(staging_limit(1_000_000), 1024);
    }

    #[test]
    fn insert_replaces_existing_id() {
        let mut index = IntervalIndex::new();
        index.insert(id("a"), 0, 5);
        index.insert(id("a"), 100, 105);
        assert_eq!(index.len(), 1);
        assert!(index.contains(&id("a")));
        assert!(index.overlapping(0, 5).is_empty());
        assert_eq!(index.overlapping(101, 102), vec![id("a")]);
    }
}
