//! Per-field sorted interval index supporting O(log N) overlap queries.
//!
//! Entries are kept sorted by `start_min` within each field's bucket. Overlap
//! queries binary-search for the first entry whose `start_min >= query.end`;
//! every candidate lies in `[0, upper_bound)` and is filtered by `end_min >
//! query.start`.

use std::collections::HashMap;

use crate::model::{ActivityId, BunkId, DivisionId, FieldId, Interval};

#[derive(Debug, Clone)]
pub struct TimeIndexEntry {
    pub start_min: u32,
    pub end_min: u32,
    pub bunk: BunkId,
    pub division: DivisionId,
    pub activity: ActivityId,
}

impl TimeIndexEntry {
    fn interval(&self) -> Interval {
        Interval::new(self.start_min, self.end_min)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConflictInfo {
    pub bunk: BunkId,
    pub division: DivisionId,
}

#[derive(Debug, Clone, Copy)]
pub struct OtherActivity {
    pub activity: ActivityId,
    pub bunk: BunkId,
}

#[derive(Debug, Clone, Default)]
pub struct FieldTimeIndex {
    entries: HashMap<FieldId, Vec<TimeIndexEntry>>,
}

impl FieldTimeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, re-sorting the field's bucket if it landed out of order.
    pub fn insert(
        &mut self,
        field: FieldId,
        interval: Interval,
        bunk: BunkId,
        division: DivisionId,
        activity: ActivityId,
    ) {
        let bucket = self.entries.entry(field).or_default();
        bucket.push(TimeIndexEntry {
            start_min: interval.start_min,
            end_min: interval.end_min,
            bunk,
            division,
            activity,
        });
        if bucket.len() > 1 && bucket[bucket.len() - 2].start_min > bucket[bucket.len() - 1].start_min
        {
            bucket.sort_by_key(|e| e.start_min);
        }
    }

    /// Locate by `(bunk, start_min, end_min)` and erase. No-op if absent —
    /// correctness relies on apply/undo symmetry, not on this call failing loudly.
    pub fn remove(&mut self, field: FieldId, interval: Interval, bunk: BunkId) {
        if let Some(bucket) = self.entries.get_mut(&field) {
            if let Some(pos) = bucket
                .iter()
                .position(|e| e.bunk == bunk && e.start_min == interval.start_min && e.end_min == interval.end_min)
            {
                bucket.remove(pos);
            }
        }
    }

    fn bucket(&self, field: FieldId) -> &[TimeIndexEntry] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates overlapping `[qs, qe)`: all entries with `start_min < qe`,
    /// filtered to `end_min > qs`. The bucket is sorted by `start_min`, so we
    /// binary-search for the upper bound and scan only the prefix.
    fn overlapping<'a>(&'a self, field: FieldId, interval: Interval) -> impl Iterator<Item = &'a TimeIndexEntry> {
        let bucket = self.bucket(field);
        let upper = bucket.partition_point(|e| e.start_min < interval.end_min);
        bucket[..upper].iter().filter(move |e| e.end_min > interval.start_min)
    }

    pub fn usage(&self, field: FieldId, interval: Interval, exclude_bunk: Option<BunkId>) -> u32 {
        self.overlapping(field, interval)
            .filter(|e| Some(e.bunk) != exclude_bunk)
            .count() as u32
    }

    pub fn cross_div_conflict(
        &self,
        field: FieldId,
        division: DivisionId,
        interval: Interval,
        exclude_bunk: Option<BunkId>,
    ) -> Option<ConflictInfo> {
        self.overlapping(field, interval)
            .filter(|e| Some(e.bunk) != exclude_bunk)
            .find(|e| e.division != division)
            .map(|e| ConflictInfo { bunk: e.bunk, division: e.division })
    }

    pub fn same_div_usage(
        &self,
        field: FieldId,
        division: DivisionId,
        interval: Interval,
        exclude_bunk: Option<BunkId>,
    ) -> u32 {
        self.overlapping(field, interval)
            .filter(|e| Some(e.bunk) != exclude_bunk && e.division == division)
            .count() as u32
    }

    pub fn activity_mismatch(
        &self,
        field: FieldId,
        interval: Interval,
        activity: ActivityId,
        exclude_bunk: Option<BunkId>,
    ) -> Option<OtherActivity> {
        self.overlapping(field, interval)
            .filter(|e| Some(e.bunk) != exclude_bunk && e.activity != activity)
            .map(|e| OtherActivity { activity: e.activity, bunk: e.bunk })
            .next()
    }

    /// All entries on `field` overlapping `interval`, regardless of division —
    /// used by the safety sweeps to regroup commits by `(field, interval)`.
    pub fn entries_overlapping(&self, field: FieldId, interval: Interval) -> Vec<TimeIndexEntry> {
        self.overlapping(field, interval).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (FieldId, BunkId, BunkId, DivisionId, DivisionId, ActivityId) {
        (FieldId(0), BunkId(0), BunkId(1), DivisionId(0), DivisionId(1), ActivityId(0))
    }

    #[test]
    fn insert_then_remove_is_symmetric() {
        let (field, bunk, _, div, _, act) = ids();
        let mut idx = FieldTimeIndex::new();
        let iv = Interval::new(60, 100);
        idx.insert(field, iv, bunk, div, act);
        assert_eq!(idx.usage(field, iv, None), 1);
        idx.remove(field, iv, bunk);
        assert_eq!(idx.usage(field, iv, None), 0);
    }

    #[test]
    fn overlap_query_excludes_non_overlapping() {
        let (field, bunk, _, div, _, act) = ids();
        let mut idx = FieldTimeIndex::new();
        idx.insert(field, Interval::new(0, 60), bunk, div, act);
        idx.insert(field, Interval::new(120, 180), bunk, div, act);
        assert_eq!(idx.usage(field, Interval::new(60, 120), None), 0);
        assert_eq!(idx.usage(field, Interval::new(50, 70), None), 1);
    }

    #[test]
    fn cross_div_conflict_detected() {
        let (field, b1, b2, d1, d2, act) = ids();
        let mut idx = FieldTimeIndex::new();
        idx.insert(field, Interval::new(0, 60), b1, d1, act);
        let conflict = idx.cross_div_conflict(field, d2, Interval::new(0, 60), Some(b2));
        assert!(conflict.is_some());
        assert_eq!(conflict.unwrap().bunk, b1);
    }

    #[test]
    fn activity_mismatch_detected() {
        let (field, b1, b2, d1, _, a1) = ids();
        let a2 = ActivityId(1);
        let mut idx = FieldTimeIndex::new();
        idx.insert(field, Interval::new(0, 60), b1, d1, a1);
        let mismatch = idx.activity_mismatch(field, Interval::new(0, 60), a2, Some(b2));
        assert!(mismatch.is_some());
    }

    #[test]
    fn remove_of_absent_entry_is_noop() {
        let (field, bunk, _, _, _, _) = ids();
        let mut idx = FieldTimeIndex::new();
        idx.remove(field, Interval::new(0, 60), bunk);
        assert_eq!(idx.len(), 0);
    }
}
