//! Rotation oracle: externally supplied bunk×activity penalty scores.
//!
//! The engine treats the oracle as a pure function of `(bunk, activity,
//! live-schedule-prefix)` and never inspects its internals. A reference
//! implementation is bundled for tests and the CLI; callers may supply their
//! own by implementing [`RotationOracle`].

use std::collections::HashMap;

use crate::model::{ActivityId, BunkId};

/// `None` encodes "+∞" (forbidden): same-day repeat, max-usage reached, etc.
pub trait RotationOracle: Send + Sync {
    fn score(&self, bunk: BunkId, activity: ActivityId, before_slot_index: u32) -> Option<i32>;

    /// True if `bunk` did `activity` exactly one day before today. Used by the
    /// pass analyzer's yesterday-repeat penalty; oracles with no day-level
    /// history can leave this at its default of `false`.
    fn did_yesterday(&self, _bunk: BunkId, _activity: ActivityId) -> bool {
        false
    }
}

/// Per-bunk history used by [`ReferenceRotationOracle`].
#[derive(Debug, Clone, Default)]
pub struct ActivityHistory {
    /// Days since this bunk last did this activity; `None` if never done.
    pub days_since_last: HashMap<ActivityId, u32>,
    /// Total times this bunk has done this activity this season.
    pub season_count: HashMap<ActivityId, u32>,
    /// Activities already done today by this bunk — forces +∞.
    pub done_today: std::collections::HashSet<ActivityId>,
    /// Per-bunk per-season cap reached for an activity — also forces +∞.
    pub max_usage_reached: std::collections::HashSet<ActivityId>,
}

/// A straightforward recency + frequency + variety oracle: monotone
/// non-increasing in `days_since_last`, rewards activities never done, and
/// nudges below-average-frequency activities ahead of above-average ones.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRotationOracle {
    history: HashMap<BunkId, ActivityHistory>,
    /// Average season count across bunks for a given activity, used for the
    /// frequency term.
    peer_average: HashMap<ActivityId, f64>,
}

const NEVER_DONE_BONUS: i32 = -500;
const RECENCY_BASE: i32 = 400;
const FREQUENCY_WEIGHT: f64 = 50.0;

impl ReferenceRotationOracle {
    pub fn new(history: HashMap<BunkId, ActivityHistory>, peer_average: HashMap<ActivityId, f64>) -> Self {
        Self { history, peer_average }
    }

    pub fn history_for(&self, bunk: BunkId) -> Option<&ActivityHistory> {
        self.history.get(&bunk)
    }

    /// Sample-based monotonicity check run once at context construction:
    /// recency penalty must never increase as `days_since_last` grows.
    pub fn assert_monotone(&self) -> Result<(), (BunkId, ActivityId)> {
        for (&bunk, hist) in &self.history {
            for (&activity, &days) in &hist.days_since_last {
                if hist.done_today.contains(&activity) || hist.max_usage_reached.contains(&activity) {
                    continue;
                }
                let at_days = recency_term(days);
                let at_days_plus_one = recency_term(days + 1);
                if at_days_plus_one > at_days {
                    return Err((bunk, activity));
                }
            }
        }
        Ok(())
    }
}

fn recency_term(days_since_last: u32) -> i32 {
    RECENCY_BASE - (days_since_last.min(20) as i32) * 20
}

impl RotationOracle for ReferenceRotationOracle {
    fn did_yesterday(&self, bunk: BunkId, activity: ActivityId) -> bool {
        self.history.get(&bunk).and_then(|h| h.days_since_last.get(&activity)).copied() == Some(1)
    }

    fn score(&self, bunk: BunkId, activity: ActivityId, _before_slot_index: u32) -> Option<i32> {
        let hist = self.history.get(&bunk)?;
        if hist.done_today.contains(&activity) || hist.max_usage_reached.contains(&activity) {
            return None;
        }

        let recency = match hist.days_since_last.get(&activity) {
            None => return Some(NEVER_DONE_BONUS),
            Some(&days) => recency_term(days),
        };

        let count = *hist.season_count.get(&activity).unwrap_or(&0) as f64;
        let avg = *self.peer_average.get(&activity).unwrap_or(&count);
        let frequency = ((count - avg) * FREQUENCY_WEIGHT) as i32;

        Some(recency + frequency)
    }
}

/// Dense `(bunk, activity) -> score` map, precomputed once per solve over the
/// solve's block set and candidate set so hot paths never call the oracle
/// directly.
#[derive(Debug, Clone, Default)]
pub struct RotationCache {
    scores: HashMap<(BunkId, ActivityId), Option<i32>>,
}

impl RotationCache {
    pub fn build(
        oracle: &dyn RotationOracle,
        bunks: impl Iterator<Item = BunkId> + Clone,
        activities: impl Iterator<Item = ActivityId> + Clone,
    ) -> Self {
        let mut scores = HashMap::new();
        for bunk in bunks {
            for activity in activities.clone() {
                scores.insert((bunk, activity), oracle.score(bunk, activity, 0));
            }
        }
        Self { scores }
    }

    pub fn get(&self, bunk: BunkId, activity: ActivityId) -> Option<i32> {
        *self.scores.get(&(bunk, activity)).unwrap_or(&None)
    }

    /// Invalidate all cached scores for a bunk — called after every commit,
    /// since the live-schedule-prefix the oracle is a function of just changed.
    pub fn invalidate_bunk(&mut self, bunk: BunkId, oracle: &dyn RotationOracle, activities: impl Iterator<Item = ActivityId>) {
        for activity in activities {
            self.scores.insert((bunk, activity), oracle.score(bunk, activity, 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_done_outscores_recent_repeat() {
        let bunk = BunkId(0);
        let never = ActivityId(0);
        let recent = ActivityId(1);
        let mut hist = ActivityHistory::default();
        hist.days_since_last.insert(recent, 1);
        let mut history = HashMap::new();
        history.insert(bunk, hist);
        let oracle = ReferenceRotationOracle::new(history, HashMap::new());

        let never_score = oracle.score(bunk, never, 0).unwrap();
        let recent_score = oracle.score(bunk, recent, 0).unwrap();
        assert!(never_score < recent_score);
    }

    #[test]
    fn done_today_is_forbidden() {
        let bunk = BunkId(0);
        let activity = ActivityId(0);
        let mut hist = ActivityHistory::default();
        hist.done_today.insert(activity);
        let mut history = HashMap::new();
        history.insert(bunk, hist);
        let oracle = ReferenceRotationOracle::new(history, HashMap::new());
        assert_eq!(oracle.score(bunk, activity, 0), None);
    }

    #[test]
    fn monotone_by_recency() {
        let bunk = BunkId(0);
        let activity = ActivityId(0);
        let mut hist = ActivityHistory::default();
        hist.days_since_last.insert(activity, 3);
        let mut history = HashMap::new();
        history.insert(bunk, hist);
        let oracle = ReferenceRotationOracle::new(history, HashMap::new());
        assert!(oracle.assert_monotone().is_ok());
    }
}
