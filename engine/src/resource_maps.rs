//! Four precomputations that steer the penalty function and planner: unique
//! host counts, time-constrained boosts, small-bunk flags and skeleton context.

use std::collections::HashMap;

use crate::candidates::CandidateSet;
use crate::model::{Activity, ActivityId, Block, BlockIdx, Bunk, BunkId, Field, FieldId, SkeletonKind};

#[derive(Debug, Clone, Default)]
pub struct ResourceMaps {
    /// Number of distinct fields hosting each activity; single-host activities
    /// are "scarce hosts".
    pub unique_field_count: HashMap<ActivityId, usize>,
    /// Penalty-reduction boost for fields whose available windows sum to less
    /// than the configured threshold, keyed by field.
    pub time_constrained_boost: HashMap<FieldId, i64>,
    /// Bunks whose size falls below the median of all activities' `minPlayers`.
    pub small_bunk: std::collections::HashSet<BunkId>,
    /// Previous/next skeleton event classification per block.
    pub skeleton: HashMap<BlockIdx, SkeletonContext>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SkeletonContext {
    pub previous: Option<SkeletonKind>,
    pub next: Option<SkeletonKind>,
}

/// One entry of the manual-skeleton outline: an event on a division's timeline
/// independent of the blocks being solved.
#[derive(Debug, Clone)]
pub struct SkeletonEntry {
    pub division: crate::model::DivisionId,
    pub start_min: u32,
    pub end_min: u32,
    pub kind: SkeletonKind,
}

impl ResourceMaps {
    pub fn build<'a>(
        candidates: &CandidateSet,
        activities: impl Iterator<Item = &'a Activity> + Clone,
        fields: impl Iterator<Item = &'a Field>,
        bunks: impl Iterator<Item = &'a Bunk>,
        blocks: &[Block],
        skeleton_outline: &[SkeletonEntry],
        time_constrained_threshold_min: u32,
    ) -> Self {
        let mut unique_field_count = HashMap::new();
        for activity in activities.clone() {
            unique_field_count.insert(activity.id, candidates.unique_host_count(activity.id));
        }

        let mut time_constrained_boost = HashMap::new();
        for field in fields {
            if let Some(minutes) = field.available_minutes() {
                if minutes < time_constrained_threshold_min {
                    let ratio = minutes as f64 / time_constrained_threshold_min as f64;
                    let boost = (3000.0 * (1.0 - ratio)).round() as i64;
                    time_constrained_boost.insert(field.id, boost.max(0));
                }
            }
        }

        let mut min_players: Vec<u32> = activities.filter_map(|a| a.min_players).collect();
        min_players.sort_unstable();
        let median = median_of(&min_players);
        let small_bunk = bunks
            .filter(|b| median.map(|m| b.size < m).unwrap_or(false))
            .map(|b| b.id)
            .collect();

        let skeleton = build_skeleton(blocks, skeleton_outline);

        Self { unique_field_count, time_constrained_boost, small_bunk, skeleton }
    }

    pub fn is_scarce_host(&self, activity: ActivityId) -> bool {
        self.unique_field_count.get(&activity).copied().unwrap_or(0) <= 1
    }

    pub fn boost_for(&self, field: FieldId) -> i64 {
        self.time_constrained_boost.get(&field).copied().unwrap_or(0)
    }
}

fn median_of(sorted: &[u32]) -> Option<u32> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    })
}

fn build_skeleton(blocks: &[Block], outline: &[SkeletonEntry]) -> HashMap<BlockIdx, SkeletonContext> {
    let mut out = HashMap::new();
    for block in blocks {
        let Some(interval) = block.interval else { continue };
        let mut prev: Option<&SkeletonEntry> = None;
        let mut next: Option<&SkeletonEntry> = None;
        for entry in outline.iter().filter(|e| e.division == block.division) {
            if entry.end_min <= interval.start_min {
                if prev.map(|p| p.end_min < entry.end_min).unwrap_or(true) {
                    prev = Some(entry);
                }
            } else if entry.start_min >= interval.end_min {
                if next.map(|n| n.start_min > entry.start_min).unwrap_or(true) {
                    next = Some(entry);
                }
            }
        }
        out.insert(
            block.idx,
            SkeletonContext { previous: prev.map(|e| e.kind), next: next.map(|e| e.kind) },
        );
    }
    out
}
