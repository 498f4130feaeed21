//! Domain model: bunks, divisions, blocks, fields, activities, candidates and picks.
//!
//! Names (bunk/division/field/activity) are interned into dense indices at
//! snapshot-load time (see [`crate::snapshot`]); everything downstream of that
//! point operates on the newtype ids defined here, never on strings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

macro_rules! dense_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

dense_id!(BunkId);
dense_id!(DivisionId);
dense_id!(FieldId);
dense_id!(ActivityId);

/// Index of a [`Block`] within the solve's dense block vector.
pub type BlockIdx = usize;
/// Index of a [`Candidate`] within the solve's dense candidate vector.
pub type CandIdx = usize;

/// Half-open interval `[start_min, end_min)`, minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start_min: u32,
    pub end_min: u32,
}

impl Interval {
    pub fn new(start_min: u32, end_min: u32) -> Self {
        Self { start_min, end_min }
    }

    /// Half-open overlap test: `[a.start, a.end) ∩ [b.start, b.end) ≠ ∅`.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_min < other.end_min && other.start_min < self.end_min
    }
}

#[derive(Debug, Clone)]
pub struct Bunk {
    pub id: BunkId,
    pub name: String,
    /// Numeric suffix parsed from `name` (e.g. "Bunk12" -> 12), used for adjacency
    /// bonuses and small-bunk pairing. `None` if the name carries no trailing digits.
    pub numeric_suffix: Option<u32>,
    pub division: DivisionId,
    pub size: u32,
}

impl Bunk {
    pub fn parse_numeric_suffix(name: &str) -> Option<u32> {
        let digits: String = name.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        digits.chars().rev().collect::<String>().parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_min: u32,
    pub end_min: u32,
}

#[derive(Debug, Clone)]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
    pub bunks: Vec<BunkId>,
    pub slots: Vec<TimeSlot>,
}

/// A contiguous run of slot indices within one division for one bunk.
#[derive(Debug, Clone)]
pub struct Block {
    pub idx: BlockIdx,
    pub bunk: BunkId,
    pub division: DivisionId,
    pub slots: Vec<u32>,
    pub interval: Option<Interval>,
    pub event: Option<String>,
    pub is_league: bool,
    pub from_split_tile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharingMode {
    NotSharable,
    SameDivision,
    All,
    Custom { capacity: u32 },
}

impl SharingMode {
    /// True when two commits on the same field at an overlapping interval
    /// must belong to the same division (everything except `All`).
    pub fn is_division_local(&self) -> bool {
        !matches!(self, SharingMode::All)
    }
}

#[derive(Debug, Clone)]
pub struct FieldPreferences {
    /// Ordered by preference rank; rank 0 is the strongest preference.
    pub ordered_divisions: Vec<DivisionId>,
    pub exclusive: bool,
}

impl FieldPreferences {
    pub fn rank_of(&self, division: DivisionId) -> Option<usize> {
        self.ordered_divisions.iter().position(|d| *d == division)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_min: u32,
    pub end_min: u32,
}

impl TimeWindow {
    pub fn minutes(&self) -> u32 {
        self.end_min.saturating_sub(self.start_min)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub capacity: u32,
    pub sharing: SharingMode,
    pub preferences: Option<FieldPreferences>,
    pub activities: HashSet<ActivityId>,
    pub time_rules: Option<Vec<TimeWindow>>,
    pub max_usage: Option<u32>,
    /// Used only for the zone-continuity penalty term; `None` disables it for this field.
    pub zone: Option<String>,
    pub disabled: bool,
}

impl Field {
    /// Effective capacity resolving `Custom { capacity }` to a plain number.
    pub fn effective_capacity(&self) -> u32 {
        match self.sharing {
            SharingMode::Custom { capacity } => capacity,
            _ => self.capacity,
        }
    }

    /// Sum of available-window minutes, or `None` if the field has no time rules
    /// (i.e. is available all day).
    pub fn available_minutes(&self) -> Option<u32> {
        self.time_rules
            .as_ref()
            .map(|rules| rules.iter().map(TimeWindow::minutes).sum())
    }

    pub fn is_available_during(&self, interval: &Interval) -> bool {
        match &self.time_rules {
            None => true,
            Some(rules) => rules.iter().any(|w| {
                w.start_min <= interval.start_min && interval.end_min <= w.end_min
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Sport,
    Special,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub kind: ActivityKind,
    pub preferences: Option<FieldPreferences>,
    pub max_usage: Option<u32>,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub disabled: bool,
}

/// A legal `(field, activity)` pairing drawn from the catalog.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub idx: CandIdx,
    pub field: FieldId,
    pub activity: ActivityId,
    pub kind: ActivityKind,
}

/// A concrete `(field, activity)` choice committed to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub field: FieldId,
    pub activity: ActivityId,
    pub kind: ActivityKind,
}

/// Cost assigned to a `Free` (unassigned) block.
pub const FREE_COST: i64 = 100_000;
/// Threshold above which a candidate is treated as effectively forbidden.
pub const HARD_GATE_COST: i64 = 999_999;
/// Any option costing at least this much is excluded from consideration
/// entirely during scoring/selection (keeps `Free` competitive but bounded).
pub const REJECT_THRESHOLD: i64 = 900_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Free,
    Assigned { pick: Pick, cost: i64 },
}

impl Assignment {
    pub fn cost(&self) -> i64 {
        match self {
            Assignment::Free => FREE_COST,
            Assignment::Assigned { cost, .. } => *cost,
        }
    }

    pub fn pick(&self) -> Option<&Pick> {
        match self {
            Assignment::Free => None,
            Assignment::Assigned { pick, .. } => Some(pick),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Assignment::Free)
    }
}

/// A field reservation forbidding a field during `[start_min, end_min)` for
/// everyone except `allowed_division`, when present.
#[derive(Debug, Clone)]
pub struct Lock {
    pub field: FieldId,
    pub allowed_division: Option<DivisionId>,
    pub interval: Interval,
}

impl Lock {
    pub fn forbids(&self, field: FieldId, division: DivisionId, interval: &Interval) -> bool {
        field == self.field
            && self.interval.overlaps(interval)
            && self.allowed_division != Some(division)
    }
}

/// Classification of the event immediately before/after a block on the same
/// bunk's division timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonKind {
    Sport,
    Special,
    Break,
    General,
    Other,
}
