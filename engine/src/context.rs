//! The solver's per-solve state, gathered into one owned struct instead of
//! scattered module globals.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::candidates::CandidateSet;
use crate::field_cache::FieldPropertyCache;
use crate::model::{
    Activity, ActivityId, Assignment, Block, BlockIdx, Bunk, BunkId, Division, DivisionId, Field,
    FieldId, Interval, Lock, Pick,
};
use crate::resource_maps::ResourceMaps;
use crate::rotation::{RotationCache, RotationOracle};
use crate::time_index::FieldTimeIndex;

/// Immutable per-solve data: everything built once from the inbound snapshot
/// and never mutated once solving starts. Held behind an `Rc` so pencil-pass
/// snapshots are cheap — only the mutable dense arrays are actually copied.
#[derive(Debug)]
pub struct Catalog {
    pub divisions: Vec<Division>,
    pub bunks: Vec<Bunk>,
    pub fields: Vec<Field>,
    pub activities: Vec<Activity>,
    pub blocks: Vec<Block>,
    pub locks: Vec<Lock>,
    pub candidates: CandidateSet,
    pub field_cache: FieldPropertyCache,
    pub resource_maps: ResourceMaps,
    pub field_by_name: HashMap<String, FieldId>,
    pub division_index: HashMap<DivisionId, usize>,
    pub bunk_index: HashMap<BunkId, usize>,
    pub field_index: HashMap<FieldId, usize>,
    pub activity_index: HashMap<ActivityId, usize>,
    pub blocks_by_bunk: HashMap<BunkId, Vec<BlockIdx>>,
    pub blocks_by_division: HashMap<DivisionId, Vec<BlockIdx>>,
    /// Per-bunk usage counts accrued in prior days this season, keyed against
    /// `Field::max_usage` / `Activity::max_usage`.
    pub field_usage_so_far: HashMap<(BunkId, FieldId), u32>,
    pub activity_usage_so_far: HashMap<(BunkId, ActivityId), u32>,
}

impl Catalog {
    pub fn division(&self, id: DivisionId) -> &Division {
        &self.divisions[self.division_index[&id]]
    }

    pub fn bunk(&self, id: BunkId) -> &Bunk {
        &self.bunks[self.bunk_index[&id]]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[self.field_index[&id]]
    }

    pub fn activity(&self, id: ActivityId) -> &Activity {
        &self.activities[self.activity_index[&id]]
    }

    pub fn locked(&self, field: FieldId, division: DivisionId, interval: &Interval) -> bool {
        self.locks.iter().any(|l| l.forbids(field, division, interval))
    }

    /// Field-level preferences, falling back to the activity's own
    /// preferences when the field carries none.
    pub fn resolve_preferences(&self, field: FieldId, activity: ActivityId) -> Option<&crate::model::FieldPreferences> {
        self.field(field).preferences.as_ref().or(self.activity(activity).preferences.as_ref())
    }
}

/// Tracks, per bunk, the set of activities already committed today on the
/// live schedule. Invalidated on every apply/undo so
/// it is always authoritative — callers never need a separate bypass rescan.
#[derive(Debug, Clone, Default)]
pub struct TodayCache {
    done: HashMap<BunkId, HashSet<ActivityId>>,
}

impl TodayCache {
    pub fn has_done(&self, bunk: BunkId, activity: ActivityId) -> bool {
        self.done.get(&bunk).map(|s| s.contains(&activity)).unwrap_or(false)
    }

    fn add(&mut self, bunk: BunkId, activity: ActivityId) {
        self.done.entry(bunk).or_default().insert(activity);
    }

    fn remove(&mut self, bunk: BunkId, activity: ActivityId) {
        if let Some(set) = self.done.get_mut(&bunk) {
            set.remove(&activity);
        }
    }

    pub fn done_for(&self, bunk: BunkId) -> HashSet<ActivityId> {
        self.done.get(&bunk).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlanEntry {
    pub activity: ActivityId,
    pub steering: i64,
}

/// Mutable per-pass steering state produced by the planner, consumed by the
/// penalty function, reset at the start of every pass except for `debt` which
/// carries forward.
#[derive(Debug, Clone, Default)]
pub struct SteeringState {
    pub plan: HashMap<BlockIdx, PlanEntry>,
    pub debt: HashMap<(BunkId, ActivityId), i64>,
    /// Keyed by `(activity, start_min)`; demand/supply ratio when demand exceeds supply.
    pub scarcity: HashMap<(ActivityId, u32), f64>,
}

impl SteeringState {
    pub fn reset_for_pass(&mut self) {
        self.plan.clear();
        self.scarcity.clear();
        // debt intentionally carried forward
    }

    pub fn debt_for(&self, bunk: BunkId, activity: ActivityId) -> i64 {
        *self.debt.get(&(bunk, activity)).unwrap_or(&0)
    }

    pub fn add_debt(&mut self, bunk: BunkId, activity: ActivityId, delta: i64) {
        *self.debt.entry((bunk, activity)).or_insert(0) += delta;
    }
}

/// All per-solve mutable state: the live schedule plus every index/cache that
/// must stay in lockstep with it.
pub struct SolverContext {
    pub catalog: Rc<Catalog>,
    pub oracle: Rc<dyn RotationOracle>,
    pub schedule: Vec<Assignment>,
    pub time_index: FieldTimeIndex,
    pub rotation_cache: RotationCache,
    pub today_cache: TodayCache,
    pub steering: SteeringState,
    /// Most recent non-Free field per bunk, used for the zone-continuity term.
    pub last_field: HashMap<BunkId, FieldId>,
    /// Commits made during this solve, added on top of `Catalog::field_usage_so_far`.
    pub solve_field_usage: HashMap<(BunkId, FieldId), u32>,
    pub solve_activity_usage: HashMap<(BunkId, ActivityId), u32>,
    /// Locks acquired during this solve (e.g. by post-edit repair pinning a
    /// cell), on top of whatever `Catalog::locks` already carries.
    pub extra_locks: Vec<Lock>,
    pub rng: StdRng,
}

impl SolverContext {
    pub fn new(catalog: Rc<Catalog>, oracle: Rc<dyn RotationOracle>) -> Self {
        let block_count = catalog.blocks.len();
        let bunks = catalog.bunks.iter().map(|b| b.id);
        let activities = catalog.activities.iter().map(|a| a.id);
        let rotation_cache = RotationCache::build(oracle.as_ref(), bunks, activities);
        Self {
            catalog,
            oracle,
            schedule: vec![Assignment::Free; block_count],
            time_index: FieldTimeIndex::new(),
            rotation_cache,
            today_cache: TodayCache::default(),
            steering: SteeringState::default(),
            last_field: HashMap::new(),
            solve_field_usage: HashMap::new(),
            solve_activity_usage: HashMap::new(),
            extra_locks: Vec::new(),
            rng: StdRng::seed_from_u64(0x5CAB),
        }
    }

    /// Whether `field` is locked against `division` at `interval`, checking
    /// both the catalog's standing locks and any locks acquired this solve.
    pub fn locked(&self, field: FieldId, division: DivisionId, interval: &Interval) -> bool {
        self.catalog.locked(field, division, interval) || self.extra_locks.iter().any(|l| l.forbids(field, division, interval))
    }

    pub fn field_usage_total(&self, bunk: BunkId, field: FieldId) -> u32 {
        self.catalog.field_usage_so_far.get(&(bunk, field)).copied().unwrap_or(0)
            + self.solve_field_usage.get(&(bunk, field)).copied().unwrap_or(0)
    }

    pub fn activity_usage_total(&self, bunk: BunkId, activity: ActivityId) -> u32 {
        self.catalog.activity_usage_so_far.get(&(bunk, activity)).copied().unwrap_or(0)
            + self.solve_activity_usage.get(&(bunk, activity)).copied().unwrap_or(0)
    }

    /// Seed the time index and today-cache from upstream league placements,
    /// which are visible to the index but never appear in `blocks`.
    pub fn seed_league_entries(
        &mut self,
        entries: impl IntoIterator<Item = (FieldId, Interval, BunkId, DivisionId, ActivityId)>,
    ) {
        for (field, interval, bunk, division, activity) in entries {
            self.time_index.insert(field, interval, bunk, division, activity);
            self.today_cache.add(bunk, activity);
        }
    }

    /// A cheap-ish clone for a "pencil" pass: everything pass-scoped is copied
    /// so the original can be restored if the pass's result isn't committed.
    pub fn pencil(&self) -> Self {
        Self {
            catalog: Rc::clone(&self.catalog),
            oracle: Rc::clone(&self.oracle),
            schedule: self.schedule.clone(),
            time_index: self.time_index.clone(),
            rotation_cache: self.rotation_cache.clone(),
            today_cache: self.today_cache.clone(),
            steering: self.steering.clone(),
            last_field: self.last_field.clone(),
            solve_field_usage: self.solve_field_usage.clone(),
            solve_activity_usage: self.solve_activity_usage.clone(),
            extra_locks: self.extra_locks.clone(),
            rng: self.rng.clone(),
        }
    }

    pub fn block(&self, idx: BlockIdx) -> &Block {
        &self.catalog.blocks[idx]
    }

    /// Commit `pick` to `block`, applying it to every index. The sole mutation
    /// path into the live schedule; solver stages never write `self.schedule`
    /// directly.
    pub fn apply(&mut self, block: BlockIdx, pick: Pick, cost: i64) {
        let b = self.catalog.blocks[block].clone();
        debug_assert!(self.schedule[block].is_free(), "apply onto an already-assigned block");
        if let Some(interval) = b.interval {
            self.time_index.insert(pick.field, interval, b.bunk, b.division, pick.activity);
        }
        self.today_cache.add(b.bunk, pick.activity);
        self.last_field.insert(b.bunk, pick.field);
        *self.solve_field_usage.entry((b.bunk, pick.field)).or_insert(0) += 1;
        *self.solve_activity_usage.entry((b.bunk, pick.activity)).or_insert(0) += 1;
        self.schedule[block] = Assignment::Assigned { pick, cost };
        self.invalidate_rotation(b.bunk);
        tracing::trace!(block, bunk = b.bunk.0, field = pick.field.0, activity = pick.activity.0, cost, "apply");
    }

    /// Undo whatever is currently assigned to `block`, restoring it to `Free`.
    /// No-op if already `Free` — apply/undo symmetry is the sole correctness
    /// contract, not a guard against misuse.
    pub fn undo(&mut self, block: BlockIdx) {
        let Assignment::Assigned { pick, .. } = self.schedule[block] else { return };
        let b = self.catalog.blocks[block].clone();
        if let Some(interval) = b.interval {
            self.time_index.remove(pick.field, interval, b.bunk);
        }
        self.today_cache.remove(b.bunk, pick.activity);
        if let Some(count) = self.solve_field_usage.get_mut(&(b.bunk, pick.field)) {
            *count = count.saturating_sub(1);
        }
        if let Some(count) = self.solve_activity_usage.get_mut(&(b.bunk, pick.activity)) {
            *count = count.saturating_sub(1);
        }
        self.schedule[block] = Assignment::Free;
        self.invalidate_rotation(b.bunk);
        tracing::trace!(block, bunk = b.bunk.0, "undo");
    }

    pub fn assign_free(&mut self, block: BlockIdx) {
        self.undo(block);
    }

    fn invalidate_rotation(&mut self, bunk: BunkId) {
        let activities: Vec<ActivityId> = self.catalog.activities.iter().map(|a| a.id).collect();
        self.rotation_cache.invalidate_bunk(bunk, self.oracle.as_ref(), activities.into_iter());
    }

    pub fn tie_break_noise(&mut self, max: i64) -> i64 {
        if max <= 0 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }
}
