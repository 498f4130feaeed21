//! Post-edit repair: given a schedule where a human has pinned one bunk onto
//! a specific field/activity (overriding whatever the last solve put there),
//! lock that cell down, commit it, and re-solve only the blocks the edit left
//! in conflict — never touching the rest of the schedule and never placing
//! anything else on the pinned field for the duration of the pin.

use std::collections::HashMap;
use std::rc::Rc;

use crate::context::{Catalog, SolverContext};
use crate::model::{ActivityId, Assignment, BlockIdx, BunkId, FieldId, Lock, Pick};
use crate::penalty::{self, CostOutcome};
use crate::rotation::RotationOracle;

/// A human edit: bunk `pinned_bunk` was moved onto `pinned_field` doing
/// `pinned_activity` for the slots in `pinned_slots`, leaving `conflict_list`
/// (blocks that now double-book a field, or lost the activity they needed)
/// to be re-solved around it.
pub struct RepairRequest {
    pub pinned_bunk: BunkId,
    pub pinned_slots: Vec<u32>,
    pub pinned_field: FieldId,
    pub pinned_activity: ActivityId,
    pub conflict_list: Vec<BlockIdx>,
    /// `true` (bypass) forces a placement on a conflicted block even if every
    /// remaining candidate hard-gates; `false` (notify) leaves it `Free` and
    /// reports it in `failed` instead.
    pub bypass_mode: bool,
}

pub struct RepairResult {
    pub reassigned: Vec<BlockIdx>,
    pub failed: Vec<BlockIdx>,
    pub pinned_lock: Lock,
}

/// Pin `request.pinned_bunk`'s cell, then re-solve `request.conflict_list`
/// bunk by bunk (numeric order) over the global candidate set minus the
/// pinned field, without disturbing anything outside the conflict list.
pub fn repair(ctx: &mut SolverContext, config: &crate::config::SolverConfig, request: &RepairRequest) -> RepairResult {
    let pinned_block = ctx
        .catalog
        .blocks_by_bunk
        .get(&request.pinned_bunk)
        .and_then(|blocks| blocks.iter().copied().find(|&b| ctx.block(b).slots == request.pinned_slots));

    let pinned_division = ctx.catalog.bunk(request.pinned_bunk).division;
    let pinned_interval = pinned_block
        .and_then(|b| ctx.block(b).interval)
        .unwrap_or(crate::model::Interval::new(0, 24 * 60));

    // Acquire a field lock for the pinned cell: reserved for the pinned
    // bunk's division regardless of the field's ordinary sharing/capacity.
    let pinned_lock = Lock { field: request.pinned_field, allowed_division: Some(pinned_division), interval: pinned_interval };
    ctx.extra_locks.push(pinned_lock.clone());

    // Commit the pin directly so every downstream hard gate sees it as
    // ordinary occupancy rather than re-deriving it through candidate search.
    // The lock just acquired reserves the field for the pinned bunk's own
    // division, so evaluating its own candidate against it never hard-gates.
    if let Some(pinned_block) = pinned_block {
        if !ctx.schedule[pinned_block].is_free() {
            ctx.undo(pinned_block);
        }
        let kind = ctx.catalog.activity(request.pinned_activity).kind;
        let candidate = ctx
            .catalog
            .candidates
            .for_field(request.pinned_field)
            .iter()
            .map(|&idx| *ctx.catalog.candidates.get(idx))
            .find(|c| c.activity == request.pinned_activity)
            .unwrap_or(crate::model::Candidate { idx: 0, field: request.pinned_field, activity: request.pinned_activity, kind });
        let cost = penalty::evaluate(ctx, config, pinned_block, &candidate).value();
        let pick = Pick { field: request.pinned_field, activity: request.pinned_activity, kind };
        ctx.apply(pinned_block, pick, cost);
    }

    // Group the conflict list by bunk and clear it so it can be re-solved.
    let mut by_bunk: HashMap<BunkId, Vec<BlockIdx>> = HashMap::new();
    for &block in &request.conflict_list {
        if !ctx.schedule[block].is_free() {
            ctx.undo(block);
        }
        by_bunk.entry(ctx.block(block).bunk).or_default().push(block);
    }
    let mut bunks: Vec<BunkId> = by_bunk.keys().copied().collect();
    bunks.sort_by_key(|b| b.0);

    let mut reassigned = Vec::new();
    let mut failed = Vec::new();

    for bunk in bunks {
        let blocks = by_bunk.remove(&bunk).unwrap_or_default();
        for block in blocks {
            match best_candidate_excluding(ctx, config, block, request.pinned_field, request.bypass_mode) {
                Some((pick, cost)) => {
                    ctx.apply(block, pick, cost);
                    reassigned.push(block);
                }
                None => failed.push(block),
            }
        }
    }

    RepairResult { reassigned, failed, pinned_lock }
}

/// The cheapest candidate for `block`, drawn from the global candidate set
/// minus `avoid_field` (the field just pinned for someone else). In notify
/// mode only candidates that clear every hard gate are considered; in bypass
/// mode, if none do, the single remaining candidate is forced anyway rather
/// than leaving the block `Free`.
fn best_candidate_excluding(
    ctx: &mut SolverContext,
    config: &crate::config::SolverConfig,
    block: BlockIdx,
    avoid_field: FieldId,
    bypass_mode: bool,
) -> Option<(Pick, i64)> {
    let candidates: Vec<_> = ctx.catalog.candidates.iter().copied().filter(|c| c.field != avoid_field).collect();

    let mut best: Option<(Pick, i64)> = None;
    for candidate in &candidates {
        if let CostOutcome::Soft(cost) = penalty::evaluate(ctx, config, block, candidate) {
            if cost >= crate::model::REJECT_THRESHOLD {
                continue;
            }
            if best.map(|(_, c)| cost < c).unwrap_or(true) {
                best = Some((Pick { field: candidate.field, activity: candidate.activity, kind: candidate.kind }, cost));
            }
        }
    }
    if best.is_some() || !bypass_mode {
        return best;
    }

    let candidate = candidates.first()?;
    let cost = penalty::evaluate(ctx, config, block, candidate).value();
    Some((Pick { field: candidate.field, activity: candidate.activity, kind: candidate.kind }, cost))
}

/// Construct a [`SolverContext`] and replay `schedule` into it commit by
/// commit, so every index (time index, today cache, usage counters) is
/// consistent before [`repair`] pins a cell and re-solves the conflict list.
pub fn rehydrate_context(catalog: Rc<Catalog>, oracle: Rc<dyn RotationOracle>, schedule: &[Assignment]) -> SolverContext {
    let mut ctx = SolverContext::new(catalog, oracle);
    for (block, assignment) in schedule.iter().enumerate() {
        if let Assignment::Assigned { pick, cost } = assignment {
            ctx.apply(block as BlockIdx, *pick, *cost);
        }
    }
    ctx
}
