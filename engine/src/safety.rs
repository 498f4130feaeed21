//! Safety sweeps: final, non-negotiable invariant checks run once
//! after the last pass. Any commit that violates one is undone outright —
//! these are correctness backstops, not scoring terms, so they never
//! negotiate a cheaper alternative.

use std::collections::HashMap;

use crate::context::SolverContext;
use crate::error::SolveWarning;
use crate::model::{BlockIdx, FieldId};

pub struct SafetyReport {
    pub violations: Vec<SolveWarning>,
}

/// Run every sweep once, then — if any of them undid a commit — re-invoke
/// the deep free resolver once so the blocks they just freed get a chance at
/// a fresh placement instead of being left `Free` until the next full solve.
pub fn sweep(ctx: &mut SolverContext, config: &crate::config::SolverConfig) -> SafetyReport {
    let mut violations = Vec::new();
    violations.extend(sweep_same_day_repeats(ctx));
    violations.extend(sweep_cross_division(ctx));
    violations.extend(sweep_activity_disagreement(ctx));
    violations.extend(sweep_capacity(ctx));

    if !violations.is_empty() {
        crate::deep_free::resolve(ctx, config);
    }

    SafetyReport { violations }
}

/// No bunk may end up doing the same activity twice in one day, even if an
/// earlier pass's cache was stale when it committed.
fn sweep_same_day_repeats(ctx: &mut SolverContext) -> Vec<SolveWarning> {
    let mut warnings = Vec::new();
    let mut seen: std::collections::HashMap<_, BlockIdx> = std::collections::HashMap::new();
    let blocks: Vec<BlockIdx> = (0..ctx.catalog.blocks.len()).collect();
    for block in blocks {
        let Some(pick) = ctx.schedule[block].pick().copied() else { continue };
        let bunk = ctx.block(block).bunk;
        let key = (bunk, pick.activity);
        if let Some(&first_block) = seen.get(&key) {
            ctx.undo(block);
            warnings.push(SolveWarning::SafetySweepViolation {
                description: format!("duplicate activity on bunk across blocks {first_block} and {block}"),
                division: Some(ctx.block(block).division),
            });
        } else {
            seen.insert(key, block);
        }
    }
    warnings
}

/// No field may host two divisions at once unless its sharing mode allows it.
fn sweep_cross_division(ctx: &mut SolverContext) -> Vec<SolveWarning> {
    let mut warnings = Vec::new();
    let blocks: Vec<BlockIdx> = (0..ctx.catalog.blocks.len()).collect();
    for block in blocks {
        let Some(pick) = ctx.schedule[block].pick().copied() else { continue };
        let Some(interval) = ctx.block(block).interval else { continue };
        let division = ctx.block(block).division;
        let bunk = ctx.block(block).bunk;
        let props = ctx.catalog.field_cache.get(pick.field);
        if !props.sharing.is_division_local() {
            continue;
        }
        if ctx.time_index.cross_div_conflict(pick.field, division, interval, Some(bunk)).is_some() {
            ctx.undo(block);
            warnings.push(SolveWarning::SafetySweepViolation {
                description: format!("cross-division conflict on field at block {block}"),
                division: Some(division),
            });
        }
    }
    warnings
}

/// A shared field must host one activity at a time. If two bunks landed on
/// the same field and interval doing different activities — a stale cache
/// during an earlier pass, say — keep whichever block committed first and
/// undo the rest.
fn sweep_activity_disagreement(ctx: &mut SolverContext) -> Vec<SolveWarning> {
    let mut warnings = Vec::new();
    let mut groups: HashMap<(FieldId, u32, u32), Vec<BlockIdx>> = HashMap::new();
    for block in 0..ctx.catalog.blocks.len() {
        let Some(pick) = ctx.schedule[block].pick().copied() else { continue };
        let Some(interval) = ctx.block(block).interval else { continue };
        groups.entry((pick.field, interval.start_min, interval.end_min)).or_default().push(block);
    }
    for mut blocks in groups.into_values() {
        if blocks.len() < 2 {
            continue;
        }
        blocks.sort_unstable();
        let Some(first_activity) = ctx.schedule[blocks[0]].pick().map(|p| p.activity) else { continue };
        for &block in &blocks[1..] {
            let Some(pick) = ctx.schedule[block].pick().copied() else { continue };
            if pick.activity != first_activity {
                let division = ctx.block(block).division;
                ctx.undo(block);
                warnings.push(SolveWarning::SafetySweepViolation {
                    description: format!("activity disagreement on shared field at block {block}"),
                    division: Some(division),
                });
            }
        }
    }
    warnings
}

/// No field may exceed its effective capacity at any instant.
fn sweep_capacity(ctx: &mut SolverContext) -> Vec<SolveWarning> {
    let mut warnings = Vec::new();
    let blocks: Vec<BlockIdx> = (0..ctx.catalog.blocks.len()).collect();
    for block in blocks {
        let Some(pick) = ctx.schedule[block].pick().copied() else { continue };
        let Some(interval) = ctx.block(block).interval else { continue };
        let bunk = ctx.block(block).bunk;
        let division = ctx.block(block).division;
        let props = ctx.catalog.field_cache.get(pick.field);
        let usage = if props.sharing.is_division_local() {
            ctx.time_index.same_div_usage(pick.field, division, interval, Some(bunk))
        } else {
            ctx.time_index.usage(pick.field, interval, Some(bunk))
        };
        if usage >= props.capacity {
            ctx.undo(block);
            warnings.push(SolveWarning::SafetySweepViolation {
                description: format!("field capacity exceeded at block {block}"),
                division: Some(division),
            });
        }
    }
    warnings
}
