//! Deep free resolver: for every block still `Free` after local search, run a
//! fresh unconstrained scan across the whole schedule and, if a candidate is
//! only blocked by a displaceable lower-priority commit, displace it.

use crate::context::SolverContext;
use crate::model::{BlockIdx, Pick};
use crate::penalty::{self, CostOutcome};

pub struct DeepFreeReport {
    pub resolved: usize,
    pub displaced: usize,
}

pub fn resolve(ctx: &mut SolverContext, config: &crate::config::SolverConfig) -> DeepFreeReport {
    let mut report = DeepFreeReport { resolved: 0, displaced: 0 };
    let free_blocks: Vec<BlockIdx> = (0..ctx.catalog.blocks.len()).filter(|&b| ctx.schedule[b].is_free()).collect();

    for block in free_blocks {
        if try_direct(ctx, config, block) {
            report.resolved += 1;
            continue;
        }
        if try_displace(ctx, config, block) {
            report.resolved += 1;
            report.displaced += 1;
        }
    }
    report
}

fn try_direct(ctx: &mut SolverContext, config: &crate::config::SolverConfig, block: BlockIdx) -> bool {
    let candidates: Vec<_> = ctx.catalog.candidates.iter().copied().collect();
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
    if let Some((pick, cost)) = best {
        ctx.apply(block, pick, cost);
        true
    } else {
        false
    }
}

/// Look for a candidate that hard-gates only on `CapacityExceeded`, then
/// check whether the occupant currently on that field/interval has a
/// strictly cheaper alternative elsewhere — if so, evict it and take its spot.
fn try_displace(ctx: &mut SolverContext, config: &crate::config::SolverConfig, block: BlockIdx) -> bool {
    let Some(interval) = ctx.block(block).interval else { return false };
    let division = ctx.block(block).division;
    let candidates: Vec<_> = ctx.catalog.candidates.iter().copied().collect();

    for candidate in &candidates {
        let outcome = penalty::evaluate(ctx, config, block, candidate);
        if !matches!(outcome, CostOutcome::Hard(crate::penalty::HardGate::CapacityExceeded)) {
            continue;
        }
        let occupants = ctx.time_index.entries_overlapping(candidate.field, interval);
        for occupant in occupants {
            if occupant.division != division {
                continue;
            }
            let Some(occupant_block) = find_block_for(ctx, &occupant) else { continue };
            if occupant_block == block {
                continue;
            }
            let occupant_cost = ctx.schedule[occupant_block].cost();
            let Some(occupant_pick) = ctx.schedule[occupant_block].pick().copied() else { continue };

            ctx.undo(occupant_block);
            let moved = try_direct(ctx, config, occupant_block);
            if !moved {
                ctx.apply(occupant_block, occupant_pick, occupant_cost);
                continue;
            }
            let new_occupant_cost = ctx.schedule[occupant_block].cost();
            if new_occupant_cost > occupant_cost + config.weights.unique_resource_protection {
                // Displacement made things meaningfully worse; undo and skip.
                ctx.undo(occupant_block);
                ctx.apply(occupant_block, occupant_pick, occupant_cost);
                continue;
            }

            if let CostOutcome::Soft(cost) = penalty::evaluate(ctx, config, block, candidate) {
                let pick = Pick { field: candidate.field, activity: candidate.activity, kind: candidate.kind };
                ctx.apply(block, pick, cost);
                return true;
            }
        }
    }
    false
}

fn find_block_for(ctx: &SolverContext, entry: &crate::time_index::TimeIndexEntry) -> Option<BlockIdx> {
    ctx.catalog
        .blocks_by_bunk
        .get(&entry.bunk)?
        .iter()
        .copied()
        .find(|&b| {
            ctx.block(b).interval.map(|iv| iv.start_min == entry.start_min && iv.end_min == entry.end_min).unwrap_or(false)
        })
}
