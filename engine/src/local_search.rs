//! Local search: after the backjump solver settles, look for direct
//! improving moves (swap one block's pick for a cheaper one) and 2-block
//! swap chains (trade picks between two blocks when neither improves alone
//! but the pair does), capped at `swap_chain_attempt_cap` attempts.

use crate::context::SolverContext;
use crate::model::{BlockIdx, Pick};
use crate::penalty::{self, CostOutcome};

pub struct LocalSearchReport {
    pub direct_improvements: usize,
    pub swap_chains: usize,
}

pub fn improve(ctx: &mut SolverContext, config: &crate::config::SolverConfig) -> LocalSearchReport {
    let mut report = LocalSearchReport { direct_improvements: 0, swap_chains: 0 };
    let assigned_blocks: Vec<BlockIdx> = (0..ctx.catalog.blocks.len())
        .filter(|&b| !ctx.schedule[b].is_free())
        .collect();

    for &block in &assigned_blocks {
        if direct_improve(ctx, config, block) {
            report.direct_improvements += 1;
        }
    }

    let mut attempts = 0usize;
    for i in 0..assigned_blocks.len() {
        for j in (i + 1)..assigned_blocks.len() {
            if attempts >= config.swap_chain_attempt_cap {
                return report;
            }
            attempts += 1;
            if try_swap(ctx, config, assigned_blocks[i], assigned_blocks[j]) {
                report.swap_chains += 1;
            }
        }
    }
    report
}

/// Re-evaluate `block`'s current pick against every candidate still legal for
/// it; commit the cheapest if it strictly improves on the current cost.
fn direct_improve(ctx: &mut SolverContext, config: &crate::config::SolverConfig, block: BlockIdx) -> bool {
    let Some(original) = ctx.schedule[block].pick().copied() else { return false };
    let original_cost = ctx.schedule[block].cost();
    ctx.undo(block);

    let candidates: Vec<_> = ctx.catalog.candidates.iter().copied().collect();
    let mut best: Option<(Pick, i64)> = None;
    for candidate in &candidates {
        if let CostOutcome::Soft(cost) = penalty::evaluate(ctx, config, block, candidate) {
            if best.map(|(_, c)| cost < c).unwrap_or(true) {
                best = Some((Pick { field: candidate.field, activity: candidate.activity, kind: candidate.kind }, cost));
            }
        }
    }

    match best {
        Some((pick, cost)) if cost < original_cost => {
            ctx.apply(block, pick, cost);
            true
        }
        _ => {
            ctx.apply(block, original, original_cost);
            false
        }
    }
}

/// Try trading `a`'s and `b`'s current picks. Accepted only if the combined
/// cost strictly improves and neither side violates a hard gate in the new
/// position.
fn try_swap(ctx: &mut SolverContext, config: &crate::config::SolverConfig, a: BlockIdx, b: BlockIdx) -> bool {
    let (Some(pick_a), Some(pick_b)) = (ctx.schedule[a].pick().copied(), ctx.schedule[b].pick().copied()) else {
        return false;
    };
    if pick_a.field == pick_b.field && pick_a.activity == pick_b.activity {
        return false;
    }
    let cost_a_orig = ctx.schedule[a].cost();
    let cost_b_orig = ctx.schedule[b].cost();
    let before = cost_a_orig + cost_b_orig;

    ctx.undo(a);
    ctx.undo(b);

    let cand_b_as_a = crate::model::Candidate { idx: 0, field: pick_b.field, activity: pick_b.activity, kind: pick_b.kind };
    let cand_a_as_b = crate::model::Candidate { idx: 0, field: pick_a.field, activity: pick_a.activity, kind: pick_a.kind };

    let outcome_a = penalty::evaluate(ctx, config, a, &cand_b_as_a);
    let outcome_b = penalty::evaluate(ctx, config, b, &cand_a_as_b);

    if let (CostOutcome::Soft(cost_a), CostOutcome::Soft(cost_b)) = (outcome_a, outcome_b) {
        if cost_a + cost_b < before {
            ctx.apply(a, pick_b, cost_a);
            ctx.apply(b, pick_a, cost_b);
            return true;
        }
    }

    ctx.apply(a, pick_a, cost_a_orig);
    ctx.apply(b, pick_b, cost_b_orig);
    false
}
