//! Backjump solver: commits the matcher's picks in most-remaining-
//! values order, and for any block the matcher left unmatched, searches its
//! domain directly, backjumping to the most recent block that shares a
//! conflicting resource instead of chronological backtracking.

use std::collections::HashMap;

use crate::context::SolverContext;
use crate::domain_builder::Domain;
use crate::matcher::MatchResult;
use crate::model::{BlockIdx, Pick};
use crate::penalty::{self, CostOutcome};

pub struct SolveOutcome {
    pub committed: Vec<BlockIdx>,
    pub exhausted: bool,
}

/// Commit every matched pick, then backjump-search the rest, in ascending
/// domain-size order (most-constrained-first).
pub fn solve(
    ctx: &mut SolverContext,
    config: &crate::config::SolverConfig,
    domains: &HashMap<BlockIdx, Domain>,
    matched: MatchResult,
) -> SolveOutcome {
    let mut committed = Vec::new();
    for (block, (pick, cost)) in matched.picks {
        if ctx.schedule[block].is_free() {
            ctx.apply(block, pick, cost);
            committed.push(block);
        }
    }

    let mut remaining: Vec<BlockIdx> = domains
        .keys()
        .copied()
        .filter(|&b| ctx.schedule[b].is_free())
        .collect();
    remaining.sort_by_key(|&b| domains[&b].candidates.len());

    let mut iterations = 0usize;
    let mut exhausted = false;
    let mut stack: Vec<(BlockIdx, Vec<usize>)> = Vec::new();
    let mut cursor = 0usize;

    while cursor < remaining.len() {
        let block = remaining[cursor];
        if !ctx.schedule[block].is_free() {
            cursor += 1;
            continue;
        }
        iterations += 1;
        if iterations > config.backjump_iteration_cap {
            exhausted = true;
            break;
        }

        let domain = &domains[&block];
        let mut ranked: Vec<(usize, i64)> = domain
            .candidates
            .iter()
            .enumerate()
            .map(|(i, &cand)| {
                let candidate = *ctx.catalog.candidates.get(cand);
                (i, penalty::evaluate(ctx, config, block, &candidate).value())
            })
            .filter(|&(_, cost)| cost < crate::model::REJECT_THRESHOLD)
            .collect();
        ranked.sort_by_key(|&(_, cost)| cost);

        if let Some(&(i, _)) = ranked.first() {
            let cand = domain.candidates[i];
            let candidate = *ctx.catalog.candidates.get(cand);
            let outcome = penalty::evaluate(ctx, config, block, &candidate);
            if let CostOutcome::Soft(cost) = outcome {
                let pick = Pick { field: candidate.field, activity: candidate.activity, kind: candidate.kind };
                ctx.apply(block, pick, cost);
                committed.push(block);
                stack.push((block, vec![i]));
                cursor += 1;
                continue;
            }
        }

        // No viable candidate: backjump to the most recent committed block
        // that conflicts on the same field, undoing it so its alternatives
        // can be explored, rather than simply retreating one step.
        if let Some(culprit_pos) = find_conflicting_ancestor(ctx, &stack, block, domains) {
            let (culprit_block, _) = stack.remove(culprit_pos);
            ctx.undo(culprit_block);
            committed.retain(|&b| b != culprit_block);
            cursor = remaining.iter().position(|&b| b == culprit_block).unwrap_or(cursor);
        } else {
            // Nothing to jump to: leave this block Free and move on.
            cursor += 1;
        }
    }

    SolveOutcome { committed, exhausted }
}

fn find_conflicting_ancestor(
    ctx: &SolverContext,
    stack: &[(BlockIdx, Vec<usize>)],
    block: BlockIdx,
    domains: &HashMap<BlockIdx, Domain>,
) -> Option<usize> {
    let my_fields: std::collections::HashSet<_> = domains
        .get(&block)
        .map(|d| d.candidates.iter().map(|&c| ctx.catalog.candidates.get(c).field).collect())
        .unwrap_or_default();
    stack.iter().rposition(|(b, _)| {
        ctx.schedule[*b]
            .pick()
            .map(|p| my_fields.contains(&p.field))
            .unwrap_or(false)
    })
}
