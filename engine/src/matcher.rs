//! Group matcher: within each group, find an assignment of blocks to
//! candidates that maximizes the count of committed blocks, breaking ties by
//! total penalty cost, via augmenting-path bipartite matching.

use std::collections::HashMap;

use crate::context::SolverContext;
use crate::domain_builder::{Domain, Group};
use crate::model::{BlockIdx, CandIdx, Pick};
use crate::penalty::{self, CostOutcome};

pub struct MatchResult {
    pub picks: HashMap<BlockIdx, (Pick, i64)>,
}

/// Run the matcher over every group, returning the best pick found per block.
/// Blocks left unmatched (empty domain, or lost their augmenting path) are
/// left absent from the result and fall through to the backjump solver.
pub fn match_all(ctx: &mut SolverContext, config: &crate::config::SolverConfig, groups: &[Group], domains: &HashMap<BlockIdx, Domain>) -> MatchResult {
    let mut picks = HashMap::new();
    for group in groups {
        match_group(ctx, config, group, domains, &mut picks);
    }
    MatchResult { picks }
}

fn match_group(
    ctx: &mut SolverContext,
    config: &crate::config::SolverConfig,
    group: &Group,
    domains: &HashMap<BlockIdx, Domain>,
    picks: &mut HashMap<BlockIdx, (Pick, i64)>,
) {
    let blocks: Vec<BlockIdx> = group.blocks.clone();
    // match_to[cand] = block currently holding that candidate, if any.
    let mut match_to: HashMap<CandIdx, BlockIdx> = HashMap::new();
    let mut block_match: HashMap<BlockIdx, CandIdx> = HashMap::new();

    for &block in &blocks {
        let mut visited = std::collections::HashSet::new();
        try_augment(ctx, config, block, domains, &mut match_to, &mut block_match, &mut visited);
    }

    for (&block, &cand) in &block_match {
        let candidate = *ctx.catalog.candidates.get(cand);
        let outcome = penalty::evaluate(ctx, config, block, &candidate);
        if let CostOutcome::Soft(cost) = outcome {
            picks.insert(block, (Pick { field: candidate.field, activity: candidate.activity, kind: candidate.kind }, cost));
        }
    }
}

/// Kuhn's algorithm augmenting path, preferring the lowest-cost candidate
/// first so ties resolve toward better assignments rather than arbitrary order.
fn try_augment(
    ctx: &mut SolverContext,
    config: &crate::config::SolverConfig,
    block: BlockIdx,
    domains: &HashMap<BlockIdx, Domain>,
    match_to: &mut HashMap<CandIdx, BlockIdx>,
    block_match: &mut HashMap<BlockIdx, CandIdx>,
    visited: &mut std::collections::HashSet<CandIdx>,
) -> bool {
    let Some(domain) = domains.get(&block) else { return false };
    let mut ranked: Vec<(CandIdx, i64)> = domain
        .candidates
        .iter()
        .map(|&cand| {
            let candidate = *ctx.catalog.candidates.get(cand);
            let cost = penalty::evaluate(ctx, config, block, &candidate).value();
            (cand, cost)
        })
        .collect();
    ranked.sort_by_key(|&(_, cost)| cost);

    for (cand, _) in ranked {
        if visited.contains(&cand) {
            continue;
        }
        visited.insert(cand);
        let free_or_augmentable = match match_to.get(&cand) {
            None => true,
            Some(&holder) => try_augment(ctx, config, holder, domains, match_to, block_match, visited),
        };
        if free_or_augmentable {
            if let Some(&holder) = match_to.get(&cand) {
                block_match.remove(&holder);
            }
            match_to.insert(cand, block);
            block_match.insert(block, cand);
            return true;
        }
    }
    false
}
