//! AC-3 arc consistency propagator: shrinks domains by removing
//! candidates that would leave some other block in the same group with an
//! empty domain, iterating to a fixpoint or the iteration cap.

use std::collections::VecDeque;

use crate::context::SolverContext;
use crate::domain_builder::{Domain, Group};
use crate::model::{BlockIdx, CandIdx};
use std::collections::HashMap;

/// Two blocks in the same group conflict on a candidate when committing that
/// candidate to one would push same-field-and-interval usage past capacity
/// for the other, given both draw from the same field.
fn candidates_conflict(ctx: &SolverContext, a: BlockIdx, b: BlockIdx, cand_a: CandIdx, cand_b: CandIdx) -> bool {
    let ca = *ctx.catalog.candidates.get(cand_a);
    let cb = *ctx.catalog.candidates.get(cand_b);
    if ca.field != cb.field {
        return false;
    }
    let props = ctx.catalog.field_cache.get(ca.field);
    if !props.sharing.is_division_local() {
        return false;
    }
    // Not-sharable fields admit exactly one concurrent occupant; two distinct
    // blocks both wanting the same not-sharable field at overlapping time
    // are mutually exclusive.
    let bunk_a = ctx.block(a).bunk;
    let bunk_b = ctx.block(b).bunk;
    if bunk_a == bunk_b {
        return false;
    }
    props.capacity <= 1
}

/// Revise `domains[block]` against every other block in `group`, removing any
/// candidate that has no remaining consistent counterpart elsewhere in the
/// group. Returns `true` if the domain shrank.
fn revise(ctx: &SolverContext, group: &Group, block: BlockIdx, domains: &mut HashMap<BlockIdx, Domain>) -> bool {
    let others: Vec<BlockIdx> = group.blocks.iter().copied().filter(|&b| b != block).collect();
    if others.is_empty() {
        return false;
    }
    let before_len = domains.get(&block).map(|d| d.candidates.len()).unwrap_or(0);
    let mut kept = Vec::new();
    let Some(domain) = domains.get(&block) else { return false };
    for &cand in &domain.candidates {
        let mut consistent = true;
        for &other in &others {
            let Some(other_domain) = domains.get(&other) else { continue };
            if other_domain.candidates.is_empty() {
                continue;
            }
            let all_conflict = other_domain
                .candidates
                .iter()
                .all(|&oc| candidates_conflict(ctx, block, other, cand, oc));
            if all_conflict && !other_domain.candidates.is_empty() {
                consistent = false;
                break;
            }
        }
        if consistent {
            kept.push(cand);
        }
    }
    let shrank = kept.len() != before_len;
    domains.get_mut(&block).unwrap().candidates = kept;
    shrank
}

/// Run AC-3 to a fixpoint across every group, capped at
/// `ac3_iteration_factor * block_count` total revisions.
pub fn propagate(ctx: &SolverContext, groups: &[Group], domains: &mut HashMap<BlockIdx, Domain>, iteration_cap: usize) -> bool {
    let mut queue: VecDeque<BlockIdx> = domains.keys().copied().collect();
    let mut iterations = 0usize;
    let group_of: HashMap<BlockIdx, usize> = groups
        .iter()
        .enumerate()
        .flat_map(|(gi, g)| g.blocks.iter().map(move |&b| (b, gi)))
        .collect();

    while let Some(block) = queue.pop_front() {
        iterations += 1;
        if iterations > iteration_cap {
            return false;
        }
        let Some(&gi) = group_of.get(&block) else { continue };
        let group = &groups[gi];
        if revise(ctx, group, block, domains) {
            for &other in &group.blocks {
                if other != block {
                    queue.push_back(other);
                }
            }
        }
    }
    true
}
