//! Domain & group builder: for every still-`Free` block, compute the
//! set of legal candidate indices (its "domain") and cluster blocks that
//! share an `(division, interval)` footprint into groups for the matcher.

use std::collections::HashMap;

use crate::context::SolverContext;
use crate::model::{BlockIdx, CandIdx, DivisionId, Interval};
use crate::penalty::{self, CostOutcome};

#[derive(Debug, Clone, Default)]
pub struct Domain {
    pub candidates: Vec<CandIdx>,
}

/// Blocks sharing `(division, interval)`, matched together so that
/// field-capacity interactions within the group are considered jointly.
#[derive(Debug, Clone)]
pub struct Group {
    pub division: DivisionId,
    pub interval: Option<Interval>,
    pub blocks: Vec<BlockIdx>,
}

pub struct DomainsAndGroups {
    pub domains: HashMap<BlockIdx, Domain>,
    pub groups: Vec<Group>,
}

/// Build domains for every `Free` block, dropping candidates that hard-gate
/// immediately, then cluster into groups. A block whose interval is unknown
/// gets its own singleton group.
pub fn build(ctx: &mut SolverContext, config: &crate::config::SolverConfig) -> DomainsAndGroups {
    let mut domains = HashMap::new();
    let block_count = ctx.catalog.blocks.len();

    for block in 0..block_count {
        if !ctx.schedule[block].is_free() {
            continue;
        }
        let activity_candidates: Vec<CandIdx> = ctx.catalog.candidates.iter().map(|c| c.idx).collect();
        let mut domain = Vec::new();
        for cand_idx in activity_candidates {
            let candidate = *ctx.catalog.candidates.get(cand_idx);
            let outcome = penalty::evaluate(ctx, config, block, &candidate);
            if !matches!(outcome, CostOutcome::Hard(_)) {
                domain.push(cand_idx);
            }
        }
        domains.insert(block, Domain { candidates: domain });
    }

    let groups = cluster(ctx, &domains);
    DomainsAndGroups { domains, groups }
}

fn cluster(ctx: &SolverContext, domains: &HashMap<BlockIdx, Domain>) -> Vec<Group> {
    let mut keyed: HashMap<(DivisionId, Option<(u32, u32)>), Vec<BlockIdx>> = HashMap::new();
    for &block in domains.keys() {
        let b = ctx.block(block);
        let key = (b.division, b.interval.map(|iv| (iv.start_min, iv.end_min)));
        keyed.entry(key).or_default().push(block);
    }
    keyed
        .into_iter()
        .map(|((division, interval), mut blocks)| {
            blocks.sort_unstable();
            Group { division, interval: interval.map(|(s, e)| Interval::new(s, e)), blocks }
        })
        .collect()
}
