//! The penalty cost function, shared by the group matcher, backjump
//! solver, local search and deep-free resolver. Hard gates short-circuit to a
//! sentinel above [`crate::model::REJECT_THRESHOLD`]; everything else sums
//! into a single soft cost where lower is better.

use crate::config::SolverConfig;
use crate::context::SolverContext;
use crate::model::{ActivityKind, BlockIdx, Candidate, HARD_GATE_COST};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardGate {
    SameDayRepeat,
    CrossDivisionConflict,
    ActivityMismatch,
    CapacityExceeded,
    ExclusivePreferenceExcluded,
    RotationForbidden,
    MaxUsageReached,
    LockViolation,
}

#[derive(Debug, Clone, Copy)]
pub enum CostOutcome {
    Hard(HardGate),
    Soft(i64),
}

impl CostOutcome {
    pub fn value(self) -> i64 {
        match self {
            CostOutcome::Hard(_) => HARD_GATE_COST as i64,
            CostOutcome::Soft(cost) => cost,
        }
    }

    pub fn is_hard(self) -> bool {
        matches!(self, CostOutcome::Hard(_))
    }
}

/// Label the engine recognizes for the type-balance term; any other
/// event label leaves that term at zero.
pub const GENERAL_ACTIVITY_SLOT: &str = "General Activity Slot";

pub fn evaluate(ctx: &mut SolverContext, config: &SolverConfig, block: BlockIdx, candidate: &Candidate) -> CostOutcome {
    let b = ctx.block(block).clone();
    let Some(interval) = b.interval else {
        // Time-unknown blocks skip interval-dependent hard gates entirely.
        return score_soft_terms(ctx, config, block, candidate, None);
    };

    // --- hard gates -------------------------------------------------------
    if ctx.today_cache.has_done(b.bunk, candidate.activity) {
        return CostOutcome::Hard(HardGate::SameDayRepeat);
    }

    if ctx.locked(candidate.field, b.division, &interval) {
        return CostOutcome::Hard(HardGate::LockViolation);
    }

    let props = ctx.catalog.field_cache.get(candidate.field);
    if props.sharing.is_division_local()
        && ctx
            .time_index
            .cross_div_conflict(candidate.field, b.division, interval, Some(b.bunk))
            .is_some()
    {
        return CostOutcome::Hard(HardGate::CrossDivisionConflict);
    }
    if ctx
        .time_index
        .activity_mismatch(candidate.field, interval, candidate.activity, Some(b.bunk))
        .is_some()
    {
        return CostOutcome::Hard(HardGate::ActivityMismatch);
    }

    let capacity_ok = if props.sharing.is_division_local() {
        ctx.time_index.same_div_usage(candidate.field, b.division, interval, Some(b.bunk)) < props.capacity
    } else {
        ctx.time_index.usage(candidate.field, interval, Some(b.bunk)) < props.capacity
    };
    if !capacity_ok {
        return CostOutcome::Hard(HardGate::CapacityExceeded);
    }

    if let Some(prefs) = ctx.catalog.resolve_preferences(candidate.field, candidate.activity) {
        if prefs.exclusive && prefs.rank_of(b.division).is_none() {
            return CostOutcome::Hard(HardGate::ExclusivePreferenceExcluded);
        }
    }

    if ctx.rotation_cache.get(b.bunk, candidate.activity).is_none() {
        return CostOutcome::Hard(HardGate::RotationForbidden);
    }

    let field = ctx.catalog.field(candidate.field);
    if let Some(cap) = field.max_usage {
        if ctx.field_usage_total(b.bunk, candidate.field) >= cap {
            return CostOutcome::Hard(HardGate::MaxUsageReached);
        }
    }
    let activity = ctx.catalog.activity(candidate.activity);
    if let Some(cap) = activity.max_usage {
        if ctx.activity_usage_total(b.bunk, candidate.activity) >= cap {
            return CostOutcome::Hard(HardGate::MaxUsageReached);
        }
    }

    score_soft_terms(ctx, config, block, candidate, Some(interval))
}

fn score_soft_terms(
    ctx: &mut SolverContext,
    config: &SolverConfig,
    block: BlockIdx,
    candidate: &Candidate,
    interval: Option<crate::model::Interval>,
) -> CostOutcome {
    let w = &config.weights;
    let b = ctx.block(block).clone();
    let mut cost: i64 = 0;

    // Rotation score.
    cost += ctx.rotation_cache.get(b.bunk, candidate.activity).unwrap_or(0) as i64;

    // Type balance for General Activity Slot events.
    if b.event.as_deref() == Some(GENERAL_ACTIVITY_SLOT) {
        cost += type_balance_term(ctx, &b, candidate, w.type_balance_weight);
    }

    // Oversize bunk on undersized field.
    let bunk_size = ctx.catalog.bunk(b.bunk).size;
    let activity = ctx.catalog.activity(candidate.activity);
    if let Some(max_players) = activity.max_players {
        if bunk_size > max_players {
            cost += w.oversize_bunk_penalty;
        }
    }

    // Division preference.
    match ctx.catalog.resolve_preferences(candidate.field, candidate.activity) {
        Some(prefs) => match prefs.rank_of(b.division) {
            Some(rank) => {
                cost -= w.division_preference_rank_base - (rank as i64) * w.division_preference_rank_step;
            }
            None => cost += w.division_preference_missing,
        },
        None => {}
    }

    if let Some(interval) = interval {
        let props = ctx.catalog.field_cache.get(candidate.field);
        let same_div_usage = ctx.time_index.same_div_usage(candidate.field, b.division, interval, Some(b.bunk));
        let global_usage = ctx.time_index.usage(candidate.field, interval, Some(b.bunk));
        let field_occupied = global_usage > 0;
        let same_activity_present = ctx
            .time_index
            .entries_overlapping(candidate.field, interval)
            .iter()
            .any(|e| e.activity == candidate.activity);

        // Sharing incentive.
        if !field_occupied {
            cost += w.sharing_empty_field;
        } else if same_activity_present {
            cost += w.sharing_same_activity;
        } else {
            cost += w.sharing_different_activity;
        }

        // Fill-to-capacity, only meaningful for sharable fields (capacity > 1).
        if props.capacity > 1 {
            if same_div_usage > 0 && same_activity_present {
                let denom = (props.capacity.saturating_sub(1)).max(1) as f64;
                let fill_ratio = same_div_usage as f64 / denom;
                cost -= w.fill_to_capacity_base + (w.fill_to_capacity_scale as f64 * fill_ratio) as i64;
            } else if same_div_usage == 0 {
                cost += w.fill_empty_sharable;
            }
        }
    }

    // Adjacent-bunk bonuses.
    cost += adjacency_term(ctx, &b, candidate, w);

    // Plan steering.
    match ctx.steering.plan.get(&block) {
        Some(plan) if plan.activity == candidate.activity => cost += w.plan_match_bonus,
        Some(_) => cost += w.plan_mismatch_penalty,
        None => {}
    }

    // Scarcity.
    if let Some(interval) = interval {
        if let Some(&ratio) = ctx.steering.scarcity.get(&(candidate.activity, interval.start_min)) {
            if ratio > 3.0 {
                cost += w.scarcity_over_2 + w.scarcity_over_3;
            } else if ratio > 2.0 {
                cost += w.scarcity_over_2;
            }
        }
    }

    // Skeleton context.
    cost += skeleton_term(ctx, block, candidate, w.skeleton_weight);

    // Unique-resource protection: this pick occupies the sole host of another
    // scarce activity while its own activity has alternatives.
    let candidates_for_field = ctx.catalog.candidates.for_field(candidate.field);
    let field_hosts_other_scarce = candidates_for_field.iter().any(|&idx| {
        let other = ctx.catalog.candidates.get(idx);
        other.activity != candidate.activity && ctx.catalog.resource_maps.is_scarce_host(other.activity)
    });
    if field_hosts_other_scarce && !ctx.catalog.resource_maps.is_scarce_host(candidate.activity) {
        cost += w.unique_resource_protection;
    }

    // Zone continuity.
    if let Some(&last) = ctx.last_field.get(&b.bunk) {
        let same_zone = ctx.catalog.field(last).zone.is_some()
            && ctx.catalog.field(last).zone == ctx.catalog.field(candidate.field).zone;
        cost += if same_zone { w.zone_continuity_bonus } else { w.zone_change_penalty };
    }

    // Time-constrained boost.
    cost -= ctx.catalog.resource_maps.boost_for(candidate.field);

    // Debt.
    cost += ctx.steering.debt_for(b.bunk, candidate.activity);

    // Tie-break noise.
    cost += ctx.tie_break_noise(w.tie_break_noise_max);

    CostOutcome::Soft(cost)
}

fn type_balance_term(ctx: &SolverContext, b: &crate::model::Block, candidate: &Candidate, weight: i64) -> i64 {
    let blocks = ctx.catalog.blocks_by_bunk.get(&b.bunk).cloned().unwrap_or_default();
    let mut sports = 0i64;
    let mut specials = 0i64;
    for idx in blocks {
        if let crate::model::Assignment::Assigned { pick, .. } = ctx.schedule[idx] {
            match pick.kind {
                ActivityKind::Sport => sports += 1,
                ActivityKind::Special => specials += 1,
            }
        }
    }
    let delta = sports - specials;
    match candidate.kind {
        // Pulling the type that is currently behind is cheaper.
        ActivityKind::Sport if delta < 0 => -weight,
        ActivityKind::Sport if delta > 0 => weight / 2,
        ActivityKind::Special if delta > 0 => -weight,
        ActivityKind::Special if delta < 0 => weight / 2,
        _ => 0,
    }
}

fn adjacency_term(
    ctx: &SolverContext,
    b: &crate::model::Block,
    candidate: &Candidate,
    w: &crate::config::PenaltyWeights,
) -> i64 {
    let Some(this_suffix) = ctx.catalog.bunk(b.bunk).numeric_suffix else { return 0 };
    let Some(interval) = b.interval else { return 0 };
    let mut best: Option<i64> = None;
    for entry in ctx.time_index.entries_overlapping(candidate.field, interval) {
        if entry.activity != candidate.activity || entry.bunk == b.bunk {
            continue;
        }
        let Some(other_suffix) = ctx.catalog.bunk(entry.bunk).numeric_suffix else { continue };
        let distance = this_suffix.abs_diff(other_suffix);
        let bonus = if distance == 1 {
            w.adjacent_bonus_d1
        } else if distance <= 3 {
            w.adjacent_bonus_d3
        } else {
            w.adjacent_bonus_far
        };
        best = Some(best.map_or(bonus, |b| b.min(bonus)));
    }
    best.unwrap_or(0)
}

fn skeleton_term(ctx: &SolverContext, block: BlockIdx, candidate: &Candidate, weight: i64) -> i64 {
    let Some(context) = ctx.catalog.resource_maps.skeleton.get(&block) else { return 0 };
    let mut cost = 0i64;
    for neighbor in [context.previous, context.next].into_iter().flatten() {
        let high_energy = matches!(neighbor, crate::model::SkeletonKind::Sport);
        cost += match (high_energy, candidate.kind) {
            (true, ActivityKind::Special) => -weight / 2,
            (true, ActivityKind::Sport) => weight / 3,
            (false, _) => 0,
        };
    }
    cost
}
