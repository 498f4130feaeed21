//! Activity-first planner: before any block is touched, build a wish list
//! per bunk ranking activities by rotation score, outstanding debt and any
//! time-constrained boost, then greedily allocate the scarce supply of
//! activity slots against that demand before falling back to per-candidate
//! scoring in the rest of the pipeline. Produces the `plan`/`scarcity`
//! steering maps the penalty function consumes.

use std::collections::{HashMap, HashSet};

use crate::context::{PlanEntry, SolverContext};
use crate::model::{ActivityId, BlockIdx, BunkId, DivisionId};

#[derive(Debug, Clone)]
struct WishListEntry {
    activity: ActivityId,
    needs_sharing: bool,
}

/// All still-`Free` blocks sharing a `(division, interval)` footprint,
/// deduplicated to one block per bunk (a bunk should have at most one free
/// block per group; if it somehow has more, the rest are left for later
/// stages to pick up).
struct PlannerGroup {
    bunks: Vec<BunkId>,
    block_for: HashMap<BunkId, BlockIdx>,
}

/// Run the planner over every still-`Free` block, populating
/// `ctx.steering.plan` and `ctx.steering.scarcity`. Idempotent: safe to call
/// once per pass since `SteeringState::reset_for_pass` clears the plan first.
pub fn plan(ctx: &mut SolverContext, config: &crate::config::SolverConfig) {
    ctx.steering.reset_for_pass();

    let wish_lists = build_wish_lists(ctx);
    let demand = count_demand(ctx, &wish_lists);
    let supply = count_supply(ctx);

    allocate(ctx, config, &wish_lists);

    for ((activity, start_min), demand_count) in demand.counts {
        let supply_count = supply.get(&(activity, start_min)).copied().unwrap_or(0);
        if supply_count == 0 {
            continue;
        }
        let ratio = demand_count as f64 / supply_count as f64;
        if ratio > 2.0 {
            ctx.steering.scarcity.insert((activity, start_min), ratio);
        }
    }
}

fn free_blocks(ctx: &SolverContext) -> Vec<BlockIdx> {
    (0..ctx.catalog.blocks.len()).filter(|&idx| ctx.schedule[idx].is_free()).collect()
}

/// `need(bunk, activity) = rotationScore + debt + timeConstraintBoost`,
/// ascending — lower need is preferred. A wish is tagged `needs_sharing` when
/// the bunk alone falls short of the activity's `min_players`, so Phase B
/// knows it can only take that wish paired with a partner bunk.
fn build_wish_lists(ctx: &SolverContext) -> HashMap<BunkId, Vec<WishListEntry>> {
    let mut lists = HashMap::new();
    for bunk in ctx.catalog.bunks.iter().map(|b| b.id) {
        let mut scored: Vec<(ActivityId, i64)> = ctx
            .catalog
            .activities
            .iter()
            .filter_map(|a| {
                ctx.rotation_cache.get(bunk, a.id).map(|score| {
                    let need = score as i64 + ctx.steering.debt_for(bunk, a.id) + boost_for_activity(ctx, a.id);
                    (a.id, need)
                })
            })
            .collect();
        scored.sort_by_key(|&(_, need)| need);
        let entries = scored
            .into_iter()
            .map(|(activity, _)| WishListEntry { activity, needs_sharing: solo_check_fails(ctx, bunk, activity) })
            .collect();
        lists.insert(bunk, entries);
    }
    lists
}

fn solo_check_fails(ctx: &SolverContext, bunk: BunkId, activity: ActivityId) -> bool {
    match ctx.catalog.activity(activity).min_players {
        Some(min) => ctx.catalog.bunk(bunk).size < min,
        None => false,
    }
}

/// Best (largest) time-constrained boost among the fields that host
/// `activity`, or zero if none carry one.
fn boost_for_activity(ctx: &SolverContext, activity: ActivityId) -> i64 {
    ctx.catalog
        .candidates
        .for_activity(activity)
        .iter()
        .map(|&idx| ctx.catalog.resource_maps.boost_for(ctx.catalog.candidates.get(idx).field))
        .max()
        .unwrap_or(0)
}

fn planner_groups(ctx: &SolverContext) -> Vec<PlannerGroup> {
    let mut keyed: HashMap<(DivisionId, Option<(u32, u32)>), PlannerGroup> = HashMap::new();
    for block in free_blocks(ctx) {
        let b = ctx.block(block);
        let key = (b.division, b.interval.map(|iv| (iv.start_min, iv.end_min)));
        let group = keyed.entry(key).or_insert_with(|| PlannerGroup { bunks: Vec::new(), block_for: HashMap::new() });
        if !group.block_for.contains_key(&b.bunk) {
            group.bunks.push(b.bunk);
            group.block_for.insert(b.bunk, block);
        }
    }
    keyed.into_values().collect()
}

/// Small-flagged bunks within one group, paired with their nearest unpaired
/// neighbor by numeric suffix so a bunk too small to meet an activity's
/// `min_players` alone can still take that wish jointly with a partner.
fn pair_small_bunks(ctx: &SolverContext, bunks: &[BunkId]) -> HashMap<BunkId, BunkId> {
    let mut small: Vec<BunkId> =
        bunks.iter().copied().filter(|b| ctx.catalog.resource_maps.small_bunk.contains(b)).collect();
    small.sort_by_key(|&b| ctx.catalog.bunk(b).numeric_suffix.unwrap_or(u32::MAX));

    let mut partner_of = HashMap::new();
    for pair in small.chunks(2) {
        if let [a, b] = pair {
            partner_of.insert(*a, *b);
            partner_of.insert(*b, *a);
        }
    }
    partner_of
}

/// Phase B: supply-constrained greedy allocation. Supply per activity starts
/// at its unique-host count and is decremented on every allocation (shared
/// between co-allocating partners); bunks are visited most-constrained-first
/// (shortest wish list); a bunk that needs sharing can only take a wish its
/// paired partner also wants, and both are allocated together. Allocating
/// anything other than a bunk's top wish accrues debt on that top wish so the
/// next pass steers harder toward it.
fn allocate(ctx: &mut SolverContext, config: &crate::config::SolverConfig, wish_lists: &HashMap<BunkId, Vec<WishListEntry>>) {
    let mut supply: HashMap<ActivityId, i64> =
        ctx.catalog.resource_maps.unique_field_count.iter().map(|(&a, &c)| (a, c as i64)).collect();
    let mut player_totals: HashMap<ActivityId, u32> = HashMap::new();
    let mut allocated: HashSet<BlockIdx> = HashSet::new();
    let steering = config.weights.planner_steering;
    let debt_miss = config.weights.planner_debt_miss;

    for group in planner_groups(ctx) {
        let partner_of = pair_small_bunks(ctx, &group.bunks);

        let mut order = group.bunks.clone();
        order.sort_by_key(|bunk| wish_lists.get(bunk).map(Vec::len).unwrap_or(0));

        for bunk in order {
            let Some(&block) = group.block_for.get(&bunk) else { continue };
            if allocated.contains(&block) {
                continue;
            }
            let Some(wish) = wish_lists.get(&bunk) else { continue };
            let Some(top_activity) = wish.first().map(|e| e.activity) else { continue };
            let bunk_size = ctx.catalog.bunk(bunk).size;

            for (rank, entry) in wish.iter().enumerate() {
                if supply.get(&entry.activity).copied().unwrap_or(0) <= 0 {
                    continue;
                }

                let mut partner_to_join: Option<(BunkId, BlockIdx)> = None;
                let mut total_players = bunk_size;

                if entry.needs_sharing {
                    let Some(&partner_bunk) = partner_of.get(&bunk) else { continue };
                    let Some(&partner_block) = group.block_for.get(&partner_bunk) else { continue };
                    if allocated.contains(&partner_block) {
                        continue;
                    }
                    let partner_size = ctx.catalog.bunk(partner_bunk).size;
                    let activity = ctx.catalog.activity(entry.activity);
                    if let Some(min) = activity.min_players {
                        if bunk_size + partner_size < min {
                            continue;
                        }
                    }
                    let partner_wants_it =
                        wish_lists.get(&partner_bunk).map(|w| w.iter().any(|e| e.activity == entry.activity)).unwrap_or(false);
                    if !partner_wants_it {
                        continue;
                    }
                    total_players += partner_size;
                    partner_to_join = Some((partner_bunk, partner_block));
                }

                if let Some(max) = ctx.catalog.activity(entry.activity).max_players {
                    let projected = player_totals.get(&entry.activity).copied().unwrap_or(0) + total_players;
                    if projected as f64 > 1.3 * max as f64 {
                        continue;
                    }
                }

                ctx.steering.plan.insert(block, PlanEntry { activity: entry.activity, steering });
                allocated.insert(block);
                *player_totals.entry(entry.activity).or_insert(0) += bunk_size;
                if rank != 0 {
                    ctx.steering.add_debt(bunk, top_activity, debt_miss);
                }

                if let Some((partner_bunk, partner_block)) = partner_to_join {
                    ctx.steering.plan.insert(partner_block, PlanEntry { activity: entry.activity, steering });
                    allocated.insert(partner_block);
                    *player_totals.entry(entry.activity).or_insert(0) += ctx.catalog.bunk(partner_bunk).size;
                    if let Some(partner_top) = wish_lists.get(&partner_bunk).and_then(|w| w.first()) {
                        if partner_top.activity != entry.activity {
                            ctx.steering.add_debt(partner_bunk, partner_top.activity, debt_miss);
                        }
                    }
                }

                *supply.get_mut(&entry.activity).expect("checked above") -= 1;
                break;
            }
        }
    }
}

#[derive(Default)]
struct DemandCounts {
    counts: HashMap<(ActivityId, u32), u32>,
}

fn count_demand(ctx: &SolverContext, wish_lists: &HashMap<BunkId, Vec<WishListEntry>>) -> DemandCounts {
    let mut counts = HashMap::new();
    for block in free_blocks(ctx) {
        let b = ctx.block(block);
        let Some(interval) = b.interval else { continue };
        let Some(wish) = wish_lists.get(&b.bunk) else { continue };
        if let Some(top) = wish.first() {
            *counts.entry((top.activity, interval.start_min)).or_insert(0) += 1;
        }
    }
    DemandCounts { counts }
}

fn count_supply(ctx: &SolverContext) -> HashMap<(ActivityId, u32), u32> {
    let mut supply = HashMap::new();
    for block in free_blocks(ctx) {
        let b = ctx.block(block);
        let Some(interval) = b.interval else { continue };
        for candidate in ctx.catalog.candidates.iter() {
            let hard = ctx.today_cache.has_done(b.bunk, candidate.activity)
                || ctx.rotation_cache.get(b.bunk, candidate.activity).is_none();
            if hard {
                continue;
            }
            let props = ctx.catalog.field_cache.get(candidate.field);
            let used = if props.sharing.is_division_local() {
                ctx.time_index.same_div_usage(candidate.field, b.division, interval, Some(b.bunk))
            } else {
                ctx.time_index.usage(candidate.field, interval, Some(b.bunk))
            };
            if used < props.capacity {
                *supply.entry((candidate.activity, interval.start_min)).or_insert(0) += 1;
            }
        }
    }
    supply
}
