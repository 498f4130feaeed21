//! Pass analyzer & debt adjuster: scores a finished pass and feeds three
//! debt adjustments back into `SteeringState::debt` so the next pass steers
//! around whatever this one got wrong. The score weighs free blocks heaviest,
//! then yesterday-repeats and player-count violations, then each assigned
//! block's own penalty cost (capped so one very expensive pick can't dominate
//! the comparison between passes).

use crate::context::SolverContext;
use crate::error::SolveWarning;
use crate::model::{Assignment, BlockIdx};

#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_index: u32,
    pub total_cost: i64,
    pub free_count: usize,
    pub assigned_count: usize,
    pub yesterday_repeats: usize,
    pub hard_player_violations: usize,
    pub soft_player_violations: usize,
    pub warnings: Vec<SolveWarning>,
}

const FREE_BLOCK_WEIGHT: i64 = 10_000;
const YESTERDAY_REPEAT_WEIGHT: i64 = 5_000;
const HARD_VIOLATION_WEIGHT: i64 = 8_000;
const SOFT_VIOLATION_WEIGHT: i64 = 2_000;
const PER_BLOCK_COST_CAP: i64 = 50_000;

const FREE_BLOCK_DEBT: i64 = -5_000;
const YESTERDAY_REPEAT_DEBT: i64 = 10_000;
const HARD_VIOLATION_DEBT: i64 = 20_000;

/// Score the pass currently committed on `ctx` and fold the three debt
/// adjustments into `ctx.steering.debt` in the same sweep.
pub fn analyze(ctx: &mut SolverContext, pass_index: u32) -> PassReport {
    let mut free_count = 0usize;
    let mut assigned_count = 0usize;
    let mut yesterday_repeats = 0usize;
    let mut hard_player_violations = 0usize;
    let mut soft_player_violations = 0usize;
    let mut capped_cost_sum = 0i64;
    let mut warnings = Vec::new();

    for idx in 0..ctx.catalog.blocks.len() {
        let block = ctx.block(idx).clone();
        match ctx.schedule[idx] {
            Assignment::Free => {
                free_count += 1;
                if !block.is_league {
                    warnings.push(SolveWarning::OverConstrainedBlock { block: idx as BlockIdx });
                }
                if let Some(entry) = ctx.steering.plan.get(&idx).copied() {
                    ctx.steering.add_debt(block.bunk, entry.activity, FREE_BLOCK_DEBT);
                }
            }
            Assignment::Assigned { pick, cost } => {
                assigned_count += 1;
                capped_cost_sum += cost.min(PER_BLOCK_COST_CAP);

                if ctx.oracle.did_yesterday(block.bunk, pick.activity) {
                    yesterday_repeats += 1;
                    ctx.steering.add_debt(block.bunk, pick.activity, YESTERDAY_REPEAT_DEBT);
                }

                let bunk_size = ctx.catalog.bunk(block.bunk).size;
                let activity = ctx.catalog.activity(pick.activity);
                if let Some(min) = activity.min_players {
                    if bunk_size < min {
                        hard_player_violations += 1;
                        ctx.steering.add_debt(block.bunk, pick.activity, HARD_VIOLATION_DEBT);
                    }
                }
                if let Some(max) = activity.max_players {
                    if bunk_size > max {
                        soft_player_violations += 1;
                    }
                }
            }
        }
    }

    let total_cost = FREE_BLOCK_WEIGHT * free_count as i64
        + YESTERDAY_REPEAT_WEIGHT * yesterday_repeats as i64
        + HARD_VIOLATION_WEIGHT * hard_player_violations as i64
        + SOFT_VIOLATION_WEIGHT * soft_player_violations as i64
        + capped_cost_sum;

    PassReport {
        pass_index,
        total_cost,
        free_count,
        assigned_count,
        yesterday_repeats,
        hard_player_violations,
        soft_player_violations,
        warnings,
    }
}
