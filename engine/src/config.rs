//! Solver tunables. Every numeric constant named in the penalty design
//! and every iteration/attempt cap lives here so tests can isolate one
//! term at a time instead of hard-coding them at call sites.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub free_penalty: i64,
    pub oversize_bunk_penalty: i64,
    pub division_preference_rank_base: i64,
    pub division_preference_rank_step: i64,
    pub division_preference_missing: i64,
    pub sharing_empty_field: i64,
    pub sharing_same_activity: i64,
    pub sharing_different_activity: i64,
    pub fill_to_capacity_base: i64,
    pub fill_to_capacity_scale: i64,
    pub fill_empty_sharable: i64,
    pub adjacent_bonus_d1: i64,
    pub adjacent_bonus_d3: i64,
    pub adjacent_bonus_far: i64,
    pub plan_match_bonus: i64,
    pub plan_mismatch_penalty: i64,
    pub scarcity_over_2: i64,
    pub scarcity_over_3: i64,
    pub skeleton_weight: i64,
    pub unique_resource_protection: i64,
    pub zone_continuity_bonus: i64,
    pub zone_change_penalty: i64,
    pub type_balance_weight: i64,
    pub tie_break_noise_max: i64,
    pub planner_steering: i64,
    pub planner_debt_miss: i64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            free_penalty: 100_000,
            oversize_bunk_penalty: 5_000,
            division_preference_rank_base: 50,
            division_preference_rank_step: 5,
            division_preference_missing: 8_000,
            sharing_empty_field: 200,
            sharing_same_activity: -3_000,
            sharing_different_activity: 500,
            fill_to_capacity_base: 3_000,
            fill_to_capacity_scale: 5_000,
            fill_empty_sharable: 500,
            adjacent_bonus_d1: -500,
            adjacent_bonus_d3: -300,
            adjacent_bonus_far: -100,
            plan_match_bonus: -8_000,
            plan_mismatch_penalty: 2_000,
            scarcity_over_2: 2_000,
            scarcity_over_3: 3_000,
            skeleton_weight: 2_000,
            unique_resource_protection: 5_000,
            zone_continuity_bonus: -300,
            zone_change_penalty: 500,
            type_balance_weight: 2_000,
            tie_break_noise_max: 300,
            planner_steering: -8_000,
            planner_debt_miss: -2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of planner/solve passes per solve; the final pass is committed
    /// ("ink"), all earlier passes are scored and discarded ("pencil").
    pub max_passes: u32,
    /// AC-3's iteration cap is `ac3_iteration_factor * block_count`.
    pub ac3_iteration_factor: usize,
    pub backjump_iteration_cap: usize,
    pub swap_chain_attempt_cap: usize,
    /// Minutes defining "time-constrained" for the scarcity boost (a field
    /// whose available windows sum to less than this is boosted).
    pub time_constrained_threshold_min: u32,
    pub weights: PenaltyWeights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_passes: 3,
            ac3_iteration_factor: 10,
            backjump_iteration_cap: 50_000,
            swap_chain_attempt_cap: 500,
            time_constrained_threshold_min: 480,
            weights: PenaltyWeights::default(),
        }
    }
}
