//! Solver driver: orchestrates the planner-through-local-search pass loop,
//! analyzes each finished pass, and runs the safety sweeps once at the end.
//!
//! Passes before the last are run "in pencil" — on a cloned context whose
//! schedule is scored and then discarded; only its debt carries forward.
//! The final pass's context is committed wholesale to the context the caller
//! keeps ("ink").

use std::rc::Rc;

use tracing::instrument;

use crate::ac3;
use crate::analyzer::{self, PassReport};
use crate::backjump;
use crate::config::SolverConfig;
use crate::context::{Catalog, SolverContext};
use crate::domain_builder;
use crate::error::SolveWarning;
use crate::local_search;
use crate::matcher;
use crate::model::Assignment;
use crate::planner;
use crate::rotation::RotationOracle;
use crate::safety;

pub struct SolveResult {
    pub schedule: Vec<Assignment>,
    pub pass_reports: Vec<PassReport>,
    pub warnings: Vec<SolveWarning>,
}

#[instrument(skip(catalog, oracle, config))]
pub fn solve(catalog: Rc<Catalog>, oracle: Rc<dyn RotationOracle>, config: &SolverConfig) -> SolveResult {
    let mut ctx = SolverContext::new(catalog, oracle);
    let mut pass_reports = Vec::new();

    for pass_index in 0..config.max_passes {
        let is_last = pass_index + 1 == config.max_passes;
        let mut working = ctx.pencil();

        run_pass(&mut working, config);
        let report = analyzer::analyze(&mut working, pass_index);
        tracing::info!(pass = pass_index, cost = report.total_cost, free = report.free_count, "pass complete");
        pass_reports.push(report);

        if is_last {
            // The final pass is committed wholesale; every index it carries
            // (time index, today cache, usage counters) is already consistent
            // with its own schedule.
            ctx = working;
        } else {
            // Debt accumulates pass over pass regardless of which pass's
            // schedule eventually wins; plan/scarcity stay pass-local and are
            // rebuilt fresh by the planner at the start of the next pass.
            ctx.steering.debt = working.steering.debt;
        }
    }

    let safety_report = safety::sweep(&mut ctx, config);
    let mut warnings: Vec<SolveWarning> = pass_reports.iter().flat_map(|r| r.warnings.clone()).collect();
    warnings.extend(safety_report.violations);

    SolveResult { schedule: ctx.schedule, pass_reports, warnings }
}

fn run_pass(ctx: &mut SolverContext, config: &SolverConfig) {
    planner::plan(ctx, config);

    let domains_and_groups = domain_builder::build(ctx, config);
    let iteration_cap = config.ac3_iteration_factor * ctx.catalog.blocks.len().max(1);
    let mut domains = domains_and_groups.domains;
    ac3::propagate(ctx, &domains_and_groups.groups, &mut domains, iteration_cap);

    let matched = matcher::match_all(ctx, config, &domains_and_groups.groups, &domains);
    backjump::solve(ctx, config, &domains, matched);

    local_search::improve(ctx, config);
    crate::deep_free::resolve(ctx, config);
}
