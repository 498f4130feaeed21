mod cli;

use std::fs;
use std::rc::Rc;

use clap::Parser;
use cli::{Cli, Command};
use common::{child_span, init_logger, root_span, TraceId};
use engine::config::SolverConfig;
use engine::context::Catalog;
use engine::rotation::ReferenceRotationOracle;
use engine::snapshot::{self, InboundSnapshot, OutboundResult};
use engine::EngineError;

fn main() -> anyhow::Result<()> {
    init_logger("camp-scheduler");
    let trace_id = TraceId::default();
    let _root = root_span("cli", &trace_id).entered();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve { snapshot, config, out } => run_solve(snapshot, config, out),
        Command::Repair { snapshot, result, pinned_bunk, pinned_slots, pinned_field, pinned_activity, blocks, bypass, config, out } => {
            run_repair(snapshot, result, pinned_bunk, pinned_slots, pinned_field, pinned_activity, blocks, bypass, config, out)
        }
    }
}

fn load_config(path: Option<std::path::PathBuf>) -> anyhow::Result<SolverConfig> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(SolverConfig::default()),
    }
}

fn load_snapshot(path: std::path::PathBuf) -> anyhow::Result<InboundSnapshot> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_result(out: Option<std::path::PathBuf>, result: &OutboundResult) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(result)?;
    match out {
        Some(path) => fs::write(path, text)?,
        None => println!("{text}"),
    }
    Ok(())
}

fn build_oracle(snapshot: &InboundSnapshot, catalog: &Catalog) -> anyhow::Result<ReferenceRotationOracle> {
    let history = snapshot::build_rotation_history(snapshot, catalog);
    let oracle = ReferenceRotationOracle::new(history, std::collections::HashMap::new());
    oracle
        .assert_monotone()
        .map_err(|(bunk, activity)| {
            anyhow::anyhow!(EngineError::RotationOracleNonMonotone {
                bunk: catalog.bunk(bunk).name.clone(),
                activity: catalog.activity(activity).name.clone(),
            })
        })?;
    Ok(oracle)
}

fn run_solve(snapshot_path: std::path::PathBuf, config_path: Option<std::path::PathBuf>, out: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let _span = child_span("solve").entered();
    let config = load_config(config_path)?;
    let snapshot = load_snapshot(snapshot_path)?;

    let catalog = snapshot::build_catalog(&snapshot, config.time_constrained_threshold_min)?;
    let oracle = build_oracle(&snapshot, &catalog)?;

    let catalog = Rc::new(catalog);
    let result = engine::solve::solve(Rc::clone(&catalog), Rc::new(oracle), &config);
    tracing::info!(warnings = result.warnings.len(), "solve complete");

    let outbound = snapshot::build_outbound(&catalog, &result);
    write_result(out, &outbound)
}

fn run_repair(
    snapshot_path: std::path::PathBuf,
    result_path: std::path::PathBuf,
    pinned_bunk: String,
    pinned_slots: Vec<u32>,
    pinned_field: String,
    pinned_activity: String,
    blocks: Vec<usize>,
    bypass: bool,
    config_path: Option<std::path::PathBuf>,
    out: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    let _span = child_span("repair").entered();
    let config = load_config(config_path)?;
    let snapshot = load_snapshot(snapshot_path)?;
    let prior: OutboundResult = serde_json::from_str(&fs::read_to_string(&result_path)?)?;

    let catalog = snapshot::build_catalog(&snapshot, config.time_constrained_threshold_min)?;
    let oracle = build_oracle(&snapshot, &catalog)?;
    let catalog = Rc::new(catalog);

    let schedule = snapshot::rehydrate_schedule(&catalog, &prior);
    let mut ctx = engine::repair::rehydrate_context(Rc::clone(&catalog), Rc::new(oracle), &schedule);

    let pinned_bunk_id = catalog
        .bunks
        .iter()
        .find(|b| b.name == pinned_bunk)
        .map(|b| b.id)
        .ok_or_else(|| anyhow::anyhow!("unknown pinned bunk '{pinned_bunk}'"))?;
    let pinned_field_id = catalog
        .field_by_name
        .get(&pinned_field)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("unknown pinned field '{pinned_field}'"))?;
    let pinned_activity_id = catalog
        .activities
        .iter()
        .find(|a| a.name == pinned_activity)
        .map(|a| a.id)
        .ok_or_else(|| anyhow::anyhow!("unknown pinned activity '{pinned_activity}'"))?;

    let request = engine::repair::RepairRequest {
        pinned_bunk: pinned_bunk_id,
        pinned_slots,
        pinned_field: pinned_field_id,
        pinned_activity: pinned_activity_id,
        conflict_list: blocks,
        bypass_mode: bypass,
    };
    let report = engine::repair::repair(&mut ctx, &config, &request);
    tracing::info!(reassigned = report.reassigned.len(), failed = report.failed.len(), "repair complete");

    let outbound = snapshot::build_outbound_from_schedule(&catalog, &ctx.schedule, &[], prior.pass_summaries);
    write_result(out, &outbound)
}
