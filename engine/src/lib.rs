//! Camp daily-activity scheduler: a synchronous, CPU-bound constraint solver.
//!
//! The engine takes an [`snapshot::InboundSnapshot`] describing a camp day
//! (divisions, bunks, fields, activities, the blocks to fill, and any
//! locks/skeleton/rotation history) and produces an
//! [`snapshot::OutboundResult`] assigning each block a field/activity or
//! leaving it `Free`. Persistence is external; see [`storage::SnapshotStore`].

pub mod ac3;
pub mod analyzer;
pub mod backjump;
pub mod candidates;
pub mod config;
pub mod context;
pub mod deep_free;
pub mod domain_builder;
pub mod error;
pub mod field_cache;
pub mod local_search;
pub mod matcher;
pub mod model;
pub mod penalty;
pub mod planner;
pub mod repair;
pub mod resource_maps;
pub mod rotation;
pub mod safety;
pub mod snapshot;
pub mod solve;
pub mod storage;
pub mod time_index;

use std::rc::Rc;

pub use config::SolverConfig;
pub use error::{EngineError, SolveWarning};
pub use rotation::{ReferenceRotationOracle, RotationOracle};
pub use snapshot::{InboundSnapshot, OutboundResult};
pub use solve::SolveResult;

/// Build a [`Catalog`](context::Catalog) from `snapshot`, solve it with the
/// bundled reference rotation oracle, and return the outbound wire result.
/// Callers supplying their own [`RotationOracle`] should call
/// [`snapshot::build_catalog`] and [`solve::solve`] directly instead.
pub fn solve_snapshot(snapshot: &InboundSnapshot, config: &SolverConfig) -> Result<OutboundResult, EngineError> {
    let catalog = snapshot::build_catalog(snapshot, config.time_constrained_threshold_min)?;
    let history = snapshot::build_rotation_history(snapshot, &catalog);
    let oracle = ReferenceRotationOracle::new(history, std::collections::HashMap::new());
    oracle.assert_monotone().map_err(|(bunk, activity)| EngineError::RotationOracleNonMonotone {
        bunk: catalog.bunk(bunk).name.clone(),
        activity: catalog.activity(activity).name.clone(),
    })?;

    let catalog = Rc::new(catalog);
    let result = solve::solve(Rc::clone(&catalog), Rc::new(oracle), config);
    Ok(snapshot::build_outbound(&catalog, &result))
}
