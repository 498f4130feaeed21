use thiserror::Error;

use crate::model::{BlockIdx, DivisionId};

/// Genuine defects the engine cannot safely work around — as opposed to an
/// over-constrained block, which is an expected outcome (see [`SolveWarning`]).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("field '{field}' is defined twice in the snapshot with conflicting capacity/sharing")]
    DuplicateFieldDefinition { field: String },

    #[error("rotation oracle failed its monotonicity self-test for bunk={bunk} activity={activity}")]
    RotationOracleNonMonotone { bunk: String, activity: String },
}

/// Non-fatal conditions recorded on a [`crate::analyzer::PassReport`] rather
/// than propagated as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveWarning {
    UnknownBunk { block: BlockIdx },
    UnknownDivision { division: String },
    OverConstrainedBlock { block: BlockIdx },
    IterationExhausted { component: &'static str },
    SafetySweepViolation { description: String, division: Option<DivisionId> },
}

impl std::fmt::Display for SolveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveWarning::UnknownBunk { block } => write!(f, "block {block} refers to an unknown bunk; skipped"),
            SolveWarning::UnknownDivision { division } => {
                write!(f, "division '{division}' referenced but not present in snapshot")
            }
            SolveWarning::OverConstrainedBlock { block } => {
                write!(f, "block {block} has no viable candidate; assigned Free")
            }
            SolveWarning::IterationExhausted { component } => {
                write!(f, "{component} hit its iteration cap before converging")
            }
            SolveWarning::SafetySweepViolation { description, .. } => {
                write!(f, "safety sweep undid a commit: {description}")
            }
        }
    }
}
