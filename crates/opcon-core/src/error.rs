//! Error taxonomy for planning and session transitions.
//!
//! Planning and assignment failures are validation errors: they are surfaced
//! to the operator and the input is preserved for correction. Transport
//! failures live at the server boundary, not here.

use thiserror::Error;

use crate::session::SessionState;

/// Coverage planning failures.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("survey polygon needs at least 3 vertices, got {0}")]
    InsufficientVertices(usize),
    #[error("scan spacing must be a positive number of meters, got {0}")]
    InvalidSpacing(f64),
}

/// Mission assignment failures.
#[derive(Debug, Error, PartialEq)]
pub enum AssignError {
    #[error("no vehicles available for assignment")]
    NoVehicles,
    #[error("leader-follower formation needs at least 2 vehicles, got {0}")]
    InsufficientVehicles(usize),
}

/// Mission session lifecycle failures.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("cannot {action} while session is {state:?}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },
    #[error("vertex index {index} out of range ({len} vertices)")]
    VertexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Assign(#[from] AssignError),
}
