//! Dispatcher error type.
//!
//! Wraps the sub-crate errors so callers see one family at the public
//! boundary.  A failed tick emits no partial plan: either every phase
//! completes or the error propagates.

use std::time::Duration;

use thiserror::Error;

use agv_core::TaskId;
use agv_fleet::FleetError;
use agv_graph::PlanningError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("task assignment exceeded its {0:?} planning budget")]
    PlanningTimeout(Duration),

    #[error("task {0} has no destination POI")]
    NoGoal(TaskId),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Fleet(#[from] FleetError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
