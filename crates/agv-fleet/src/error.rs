//! Fleet-subsystem error types.

use thiserror::Error;

use agv_core::{PoiId, RobotId, TaskId};

/// A robot record that fails eager validation.
#[derive(Debug, Error)]
pub enum RobotError {
    #[error("fleet snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("robot has an empty id")]
    EmptyId,

    #[error("robot {0}: reports neither a graph edge nor a POI")]
    Unplaceable(RobotId),
}

/// A per-tick plan operation that violates its contract.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Robot(#[from] RobotError),

    #[error("robot {0} is not part of this tick's plan")]
    UnknownRobot(RobotId),

    #[error("robot {0}: stands at unknown POI {1}")]
    UnknownPoi(RobotId, PoiId),

    #[error("task {task} already belongs to robot {assigned}, not {robot}")]
    TaskConflict {
        task: TaskId,
        assigned: RobotId,
        robot: RobotId,
    },

    #[error("robot {0} has no task this tick")]
    NoTask(RobotId),

    #[error("robot {0} has no committed next edge")]
    NoEdge(RobotId),
}

pub type FleetResult<T> = Result<T, FleetError>;
