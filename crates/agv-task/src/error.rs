//! Task-subsystem error types.

use thiserror::Error;

use agv_core::TaskId;

/// A behaviour record that fails eager validation.
#[derive(Debug, Error)]
pub enum BehaviourError {
    #[error("behaviour record is not a structured object")]
    NotARecord,

    #[error("behaviour record is missing field {0:?}")]
    MissingField(&'static str),

    #[error("behaviour field {0:?} has the wrong type")]
    WrongFieldType(&'static str),

    #[error("behaviour {id}: unknown behaviour name {name:?}")]
    UnknownName { id: String, name: String },

    #[error("behaviour {id}: GO_TO requires a destination POI")]
    MissingGoal { id: String },
}

/// A task record that fails eager validation.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task backlog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("task has an empty id")]
    EmptyId,

    #[error("task {task}: {source}")]
    Behaviour {
        task: TaskId,
        source: BehaviourError,
    },

    #[error("task {task}: has no behaviours")]
    NoBehaviours { task: TaskId },

    #[error("task {task}: unknown status {status:?}")]
    BadStatus { task: TaskId, status: String },

    #[error("task {task}: bad start time {value:?} (expected YYYY-mm-dd HH:MM:SS)")]
    BadTimestamp { task: TaskId, value: String },

    #[error("task {task}: current behaviour index {index} outside [-1, {max}]")]
    BadIndex { task: TaskId, index: i32, max: i32 },

    #[error("task {task}: status {status:?} requires an assigned robot")]
    MissingRobot { task: TaskId, status: String },
}

pub type TaskResult<T> = Result<T, TaskError>;
