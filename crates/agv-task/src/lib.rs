//! `agv-task` — task and behaviour domain model plus backlog ordering.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`behaviour`] | `Behaviour`, `BehaviourKind`, record validation         |
//! | [`task`]      | `Task`, `TaskStatus`, record validation, goal queries   |
//! | [`registry`]  | `TaskRegistry` — priority/arrival ordering, pool ops    |
//! | [`error`]     | `BehaviourError`, `TaskError`                           |
//!
//! # Validation model
//!
//! All validation is eager: a `Behaviour` or `Task` that constructs is valid,
//! and the dispatcher never re-checks.  Failures carry the offending
//! task/behaviour id so a supervisor can report per-entity errors while
//! continuing with the rest of the backlog.

pub mod behaviour;
pub mod error;
pub mod registry;
pub mod task;

#[cfg(test)]
mod tests;

pub use behaviour::{Behaviour, BehaviourKind};
pub use error::{BehaviourError, TaskError, TaskResult};
pub use registry::TaskRegistry;
pub use task::{
    DEFAULT_PRIORITY, PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_NORMAL, PRIORITY_VERY_HIGH, Task,
    TaskStatus, tasks_from_json,
};
