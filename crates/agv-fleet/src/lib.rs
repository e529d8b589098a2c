//! `agv-fleet` — fleet snapshot model and per-tick plan state.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`robot`]  | `Robot`, record validation, JSON ingestion                 |
//! | [`plan`]   | `FleetPlan` — assignments and next-edge commitments for    |
//! |            | the current dispatch tick                                  |
//! | [`error`]  | `RobotError`, `FleetError`                                 |
//!
//! A `FleetPlan` lives exactly one tick: it is rebuilt from the fleet
//! snapshot at tick entry, mutated by the dispatcher's assignment phases,
//! and read out as the emitted plan at tick exit.  Nothing here persists.

pub mod error;
pub mod plan;
pub mod robot;

#[cfg(test)]
mod tests;

pub use error::{FleetError, FleetResult, RobotError};
pub use plan::{FleetPlan, PlannedRobot};
pub use robot::{Robot, robots_from_json};
