//! Dispatcher configuration.

use std::time::Duration;

/// Physical and timing parameters shared by the graph builder and the
/// dispatcher.
///
/// Typically loaded from a TOML/JSON file by the application crate; the
/// defaults match the reference deployment.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Robot footprint length in metres.  Divides corridor length to get
    /// per-edge robot capacity.
    pub robot_length_m: f64,

    /// Nominal robot velocity in metres per second.  Divides corridor length
    /// to get GO_TO edge weights.
    pub robot_velocity_mps: f64,

    /// Corridor half-geometry parameter; also offsets expanded intersection
    /// node display positions.
    pub corridor_width_m: f64,

    /// Time weight of a DOCK edge.
    pub docking_weight: u32,

    /// Time weight of an UNDOCK edge.
    pub undocking_weight: u32,

    /// Time weight of a WAIT (or battery-exchange) edge.
    pub wait_weight: u32,

    /// Fixed weight of an intersection-internal GO_TO edge.
    pub intersection_weight: u32,

    /// Wall-clock budget for the task-assignment fixpoint loop.
    pub planning_deadline: Duration,

    /// Optional deterministic iteration cap for the same loop.  When set, it
    /// is checked alongside the wall clock; tests use it for reproducible
    /// timeout behavior.
    pub planning_fuel: Option<u32>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            robot_length_m: 0.4,
            robot_velocity_mps: 0.5,
            corridor_width_m: 0.3,
            docking_weight: 20,
            undocking_weight: 20,
            wait_weight: 10,
            intersection_weight: 3,
            planning_deadline: Duration::from_secs(5),
            planning_fuel: None,
        }
    }
}
