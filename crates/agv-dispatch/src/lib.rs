//! `agv-dispatch` — the per-tick task assignment loop.
//!
//! # Tick anatomy
//!
//! ```text
//! snapshot in ──▶ rebuild occupancy ──▶ phase 1: continue in-place
//!                                      phase 2: continue en-route
//!                                      phase 3: pick up pinned tasks
//!                                      phase 4: assign the rest
//!                                               (blocking robots first)
//!                ◀── plan out: robotId → (taskId, nextEdge, endBeh)
//! ```
//!
//! One call to [`Dispatcher::plan_all_free_robots`] is one tick.  It consumes
//! frozen snapshots, mutates nothing that outlives the call except the
//! graph's per-edge occupancy (rewritten at the next tick anyway), and
//! returns a frozen plan.  Robots for which no edge could be committed are
//! absent from the plan.
//!
//! # Crate layout
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`dispatcher`] | `Dispatcher`, `PlanEntry`, the four phases           |
//! | [`error`]      | `DispatchError`                                      |

pub mod dispatcher;
pub mod error;


pub use dispatcher::{Dispatcher, Plan, PlanEntry};
pub use error::{DispatchError, DispatchResult};
