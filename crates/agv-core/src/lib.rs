//! `agv-core` — foundational types for the `agv_dispatch` fleet dispatcher.
//!
//! This crate is a dependency of every other `agv-*` crate.  It intentionally
//! has no `agv-*` dependencies and minimal external ones (only `serde` and
//! `thiserror`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `NodeId`, `EdgeId`, `GroupId`, string-backed domain ids   |
//! | [`geo`]     | `Point`, Euclidean distance, polyline length              |
//! | [`types`]   | `WayType`, `PoiKind`, `SectionKind`, `EdgeAction`         |
//! | [`config`]  | `DispatchConfig`                                          |
//! | [`error`]   | `CoreError`, `CoreResult`                                 |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod types;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::DispatchConfig;
pub use error::{CoreError, CoreResult};
pub use geo::Point;
pub use ids::{EdgeId, GroupId, NodeId, PoiId, RobotId, SourceEdgeId, SourceNodeId, TaskId};
pub use types::{EdgeAction, PoiKind, SectionKind, WayType};
