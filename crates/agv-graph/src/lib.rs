//! `agv-graph` — graph expansion, validation, and routing.
//!
//! Converts a compact operational graph (nodes with semantic roles, edges
//! with direction/width classes) into an expanded planning graph whose edges
//! are single robot actions, then answers masked shortest-path queries
//! against it.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                   |
//! |-------------|------------------------------------------------------------|
//! | [`source`]  | `SourceGraph`, snapshot records, JSON ingestion            |
//! | [`convert`] | `GraphConverter` — orientation expansion, normal-node      |
//! |             | collapse, connection-shape validation                      |
//! | [`builder`] | `SupervisorGraphBuilder` — POI/intersection expansion,     |
//! |             | groups, weights, capacities                                |
//! | [`graph`]   | `PlanningGraph` — CSR adjacency, lookups, occupancy        |
//! | [`router`]  | Dijkstra with on-the-fly POI masking                       |
//! | [`error`]   | `GraphError`, `PlanningError`                              |
//!
//! # Pipeline
//!
//! ```text
//! SourceGraph ──convert──▶ reduced edges ──build──▶ PlanningGraph
//!      │      (validated)                │
//!      └── structural errors ◀───────────┘
//! ```
//!
//! The planning graph is immutable with respect to routing queries; the only
//! per-tick mutation is rewriting edge occupancy from the fleet snapshot.

pub mod builder;
pub mod convert;
pub mod error;
pub mod graph;
pub mod router;
pub mod source;


pub use builder::build_supervisor_graph;
pub use convert::{GraphConverter, ReducedEdge};
pub use error::{GraphError, GraphResult, PlanningError, PlanningResult};
pub use graph::{PlanEdge, PlanNode, PlanNodeKind, PlanningGraph};
pub use source::{SourceEdge, SourceGraph, SourceNode};
