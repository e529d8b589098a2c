//! Graph-subsystem error types.
//!
//! Two enums, matching the two failure classes: [`GraphError`] for
//! construction-time structural problems (fatal at startup; the operator must
//! fix the source data) and [`PlanningError`] for runtime contract violations
//! during dispatch queries.

use thiserror::Error;

use agv_core::{EdgeId, GroupId, NodeId, PoiId, SourceEdgeId, SourceNodeId};

/// Structural errors raised while converting and expanding the source graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("edge {edge} has unknown way-type code {code}")]
    UnknownWayType { edge: SourceEdgeId, code: u8 },

    #[error("node {node} has unknown type code {code}")]
    UnknownNodeType { node: SourceNodeId, code: u8 },

    #[error("node {node} declares section code {declared} but its role implies {implied}")]
    SectionMismatch {
        node: SourceNodeId,
        declared: u8,
        implied: u8,
    },

    #[error("edge {edge} references unknown node {node}")]
    UnknownNode {
        edge: SourceEdgeId,
        node: SourceNodeId,
    },

    #[error("normal-node path through {node} does not end at a non-normal node")]
    OpenNormalChain { node: SourceNodeId },

    #[error("normal-node path through {node} mixes way types")]
    MixedChainWayType { node: SourceNodeId },

    #[error("{node}: {detail}")]
    BadConnection {
        node: SourceNodeId,
        detail: String,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Runtime contract violations in planning-graph queries.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("path query from node {0} to itself")]
    TrivialPath(NodeId),

    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("POI {0} not present in the planning graph")]
    UnknownPoi(PoiId),

    #[error("POI {poi} has no {wanted} node")]
    MissingPoiNode { poi: PoiId, wanted: &'static str },

    #[error("no planning edge between nodes {from} and {to}")]
    UnknownEdge { from: NodeId, to: NodeId },

    #[error("more than one robot in exclusion group {0}")]
    GroupOverflow(GroupId),

    #[error("edge {edge} holds {got} robots, capacity {max}")]
    EdgeOverflow { edge: EdgeId, got: usize, max: u32 },
}

pub type PlanningResult<T> = Result<T, PlanningError>;
