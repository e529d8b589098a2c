//! Source-graph snapshot: records as the backend sends them, plus ingestion.
//!
//! # Wire format
//!
//! Nodes arrive as a map `sourceNodeId → record`:
//!
//! ```json
//! {
//!   "n1": { "name": "Dock L1", "pos": [3.5, 0.0],
//!           "type": { "id": 2, "nodeSection": 2 }, "poiId": "L1" },
//!   "n2": { "name": "bend",    "pos": [5.0, 0.0],
//!           "type": "normal",  "poiId": 0 }
//! }
//! ```
//!
//! The `type` descriptor is either a compound `{id, nodeSection}` or the bare
//! string `"normal"`.  `poiId` may be a string or the integer `0`; both
//! no-POI spellings normalize to [`PoiId::none`].
//!
//! Edges arrive as `sourceEdgeId → {startNode, endNode, type, isActive}` with
//! `type` ∈ {1: twoWay, 2: narrowTwoWay, 3: oneWay}.
//!
//! Maps are stored as `BTreeMap` so that every downstream pass (group
//! allocation, node expansion) iterates in a deterministic order and the
//! resulting planning-graph node ids are stable for a given snapshot.

use std::collections::BTreeMap;

use serde::Deserialize;

use agv_core::{PoiId, PoiKind, Point, SourceEdgeId, SourceNodeId, WayType};

use crate::error::{GraphError, GraphResult};

// ── Ingested model ────────────────────────────────────────────────────────────

/// A node of the compact operational graph.
#[derive(Clone, Debug)]
pub struct SourceNode {
    pub name: String,
    pub pos: Point,
    pub kind: PoiKind,
    pub poi: PoiId,
}

/// A directed or bidirectional edge of the compact operational graph.
#[derive(Clone, Debug)]
pub struct SourceEdge {
    pub start: SourceNodeId,
    pub end: SourceNodeId,
    pub way: WayType,
    pub is_active: bool,
}

/// The validated-at-ingestion source graph.
#[derive(Clone, Debug, Default)]
pub struct SourceGraph {
    pub nodes: BTreeMap<SourceNodeId, SourceNode>,
    pub edges: BTreeMap<SourceEdgeId, SourceEdge>,
}

impl SourceGraph {
    pub fn new(
        nodes: BTreeMap<SourceNodeId, SourceNode>,
        edges: BTreeMap<SourceEdgeId, SourceEdge>,
    ) -> Self {
        Self { nodes, edges }
    }

    /// Parse a node map and an edge map from backend JSON payloads.
    pub fn from_json(nodes_json: &str, edges_json: &str) -> GraphResult<Self> {
        let raw_nodes: BTreeMap<String, NodeRecord> = serde_json::from_str(nodes_json)?;
        let raw_edges: BTreeMap<String, EdgeRecord> = serde_json::from_str(edges_json)?;

        let mut nodes = BTreeMap::new();
        for (id, rec) in raw_nodes {
            let id = SourceNodeId(id);
            let node = rec.into_node(&id)?;
            nodes.insert(id, node);
        }

        let mut edges = BTreeMap::new();
        for (id, rec) in raw_edges {
            let id = SourceEdgeId(id);
            let way = WayType::from_code(rec.way).ok_or_else(|| GraphError::UnknownWayType {
                edge: id.clone(),
                code: rec.way,
            })?;
            for endpoint in [&rec.start_node, &rec.end_node] {
                if !nodes.contains_key(&SourceNodeId(endpoint.clone())) {
                    return Err(GraphError::UnknownNode {
                        edge: id.clone(),
                        node: SourceNodeId(endpoint.clone()),
                    });
                }
            }
            edges.insert(
                id,
                SourceEdge {
                    start: SourceNodeId(rec.start_node),
                    end: SourceNodeId(rec.end_node),
                    way,
                    is_active: rec.is_active,
                },
            );
        }

        Ok(Self { nodes, edges })
    }

    /// `poiId → role` for every node carrying a real POI id.
    pub fn poi_kinds(&self) -> BTreeMap<PoiId, PoiKind> {
        self.nodes
            .values()
            .filter(|n| n.poi.is_some())
            .map(|n| (n.poi.clone(), n.kind))
            .collect()
    }
}

// ── Wire records ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    name: String,
    pos: (f64, f64),
    #[serde(rename = "type")]
    kind: TypeRecord,
    #[serde(rename = "poiId", default)]
    poi: PoiRecord,
}

/// Compound `{id, nodeSection}` descriptor or the bare `"normal"` marker.
#[derive(Deserialize)]
#[serde(untagged)]
enum TypeRecord {
    Compound {
        id: u8,
        #[serde(rename = "nodeSection")]
        node_section: u8,
    },
    Bare(String),
}

/// `poiId` field: a string, or the legacy integer `0` for "no POI".
#[derive(Deserialize)]
#[serde(untagged)]
enum PoiRecord {
    Text(String),
    Number(i64),
}

impl Default for PoiRecord {
    fn default() -> Self {
        PoiRecord::Number(0)
    }
}

impl PoiRecord {
    fn normalize(self) -> PoiId {
        match self {
            PoiRecord::Text(s) if s != PoiId::NONE_STR && !s.is_empty() => PoiId(s),
            PoiRecord::Number(n) if n != 0 => PoiId(n.to_string()),
            _ => PoiId::none(),
        }
    }
}

impl NodeRecord {
    fn into_node(self, id: &SourceNodeId) -> GraphResult<SourceNode> {
        let kind = match self.kind {
            TypeRecord::Bare(ref s) if s == "normal" => PoiKind::Normal,
            TypeRecord::Bare(_) => {
                return Err(GraphError::UnknownNodeType {
                    node: id.clone(),
                    code: 0,
                });
            }
            TypeRecord::Compound { id: code, node_section } => {
                let kind = PoiKind::from_code(code).ok_or_else(|| GraphError::UnknownNodeType {
                    node: id.clone(),
                    code,
                })?;
                if kind.section().code() != node_section {
                    return Err(GraphError::SectionMismatch {
                        node: id.clone(),
                        declared: node_section,
                        implied: kind.section().code(),
                    });
                }
                kind
            }
        };
        Ok(SourceNode {
            name: self.name,
            pos: Point::new(self.pos.0, self.pos.1),
            kind,
            poi: self.poi.normalize(),
        })
    }
}

#[derive(Deserialize)]
struct EdgeRecord {
    #[serde(rename = "startNode")]
    start_node: String,
    #[serde(rename = "endNode")]
    end_node: String,
    #[serde(rename = "type")]
    way: u8,
    #[serde(rename = "isActive", default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}
