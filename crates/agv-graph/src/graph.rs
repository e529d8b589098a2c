//! The expanded planning graph and its dispatch-time queries.
//!
//! # Data layout
//!
//! Nodes and edges live in flat vectors indexed by `NodeId` / `EdgeId`.
//! Outgoing edges use **Compressed Sparse Row (CSR)** format: the outgoing
//! edges of node `n` occupy `edges[node_out_start[n] .. node_out_start[n+1]]`
//! (edges are sorted by source node at build time), so Dijkstra's inner loop
//! is a contiguous scan.
//!
//! # Mutability
//!
//! Routing queries never mutate the graph — masking is a per-query predicate
//! inside the router.  The only mutation is [`PlanningGraph::set_robots_on_edges`],
//! which rewrites per-edge occupancy from the fleet snapshot at the start of
//! every dispatch tick; occupancy is never carried over from history.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use agv_core::{
    EdgeAction, EdgeId, GroupId, NodeId, PoiId, PoiKind, Point, RobotId, SectionKind,
    SourceEdgeId, SourceNodeId, WayType,
};

use crate::error::{PlanningError, PlanningResult};
use crate::router;

// ── Node ──────────────────────────────────────────────────────────────────────

/// Role of an expanded planning-graph node.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PlanNodeKind {
    /// Docking starts here (first node of a dock→wait→undock→end chain).
    Dock,
    /// The station operation proper starts here.
    Wait,
    /// Undocking starts here.
    Undock,
    /// Chain finished; the robot can be redirected.
    End,
    /// Copied through unchanged (waiting, departure, parking, queue).
    NoChanges,
    /// Entry half of an expanded intersection.
    IntersectionIn,
    /// Exit half of an expanded intersection.
    IntersectionOut,
}

impl PlanNodeKind {
    /// Position step along the waiting→departure segment for POI-chain
    /// display coordinates (dock=1 … end=4); `None` for non-chain kinds.
    pub(crate) fn chain_step(self) -> Option<u32> {
        match self {
            PlanNodeKind::Dock => Some(1),
            PlanNodeKind::Wait => Some(2),
            PlanNodeKind::Undock => Some(3),
            PlanNodeKind::End => Some(4),
            _ => None,
        }
    }
}

/// A node of the planning graph.
#[derive(Clone, Debug)]
pub struct PlanNode {
    /// The source node this planning node was expanded from.
    pub source: SourceNodeId,
    pub kind: PlanNodeKind,
    /// POI this node belongs to; [`PoiId::none`] outside POIs.
    pub poi: PoiId,
    /// Display position (metres).
    pub pos: Point,
}

// ── Edge ──────────────────────────────────────────────────────────────────────

/// A directed planning-graph edge: one robot action.
#[derive(Clone, Debug)]
pub struct PlanEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub action: EdgeAction,
    /// Traversal cost; `None` means unreachable (an inactive source edge lies
    /// on the path).  Callers must distinguish this from any finite weight.
    pub weight: Option<u32>,
    /// Mutual-exclusion group; [`GroupId::NONE`] for independent edges.
    pub group: GroupId,
    /// Capacity for independent edges; group edges are capped at one robot
    /// by group semantics regardless of this value.
    pub max_robots: u32,
    /// Width class of the underlying corridor; `None` for POI-chain edges.
    pub way: Option<WayType>,
    /// Source nodes the edge passes through, in order.
    pub source_nodes: Vec<SourceNodeId>,
    /// Source edges the edge traverses; empty for POI-chain and
    /// intersection-internal edges.
    pub source_edges: Vec<SourceEdgeId>,
    /// POI whose approach this edge is, for parking/queue/waiting slots.
    pub connected_poi: Option<PoiId>,
    /// Robots currently on the edge; rewritten from the snapshot every tick.
    pub robots: Vec<RobotId>,
}

// ── PlanningGraph ─────────────────────────────────────────────────────────────

/// The immutable product of supervisor-graph construction.
///
/// Construct via [`build_supervisor_graph`](crate::build_supervisor_graph).
pub struct PlanningGraph {
    nodes: Vec<PlanNode>,
    edges: Vec<PlanEdge>,
    /// CSR row pointer; outgoing edges of node `n` are
    /// `edges[node_out_start[n] .. node_out_start[n+1]]`.
    node_out_start: Vec<u32>,
    edge_index: FxHashMap<(NodeId, NodeId), EdgeId>,
    groups: FxHashMap<GroupId, Vec<EdgeId>>,
    poi_nodes: FxHashMap<PoiId, Vec<NodeId>>,
    poi_kinds: FxHashMap<PoiId, PoiKind>,
    /// Exclusion groups owned by POIs and parkings, keyed by POI.
    poi_groups: FxHashMap<PoiId, GroupId>,
    source_positions: FxHashMap<SourceNodeId, Point>,
}

impl PlanningGraph {
    /// Assemble the CSR adjacency and lookup indexes from builder output.
    pub(crate) fn from_parts(
        nodes: Vec<PlanNode>,
        mut edges: Vec<PlanEdge>,
        poi_kinds: FxHashMap<PoiId, PoiKind>,
        poi_groups: FxHashMap<PoiId, GroupId>,
        source_positions: FxHashMap<SourceNodeId, Point>,
    ) -> Self {
        edges.sort_by_key(|e| (e.from, e.to));

        let node_count = nodes.len();
        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &edges {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }

        let mut edge_index = FxHashMap::default();
        let mut groups: FxHashMap<GroupId, Vec<EdgeId>> = FxHashMap::default();
        for (i, e) in edges.iter().enumerate() {
            let id = EdgeId(i as u32);
            edge_index.insert((e.from, e.to), id);
            if !e.group.is_none() {
                groups.entry(e.group).or_default().push(id);
            }
        }

        let mut poi_nodes: FxHashMap<PoiId, Vec<NodeId>> = FxHashMap::default();
        for (i, n) in nodes.iter().enumerate() {
            if n.poi.is_some() {
                poi_nodes.entry(n.poi.clone()).or_default().push(NodeId(i as u32));
            }
        }

        Self {
            nodes,
            edges,
            node_out_start,
            edge_index,
            groups,
            poi_nodes,
            poi_kinds,
            poi_groups,
            source_positions,
        }
    }

    // ── Dimensions & access ───────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &PlanNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &PlanEdge {
        &self.edges[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PlanNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &PlanEdge)> {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i as u32), e))
    }

    /// The edge between two nodes, if one exists.
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.edge_index.get(&(from, to)).copied()
    }

    /// Like [`edge_between`](Self::edge_between) but a contract violation if
    /// absent.
    pub fn require_edge(&self, from: NodeId, to: NodeId) -> PlanningResult<EdgeId> {
        self.edge_between(from, to)
            .ok_or(PlanningError::UnknownEdge { from, to })
    }

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    ///
    /// A contiguous index range — no heap allocation.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    // ── POI registry ──────────────────────────────────────────────────────

    pub fn poi_kind(&self, poi: &PoiId) -> Option<PoiKind> {
        self.poi_kinds.get(poi).copied()
    }

    pub fn pois(&self) -> impl Iterator<Item = (&PoiId, PoiKind)> {
        self.poi_kinds.iter().map(|(p, k)| (p, *k))
    }

    fn require_poi(&self, poi: &PoiId) -> PlanningResult<PoiKind> {
        self.poi_kind(poi)
            .ok_or_else(|| PlanningError::UnknownPoi(poi.clone()))
    }

    fn poi_node_of_kind(&self, poi: &PoiId, kind: PlanNodeKind) -> Option<NodeId> {
        self.poi_nodes
            .get(poi)?
            .iter()
            .copied()
            .find(|n| self.node(*n).kind == kind)
    }

    fn require_poi_node(
        &self,
        poi: &PoiId,
        kind: PlanNodeKind,
        wanted: &'static str,
    ) -> PlanningResult<NodeId> {
        self.poi_node_of_kind(poi, kind)
            .ok_or_else(|| PlanningError::MissingPoiNode {
                poi: poi.clone(),
                wanted,
            })
    }

    // ── Behaviour-terminal node lookups ───────────────────────────────────

    /// Terminal node of the GO_TO approach into `poi`: the `dock` node for
    /// docking POIs, the `wait` node for wait POIs, the single node otherwise.
    pub fn end_go_to_node(&self, poi: &PoiId) -> PlanningResult<NodeId> {
        match self.require_poi(poi)?.section() {
            SectionKind::DockWaitUndock => self.require_poi_node(poi, PlanNodeKind::Dock, "dock"),
            SectionKind::WaitPoi => self.require_poi_node(poi, PlanNodeKind::Wait, "wait"),
            _ => self
                .poi_nodes
                .get(poi)
                .and_then(|ns| ns.first().copied())
                .ok_or_else(|| PlanningError::MissingPoiNode {
                    poi: poi.clone(),
                    wanted: "base",
                }),
        }
    }

    /// Terminal node of the DOCK edge inside `poi`'s chain.
    pub fn end_docking_node(&self, poi: &PoiId) -> PlanningResult<NodeId> {
        self.require_poi(poi)?;
        self.require_poi_node(poi, PlanNodeKind::Wait, "wait")
    }

    /// Terminal node of the WAIT edge inside `poi`'s chain.
    pub fn end_wait_node(&self, poi: &PoiId) -> PlanningResult<NodeId> {
        match self.require_poi(poi)?.section() {
            SectionKind::DockWaitUndock => {
                self.require_poi_node(poi, PlanNodeKind::Undock, "undock")
            }
            _ => self.require_poi_node(poi, PlanNodeKind::End, "end"),
        }
    }

    /// Terminal node of the UNDOCK edge inside `poi`'s chain.
    pub fn end_undocking_node(&self, poi: &PoiId) -> PlanningResult<NodeId> {
        self.require_poi(poi)?;
        self.require_poi_node(poi, PlanNodeKind::End, "end")
    }

    // ── Group & capacity accounting ───────────────────────────────────────

    /// All edges in exclusion group `group`.
    pub fn edges_by_group(&self, group: GroupId) -> &[EdgeId] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The exclusion group a POI (or parking) owns, if it owns one.
    pub fn poi_group(&self, poi: &PoiId) -> Option<GroupId> {
        self.poi_groups.get(poi).copied()
    }

    /// `true` if `group` is owned by a POI or parking (as opposed to a
    /// narrow-corridor pair or an intersection).
    pub fn is_poi_group(&self, group: GroupId) -> bool {
        self.poi_groups.values().any(|g| *g == group)
    }

    /// Robots currently occupying `edge`, counting the whole exclusion group
    /// for grouped edges.
    ///
    /// For a non-zero group the union must hold at most one robot; more is a
    /// contract violation.
    pub fn robots_in_group_edge(&self, edge: EdgeId) -> PlanningResult<Vec<RobotId>> {
        let e = self.edge(edge);
        if e.group.is_none() {
            return Ok(e.robots.clone());
        }
        let mut robots: Vec<RobotId> = Vec::new();
        for member in self.edges_by_group(e.group) {
            for r in &self.edge(*member).robots {
                if !robots.contains(r) {
                    robots.push(r.clone());
                }
            }
        }
        if robots.len() > 1 {
            return Err(PlanningError::GroupOverflow(e.group));
        }
        Ok(robots)
    }

    /// Effective robot capacity of `edge`: one for grouped edges, the edge's
    /// own `max_robots` otherwise.
    pub fn max_allowed_robots(&self, edge: EdgeId) -> u32 {
        let e = self.edge(edge);
        if e.group.is_none() { e.max_robots } else { 1 }
    }

    /// Per-POI robot capacity derived from the connected-POI approach tags:
    /// parking holds one robot, a queue holds as many as fit on its approach
    /// edge, and an operational POI holds its approach-edge capacity plus the
    /// seat at the station itself.
    pub fn max_allowed_robots_using_pois(&self) -> FxHashMap<PoiId, u32> {
        let mut capacity: FxHashMap<PoiId, u32> =
            self.poi_kinds.keys().map(|p| (p.clone(), 0)).collect();
        for e in &self.edges {
            let Some(poi) = &e.connected_poi else { continue };
            let Some(kind) = self.poi_kind(poi) else { continue };
            let slots = match kind {
                PoiKind::Parking => 1,
                PoiKind::Queue => e.max_robots.max(1),
                _ => e.max_robots + 1,
            };
            capacity.insert(poi.clone(), slots);
        }
        capacity
    }

    /// Canonical "at rest inside the POI" edge for each POI: the last chain
    /// edge for expanded POIs, the approach edge for pass-through POIs.
    ///
    /// Used to place robots whose snapshot reports a POI id instead of a
    /// concrete graph edge.
    pub fn base_poi_edges(&self) -> FxHashMap<PoiId, (NodeId, NodeId)> {
        let mut base = FxHashMap::default();
        for (poi, kind) in &self.poi_kinds {
            let pair = match kind.section() {
                SectionKind::DockWaitUndock => self
                    .poi_node_of_kind(poi, PlanNodeKind::Undock)
                    .zip(self.poi_node_of_kind(poi, PlanNodeKind::End)),
                SectionKind::WaitPoi => self
                    .poi_node_of_kind(poi, PlanNodeKind::Wait)
                    .zip(self.poi_node_of_kind(poi, PlanNodeKind::End)),
                SectionKind::NoChanges => {
                    let node = self.poi_nodes.get(poi).and_then(|ns| ns.first().copied());
                    node.and_then(|n| {
                        self.edges()
                            .find(|(_, e)| e.to == n)
                            .map(|(_, e)| (e.from, e.to))
                    })
                }
                _ => None,
            };
            if let Some((from, to)) = pair {
                base.insert(poi.clone(), (from, to));
            }
        }
        base
    }

    // ── Occupancy ─────────────────────────────────────────────────────────

    /// Rewrite per-edge occupancy from the tick's fleet snapshot.
    ///
    /// Clears every edge's robot list, places each robot on its reported
    /// edge, and checks the occupancy contracts: at most one robot across any
    /// exclusion group, at most `max_robots` on an independent edge.
    pub fn set_robots_on_edges<I>(&mut self, placements: I) -> PlanningResult<()>
    where
        I: IntoIterator<Item = (RobotId, (NodeId, NodeId))>,
    {
        for e in &mut self.edges {
            e.robots.clear();
        }
        for (robot, (from, to)) in placements {
            let edge = self.require_edge(from, to)?;
            self.edges[edge.index()].robots.push(robot);
        }
        // Contract check at the tick boundary.
        for (id, e) in self.edges.iter().enumerate() {
            let id = EdgeId(id as u32);
            if e.robots.is_empty() {
                continue;
            }
            if e.group.is_none() {
                if e.robots.len() > e.max_robots as usize {
                    return Err(PlanningError::EdgeOverflow {
                        edge: id,
                        got: e.robots.len(),
                        max: e.max_robots,
                    });
                }
            } else {
                self.robots_in_group_edge(id)?;
            }
        }
        Ok(())
    }

    // ── Routing ───────────────────────────────────────────────────────────

    /// Shortest path from `from` to `to` as a node sequence, masking every
    /// POI that is neither endpoint's.
    ///
    /// `from == to` is a contract violation — stationary goals must be
    /// detected by the caller before routing.
    pub fn path(&self, from: NodeId, to: NodeId) -> PlanningResult<Vec<NodeId>> {
        router::path(self, from, to)
    }

    /// Cumulative weight of the masked shortest path; 0 when `from == to`.
    pub fn path_length(&self, from: NodeId, to: NodeId) -> PlanningResult<u32> {
        router::path_length(self, from, to)
    }

    // ── Corridor geometry ─────────────────────────────────────────────────

    /// The polyline a robot sweeps while traversing a GO_TO `edge`: the
    /// source-path positions, with the endpoints replaced by the expanded
    /// nodes' display positions.  Intersection-internal edges yield the
    /// entry → centre → exit dog-leg.
    pub fn corridor_path(&self, edge: EdgeId) -> PlanningResult<Vec<Point>> {
        let e = self.edge(edge);
        if e.action != EdgeAction::GoTo {
            return Err(PlanningError::UnknownEdge { from: e.from, to: e.to });
        }
        let start = self.node(e.from).pos;
        let end = self.node(e.to).pos;
        if e.source_nodes.len() == 1 {
            let centre = self.source_positions[&e.source_nodes[0]];
            return Ok(vec![start, centre, end]);
        }
        let mut pts: Vec<Point> = e
            .source_nodes
            .iter()
            .map(|n| self.source_positions[n])
            .collect();
        if let Some(first) = pts.first_mut() {
            *first = start;
        }
        if let Some(last) = pts.last_mut() {
            *last = end;
        }
        Ok(pts)
    }
}
