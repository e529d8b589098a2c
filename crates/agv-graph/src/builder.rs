//! Supervisor-graph construction: expanding the validated source graph into
//! the planning graph.
//!
//! # Expansion rules
//!
//! | Source node            | Planning nodes                                  |
//! |------------------------|-------------------------------------------------|
//! | docking POI            | dock → wait → undock → end chain                |
//! | wait POI               | wait → end chain                                |
//! | waiting/departure/parking/queue | one pass-through node                  |
//! | intersection           | one `in` half per incoming direction, one `out` |
//! |                        | half per outgoing direction, fully cross-wired  |
//!
//! Chain edges carry the DOCK/WAIT/UNDOCK actions; everything else is GO_TO.
//!
//! # Groups
//!
//! Every docking/wait POI and every parking node owns a mutual-exclusion
//! group shared by its chain edges and every reduced edge touching it.  Each
//! remaining narrow two-way corridor forms a two-edge group with its reverse
//! twin.  Each intersection's cross edges share one fresh group — one robot
//! crosses an intersection at a time — except waiting-departure
//! intersections, whose cross edges count against the attached POI's group.

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use agv_core::{
    DispatchConfig, EdgeAction, GroupId, NodeId, PoiId, PoiKind, Point, SectionKind,
    SourceNodeId, WayType,
};
use agv_core::geo::polyline_len;

use crate::convert::{GraphConverter, ReducedEdge};
use crate::error::{GraphError, GraphResult};
use crate::graph::{PlanEdge, PlanNode, PlanNodeKind, PlanningGraph};
use crate::source::SourceGraph;

/// Convert, validate, and expand `source` into a [`PlanningGraph`].
pub fn build_supervisor_graph(
    source: &SourceGraph,
    cfg: &DispatchConfig,
) -> GraphResult<PlanningGraph> {
    let reduced = GraphConverter::convert(source)?;
    SupervisorGraphBuilder::new(source, cfg).build(reduced)
}

// ── Expanded-POI bookkeeping ──────────────────────────────────────────────────

/// Planning nodes a source POI node expanded into.
enum ExpandedPoi {
    Chain {
        dock: NodeId,
        end: NodeId,
    },
    Short {
        wait: NodeId,
        end: NodeId,
    },
    Single(NodeId),
}

impl ExpandedPoi {
    /// Node where an arriving GO_TO edge terminates.
    fn entry(&self) -> NodeId {
        match *self {
            ExpandedPoi::Chain { dock, .. } => dock,
            ExpandedPoi::Short { wait, .. } => wait,
            ExpandedPoi::Single(n) => n,
        }
    }

    /// Node where a departing GO_TO edge originates.
    fn exit(&self) -> NodeId {
        match *self {
            ExpandedPoi::Chain { end, .. } | ExpandedPoi::Short { end, .. } => end,
            ExpandedPoi::Single(n) => n,
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

struct SupervisorGraphBuilder<'a> {
    source: &'a SourceGraph,
    cfg: &'a DispatchConfig,
    nodes: Vec<PlanNode>,
    edges: Vec<PlanEdge>,
    next_group: u32,
    /// POI/parking source node → its owned exclusion group.
    poi_groups: FxHashMap<SourceNodeId, GroupId>,
    /// Source POI node → its expanded planning nodes.
    expanded: FxHashMap<SourceNodeId, ExpandedPoi>,
    /// Intersection source node → its entry halves, in creation order.
    halves_in: FxHashMap<SourceNodeId, Vec<NodeId>>,
    /// Intersection source node → its exit halves, in creation order.
    halves_out: FxHashMap<SourceNodeId, Vec<NodeId>>,
}

impl<'a> SupervisorGraphBuilder<'a> {
    fn new(source: &'a SourceGraph, cfg: &'a DispatchConfig) -> Self {
        Self {
            source,
            cfg,
            nodes: Vec::new(),
            edges: Vec::new(),
            next_group: 1,
            poi_groups: FxHashMap::default(),
            expanded: FxHashMap::default(),
            halves_in: FxHashMap::default(),
            halves_out: FxHashMap::default(),
        }
    }

    fn build(mut self, mut reduced: Vec<ReducedEdge>) -> GraphResult<PlanningGraph> {
        self.allocate_groups(&mut reduced);
        self.add_docking_poi_chains();
        self.add_wait_poi_chains();
        self.add_pass_through_nodes();
        self.add_main_paths(&reduced)?;
        self.add_intersection_cross_edges(&reduced);
        self.set_node_positions(&reduced);
        self.tag_connected_pois()?;
        self.set_weights();
        self.set_capacities();

        info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            groups = self.next_group - 1,
            "supervisor graph built"
        );

        let poi_kinds: FxHashMap<PoiId, PoiKind> = self.source.poi_kinds().into_iter().collect();
        let poi_group_map: FxHashMap<PoiId, GroupId> = self
            .poi_groups
            .iter()
            .map(|(node, group)| (self.source.nodes[node].poi.clone(), *group))
            .filter(|(poi, _)| poi.is_some())
            .collect();
        let source_positions: FxHashMap<SourceNodeId, Point> = self
            .source
            .nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.pos))
            .collect();
        Ok(PlanningGraph::from_parts(
            self.nodes,
            self.edges,
            poi_kinds,
            poi_group_map,
            source_positions,
        ))
    }

    fn fresh_group(&mut self) -> GroupId {
        let g = GroupId(self.next_group);
        self.next_group += 1;
        g
    }

    // ── Group allocation ──────────────────────────────────────────────────

    /// Give every docking/wait POI and parking node its own group, inherited
    /// by every reduced edge touching it; pair leftover narrow two-way edges
    /// with their reverse twins under fresh shared groups.
    fn allocate_groups(&mut self, reduced: &mut [ReducedEdge]) {
        for (id, node) in &self.source.nodes {
            let owns_group = node.kind.is_operational() || node.kind == PoiKind::Parking;
            if owns_group {
                let g = self.fresh_group();
                self.poi_groups.insert(id.clone(), g);
            }
        }

        for edge in reduced.iter_mut() {
            if let Some(g) = self.poi_groups.get(&edge.start) {
                edge.group = *g;
            } else if let Some(g) = self.poi_groups.get(&edge.end) {
                edge.group = *g;
            }
        }

        // Remaining narrow two-way corridors: each pair of mirror
        // orientations excludes each other.
        let mut unpaired: Vec<usize> = reduced
            .iter()
            .enumerate()
            .filter(|(_, e)| e.way == WayType::NarrowTwoWay && e.group.is_none())
            .map(|(i, _)| i)
            .collect();
        while let Some(i) = unpaired.pop() {
            let twin_path: Vec<_> = reduced[i].source_nodes.iter().rev().cloned().collect();
            if let Some(pos) = unpaired
                .iter()
                .position(|&j| reduced[j].source_nodes == twin_path)
            {
                let j = unpaired.swap_remove(pos);
                let g = self.fresh_group();
                reduced[i].group = g;
                reduced[j].group = g;
            }
        }
        debug!(groups = self.next_group - 1, "edge groups allocated");
    }

    // ── Node expansion ────────────────────────────────────────────────────

    fn push_node(&mut self, source: &SourceNodeId, kind: PlanNodeKind, poi: PoiId) -> NodeId {
        let pos = self.source.nodes[source].pos;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PlanNode {
            source: source.clone(),
            kind,
            poi,
            pos,
        });
        id
    }

    fn push_chain_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        action: EdgeAction,
        group: GroupId,
        source: &SourceNodeId,
    ) {
        self.edges.push(PlanEdge {
            from,
            to,
            action,
            weight: None,
            group,
            max_robots: 1,
            way: None,
            source_nodes: vec![source.clone()],
            source_edges: Vec::new(),
            connected_poi: None,
            robots: Vec::new(),
        });
    }

    /// dock → wait → undock → end for every docking POI.
    fn add_docking_poi_chains(&mut self) {
        let ids: Vec<SourceNodeId> = self.section_nodes(SectionKind::DockWaitUndock);
        for id in ids {
            let poi = self.source.nodes[&id].poi.clone();
            let group = self.poi_groups[&id];

            let dock = self.push_node(&id, PlanNodeKind::Dock, poi.clone());
            let wait = self.push_node(&id, PlanNodeKind::Wait, poi.clone());
            let undock = self.push_node(&id, PlanNodeKind::Undock, poi.clone());
            let end = self.push_node(&id, PlanNodeKind::End, poi);

            self.push_chain_edge(dock, wait, EdgeAction::Dock, group, &id);
            self.push_chain_edge(wait, undock, EdgeAction::Wait, group, &id);
            self.push_chain_edge(undock, end, EdgeAction::Undock, group, &id);

            self.expanded.insert(id, ExpandedPoi::Chain { dock, end });
        }
    }

    /// wait → end for every wait POI.
    fn add_wait_poi_chains(&mut self) {
        let ids: Vec<SourceNodeId> = self.section_nodes(SectionKind::WaitPoi);
        for id in ids {
            let poi = self.source.nodes[&id].poi.clone();
            let group = self.poi_groups[&id];

            let wait = self.push_node(&id, PlanNodeKind::Wait, poi.clone());
            let end = self.push_node(&id, PlanNodeKind::End, poi);
            self.push_chain_edge(wait, end, EdgeAction::Wait, group, &id);

            self.expanded.insert(id, ExpandedPoi::Short { wait, end });
        }
    }

    /// Single pass-through node for waiting, departure, parking and queue.
    fn add_pass_through_nodes(&mut self) {
        let ids: Vec<SourceNodeId> = self.section_nodes(SectionKind::NoChanges);
        for id in ids {
            let poi = self.source.nodes[&id].poi.clone();
            let node = self.push_node(&id, PlanNodeKind::NoChanges, poi);
            self.expanded.insert(id, ExpandedPoi::Single(node));
        }
    }

    fn section_nodes(&self, section: SectionKind) -> Vec<SourceNodeId> {
        self.source
            .nodes
            .iter()
            .filter(|(_, n)| n.kind.section() == section)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn section_of(&self, node: &SourceNodeId) -> SectionKind {
        self.source.nodes[node].kind.section()
    }

    /// The planning nodes a non-intersection endpoint expanded into.  Absence
    /// means the source data names a node the expansion passes never saw.
    fn expanded_poi(&self, node: &SourceNodeId) -> GraphResult<&ExpandedPoi> {
        self.expanded.get(node).ok_or_else(|| GraphError::BadConnection {
            node: node.clone(),
            detail: "edge endpoint was never expanded into planning nodes".to_owned(),
        })
    }

    // ── Main-path edges ───────────────────────────────────────────────────

    /// One GO_TO edge per reduced edge, with intersection endpoints expanded
    /// into fresh in/out halves and POI endpoints resolved to their chain's
    /// entry/exit node.
    fn add_main_paths(&mut self, reduced: &[ReducedEdge]) -> GraphResult<()> {
        for r in reduced {
            let start = r.start.clone();
            let end = r.end.clone();
            let start_is_x = self.section_of(&start) == SectionKind::Intersection;
            let end_is_x = self.section_of(&end) == SectionKind::Intersection;

            let from = if start_is_x {
                let half = self.push_node(&start, PlanNodeKind::IntersectionOut, PoiId::none());
                self.halves_out.entry(start.clone()).or_default().push(half);
                half
            } else {
                self.expanded_poi(&start)?.exit()
            };
            let to = if end_is_x {
                let half = self.push_node(&end, PlanNodeKind::IntersectionIn, PoiId::none());
                self.halves_in.entry(end.clone()).or_default().push(half);
                half
            } else {
                self.expanded_poi(&end)?.entry()
            };

            self.edges.push(PlanEdge {
                from,
                to,
                action: EdgeAction::GoTo,
                weight: None,
                group: r.group,
                max_robots: 1,
                way: Some(r.way),
                source_nodes: r.source_nodes.clone(),
                source_edges: r.source_edges.clone(),
                connected_poi: None,
                robots: Vec::new(),
            });
        }
        Ok(())
    }

    // ── Intersection cross edges ──────────────────────────────────────────

    /// Wire every (in, out) half pair of each intersection with a one-way
    /// GO_TO edge.  One fresh shared group per intersection; waiting-departure
    /// intersections count against the attached POI's group instead.
    fn add_intersection_cross_edges(&mut self, reduced: &[ReducedEdge]) {
        let ids: Vec<SourceNodeId> = self.section_nodes(SectionKind::Intersection);
        for id in ids {
            let ins = self.halves_in.get(&id).cloned().unwrap_or_default();
            let outs = self.halves_out.get(&id).cloned().unwrap_or_default();
            if ins.is_empty() || outs.is_empty() {
                continue;
            }

            let wait_dep = self.source.nodes[&id].kind == PoiKind::WaitingDeparture;
            let group = if wait_dep {
                self.attached_poi_group(reduced, &id)
                    .unwrap_or_else(|| self.fresh_group())
            } else {
                self.fresh_group()
            };

            for &in_half in &ins {
                for &out_half in &outs {
                    self.edges.push(PlanEdge {
                        from: in_half,
                        to: out_half,
                        action: EdgeAction::GoTo,
                        weight: None,
                        group,
                        max_robots: 1,
                        way: Some(WayType::OneWay),
                        source_nodes: vec![id.clone()],
                        source_edges: Vec::new(),
                        connected_poi: None,
                        robots: Vec::new(),
                    });
                }
            }
        }
    }

    /// Group of the operational POI a waiting-departure node serves.
    fn attached_poi_group(&self, reduced: &[ReducedEdge], node: &SourceNodeId) -> Option<GroupId> {
        reduced
            .iter()
            .filter(|r| &r.start == node || &r.end == node)
            .find_map(|r| {
                let other = if &r.start == node { &r.end } else { &r.start };
                self.source.nodes[other]
                    .kind
                    .is_operational()
                    .then(|| self.poi_groups.get(other).copied())
                    .flatten()
            })
    }

    // ── Display positions ─────────────────────────────────────────────────

    fn set_node_positions(&mut self, reduced: &[ReducedEdge]) {
        for idx in 0..self.nodes.len() {
            let kind = self.nodes[idx].kind;
            let pos = match kind {
                PlanNodeKind::Dock
                | PlanNodeKind::Wait
                | PlanNodeKind::Undock
                | PlanNodeKind::End => self.chain_node_pos(idx, reduced),
                PlanNodeKind::NoChanges => self.nodes[idx].pos,
                PlanNodeKind::IntersectionIn | PlanNodeKind::IntersectionOut => {
                    self.intersection_half_pos(idx)
                }
            };
            self.nodes[idx].pos = pos;
        }
    }

    /// POI chain nodes are stepped at `k·d/5` along the segment from the node
    /// before the POI to the node after it (k = 1..4 for dock..end).  POIs
    /// fed by a waiting-departure node keep the POI's own position.
    fn chain_node_pos(&self, idx: usize, reduced: &[ReducedEdge]) -> Point {
        let node = &self.nodes[idx];
        let poi_source = &node.source;
        let own_pos = self.source.nodes[poi_source].pos;

        let before = reduced
            .iter()
            .find(|r| &r.end == poi_source)
            .map(|r| r.start.clone());
        let after = reduced
            .iter()
            .find(|r| &r.start == poi_source)
            .map(|r| r.end.clone());
        let (Some(before), Some(after)) = (before, after) else {
            return own_pos;
        };
        if self.source.nodes[&before].kind == PoiKind::WaitingDeparture {
            return own_pos;
        }

        let p_before = self.source.nodes[&before].pos;
        let p_after = self.source.nodes[&after].pos;
        let angle = p_before.angle_to(p_after);
        let step = p_before.dist(p_after) / 5.0;
        let k = node.kind.chain_step().unwrap_or(0) as f64;
        Point::new(
            p_before.x + angle.cos() * step * k,
            p_before.y + angle.sin() * step * k,
        )
    }

    /// Intersection halves sit offset from the intersection centre along the
    /// way they serve: forward by corridor width + robot length, sideways by
    /// half a corridor (mirrored for in vs. out, centred for ways too narrow
    /// to pass in).
    fn intersection_half_pos(&self, idx: usize) -> Point {
        let node_id = NodeId(idx as u32);
        let node = &self.nodes[idx];
        let centre = self.source.nodes[&node.source].pos;

        // The outward main-path edge at this half: its far endpoint belongs
        // to a different source node (cross edges connect halves of the same
        // intersection and never qualify).
        let outward = self.edges.iter().find_map(|e| {
            let other = if e.from == node_id {
                e.to
            } else if e.to == node_id {
                e.from
            } else {
                return None;
            };
            (self.nodes[other.index()].source != node.source).then_some((other, e))
        });
        let Some((other, edge)) = outward else {
            return Point::new(0.0, 0.0);
        };

        // Aim at the source node adjacent to the intersection along the
        // path, falling back to the far endpoint for single-hop edges.
        let target = if edge.source_nodes.len() >= 2 {
            let adjacent = if edge.source_nodes[0] == node.source {
                &edge.source_nodes[1]
            } else {
                &edge.source_nodes[edge.source_nodes.len() - 2]
            };
            self.source.nodes[adjacent].pos
        } else {
            self.source.nodes[&self.nodes[other.index()].source].pos
        };

        let angle = centre.angle_to(target);
        let forward = self.cfg.corridor_width_m + self.cfg.robot_length_m;
        let mut lateral = match node.kind {
            PlanNodeKind::IntersectionIn => self.cfg.corridor_width_m / 2.0,
            _ => -self.cfg.corridor_width_m / 2.0,
        };
        if edge.way != Some(WayType::TwoWay) {
            lateral = 0.0;
        }
        Point::new(
            centre.x + angle.cos() * forward - angle.sin() * lateral,
            centre.y + angle.sin() * forward + angle.cos() * lateral,
        )
    }

    // ── Connected-POI tags ────────────────────────────────────────────────

    /// Tag the approach edges that admit robots toward parking, queue and
    /// waiting slots with the POI they serve; used by per-POI free-slot
    /// accounting.
    fn tag_connected_pois(&mut self) -> GraphResult<()> {
        // Parking and queue: the edge into the pass-through node, tagged with
        // the node's own POI.
        let slots: Vec<(SourceNodeId, PoiId)> = self
            .source
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind, PoiKind::Parking | PoiKind::Queue))
            .map(|(id, n)| (id.clone(), n.poi.clone()))
            .collect();
        for (id, poi) in slots {
            let node = self.expanded[&id].entry();
            if let Some(e) = self.edges.iter_mut().find(|e| e.to == node) {
                e.connected_poi = Some(poi);
            }
        }

        // Waiting nodes: the edge into the waiting node, tagged with the POI
        // the waiting node feeds.
        let waits: Vec<SourceNodeId> = self
            .source
            .nodes
            .iter()
            .filter(|(_, n)| n.kind == PoiKind::Waiting)
            .map(|(id, _)| id.clone())
            .collect();
        for id in waits {
            let node = self.expanded[&id].entry();
            let fed_poi = self
                .edges
                .iter()
                .find(|e| e.from == node)
                .map(|e| self.nodes[e.to.index()].poi.clone());
            if let (Some(poi), Some(e)) =
                (fed_poi, self.edges.iter_mut().find(|e| e.to == node))
            {
                e.connected_poi = Some(poi);
            }
        }

        // Waiting-departure: two edges end at the node's entry halves — the
        // POI-side edge (grouped with the POI) and the waiting-side edge from
        // the road network.  The waiting-side edge gets the tag.
        let wait_deps: Vec<SourceNodeId> = self
            .source
            .nodes
            .iter()
            .filter(|(_, n)| n.kind == PoiKind::WaitingDeparture)
            .map(|(id, _)| id.clone())
            .collect();
        for id in wait_deps {
            let ins = self.halves_in.get(&id).cloned().unwrap_or_default();
            // Cross edges never end at an entry half, so these are exactly
            // the two main-path approaches.
            let incoming: Vec<usize> = self
                .edges
                .iter()
                .enumerate()
                .filter(|(_, e)| ins.contains(&e.to))
                .map(|(i, _)| i)
                .collect();
            if incoming.len() != 2 {
                return Err(GraphError::BadConnection {
                    node: id.clone(),
                    detail: format!(
                        "waiting-departure expects two approach edges, found {}",
                        incoming.len()
                    ),
                });
            }
            let (poi_side, wait_side) = if !self.edges[incoming[0]].group.is_none() {
                (incoming[0], incoming[1])
            } else {
                (incoming[1], incoming[0])
            };
            let poi = self.nodes[self.edges[poi_side].from.index()].poi.clone();
            self.edges[wait_side].connected_poi = Some(poi);
        }
        Ok(())
    }

    // ── Weights & capacities ──────────────────────────────────────────────

    /// Nominal time cost per edge; edges crossing an inactive source edge are
    /// unreachable (`None`), never merely expensive.
    fn set_weights(&mut self) {
        let source = self.source;
        let cfg = self.cfg;
        for e in &mut self.edges {
            let blocked = e
                .source_edges
                .iter()
                .any(|id| !source.edges[id].is_active);
            if blocked {
                e.weight = None;
                continue;
            }
            e.weight = Some(match e.action {
                EdgeAction::GoTo if !e.group.is_none() && e.source_nodes.len() == 1 => {
                    cfg.intersection_weight
                }
                EdgeAction::GoTo => {
                    let pts: Vec<Point> = e
                        .source_nodes
                        .iter()
                        .map(|n| source.nodes[n].pos)
                        .collect();
                    (polyline_len(&pts) / cfg.robot_velocity_mps).ceil() as u32
                }
                EdgeAction::Dock => cfg.docking_weight,
                EdgeAction::Wait => cfg.wait_weight,
                EdgeAction::Undock => cfg.undocking_weight,
            });
        }
    }

    /// Long corridor edges away from POIs hold as many robots as fit
    /// nose-to-tail; everything else holds one.
    fn set_capacities(&mut self) {
        let source = self.source;
        let cfg = self.cfg;
        let restricted: Vec<&SourceNodeId> = source
            .nodes
            .iter()
            .filter(|(_, n)| n.kind.is_operational() || n.kind == PoiKind::Parking)
            .map(|(id, _)| id)
            .collect();
        for e in &mut self.edges {
            let touches_poi = e
                .source_nodes
                .first()
                .zip(e.source_nodes.last())
                .is_some_and(|(first, last)| {
                    restricted.contains(&first) || restricted.contains(&last)
                });
            if e.action == EdgeAction::GoTo && e.source_nodes.len() > 1 && !touches_poi {
                let pts: Vec<Point> =
                    e.source_nodes.iter().map(|n| source.nodes[n].pos).collect();
                let fit = (polyline_len(&pts) / cfg.robot_length_m).floor() as u32;
                e.max_robots = fit.max(1);
            } else {
                e.max_robots = 1;
            }
        }
    }
}
