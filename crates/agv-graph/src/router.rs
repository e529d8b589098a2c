//! Shortest-path routing with contextual POI masking.
//!
//! # Masking
//!
//! A trip from `from` to `to` may pass through nodes belonging to no POI, to
//! `from`'s POI, or to `to`'s POI — never through an unrelated POI.  The mask
//! is evaluated per edge inside Dijkstra's relaxation loop; the graph itself
//! is not touched, so concurrent queries against the same `&PlanningGraph`
//! are safe.
//!
//! Edges whose weight is `None` (an inactive source edge lies on their path)
//! are unreachable and never relaxed.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use agv_core::{EdgeId, NodeId, PoiId};

use crate::error::{PlanningError, PlanningResult};
use crate::graph::PlanningGraph;

/// POIs a query from `from` to `to` is allowed to touch.
struct PoiMask {
    start: PoiId,
    end: PoiId,
}

impl PoiMask {
    fn new(graph: &PlanningGraph, from: NodeId, to: NodeId) -> Self {
        Self {
            start: graph.node(from).poi.clone(),
            end: graph.node(to).poi.clone(),
        }
    }

    #[inline]
    fn allows(&self, poi: &PoiId) -> bool {
        poi.is_none() || *poi == self.start || *poi == self.end
    }
}

/// Masked shortest path as a node sequence (`from` first, `to` last).
pub fn path(graph: &PlanningGraph, from: NodeId, to: NodeId) -> PlanningResult<Vec<NodeId>> {
    if from == to {
        return Err(PlanningError::TrivialPath(from));
    }
    let (prev_edge, _) = dijkstra(graph, from, to)?;
    let mut nodes = vec![to];
    let mut cur = to;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        cur = graph.edge(e).from;
        nodes.push(cur);
    }
    nodes.reverse();
    Ok(nodes)
}

/// Cumulative weight of the masked shortest path; 0 when `from == to`.
pub fn path_length(graph: &PlanningGraph, from: NodeId, to: NodeId) -> PlanningResult<u32> {
    if from == to {
        return Ok(0);
    }
    let (_, cost) = dijkstra(graph, from, to)?;
    Ok(cost)
}

/// Standard Dijkstra over the CSR adjacency.
///
/// Returns the predecessor-edge array and the cost of reaching `to`.
/// The `Reverse` wrapper turns `BinaryHeap` (a max-heap) into a min-heap;
/// the secondary `NodeId` key makes tie-breaking deterministic.
fn dijkstra(
    graph: &PlanningGraph,
    from: NodeId,
    to: NodeId,
) -> PlanningResult<(Vec<EdgeId>, u32)> {
    let mask = PoiMask::new(graph, from, to);

    let n = graph.node_count();
    let mut dist = vec![u32::MAX; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    dist[from.index()] = 0;

    let mut heap: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Ok((prev_edge, cost));
        }
        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for edge_id in graph.out_edges(node) {
            let edge = graph.edge(edge_id);
            let Some(weight) = edge.weight else { continue };
            if !mask.allows(&graph.node(edge.from).poi) || !mask.allows(&graph.node(edge.to).poi) {
                continue;
            }

            let neighbor = edge.to;
            let new_cost = cost.saturating_add(weight);
            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = edge_id;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    Err(PlanningError::NoRoute { from, to })
}
