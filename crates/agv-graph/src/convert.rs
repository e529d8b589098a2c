//! Source-graph conversion: orientation expansion, normal-node collapse, and
//! connection-shape validation.
//!
//! # Reduced edges
//!
//! `normal` nodes are geometric waypoints, not decision points.  Every maximal
//! directed chain that starts at a non-normal node, runs through one or more
//! normal nodes, and ends at a non-normal node collapses into one *reduced
//! edge* that remembers the full node path and the source edges it traverses.
//! The rest of the pipeline only ever sees reduced edges.
//!
//! # Validation
//!
//! Each semantically typed node must sit in exactly the permitted
//! neighborhood (see the `validate_*` functions).  A violation is fatal at
//! construction: the operator must fix the source data.

use agv_core::{GroupId, PoiKind, SourceEdgeId, SourceNodeId, WayType};

use crate::error::{GraphError, GraphResult};
use crate::source::SourceGraph;

// ── ReducedEdge ───────────────────────────────────────────────────────────────

/// A directed edge of the intermediate graph after normal-node collapse.
#[derive(Clone, Debug)]
pub struct ReducedEdge {
    /// First node of the path; always non-normal.
    pub start: SourceNodeId,
    /// Last node of the path; always non-normal.
    pub end: SourceNodeId,
    /// Full ordered node path from `start` to `end`; interior nodes (if any)
    /// are normal waypoints.
    pub source_nodes: Vec<SourceNodeId>,
    /// Source edges traversed, in path order.
    pub source_edges: Vec<SourceEdgeId>,
    pub way: WayType,
    /// Mutual-exclusion group; assigned by the supervisor-graph builder.
    pub group: GroupId,
}

// ── GraphConverter ────────────────────────────────────────────────────────────

/// Stateless conversion pipeline from [`SourceGraph`] to reduced edges.
pub struct GraphConverter;

impl GraphConverter {
    /// Expand edge orientations, collapse normal-node chains, and validate
    /// every POI neighborhood.
    pub fn convert(source: &SourceGraph) -> GraphResult<Vec<ReducedEdge>> {
        let directed = orient_edges(source);
        let reduced = collapse_normal_chains(source, directed)?;
        validate_connections(source, &reduced)?;
        Ok(reduced)
    }
}

// ── Orientation expansion ─────────────────────────────────────────────────────

struct DirectedEdge {
    start: SourceNodeId,
    end: SourceNodeId,
    way: WayType,
    source: SourceEdgeId,
}

/// Emit one directed edge per orientation: two for `twoWay`/`narrowTwoWay`,
/// one for `oneWay`.  The source edge id is retained on every orientation.
fn orient_edges(source: &SourceGraph) -> Vec<DirectedEdge> {
    let mut out = Vec::with_capacity(source.edges.len() * 2);
    for (id, edge) in &source.edges {
        out.push(DirectedEdge {
            start: edge.start.clone(),
            end: edge.end.clone(),
            way: edge.way,
            source: id.clone(),
        });
        if edge.way.is_bidirectional() {
            out.push(DirectedEdge {
                start: edge.end.clone(),
                end: edge.start.clone(),
                way: edge.way,
                source: id.clone(),
            });
        }
    }
    out
}

// ── Normal-node collapse ──────────────────────────────────────────────────────

struct Chain {
    nodes: Vec<SourceNodeId>,
    edges: Vec<SourceEdgeId>,
    way: WayType,
    /// Position of the seed edge in the directed-edge list; keeps the output
    /// order deterministic.
    seed_idx: usize,
}

fn collapse_normal_chains(
    source: &SourceGraph,
    directed: Vec<DirectedEdge>,
) -> GraphResult<Vec<ReducedEdge>> {
    let is_normal =
        |id: &SourceNodeId| source.nodes.get(id).is_some_and(|n| n.kind == PoiKind::Normal);

    // Seed one chain per edge entering the normal region from outside.
    let mut chains: Vec<Chain> = Vec::new();
    let mut direct: Vec<(usize, &DirectedEdge)> = Vec::new();
    let mut pending: Vec<&DirectedEdge> = Vec::new();

    for (idx, edge) in directed.iter().enumerate() {
        match (is_normal(&edge.start), is_normal(&edge.end)) {
            (false, false) => direct.push((idx, edge)),
            (false, true) => chains.push(Chain {
                nodes: vec![edge.start.clone(), edge.end.clone()],
                edges: vec![edge.source.clone()],
                way: edge.way,
                seed_idx: idx,
            }),
            (true, _) => pending.push(edge),
        }
    }

    // Grow chains until no pending edge can extend any of them.  An edge may
    // extend a chain only if its source edge is not already on the chain —
    // that is what stops a chain from doubling back along the reverse
    // orientation of the edge it arrived on.
    loop {
        let before = pending.len();
        pending.retain(|edge| {
            for chain in chains.iter_mut() {
                if chain.nodes.last() == Some(&edge.start) && !chain.edges.contains(&edge.source) {
                    chain.nodes.push(edge.end.clone());
                    chain.edges.push(edge.source.clone());
                    return false;
                }
            }
            true
        });
        if pending.is_empty() {
            break;
        }
        if pending.len() == before {
            return Err(GraphError::OpenNormalChain {
                node: pending[0].start.clone(),
            });
        }
    }

    // Merge direct edges and collapsed chains back into input order.  Every
    // finished chain must terminate outside the normal region and must not
    // mix way types along the way.
    let mut reduced: Vec<(usize, ReducedEdge)> = direct
        .into_iter()
        .map(|(idx, edge)| {
            (
                idx,
                ReducedEdge {
                    start: edge.start.clone(),
                    end: edge.end.clone(),
                    source_nodes: vec![edge.start.clone(), edge.end.clone()],
                    source_edges: vec![edge.source.clone()],
                    way: edge.way,
                    group: GroupId::NONE,
                },
            )
        })
        .collect();
    for chain in chains {
        let endpoints = chain.nodes.first().cloned().zip(chain.nodes.last().cloned());
        let Some((start, end)) = endpoints else { continue };
        if is_normal(&end) {
            return Err(GraphError::OpenNormalChain { node: end });
        }
        let homogeneous = chain
            .edges
            .iter()
            .all(|e| source.edges.get(e).map(|s| s.way) == Some(chain.way));
        if !homogeneous {
            return Err(GraphError::MixedChainWayType { node: start });
        }
        reduced.push((
            chain.seed_idx,
            ReducedEdge {
                start,
                end,
                source_nodes: chain.nodes,
                source_edges: chain.edges,
                way: chain.way,
                group: GroupId::NONE,
            },
        ));
    }
    reduced.sort_by_key(|(idx, _)| *idx);
    Ok(reduced.into_iter().map(|(_, e)| e).collect())
}

// ── Connection-shape validation ───────────────────────────────────────────────

fn validate_connections(source: &SourceGraph, reduced: &[ReducedEdge]) -> GraphResult<()> {
    for (id, node) in &source.nodes {
        match node.kind {
            k if k.is_operational() => validate_poi(source, reduced, id)?,
            PoiKind::Parking => validate_parking(source, reduced, id)?,
            PoiKind::Queue => validate_queue(source, reduced, id)?,
            PoiKind::Waiting => validate_waiting(source, reduced, id)?,
            PoiKind::Departure => validate_departure(source, reduced, id)?,
            PoiKind::WaitingDeparture => validate_waiting_departure(source, reduced, id)?,
            _ => {}
        }
    }
    Ok(())
}

fn in_neighbors<'a>(reduced: &'a [ReducedEdge], node: &SourceNodeId) -> Vec<&'a SourceNodeId> {
    reduced
        .iter()
        .filter(|e| &e.end == node)
        .map(|e| &e.start)
        .collect()
}

fn out_neighbors<'a>(reduced: &'a [ReducedEdge], node: &SourceNodeId) -> Vec<&'a SourceNodeId> {
    reduced
        .iter()
        .filter(|e| &e.start == node)
        .map(|e| &e.end)
        .collect()
}

fn way_between(reduced: &[ReducedEdge], a: &SourceNodeId, b: &SourceNodeId) -> Option<WayType> {
    reduced
        .iter()
        .find(|e| &e.start == a && &e.end == b)
        .map(|e| e.way)
}

fn kind_of(source: &SourceGraph, node: &SourceNodeId) -> PoiKind {
    source.nodes[node].kind
}

fn bad(node: &SourceNodeId, detail: impl Into<String>) -> GraphError {
    GraphError::BadConnection {
        node: node.clone(),
        detail: detail.into(),
    }
}

/// One entry, one exit: `waiting → POI → departure` over one-way edges, or a
/// single `waiting-departure` node on both sides over narrow two-way edges.
fn validate_poi(
    source: &SourceGraph,
    reduced: &[ReducedEdge],
    node: &SourceNodeId,
) -> GraphResult<()> {
    let ins = in_neighbors(reduced, node);
    let outs = out_neighbors(reduced, node);
    if ins.len() != 1 {
        return Err(bad(node, "exactly one waiting/waiting-departure node must feed the POI"));
    }
    if outs.len() != 1 {
        return Err(bad(node, "exactly one departure/waiting-departure node must follow the POI"));
    }
    let in_kind = kind_of(source, ins[0]);
    let out_kind = kind_of(source, outs[0]);
    let in_way = way_between(reduced, ins[0], node);
    let out_way = way_between(reduced, node, outs[0]);

    match (in_kind, out_kind) {
        (PoiKind::Waiting, PoiKind::Departure) => {
            if in_way != Some(WayType::OneWay) || out_way != Some(WayType::OneWay) {
                return Err(bad(node, "edges must be one-way in waiting→POI→departure"));
            }
        }
        (PoiKind::WaitingDeparture, PoiKind::WaitingDeparture) => {
            if in_way != Some(WayType::NarrowTwoWay) || out_way != Some(WayType::NarrowTwoWay) {
                return Err(bad(
                    node,
                    "edges must be narrow two-way in waiting-departure↔POI",
                ));
            }
        }
        _ => {
            return Err(bad(
                node,
                "POI must connect as waiting→POI→departure or waiting-departure↔POI",
            ));
        }
    }
    Ok(())
}

/// Parking sits between intersections over narrow two-way edges.
fn validate_parking(
    source: &SourceGraph,
    reduced: &[ReducedEdge],
    node: &SourceNodeId,
) -> GraphResult<()> {
    let ins = in_neighbors(reduced, node);
    let outs = out_neighbors(reduced, node);
    if ins.len() != 1 || outs.len() != 1 {
        return Err(bad(node, "parking must connect to exactly one intersection each way"));
    }
    if kind_of(source, ins[0]) != PoiKind::Intersection
        || kind_of(source, outs[0]) != PoiKind::Intersection
    {
        return Err(bad(node, "parking must connect as intersection→parking→intersection"));
    }
    if way_between(reduced, ins[0], node) != Some(WayType::NarrowTwoWay)
        || way_between(reduced, node, outs[0]) != Some(WayType::NarrowTwoWay)
    {
        return Err(bad(
            node,
            "edges must be narrow two-way in intersection→parking→intersection",
        ));
    }
    Ok(())
}

/// Queue sits between intersections over one-way edges.
fn validate_queue(
    source: &SourceGraph,
    reduced: &[ReducedEdge],
    node: &SourceNodeId,
) -> GraphResult<()> {
    let ins = in_neighbors(reduced, node);
    let outs = out_neighbors(reduced, node);
    if ins.len() != 1 || outs.len() != 1 {
        return Err(bad(node, "queue must connect to exactly one intersection each way"));
    }
    if kind_of(source, ins[0]) != PoiKind::Intersection
        || kind_of(source, outs[0]) != PoiKind::Intersection
    {
        return Err(bad(node, "queue must connect as intersection→queue→intersection"));
    }
    if way_between(reduced, ins[0], node) != Some(WayType::OneWay)
        || way_between(reduced, node, outs[0]) != Some(WayType::OneWay)
    {
        return Err(bad(node, "edges must be one-way in intersection→queue→intersection"));
    }
    Ok(())
}

/// Waiting node: one-way intersection→waiting→POI.
fn validate_waiting(
    source: &SourceGraph,
    reduced: &[ReducedEdge],
    node: &SourceNodeId,
) -> GraphResult<()> {
    let ins = in_neighbors(reduced, node);
    let outs = out_neighbors(reduced, node);
    if ins.len() != 1 {
        return Err(bad(node, "exactly one intersection must feed the waiting node"));
    }
    if outs.len() != 1 {
        return Err(bad(node, "exactly one POI must follow the waiting node"));
    }
    if kind_of(source, ins[0]) != PoiKind::Intersection
        || !kind_of(source, outs[0]).is_operational()
    {
        return Err(bad(node, "waiting must connect as intersection→waiting→POI"));
    }
    if way_between(reduced, ins[0], node) != Some(WayType::OneWay)
        || way_between(reduced, node, outs[0]) != Some(WayType::OneWay)
    {
        return Err(bad(node, "edges must be one-way in intersection→waiting→POI"));
    }
    Ok(())
}

/// Departure node: one-way POI→departure→intersection.
fn validate_departure(
    source: &SourceGraph,
    reduced: &[ReducedEdge],
    node: &SourceNodeId,
) -> GraphResult<()> {
    let ins = in_neighbors(reduced, node);
    let outs = out_neighbors(reduced, node);
    if ins.len() != 1 {
        return Err(bad(node, "exactly one POI must feed the departure node"));
    }
    if outs.len() != 1 {
        return Err(bad(node, "exactly one intersection must follow the departure node"));
    }
    if !kind_of(source, ins[0]).is_operational()
        || kind_of(source, outs[0]) != PoiKind::Intersection
    {
        return Err(bad(node, "departure must connect as POI→departure→intersection"));
    }
    if way_between(reduced, ins[0], node) != Some(WayType::OneWay)
        || way_between(reduced, node, outs[0]) != Some(WayType::OneWay)
    {
        return Err(bad(node, "edges must be one-way in POI→departure→intersection"));
    }
    Ok(())
}

/// Waiting-departure node: two-way to an intersection, narrow two-way to the
/// POI it serves — both directions of each.
fn validate_waiting_departure(
    source: &SourceGraph,
    reduced: &[ReducedEdge],
    node: &SourceNodeId,
) -> GraphResult<()> {
    let ins = in_neighbors(reduced, node);
    let outs = out_neighbors(reduced, node);
    if ins.len() != 2 || outs.len() != 2 {
        return Err(bad(
            node,
            "waiting-departure must connect to exactly one intersection and one POI",
        ));
    }

    let classify = |neighbors: &[&SourceNodeId]| -> Option<(SourceNodeId, SourceNodeId)> {
        // Returns (intersection neighbor, POI neighbor).
        let inter = neighbors
            .iter()
            .find(|n| kind_of(source, n) == PoiKind::Intersection)?;
        let poi = neighbors
            .iter()
            .find(|n| kind_of(source, n).is_operational())?;
        Some(((**inter).clone(), (**poi).clone()))
    };

    let Some((in_inter, in_poi)) = classify(&ins) else {
        return Err(bad(node, "waiting-departure must connect to an intersection and a POI"));
    };
    let Some((out_inter, out_poi)) = classify(&outs) else {
        return Err(bad(node, "waiting-departure must connect to an intersection and a POI"));
    };

    if way_between(reduced, &in_inter, node) != Some(WayType::TwoWay)
        || way_between(reduced, node, &out_inter) != Some(WayType::TwoWay)
    {
        return Err(bad(node, "edges must be two-way in intersection↔waiting-departure"));
    }
    if way_between(reduced, &in_poi, node) != Some(WayType::NarrowTwoWay)
        || way_between(reduced, node, &out_poi) != Some(WayType::NarrowTwoWay)
    {
        return Err(bad(node, "edges must be narrow two-way in waiting-departure↔POI"));
    }
    Ok(())
}
