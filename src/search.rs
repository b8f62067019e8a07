//! Shortest path searches over [`Graph`] and [`RoutingChGraph`]

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::ch::{ChEdge, RoutingChGraph};
use crate::core::error::{Error, Result};
use crate::core::geometry::{FetchMode, PointList};
use crate::core::graph::{EdgeId, Graph, NodeId};
use crate::weighting::Weighting;

/// Min-heap entry ordered by weight, then node id
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HeapEntry {
    pub weight: f64,
    pub node: NodeId,
}

impl HeapEntry {
    pub(crate) fn new(weight: f64, node: NodeId) -> Self {
        Self { weight, node }
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A route between two nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub weight: f64,
    pub distance: f64,
    pub millis: u64,
}

impl Path {
    fn single(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            edges: Vec::new(),
            weight: 0.0,
            distance: 0.0,
            millis: 0,
        }
    }

    /// Polyline of the whole path
    pub fn geometry(&self, graph: &dyn Graph) -> Result<PointList> {
        let mut points = PointList::new(graph.is_3d());
        if self.edges.is_empty() {
            if let Some(&node) = self.nodes.first() {
                points.push(graph.coordinate(node));
            }
            return Ok(points);
        }
        for (i, (&edge, &adj)) in self.edges.iter().zip(&self.nodes[1..]).enumerate() {
            let mode = if i == 0 {
                FetchMode::All
            } else {
                FetchMode::PillarAndAdj
            };
            let part = graph.edge(edge, Some(adj))?.fetch_geometry(mode);
            points.extend_from(&part, 0, part.len());
        }
        Ok(points)
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    weight: f64,
    millis: u64,
    parent: Option<(NodeId, EdgeId)>,
}

/// Node-based Dijkstra; turn costs are charged from the edge a node was reached by
pub fn dijkstra<G, W>(graph: &G, weighting: &W, from: NodeId, to: NodeId) -> Option<Path>
where
    G: Graph + ?Sized,
    W: Weighting + ?Sized,
{
    if from == to {
        return Some(Path::single(from));
    }
    let mut labels: FxHashMap<NodeId, Label> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    labels.insert(
        from,
        Label {
            weight: 0.0,
            millis: 0,
            parent: None,
        },
    );
    heap.push(HeapEntry::new(0.0, from));

    while let Some(HeapEntry { weight, node }) = heap.pop() {
        let label = match labels.get(&node) {
            Some(label) if weight <= label.weight => *label,
            _ => continue,
        };
        if node == to {
            break;
        }
        let in_edge = label.parent.map(|(_, edge)| edge);
        for edge in graph.edges(node) {
            let mut w = weighting.edge_weight(&edge, false);
            if !w.is_finite() {
                continue;
            }
            let mut millis = weighting.edge_millis(&edge, false);
            if let (Some(in_edge), true) = (in_edge, weighting.has_turn_costs()) {
                let turn = weighting.turn_weight(in_edge, node, edge.edge());
                if !turn.is_finite() {
                    continue;
                }
                w += turn;
                millis = millis.saturating_add(weighting.turn_millis(in_edge, node, edge.edge()));
            }
            let candidate = weight + w;
            let adj = edge.adj_node();
            if labels.get(&adj).map_or(true, |l| candidate < l.weight) {
                labels.insert(
                    adj,
                    Label {
                        weight: candidate,
                        millis: label.millis.saturating_add(millis),
                        parent: Some((node, edge.edge())),
                    },
                );
                heap.push(HeapEntry::new(candidate, adj));
            }
        }
    }

    let target = labels.get(&to)?;
    let mut nodes = vec![to];
    let mut edges = Vec::new();
    let mut current = to;
    while let Some((parent, edge)) = labels.get(&current).and_then(|l| l.parent) {
        nodes.push(parent);
        edges.push(edge);
        current = parent;
    }
    nodes.reverse();
    edges.reverse();

    let mut distance = 0.0;
    for (&edge, &adj) in edges.iter().zip(&nodes[1..]) {
        distance += graph.edge(edge, Some(adj)).ok()?.distance();
    }
    trace!("Dijkstra {} -> {}: {} edges, weight {:.3}", from, to, edges.len(), target.weight);
    Some(Path {
        nodes,
        edges,
        weight: target.weight,
        distance,
        millis: target.millis,
    })
}

fn accept<C: RoutingChGraph + ?Sized>(graph: &C, edge: &ChEdge) -> bool {
    let level = graph.level(edge.base_node);
    level == u32::MAX || level <= graph.level(edge.adj_node)
}

/// Bidirectional upward search over a contraction hierarchy.
///
/// Shortcuts in the result are unpacked, so `edges` holds ids of the graph the
/// hierarchy sits on (query graph ids for a [`QueryChGraph`](crate::querygraph::QueryChGraph)).
pub fn ch_route<C: RoutingChGraph + ?Sized>(graph: &C, from: NodeId, to: NodeId) -> Result<Option<Path>> {
    if graph.is_edge_based() {
        return Err(Error::EdgeBasedHierarchy);
    }
    if from == to {
        return Ok(Some(Path::single(from)));
    }
    let mut fwd: FxHashMap<NodeId, (f64, Option<ChEdge>)> = FxHashMap::default();
    let mut bwd: FxHashMap<NodeId, (f64, Option<ChEdge>)> = FxHashMap::default();
    let mut fwd_heap = BinaryHeap::new();
    let mut bwd_heap = BinaryHeap::new();
    fwd.insert(from, (0.0, None));
    bwd.insert(to, (0.0, None));
    fwd_heap.push(HeapEntry::new(0.0, from));
    bwd_heap.push(HeapEntry::new(0.0, to));

    let mut best = f64::INFINITY;
    let mut meeting: Option<NodeId> = None;

    loop {
        let fwd_top = fwd_heap.peek().map(|e: &HeapEntry| e.weight).unwrap_or(f64::INFINITY);
        let bwd_top = bwd_heap.peek().map(|e: &HeapEntry| e.weight).unwrap_or(f64::INFINITY);
        if fwd_top >= best && bwd_top >= best {
            break;
        }
        let forward = fwd_top <= bwd_top;
        let (heap, labels, other) = if forward {
            (&mut fwd_heap, &mut fwd, &bwd)
        } else {
            (&mut bwd_heap, &mut bwd, &fwd)
        };
        let Some(HeapEntry { weight, node }) = heap.pop() else {
            break;
        };
        if labels.get(&node).map_or(true, |&(w, _)| weight > w) {
            continue;
        }
        if let Some(&(w, _)) = other.get(&node) {
            if weight + w < best {
                best = weight + w;
                meeting = Some(node);
            }
        }
        let edges = if forward {
            graph.out_edges(node)
        } else {
            graph.in_edges(node)
        };
        for edge in edges {
            if !accept(graph, &edge) {
                continue;
            }
            let w = if forward { edge.weight_fwd } else { edge.weight_bwd };
            if !w.is_finite() {
                continue;
            }
            let candidate = weight + w;
            if labels.get(&edge.adj_node).map_or(true, |&(l, _)| candidate < l) {
                labels.insert(edge.adj_node, (candidate, Some(edge)));
                heap.push(HeapEntry::new(candidate, edge.adj_node));
            }
        }
    }

    let Some(meeting) = meeting else {
        return Ok(None);
    };

    // edges from `from` to the meeting node, then on to `to`, all oriented along the path
    let mut chain = Vec::new();
    let mut current = meeting;
    while let Some(&(_, Some(edge))) = fwd.get(&current) {
        chain.push(edge);
        current = edge.base_node;
    }
    chain.reverse();
    let mut current = meeting;
    while let Some(&(_, Some(edge))) = bwd.get(&current) {
        chain.push(edge.reversed());
        current = edge.base_node;
    }

    let mut unpacked = Vec::new();
    for edge in chain {
        unpack(graph, edge, &mut unpacked)?;
    }
    let mut nodes = vec![from];
    let mut edges = Vec::with_capacity(unpacked.len());
    let mut distance = 0.0;
    let mut millis = 0u64;
    for edge in &unpacked {
        nodes.push(edge.adj_node);
        if let Some(orig) = edge.orig_edge {
            edges.push(orig);
        }
        distance += edge.distance;
        millis = millis.saturating_add(edge.millis_fwd);
    }
    trace!("CH route {} -> {} via {}: weight {:.3}", from, to, meeting, best);
    Ok(Some(Path {
        nodes,
        edges,
        weight: best,
        distance,
        millis,
    }))
}

/// Expand `edge`, oriented along the path, into edges of the graph underneath
fn unpack<C: RoutingChGraph + ?Sized>(graph: &C, edge: ChEdge, out: &mut Vec<ChEdge>) -> Result<()> {
    let Some((first, second)) = edge.skipped else {
        out.push(edge);
        return Ok(());
    };
    let first = graph.edge(first, None)?;
    let first = if first.base_node == edge.base_node {
        first
    } else {
        first.reversed()
    };
    let second = graph.edge(second, None)?;
    let second = if second.base_node == first.adj_node {
        second
    } else {
        second.reversed()
    };
    unpack(graph, first, out)?;
    unpack(graph, second, out)
}
