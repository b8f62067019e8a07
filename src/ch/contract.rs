//! Contraction with a static node order and bounded witness searches

use std::collections::BinaryHeap;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::ch::{ChEdge, ChGraph};
use crate::core::error::Result;
use crate::core::graph::{BaseGraph, EdgeId, Graph, NodeId};
use crate::search::HeapEntry;
use crate::weighting::Weighting;

/// Nodes a witness search may settle before giving up
const WITNESS_SETTLED_LIMIT: usize = 64;

/// Directed arc of the graph still being contracted
#[derive(Debug, Clone, Copy)]
struct Arc {
    node: NodeId,
    edge: EdgeId,
    weight: f64,
    millis: u64,
    distance: f64,
}

/// Contract `graph` under `weighting`.
///
/// Turn costs are ignored. Nodes are ordered by degree then id; shortcuts get
/// ids after the base edges in the order they are created.
pub fn contract<W: Weighting + ?Sized>(graph: &BaseGraph, weighting: &W) -> Result<ChGraph> {
    let n = graph.node_count();
    let base_edge_count = graph.edge_count();
    let mut edges = Vec::with_capacity(base_edge_count);
    for id in 0..base_edge_count as EdgeId {
        let view = graph.edge(id, None)?;
        edges.push(ChEdge {
            edge: id,
            orig_edge: Some(id),
            base_node: view.base_node(),
            adj_node: view.adj_node(),
            skipped: None,
            weight_fwd: weighting.edge_weight(&view, false),
            weight_bwd: weighting.edge_weight(&view, true),
            millis_fwd: weighting.edge_millis(&view, false),
            millis_bwd: weighting.edge_millis(&view, true),
            distance: view.distance(),
        });
    }

    let mut out: Vec<Vec<Arc>> = vec![Vec::new(); n];
    let mut inc: Vec<Vec<Arc>> = vec![Vec::new(); n];
    for e in &edges {
        if e.base_node == e.adj_node {
            continue;
        }
        if e.weight_fwd.is_finite() {
            add_arc(&mut out, &mut inc, e.base_node, e.adj_node, e.edge, e.weight_fwd, e.millis_fwd, e.distance);
        }
        if e.weight_bwd.is_finite() {
            add_arc(&mut out, &mut inc, e.adj_node, e.base_node, e.edge, e.weight_bwd, e.millis_bwd, e.distance);
        }
    }

    let mut order: Vec<NodeId> = (0..n as NodeId).collect();
    order.sort_by_key(|&v| (out[v as usize].len() + inc[v as usize].len(), v));
    let mut levels = vec![0u32; n];
    for (rank, &v) in order.iter().enumerate() {
        levels[v as usize] = rank as u32;
    }

    let mut contracted = vec![false; n];
    for &v in &order {
        let ins: Vec<Arc> = inc[v as usize]
            .iter()
            .filter(|a| !contracted[a.node as usize] && a.node != v)
            .copied()
            .collect();
        let outs: Vec<Arc> = out[v as usize]
            .iter()
            .filter(|a| !contracted[a.node as usize] && a.node != v)
            .copied()
            .collect();

        for a_in in &ins {
            for a_out in &outs {
                if a_in.node == a_out.node {
                    continue;
                }
                let weight = a_in.weight + a_out.weight;
                if has_witness(&out, &contracted, a_in.node, a_out.node, v, weight) {
                    continue;
                }
                let id = edges.len() as EdgeId;
                let millis = a_in.millis.saturating_add(a_out.millis);
                let distance = a_in.distance + a_out.distance;
                trace!("Shortcut {}: {} -> {} via {}", id, a_in.node, a_out.node, v);
                edges.push(ChEdge {
                    edge: id,
                    orig_edge: None,
                    base_node: a_in.node,
                    adj_node: a_out.node,
                    skipped: Some((a_in.edge, a_out.edge)),
                    weight_fwd: weight,
                    weight_bwd: f64::INFINITY,
                    millis_fwd: millis,
                    millis_bwd: u64::MAX,
                    distance,
                });
                add_arc(&mut out, &mut inc, a_in.node, a_out.node, id, weight, millis, distance);
            }
        }
        contracted[v as usize] = true;
    }

    debug!(
        "Contracted {} nodes: {} base edges, {} shortcuts",
        n,
        base_edge_count,
        edges.len() - base_edge_count
    );
    Ok(ChGraph::new(base_edge_count, edges, levels))
}

#[allow(clippy::too_many_arguments)]
fn add_arc(
    out: &mut [Vec<Arc>],
    inc: &mut [Vec<Arc>],
    from: NodeId,
    to: NodeId,
    edge: EdgeId,
    weight: f64,
    millis: u64,
    distance: f64,
) {
    out[from as usize].push(Arc {
        node: to,
        edge,
        weight,
        millis,
        distance,
    });
    inc[to as usize].push(Arc {
        node: from,
        edge,
        weight,
        millis,
        distance,
    });
}

/// Whether `from` reaches `to` within `max_weight` without passing `avoid`
fn has_witness(
    out: &[Vec<Arc>],
    contracted: &[bool],
    from: NodeId,
    to: NodeId,
    avoid: NodeId,
    max_weight: f64,
) -> bool {
    let mut best: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    best.insert(from, 0.0);
    heap.push(HeapEntry::new(0.0, from));
    let mut settled = 0;

    while let Some(HeapEntry { weight, node }) = heap.pop() {
        if weight > max_weight {
            return false;
        }
        if node == to {
            return true;
        }
        if best.get(&node).is_some_and(|&w| weight > w) {
            continue;
        }
        settled += 1;
        if settled > WITNESS_SETTLED_LIMIT {
            return false;
        }
        for arc in &out[node as usize] {
            if arc.node == avoid || contracted[arc.node as usize] {
                continue;
            }
            let candidate = weight + arc.weight;
            if best.get(&arc.node).map_or(true, |&w| candidate < w) {
                best.insert(arc.node, candidate);
                heap.push(HeapEntry::new(candidate, arc.node));
            }
        }
    }
    false
}
