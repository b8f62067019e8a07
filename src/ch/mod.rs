//! Node-based contraction hierarchy
//!
//! Nodes are contracted in a static order; each contraction adds the
//! shortcuts needed to keep shortest path weights between the remaining
//! nodes. A query only ever relaxes edges towards nodes of equal or higher
//! level, from both ends.

mod contract;

pub use contract::contract;

use crate::core::error::{Error, Result};
use crate::core::graph::{EdgeId, NodeId};

/// Edges incident to a node, oriented with that node as base
pub type ChEdgeIter<'a> = std::iter::Copied<std::slice::Iter<'a, ChEdge>>;

/// One edge of a contraction hierarchy, original or shortcut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChEdge {
    pub edge: EdgeId,
    /// Edge of the graph underneath, `None` for shortcuts
    pub orig_edge: Option<EdgeId>,
    pub base_node: NodeId,
    pub adj_node: NodeId,
    /// The two edges a shortcut replaces, `base -> middle` then `middle -> adj`
    pub skipped: Option<(EdgeId, EdgeId)>,
    /// Weight of `base -> adj`
    pub weight_fwd: f64,
    /// Weight of `adj -> base`
    pub weight_bwd: f64,
    pub millis_fwd: u64,
    pub millis_bwd: u64,
    pub distance: f64,
}

impl ChEdge {
    pub fn is_shortcut(&self) -> bool {
        self.skipped.is_some()
    }

    /// The same edge seen from its adjacent node
    pub fn reversed(&self) -> ChEdge {
        ChEdge {
            edge: self.edge,
            orig_edge: self.orig_edge,
            base_node: self.adj_node,
            adj_node: self.base_node,
            skipped: self.skipped.map(|(first, second)| (second, first)),
            weight_fwd: self.weight_bwd,
            weight_bwd: self.weight_fwd,
            millis_fwd: self.millis_bwd,
            millis_bwd: self.millis_fwd,
            distance: self.distance,
        }
    }

    /// Orient towards `adj_node` when given
    pub(crate) fn oriented(self, adj_node: Option<NodeId>) -> Result<ChEdge> {
        match adj_node {
            None => Ok(self),
            Some(adj) if adj == self.adj_node => Ok(self),
            Some(adj) if adj == self.base_node => Ok(self.reversed()),
            Some(adj) => Err(Error::EdgeNotAdjacent {
                edge: self.edge,
                node: adj,
            }),
        }
    }
}

/// Read contract consumed by [`ch_route`](crate::search::ch_route)
pub trait RoutingChGraph {
    fn node_count(&self) -> usize;

    /// Original edges, shortcuts and, for a query graph, virtual edges
    fn edge_count(&self) -> usize;

    /// Edge count of the graph the hierarchy was built from
    fn base_edge_count(&self) -> usize;

    /// Edges leaving `node` with a finite `weight_fwd`
    fn out_edges(&self, node: NodeId) -> ChEdgeIter<'_>;

    /// Edges arriving at `node` with a finite `weight_bwd`, still oriented from `node`
    fn in_edges(&self, node: NodeId) -> ChEdgeIter<'_>;

    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<ChEdge>;

    fn level(&self, node: NodeId) -> u32;

    /// Turn weight between two edges of the graph underneath the hierarchy.
    ///
    /// `in_edge` and `out_edge` are [`ChEdge::orig_edge`] ids (query graph ids
    /// for a [`QueryChGraph`](crate::querygraph::QueryChGraph)), never CH ids;
    /// a shortcut has no turn weight of its own.
    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64;

    fn has_turn_costs(&self) -> bool;

    /// Whether shortcuts were built between edges rather than nodes
    fn is_edge_based(&self) -> bool;
}

/// Contracted base graph
#[derive(Debug, Clone)]
pub struct ChGraph {
    base_edge_count: usize,
    edges: Vec<ChEdge>,
    levels: Vec<u32>,
    out: Vec<Vec<ChEdge>>,
    inc: Vec<Vec<ChEdge>>,
}

impl ChGraph {
    pub(crate) fn new(base_edge_count: usize, edges: Vec<ChEdge>, levels: Vec<u32>) -> Self {
        let n = levels.len();
        let mut out = vec![Vec::new(); n];
        let mut inc = vec![Vec::new(); n];
        for edge in &edges {
            if edge.base_node == edge.adj_node {
                continue;
            }
            let reversed = edge.reversed();
            if edge.weight_fwd.is_finite() {
                out[edge.base_node as usize].push(*edge);
                inc[edge.adj_node as usize].push(reversed);
            }
            if edge.weight_bwd.is_finite() {
                out[edge.adj_node as usize].push(reversed);
                inc[edge.base_node as usize].push(*edge);
            }
        }
        Self {
            base_edge_count,
            edges,
            levels,
            out,
            inc,
        }
    }

    pub fn shortcut_count(&self) -> usize {
        self.edges.len() - self.base_edge_count
    }
}

impl RoutingChGraph for ChGraph {
    fn node_count(&self) -> usize {
        self.levels.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn base_edge_count(&self) -> usize {
        self.base_edge_count
    }

    fn out_edges(&self, node: NodeId) -> ChEdgeIter<'_> {
        self.out
            .get(node as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    fn in_edges(&self, node: NodeId) -> ChEdgeIter<'_> {
        self.inc
            .get(node as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<ChEdge> {
        self.edges
            .get(edge as usize)
            .copied()
            .ok_or(Error::EdgeNotFound(edge))?
            .oriented(adj_node)
    }

    fn level(&self, node: NodeId) -> u32 {
        self.levels.get(node as usize).copied().unwrap_or(0)
    }

    fn turn_weight(&self, _in_edge: EdgeId, _via_node: NodeId, _out_edge: EdgeId) -> f64 {
        0.0
    }

    fn has_turn_costs(&self) -> bool {
        false
    }

    fn is_edge_based(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: EdgeId, base: NodeId, adj: NodeId, fwd: f64, bwd: f64) -> ChEdge {
        ChEdge {
            edge: id,
            orig_edge: Some(id),
            base_node: base,
            adj_node: adj,
            skipped: None,
            weight_fwd: fwd,
            weight_bwd: bwd,
            millis_fwd: (fwd * 1000.0) as u64,
            millis_bwd: u64::MAX,
            distance: 10.0,
        }
    }

    #[test]
    fn test_lists_follow_direction() {
        let graph = ChGraph::new(2, vec![edge(0, 0, 1, 1.0, f64::INFINITY), edge(1, 1, 2, 2.0, 3.0)], vec![0, 1, 2]);

        let out: Vec<_> = graph.out_edges(1).map(|e| (e.edge, e.adj_node)).collect();
        assert_eq!(out, vec![(1, 2)]);
        let inc: Vec<_> = graph.in_edges(1).map(|e| (e.edge, e.adj_node, e.weight_bwd)).collect();
        assert_eq!(inc, vec![(0, 0, 1.0), (1, 2, 3.0)]);
        for e in graph.out_edges(1).chain(graph.in_edges(1)) {
            assert_eq!(e.base_node, 1);
        }
    }

    #[test]
    fn test_edge_orientation() {
        let graph = ChGraph::new(1, vec![edge(0, 0, 1, 1.0, 2.0)], vec![0, 1]);
        let e = graph.edge(0, Some(0)).unwrap();
        assert_eq!((e.base_node, e.adj_node), (1, 0));
        assert_eq!(e.weight_fwd, 2.0);
        assert!(matches!(graph.edge(0, Some(5)), Err(Error::EdgeNotAdjacent { .. })));
        assert!(matches!(graph.edge(3, None), Err(Error::EdgeNotFound(3))));
    }
}
