//! Virtual edges: pieces of an original edge between a snap and its neighbours

use std::cell::Cell;

use crate::core::geometry::PointList;
use crate::core::graph::{BaseGraph, EdgeId, NodeId};
use crate::querygraph::overlay::Overlay;

/// One direction of a sub-segment of an original edge.
///
/// Stored once per direction in the overlay arena; slots that reach the same
/// segment share this object, so `unfavored` is the same whichever slot set it.
#[derive(Debug, Clone)]
pub struct VirtualEdge {
    id: EdgeId,
    original_edge: EdgeId,
    base_node: NodeId,
    adj_node: NodeId,
    distance: f64,
    reverse: bool,
    geometry: PointList,
    reverse_edge: u32,
    unfavored: Cell<bool>,
}

impl VirtualEdge {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: EdgeId,
        original_edge: EdgeId,
        base_node: NodeId,
        adj_node: NodeId,
        distance: f64,
        reverse: bool,
        geometry: PointList,
        reverse_edge: u32,
    ) -> Self {
        Self {
            id,
            original_edge,
            base_node,
            adj_node,
            distance,
            reverse,
            geometry,
            reverse_edge,
            unfavored: Cell::new(false),
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn original_edge(&self) -> EdgeId {
        self.original_edge
    }

    pub fn base_node(&self) -> NodeId {
        self.base_node
    }

    pub fn adj_node(&self) -> NodeId {
        self.adj_node
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Full geometry from base node to adjacent node
    pub fn geometry(&self) -> &PointList {
        &self.geometry
    }

    /// Arena index of the opposite direction
    pub fn reverse_edge(&self) -> u32 {
        self.reverse_edge
    }

    pub fn is_unfavored(&self) -> bool {
        self.unfavored.get()
    }

    pub(crate) fn set_unfavored(&self, unfavored: bool) {
        self.unfavored.set(unfavored);
    }
}

/// Borrowed handle on a virtual edge, resolving names and flags through the base graph
#[derive(Clone, Copy)]
pub struct VirtualEdgeView<'a> {
    graph: &'a BaseGraph,
    overlay: &'a Overlay,
    index: u32,
}

impl<'a> VirtualEdgeView<'a> {
    pub(crate) fn new(graph: &'a BaseGraph, overlay: &'a Overlay, index: u32) -> Self {
        Self { graph, overlay, index }
    }

    pub fn inner(&self) -> &'a VirtualEdge {
        self.overlay.edge_at(self.index)
    }

    pub(crate) fn graph(&self) -> &'a BaseGraph {
        self.graph
    }

    pub(crate) fn reverse_view(&self) -> VirtualEdgeView<'a> {
        Self::new(self.graph, self.overlay, self.inner().reverse_edge())
    }
}

impl std::fmt::Debug for VirtualEdgeView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let edge = self.inner();
        write!(
            f,
            "VirtualEdge({}: {}->{}, original {})",
            edge.id, edge.base_node, edge.adj_node, edge.original_edge
        )
    }
}
