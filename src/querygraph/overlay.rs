//! Per-request overlay: virtual nodes, virtual edges and edge deltas

use rustc_hash::FxHashMap;

use crate::core::edge::EdgeView;
use crate::core::error::Result;
use crate::core::geometry::{GeoPoint, PointList};
use crate::core::graph::{BaseGraph, EdgeId, NodeId};
use crate::index::Snap;
use crate::querygraph::builder::OverlayBuilder;
use crate::querygraph::virtual_edge::{VirtualEdge, VirtualEdgeView};

/// Slot of the edge from the previous anchor (base side) to the snap
pub const BASE_SNAP: usize = 0;
/// Slot of the edge from the snap back to the previous anchor
pub const SNAP_BASE: usize = 1;
/// Slot of the edge from the snap to the next anchor (adjacent side)
pub const SNAP_ADJ: usize = 2;
/// Slot of the edge from the next anchor back to the snap
pub const ADJ_SNAP: usize = 3;

/// Slots reserved for each virtual node
pub const SLOTS_PER_NODE: usize = 4;

/// Edges to splice in and hide at one real node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDelta {
    additions: Vec<u32>,
    removals: Vec<EdgeId>,
}

impl EdgeDelta {
    /// Arena indices of virtual edges based at this node
    pub fn additions(&self) -> &[u32] {
        &self.additions
    }

    /// Original edges hidden at this node
    pub fn removals(&self) -> &[EdgeId] {
        &self.removals
    }

    pub fn is_removed(&self, edge: EdgeId) -> bool {
        self.removals.contains(&edge)
    }

    pub(crate) fn add(&mut self, index: u32) {
        if !self.additions.contains(&index) {
            self.additions.push(index);
        }
    }

    pub(crate) fn remove(&mut self, edge: EdgeId) {
        if !self.removals.contains(&edge) {
            self.removals.push(edge);
        }
    }
}

/// Virtual topology of one request, layered over a base graph by id range.
///
/// Edge ids follow the slot a directed edge was created in; every slot id in
/// `[first_virtual_edge, first_virtual_edge + 4 * virtual_node_count)` resolves
/// to an edge, and the two slots that re-reference a chain segment resolve to
/// the edge created first.
#[derive(Debug, Clone)]
pub struct Overlay {
    first_node: NodeId,
    first_edge: EdgeId,
    nodes: PointList,
    closest_edges: Vec<EdgeId>,
    edges: Vec<VirtualEdge>,
    slots: Vec<u32>,
    pub(crate) deltas: FxHashMap<NodeId, EdgeDelta>,
}

impl Overlay {
    pub(crate) fn new(first_node: NodeId, first_edge: EdgeId, is_3d: bool) -> Self {
        Self {
            first_node,
            first_edge,
            nodes: PointList::new(is_3d),
            closest_edges: Vec::new(),
            edges: Vec::new(),
            slots: Vec::new(),
            deltas: FxHashMap::default(),
        }
    }

    /// Splice `snaps` into `graph`; see [`OverlayBuilder::build`]
    pub fn build(graph: &BaseGraph, snaps: &mut [Snap]) -> Result<Overlay> {
        OverlayBuilder::build(graph, snaps)
    }

    pub fn first_virtual_node(&self) -> NodeId {
        self.first_node
    }

    pub fn first_virtual_edge(&self) -> EdgeId {
        self.first_edge
    }

    pub fn virtual_node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edge slots, four per virtual node
    pub fn virtual_edge_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether `node` is one of this overlay's nodes; ids past the last one are not
    pub fn is_virtual_node(&self, node: NodeId) -> bool {
        node.checked_sub(self.first_node)
            .is_some_and(|index| (index as usize) < self.nodes.len())
    }

    /// Whether `edge` is one of the `4 * virtual_node_count` slot ids
    pub fn is_virtual_edge(&self, edge: EdgeId) -> bool {
        self.edge_index(edge).is_some()
    }

    pub fn virtual_nodes(&self) -> &PointList {
        &self.nodes
    }

    pub fn node(&self, node: NodeId) -> Option<GeoPoint> {
        let index = node.checked_sub(self.first_node)? as usize;
        (index < self.nodes.len()).then(|| self.nodes.get(index))
    }

    /// Original edge subdivided at each virtual node
    pub fn closest_edges(&self) -> &[EdgeId] {
        &self.closest_edges
    }

    pub fn closest_edge(&self, node: NodeId) -> Option<EdgeId> {
        let index = node.checked_sub(self.first_node)? as usize;
        self.closest_edges.get(index).copied()
    }

    /// Unique directed edges, two per chain segment
    pub fn edges(&self) -> &[VirtualEdge] {
        &self.edges
    }

    pub(crate) fn edge_at(&self, index: u32) -> &VirtualEdge {
        &self.edges[index as usize]
    }

    /// Arena index behind each slot
    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    /// Arena index of a virtual edge id
    pub fn edge_index(&self, edge: EdgeId) -> Option<u32> {
        let slot = edge.checked_sub(self.first_edge)? as usize;
        self.slots.get(slot).copied()
    }

    pub fn virtual_edge(&self, edge: EdgeId) -> Option<&VirtualEdge> {
        self.edge_index(edge).map(|index| self.edge_at(index))
    }

    /// Arena index in `slot` of the given virtual node
    pub(crate) fn slot_of(&self, node: NodeId, slot: usize) -> u32 {
        let base = (node - self.first_node) as usize * SLOTS_PER_NODE;
        self.slots[base + slot]
    }

    pub fn deltas(&self) -> &FxHashMap<NodeId, EdgeDelta> {
        &self.deltas
    }

    pub fn delta(&self, node: NodeId) -> Option<&EdgeDelta> {
        self.deltas.get(&node)
    }

    /// Original edge of any edge id, identity for real edges
    pub fn original_edge(&self, edge: EdgeId) -> EdgeId {
        self.virtual_edge(edge)
            .map(|e| e.original_edge())
            .unwrap_or(edge)
    }

    /// Whether `out_edge` leaves the same way `in_edge` arrived
    pub fn is_u_turn(&self, in_edge: EdgeId, out_edge: EdgeId) -> bool {
        if in_edge == out_edge {
            return true;
        }
        match (self.edge_index(in_edge), self.edge_index(out_edge)) {
            (Some(a), Some(b)) => a == b || self.edge_at(a).reverse_edge() == b,
            _ => false,
        }
    }

    pub(crate) fn view<'a>(&'a self, graph: &'a BaseGraph, index: u32) -> EdgeView<'a> {
        EdgeView::Virtual(VirtualEdgeView::new(graph, self, index))
    }

    pub(crate) fn push_node(&mut self, point: GeoPoint, closest_edge: EdgeId) -> NodeId {
        let node = self.first_node + self.nodes.len() as NodeId;
        self.nodes.push(point);
        self.closest_edges.push(closest_edge);
        node
    }

    /// Create the directed pair `from -> to` / `to -> from` in the next two slots
    pub(crate) fn push_pair(
        &mut self,
        original_edge: EdgeId,
        from: NodeId,
        to: NodeId,
        reverse: bool,
        geometry: PointList,
        distance: f64,
    ) {
        let fwd_index = self.edges.len() as u32;
        let bwd_index = fwd_index + 1;
        let fwd_id = self.first_edge + self.slots.len() as EdgeId;
        let reversed = geometry.reversed();

        self.edges.push(VirtualEdge::new(
            fwd_id,
            original_edge,
            from,
            to,
            distance,
            reverse,
            geometry,
            bwd_index,
        ));
        self.edges.push(VirtualEdge::new(
            fwd_id + 1,
            original_edge,
            to,
            from,
            distance,
            !reverse,
            reversed,
            fwd_index,
        ));
        self.slots.push(fwd_index);
        self.slots.push(bwd_index);
    }

    /// Reference the last created pair again for the next virtual node
    pub(crate) fn repeat_last_pair(&mut self) {
        let len = self.slots.len();
        let fwd = self.slots[len - 2];
        let bwd = self.slots[len - 1];
        self.slots.push(fwd);
        self.slots.push(bwd);
    }
}
