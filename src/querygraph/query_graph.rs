//! Read-only graph view combining a base graph with one overlay

use log::debug;
use rustc_hash::FxHashMap;

use crate::core::angle::{align_orientation, calc_orientation, convert_azimuth_to_xaxis_angle};
use crate::core::edge::EdgeView;
use crate::core::error::{Error, Result};
use crate::core::geometry::{BBox, FetchMode, GeoPoint};
use crate::core::graph::{BaseGraph, EdgeId, EdgeIter, EdgeIterInner, EdgeSlot, Graph, NodeId};
use crate::core::turn_cost::TurnCostLookup;
use crate::querygraph::overlay::{Overlay, ADJ_SNAP, BASE_SNAP, SNAP_ADJ, SNAP_BASE};
use crate::querygraph::turn_cost::{QueryGraphWeighting, QueryTurnCosts};
use crate::weighting::Weighting;

/// Largest accepted deviation between a requested heading and a virtual edge, ~100°
pub const HEADING_DEVIATION_THRESHOLD: f64 = 1.74;

/// Base graph plus the virtual nodes and edges of one request.
///
/// Ids below the base counts behave exactly as in the base graph, except that
/// real nodes next to a virtual node offer the virtual edges instead of the
/// original edge they replace.
pub struct QueryGraph<'a> {
    base: &'a BaseGraph,
    overlay: &'a Overlay,
    edges_at_real: FxHashMap<NodeId, Vec<EdgeSlot>>,
    edges_at_virtual: Vec<[EdgeSlot; 2]>,
    turn_costs: QueryTurnCosts<'a>,
    unfavored: Vec<u32>,
}

impl<'a> QueryGraph<'a> {
    pub fn new(base: &'a BaseGraph, overlay: &'a Overlay) -> Self {
        let mut edges_at_real = FxHashMap::default();
        for (&node, delta) in overlay.deltas() {
            let mut slots: Vec<EdgeSlot> = delta
                .additions()
                .iter()
                .map(|&index| EdgeSlot::Virtual(index))
                .collect();
            slots.extend(
                base.edges(node)
                    .filter(|e| !delta.is_removed(e.edge()))
                    .map(|e| EdgeSlot::Real {
                        edge: e.edge(),
                        base: e.base_node(),
                        adj: e.adj_node(),
                        reverse: e.reverse(),
                    }),
            );
            edges_at_real.insert(node, slots);
        }

        let edges_at_virtual = (0..overlay.virtual_node_count() as NodeId)
            .map(|i| {
                let node = overlay.first_virtual_node() + i;
                [
                    EdgeSlot::Virtual(overlay.slot_of(node, SNAP_BASE)),
                    EdgeSlot::Virtual(overlay.slot_of(node, SNAP_ADJ)),
                ]
            })
            .collect();

        debug!(
            "Query graph: {} virtual nodes, {} virtual edges, {} modified real nodes",
            overlay.virtual_node_count(),
            overlay.virtual_edge_count(),
            edges_at_real.len()
        );

        Self {
            base,
            overlay,
            edges_at_real,
            edges_at_virtual,
            turn_costs: QueryTurnCosts::new(base.turn_cost_table(), overlay),
            unfavored: Vec::new(),
        }
    }

    pub fn overlay(&self) -> &'a Overlay {
        self.overlay
    }

    pub fn is_virtual_node(&self, node: NodeId) -> bool {
        self.overlay.is_virtual_node(node)
    }

    pub fn is_virtual_edge(&self, edge: EdgeId) -> bool {
        self.overlay.is_virtual_edge(edge)
    }

    /// Adapt `weighting` to the virtual ids of this graph
    pub fn wrap_weighting<'w, W: Weighting + ?Sized>(&self, weighting: &'w W) -> QueryGraphWeighting<'w, W>
    where
        'a: 'w,
    {
        QueryGraphWeighting::new(weighting, self.overlay)
    }

    fn iter_slots<'s>(&'s self, slots: &'s [EdgeSlot]) -> EdgeIter<'s> {
        EdgeIter {
            inner: EdgeIterInner::Overlay {
                graph: self.base,
                overlay: self.overlay,
                slots: slots.iter(),
            },
        }
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node as usize >= self.node_count() {
            return Err(Error::NodeNotFound(node));
        }
        Ok(())
    }

    fn virtual_index(&self, edge: EdgeId) -> Result<u32> {
        self.overlay.edge_index(edge).ok_or(Error::EdgeNotFound(edge))
    }

    /// Penalize the virtual edges at `node` that deviate from `heading`.
    ///
    /// `heading` is an azimuth in degrees, north = 0, clockwise. With
    /// `incoming` set the edges arriving at the node are checked by their last
    /// segment, otherwise the edges leaving it by their first segment. Returns
    /// whether any edge was penalized.
    pub fn enforce_heading(&mut self, node: NodeId, heading: f64, incoming: bool) -> Result<bool> {
        self.check_node(node)?;
        if heading.is_nan() || !self.is_virtual_node(node) {
            return Ok(false);
        }
        if !(0.0..=360.0).contains(&heading) {
            return Err(Error::InvalidHeading(heading));
        }
        let favored = convert_azimuth_to_xaxis_angle(heading);
        let candidates = if incoming {
            [BASE_SNAP, ADJ_SNAP]
        } else {
            [SNAP_BASE, SNAP_ADJ]
        };

        let mut enforced = false;
        for slot in candidates {
            let index = self.overlay.slot_of(node, slot);
            let geometry = self.overlay.edge_at(index).geometry().fetch(FetchMode::All);
            let len = geometry.len();
            if len < 2 {
                continue;
            }
            let (from, to) = if incoming { (len - 2, len - 1) } else { (0, 1) };
            let orientation = calc_orientation(
                geometry.lat(from),
                geometry.lon(from),
                geometry.lat(to),
                geometry.lon(to),
            );
            let orientation = align_orientation(favored, orientation);
            if (orientation - favored).abs() > HEADING_DEVIATION_THRESHOLD {
                self.mark_unfavored(index);
                enforced = true;
            }
        }
        if enforced {
            debug!("Heading {:.1} enforced at virtual node {}", heading, node);
        }
        Ok(enforced)
    }

    /// Penalize the virtual edge arriving at `virtual_node` and its reverse
    pub fn unfavor_virtual_edge_pair(&mut self, virtual_node: NodeId, virtual_edge: EdgeId) -> Result<()> {
        self.check_node(virtual_node)?;
        if !self.is_virtual_node(virtual_node) {
            return Err(Error::NotVirtualNode(virtual_node));
        }
        let index = self
            .overlay
            .edge_index(virtual_edge)
            .ok_or(Error::NotVirtualEdge(virtual_edge))?;
        let edge = self.overlay.edge_at(index);
        let arriving = if edge.adj_node() == virtual_node {
            index
        } else if edge.base_node() == virtual_node {
            edge.reverse_edge()
        } else {
            return Err(Error::EdgeNotAdjacent {
                edge: virtual_edge,
                node: virtual_node,
            });
        };
        self.mark_unfavored(arriving);
        Ok(())
    }

    /// Penalize each listed virtual edge and its reverse, stopping at the first real id
    pub fn unfavor_virtual_edges(&mut self, edges: &[EdgeId]) {
        for &edge in edges {
            let Some(index) = self.overlay.edge_index(edge) else {
                return;
            };
            self.mark_unfavored(index);
        }
    }

    /// Edges currently penalized, in the order they were marked
    pub fn unfavored_virtual_edges(&self) -> Vec<EdgeView<'a>> {
        self.unfavored
            .iter()
            .map(|&index| self.overlay.view(self.base, index))
            .collect()
    }

    /// Reset every edge marked through this graph
    pub fn clear_unfavored_status(&mut self) {
        for index in self.unfavored.drain(..) {
            self.overlay.edge_at(index).set_unfavored(false);
        }
    }

    fn mark_unfavored(&mut self, index: u32) {
        let reverse = self.overlay.edge_at(index).reverse_edge();
        for index in [index, reverse] {
            self.overlay.edge_at(index).set_unfavored(true);
            if !self.unfavored.contains(&index) {
                self.unfavored.push(index);
            }
        }
    }
}

impl<'a> Graph for QueryGraph<'a> {
    fn base_graph(&self) -> &BaseGraph {
        self.base
    }

    fn node_count(&self) -> usize {
        self.base.node_count() + self.overlay.virtual_node_count()
    }

    fn edge_count(&self) -> usize {
        self.base.edge_count() + self.overlay.virtual_edge_count()
    }

    fn is_3d(&self) -> bool {
        self.base.is_3d()
    }

    fn coordinate(&self, node: NodeId) -> GeoPoint {
        if self.is_virtual_node(node) {
            let index = (node - self.overlay.first_virtual_node()) as usize;
            self.overlay.virtual_nodes().get(index)
        } else {
            self.base.coordinate(node)
        }
    }

    fn bounds(&self) -> BBox {
        self.base.bounds()
    }

    fn edges(&self, node: NodeId) -> EdgeIter<'_> {
        if self.is_virtual_node(node) {
            let index = (node - self.overlay.first_virtual_node()) as usize;
            return match self.edges_at_virtual.get(index) {
                Some(slots) => self.iter_slots(slots),
                None => self.iter_slots(&[]),
            };
        }
        match self.edges_at_real.get(&node) {
            Some(slots) => self.iter_slots(slots),
            None => self.base.edges(node),
        }
    }

    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<EdgeView<'_>> {
        if !self.is_virtual_edge(edge) {
            return self.base.edge(edge, adj_node);
        }
        let index = self.virtual_index(edge)?;
        let found = self.overlay.edge_at(index);
        match adj_node {
            None => Ok(self.overlay.view(self.base, index)),
            Some(adj) if found.adj_node() == adj => Ok(self.overlay.view(self.base, index)),
            Some(adj) if found.base_node() == adj => {
                Ok(self.overlay.view(self.base, found.reverse_edge()))
            }
            Some(adj) => Err(Error::EdgeNotAdjacent { edge, node: adj }),
        }
    }

    fn other_node(&self, edge: EdgeId, node: NodeId) -> Result<NodeId> {
        if !self.is_virtual_edge(edge) {
            return self.base.other_node(edge, node);
        }
        let found = self.overlay.edge_at(self.virtual_index(edge)?);
        if found.base_node() == node {
            Ok(found.adj_node())
        } else if found.adj_node() == node {
            Ok(found.base_node())
        } else {
            Err(Error::EdgeNotAdjacent { edge, node })
        }
    }

    fn is_adjacent_to_node(&self, edge: EdgeId, node: NodeId) -> bool {
        if !self.is_virtual_edge(edge) {
            return self.base.is_adjacent_to_node(edge, node);
        }
        self.overlay
            .virtual_edge(edge)
            .map(|e| e.base_node() == node || e.adj_node() == node)
            .unwrap_or(false)
    }

    fn turn_costs(&self) -> &dyn TurnCostLookup {
        &self.turn_costs
    }

    fn add_edge(&mut self, _a: NodeId, _b: NodeId, _distance: f64) -> Result<EdgeId> {
        Err(Error::ReadOnlyGraph("add_edge"))
    }

    fn set_node(&mut self, _node: NodeId, _point: GeoPoint) -> Result<()> {
        Err(Error::ReadOnlyGraph("set_node"))
    }

    fn copy_to(&self, _target: &mut BaseGraph) -> Result<()> {
        Err(Error::ReadOnlyGraph("copy_to"))
    }
}
