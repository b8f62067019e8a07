//! Turn costs across virtual nodes and edges
//!
//! A virtual node lies in the middle of an original edge, so going straight
//! through it is free and turning back is never allowed. Everywhere else the
//! virtual edge ids are mapped to their original edges before asking the real
//! cost source.

use crate::core::edge::EdgeView;
use crate::core::graph::{EdgeId, NodeId};
use crate::core::turn_cost::TurnCostLookup;
use crate::querygraph::overlay::Overlay;
use crate::weighting::Weighting;

/// [`TurnCostLookup`] over query graph ids
#[derive(Clone, Copy)]
pub struct QueryTurnCosts<'a> {
    inner: &'a dyn TurnCostLookup,
    overlay: &'a Overlay,
}

impl<'a> QueryTurnCosts<'a> {
    pub fn new(inner: &'a dyn TurnCostLookup, overlay: &'a Overlay) -> Self {
        Self { inner, overlay }
    }
}

impl TurnCostLookup for QueryTurnCosts<'_> {
    fn turn_cost(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        if self.overlay.is_virtual_node(via_node) {
            return if self.overlay.is_u_turn(in_edge, out_edge) {
                f64::INFINITY
            } else {
                0.0
            };
        }
        self.inner.turn_cost(
            self.overlay.original_edge(in_edge),
            via_node,
            self.overlay.original_edge(out_edge),
        )
    }
}

/// [`Weighting`] over query graph ids, see [`QueryGraph::wrap_weighting`](crate::querygraph::QueryGraph::wrap_weighting)
pub struct QueryGraphWeighting<'a, W: ?Sized> {
    inner: &'a W,
    overlay: &'a Overlay,
}

impl<'a, W: Weighting + ?Sized> QueryGraphWeighting<'a, W> {
    pub fn new(inner: &'a W, overlay: &'a Overlay) -> Self {
        Self { inner, overlay }
    }

    pub fn inner(&self) -> &'a W {
        self.inner
    }
}

impl<W: Weighting + ?Sized> Weighting for QueryGraphWeighting<'_, W> {
    fn edge_weight(&self, edge: &EdgeView<'_>, reverse: bool) -> f64 {
        self.inner.edge_weight(edge, reverse)
    }

    fn edge_millis(&self, edge: &EdgeView<'_>, reverse: bool) -> u64 {
        self.inner.edge_millis(edge, reverse)
    }

    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        if self.overlay.is_virtual_node(via_node) {
            return if self.overlay.is_u_turn(in_edge, out_edge) {
                f64::INFINITY
            } else {
                0.0
            };
        }
        self.inner.turn_weight(
            self.overlay.original_edge(in_edge),
            via_node,
            self.overlay.original_edge(out_edge),
        )
    }

    fn turn_millis(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> u64 {
        if self.overlay.is_virtual_node(via_node) {
            return 0;
        }
        self.inner.turn_millis(
            self.overlay.original_edge(in_edge),
            via_node,
            self.overlay.original_edge(out_edge),
        )
    }

    fn has_turn_costs(&self) -> bool {
        self.inner.has_turn_costs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::GeoPoint;
    use crate::core::graph::Graph;
    use crate::core::turn_cost::TurnCostTable;
    use crate::index::{ClosestEdge, Snap, SnappedPosition};
    use crate::querygraph::overlay::{ADJ_SNAP, BASE_SNAP, SNAP_ADJ, SNAP_BASE};
    use crate::querygraph::OverlayBuilder;
    use crate::testutil;
    use crate::weighting::{SpeedWeighting, WeightingConfig};

    fn overlay_on_edge_zero(graph: &crate::core::graph::BaseGraph) -> Overlay {
        let closest = ClosestEdge::from(graph.edge(0, None).unwrap());
        let mut snap = Snap::on_edge(GeoPoint::new(0.0, 0.5), closest, 0, SnappedPosition::Edge);
        snap.calc_snapped_point(graph).unwrap();
        OverlayBuilder::build(graph, &mut [snap]).unwrap()
    }

    fn id_of(overlay: &Overlay, slot: usize) -> EdgeId {
        overlay.edge_at(overlay.slot_of(overlay.first_virtual_node(), slot)).id()
    }

    #[test]
    fn test_virtual_via_node() {
        let graph = testutil::straight_edge_graph();
        let overlay = overlay_on_edge_zero(&graph);
        let costs = QueryTurnCosts::new(graph.turn_cost_table(), &overlay);
        let node = overlay.first_virtual_node();

        // straight through
        assert_eq!(costs.turn_cost(id_of(&overlay, BASE_SNAP), node, id_of(&overlay, SNAP_ADJ)), 0.0);
        // back the way it came
        assert!(costs
            .turn_cost(id_of(&overlay, BASE_SNAP), node, id_of(&overlay, SNAP_BASE))
            .is_infinite());
        assert!(!costs.is_turn_allowed(id_of(&overlay, ADJ_SNAP), node, id_of(&overlay, SNAP_ADJ)));
    }

    #[test]
    fn test_real_via_node_uses_original_ids() {
        let graph = testutil::straight_edge_graph();
        let overlay = overlay_on_edge_zero(&graph);
        let mut table = TurnCostTable::new();
        table.set(0, 1, 0, 25.0);
        let costs = QueryTurnCosts::new(&table, &overlay);

        // arriving at node 1 on the virtual piece of edge 0, then leaving on it again
        let arriving = id_of(&overlay, SNAP_ADJ);
        let leaving = id_of(&overlay, ADJ_SNAP);
        assert_eq!(costs.turn_cost(arriving, 1, leaving), 25.0);
        assert_eq!(costs.turn_cost(arriving, 0, leaving), 0.0);
    }

    #[test]
    fn test_wrapped_weighting() {
        let (graph, encoding) = testutil::speed_graph();
        let overlay = overlay_on_edge_zero(&graph);
        let weighting = SpeedWeighting::new(&encoding, WeightingConfig::car());
        let wrapped = QueryGraphWeighting::new(&weighting, &overlay);
        let node = overlay.first_virtual_node();

        assert_eq!(wrapped.turn_weight(id_of(&overlay, BASE_SNAP), node, id_of(&overlay, SNAP_ADJ)), 0.0);
        assert!(wrapped
            .turn_weight(id_of(&overlay, BASE_SNAP), node, id_of(&overlay, SNAP_BASE))
            .is_infinite());
        assert_eq!(wrapped.turn_millis(id_of(&overlay, BASE_SNAP), node, id_of(&overlay, SNAP_BASE)), 0);

        // u-turn at a real node maps onto the same original edge
        let u_turn = wrapped.turn_weight(id_of(&overlay, SNAP_BASE), 0, id_of(&overlay, BASE_SNAP));
        assert_eq!(u_turn, WeightingConfig::car().u_turn_cost_s);
    }
}
