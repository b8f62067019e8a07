//! Per-real-node edge changes
//!
//! A real node next to a virtual node must stop offering the original edge
//! (otherwise a search could tunnel past the virtual node) and start offering
//! the virtual edge that replaces it.

use log::trace;
use rustc_hash::FxHashSet;

use crate::core::error::{Error, Result};
use crate::core::graph::NodeId;
use crate::querygraph::overlay::{Overlay, ADJ_SNAP, BASE_SNAP, SNAP_ADJ, SNAP_BASE};

pub struct EdgeDeltaBuilder;

impl EdgeDeltaBuilder {
    /// Fill the overlay's delta map, which must still be empty.
    ///
    /// All additions are collected before any removal is resolved, so the
    /// result does not depend on the order virtual nodes are visited in.
    pub fn build(overlay: &mut Overlay) -> Result<()> {
        if !overlay.deltas.is_empty() {
            return Err(Error::DeltaMapNotEmpty(overlay.deltas.len()));
        }

        let first_virtual = overlay.first_virtual_node();
        let mut marked: Vec<NodeId> = Vec::new();
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();

        for i in 0..overlay.virtual_node_count() as NodeId {
            let node = first_virtual + i;

            // the edge back towards the base side ends at a real node on the first link of a chain
            let snap_base = overlay.edge_at(overlay.slot_of(node, SNAP_BASE));
            if snap_base.adj_node() < first_virtual {
                let real = snap_base.adj_node();
                let addition = overlay.slot_of(node, BASE_SNAP);
                overlay.deltas.entry(real).or_default().add(addition);
                if seen.insert(real) {
                    marked.push(real);
                }
            }

            let snap_adj = overlay.edge_at(overlay.slot_of(node, SNAP_ADJ));
            if snap_adj.adj_node() < first_virtual {
                let real = snap_adj.adj_node();
                let addition = overlay.slot_of(node, ADJ_SNAP);
                overlay.deltas.entry(real).or_default().add(addition);
                if seen.insert(real) {
                    marked.push(real);
                }
            }
        }

        for real in marked {
            let removals: Vec<_> = match overlay.deltas.get(&real) {
                Some(delta) => delta
                    .additions()
                    .iter()
                    .filter_map(|&index| overlay.closest_edge(overlay.edge_at(index).adj_node()))
                    .collect(),
                None => continue,
            };
            trace!("Real node {} hides original edges {:?}", real, removals);
            if let Some(delta) = overlay.deltas.get_mut(&real) {
                for edge in removals {
                    delta.remove(edge);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::GeoPoint;
    use crate::core::graph::{BaseGraph, Graph};
    use crate::index::{ClosestEdge, Snap, SnappedPosition};
    use crate::querygraph::builder::OverlayBuilder;
    use crate::testutil;

    fn snap(graph: &BaseGraph, edge: u32, lat: f64, lon: f64, way_index: usize) -> Snap {
        let closest = ClosestEdge::from(graph.edge(edge, None).unwrap());
        let mut snap = Snap::on_edge(GeoPoint::new(lat, lon), closest, way_index, SnappedPosition::Edge);
        snap.calc_snapped_point(graph).unwrap();
        snap
    }

    #[test]
    fn test_single_virtual_node_deltas() {
        let graph = testutil::straight_edge_graph();
        let mut snaps = vec![snap(&graph, 0, 0.0, 0.5, 0)];
        let overlay = OverlayBuilder::build(&graph, &mut snaps).unwrap();

        assert_eq!(overlay.deltas().len(), 2);
        let at_base = overlay.delta(0).unwrap();
        assert_eq!(at_base.additions(), &[overlay.slot_of(2, BASE_SNAP)]);
        assert_eq!(at_base.removals(), &[0]);
        let at_adj = overlay.delta(1).unwrap();
        assert_eq!(at_adj.additions(), &[overlay.slot_of(2, ADJ_SNAP)]);
        assert_eq!(at_adj.removals(), &[0]);

        for (&node, delta) in overlay.deltas() {
            for &index in delta.additions() {
                assert_eq!(overlay.edge_at(index).base_node(), node);
            }
        }
    }

    #[test]
    fn test_chain_only_touches_ends() {
        let graph = testutil::straight_edge_graph();
        let mut snaps = vec![snap(&graph, 0, 0.0, 0.2, 0), snap(&graph, 0, 0.0, 0.8, 0)];
        let overlay = OverlayBuilder::build(&graph, &mut snaps).unwrap();

        assert_eq!(overlay.deltas().len(), 2);
        assert_eq!(overlay.delta(0).unwrap().additions().len(), 1);
        assert_eq!(overlay.delta(1).unwrap().additions().len(), 1);
        // node 1 is reached from the second virtual node
        let addition = overlay.edge_at(overlay.delta(1).unwrap().additions()[0]);
        assert_eq!(addition.adj_node(), 3);
    }

    #[test]
    fn test_node_shared_by_two_subdivided_edges() {
        let graph = testutil::one_virtual_node_graph();
        // one snap on edge 0 (0-2) and one on edge 1 (0-1), both touch node 0
        let mut snaps = vec![snap(&graph, 0, 0.5, 0.1, 0), snap(&graph, 1, 1.6, 1.25, 1)];
        let overlay = OverlayBuilder::build(&graph, &mut snaps).unwrap();

        let at_zero = overlay.delta(0).unwrap();
        assert_eq!(at_zero.additions().len(), 2);
        let mut removed = at_zero.removals().to_vec();
        removed.sort();
        assert_eq!(removed, vec![0, 1]);
        assert_eq!(overlay.delta(2).unwrap().removals(), &[0]);
        assert_eq!(overlay.delta(1).unwrap().removals(), &[1]);
    }

    #[test]
    fn test_rejects_populated_map() {
        let graph = testutil::straight_edge_graph();
        let mut snaps = vec![snap(&graph, 0, 0.0, 0.5, 0)];
        let mut overlay = OverlayBuilder::build(&graph, &mut snaps).unwrap();
        assert!(matches!(
            EdgeDeltaBuilder::build(&mut overlay),
            Err(Error::DeltaMapNotEmpty(2))
        ));
    }
}
