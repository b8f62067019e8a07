//! Overlay construction from snap results
//!
//! Snaps are grouped per original edge and chained from the edge's base node
//! to its adjacent node. Each new virtual node gets the segment back to the
//! previous anchor and, once the chain moves on, the segment to the next one:
//!
//! ```text
//!  base ---- v0 ---- v1 ---- adj
//!  slots v0: [base->v0, v0->base, v0->v1, v1->v0]
//!  slots v1: [v0->v1,   v1->v0,   v1->adj, adj->v1]
//! ```

use log::{debug, trace, warn};
use rustc_hash::FxHashMap;

use crate::core::distance::{plane_normalized_distance, point_list_distance};
use crate::core::error::{Error, Result};
use crate::core::geometry::{GeoPoint, PointList};
use crate::core::graph::{BaseGraph, EdgeId, Graph, NodeId};
use crate::index::{ClosestEdge, Snap, SnappedPosition};
use crate::querygraph::edge_delta::EdgeDeltaBuilder;
use crate::querygraph::overlay::Overlay;

pub struct OverlayBuilder<'a> {
    graph: &'a BaseGraph,
    overlay: Overlay,
}

impl<'a> OverlayBuilder<'a> {
    /// Build the overlay for `snaps`.
    ///
    /// Every snap must carry a closest edge. The closest node, snapped point,
    /// way index and position of each snap are rewritten so that searches can
    /// start from `snap.closest_node()` afterwards.
    pub fn build(graph: &'a BaseGraph, snaps: &mut [Snap]) -> Result<Overlay> {
        if let Some(index) = snaps.iter().position(|s| s.closest_edge().is_none()) {
            warn!("Rejecting overlay build: snap #{} has no closest edge", index);
            return Err(Error::MissingClosestEdge { index });
        }

        let mut builder = OverlayBuilder {
            graph,
            overlay: Overlay::new(
                graph.node_count() as NodeId,
                graph.edge_count() as EdgeId,
                graph.is_3d(),
            ),
        };
        builder.build_virtual_nodes_and_edges(snaps)?;
        EdgeDeltaBuilder::build(&mut builder.overlay)?;

        debug!(
            "Built overlay: {} virtual nodes, {} virtual edges, {} modified real nodes",
            builder.overlay.virtual_node_count(),
            builder.overlay.virtual_edge_count(),
            builder.overlay.deltas().len()
        );
        Ok(builder.overlay)
    }

    fn build_virtual_nodes_and_edges(&mut self, snaps: &mut [Snap]) -> Result<()> {
        // groups keep the order of first appearance so ids are deterministic
        let mut groups: Vec<(EdgeId, Vec<usize>)> = Vec::new();
        let mut group_of: FxHashMap<EdgeId, usize> = FxHashMap::default();

        for index in 0..snaps.len() {
            if snaps[index].position() == SnappedPosition::Tower {
                continue;
            }
            self.normalize_direction(&mut snaps[index])?;
            if snaps[index].snapped_point().is_none() {
                snaps[index].calc_snapped_point(self.graph)?;
            }

            let edge = closest_of(&snaps[index], index)?.edge;
            let group = *group_of.entry(edge).or_insert_with(|| {
                groups.push((edge, Vec::new()));
                groups.len() - 1
            });
            groups[group].1.push(index);
        }

        for (_, indices) in groups {
            self.splice_edge(snaps, indices)?;
        }
        Ok(())
    }

    /// Orient the closest edge from the lower to the higher node id, so snaps
    /// reached from either side of an edge chain up in one direction
    fn normalize_direction(&self, snap: &mut Snap) -> Result<()> {
        let closest = match snap.closest_edge() {
            Some(c) => c,
            None => return Ok(()),
        };

        let mut do_reverse = closest.base_node > closest.adj_node;
        if closest.base_node == closest.adj_node {
            // loops have no node order, use the latitude of the first and last pillar
            let full = closest.geometry(self.graph)?;
            if full.len() > 3 {
                do_reverse = full.lat(1) > full.lat(full.len() - 2);
            }
        }
        if !do_reverse {
            return Ok(());
        }

        let reversed = closest.reversed();
        let points = reversed.geometry(self.graph)?.len();
        let offset = if snap.position() == SnappedPosition::Pillar {
            1
        } else {
            2
        };
        let way_index = points
            .checked_sub(snap.way_index() + offset)
            .ok_or(Error::InvalidWayIndex {
                edge: closest.edge,
                way_index: snap.way_index(),
                points,
            })?;
        trace!(
            "Reversing closest edge {} for snap at way index {} -> {}",
            closest.edge,
            snap.way_index(),
            way_index
        );
        snap.set_closest_edge(reversed);
        snap.set_way_index(way_index);
        Ok(())
    }

    fn splice_edge(&mut self, snaps: &mut [Snap], mut indices: Vec<usize>) -> Result<()> {
        let closest = closest_of(&snaps[indices[0]], indices[0])?;
        let full = closest.geometry(self.graph)?;

        let snapped_distance = |snap: &Snap| -> f64 {
            let at = full.get(snap.way_index().min(full.len() - 1));
            let p = snap.snapped_point().unwrap_or(at);
            plane_normalized_distance(at.lat, at.lon, p.lat, p.lon)
        };
        indices.sort_by(|&a, &b| {
            snaps[a]
                .way_index()
                .cmp(&snaps[b].way_index())
                .then_with(|| snapped_distance(&snaps[a]).total_cmp(&snapped_distance(&snaps[b])))
        });

        let base = closest.base_node;
        let adj = closest.adj_node;
        let mut prev_point = full.get(0);
        let mut prev_way_index = 1;
        let mut prev_node = base;
        let mut added_edges = false;

        for (position, &index) in indices.iter().enumerate() {
            let snap_edge = closest_of(&snaps[index], index)?;
            if snap_edge.base_node != base {
                return Err(Error::InconsistentBaseNode {
                    edge: closest.edge,
                    expected: base,
                    actual: snap_edge.base_node,
                });
            }
            let snapped = snaps[index].snapped_point().unwrap_or(prev_point);

            if Snap::consider_equal(prev_point, snapped) {
                // same spot as the previous anchor, no new node
                let (way_index, snapped_position) = if position == 0 {
                    (0, SnappedPosition::Tower)
                } else {
                    let previous = &snaps[indices[position - 1]];
                    (previous.way_index(), previous.position())
                };
                let snap = &mut snaps[index];
                snap.set_closest_node(prev_node);
                snap.set_snapped_point(prev_point);
                snap.set_way_index(way_index);
                snap.set_position(snapped_position);
                snap.calc_query_distance();
                trace!("Snap #{} collapsed onto node {}", index, prev_node);
                continue;
            }

            let is_pillar = snaps[index].position() == SnappedPosition::Pillar;
            let way_index = snaps[index].way_index();
            let virtual_node = self.overlay.first_virtual_node() + self.overlay.virtual_node_count() as NodeId;
            self.create_edges(
                closest,
                &full,
                prev_point,
                prev_way_index,
                is_pillar,
                snapped,
                way_index,
                prev_node,
                virtual_node,
            );
            self.overlay.push_node(snapped, closest.edge);
            if added_edges {
                self.overlay.repeat_last_pair();
            }
            added_edges = true;

            snaps[index].set_closest_node(virtual_node);
            prev_node = virtual_node;
            prev_way_index = way_index + 1;
            prev_point = snapped;
        }

        // the segment from the last virtual node to the adjacent node
        if added_edges {
            let last = full.get(full.len() - 1);
            self.create_edges(
                closest,
                &full,
                prev_point,
                prev_way_index,
                false,
                last,
                full.len() - 2,
                prev_node,
                adj,
            );
        }
        Ok(())
    }

    /// Emit the pair `prev_node <-> node` with the geometry between the two points
    #[allow(clippy::too_many_arguments)]
    fn create_edges(
        &mut self,
        closest: ClosestEdge,
        full: &PointList,
        prev_point: GeoPoint,
        prev_way_index: usize,
        is_pillar: bool,
        point: GeoPoint,
        way_index: usize,
        prev_node: NodeId,
        node: NodeId,
    ) {
        let max = (way_index + 1).min(full.len());
        let from = prev_way_index.min(max);
        let mut geometry = PointList::with_capacity(max - from + 2, full.is_3d());
        geometry.push(prev_point);
        geometry.extend_from(full, from, max);
        if !is_pillar {
            geometry.push(point);
        }

        let distance = point_list_distance(&geometry);
        self.overlay
            .push_pair(closest.edge, prev_node, node, closest.reverse, geometry, distance);
    }
}

fn closest_of(snap: &Snap, index: usize) -> Result<ClosestEdge> {
    snap.closest_edge().ok_or(Error::MissingClosestEdge { index })
}
