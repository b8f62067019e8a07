//! Snap results: where a query point lands on the road graph

use serde::{Deserialize, Serialize};

use crate::core::distance::{crossing_point_to_edge, haversine_distance};
use crate::core::error::{Error, Result};
use crate::core::edge::EdgeView;
use crate::core::geometry::{GeoPoint, PointList};
use crate::core::graph::{BaseGraph, EdgeId, NodeId};

/// Coordinates closer than this (in degrees) are treated as the same point
pub const COORDINATE_EPSILON: f64 = 1e-6;

/// Where on the closest edge the snapped point lies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnappedPosition {
    /// On a junction node
    Tower,
    /// On a shape point of the edge
    Pillar,
    /// Between two consecutive points of the edge geometry
    Edge,
}

/// Closest edge of a snap, oriented `base_node -> adj_node`.
///
/// `reverse` tells whether that orientation runs against the stored one,
/// which is the only way to orient a loop edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosestEdge {
    pub edge: EdgeId,
    pub base_node: NodeId,
    pub adj_node: NodeId,
    pub reverse: bool,
}

impl ClosestEdge {
    pub fn new(edge: EdgeId, base_node: NodeId, adj_node: NodeId, reverse: bool) -> Self {
        Self {
            edge,
            base_node,
            adj_node,
            reverse,
        }
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.edge, self.adj_node, self.base_node, !self.reverse)
    }

    /// Full geometry in this orientation
    pub fn geometry(&self, graph: &BaseGraph) -> Result<PointList> {
        graph.edge_nodes(self.edge)?;
        Ok(graph.full_geometry(self.edge, self.reverse))
    }
}

impl From<EdgeView<'_>> for ClosestEdge {
    fn from(view: EdgeView<'_>) -> Self {
        Self::new(view.edge(), view.base_node(), view.adj_node(), view.reverse())
    }
}

#[derive(Debug, Clone)]
pub struct Snap {
    query_point: GeoPoint,
    closest_edge: Option<ClosestEdge>,
    closest_node: Option<NodeId>,
    way_index: usize,
    position: SnappedPosition,
    snapped_point: Option<GeoPoint>,
    query_distance: f64,
}

impl Snap {
    /// A snap that did not find any edge
    pub fn new(query_point: GeoPoint) -> Self {
        Self {
            query_point,
            closest_edge: None,
            closest_node: None,
            way_index: 0,
            position: SnappedPosition::Edge,
            snapped_point: None,
            query_distance: f64::INFINITY,
        }
    }

    pub fn on_edge(query_point: GeoPoint, edge: ClosestEdge, way_index: usize, position: SnappedPosition) -> Self {
        Self {
            closest_edge: Some(edge),
            way_index,
            position,
            ..Self::new(query_point)
        }
    }

    /// Whether the snap resolved to a node the search can start from
    pub fn is_valid(&self) -> bool {
        self.closest_node.is_some()
    }

    pub fn query_point(&self) -> GeoPoint {
        self.query_point
    }

    pub fn closest_edge(&self) -> Option<ClosestEdge> {
        self.closest_edge
    }

    pub fn closest_node(&self) -> Option<NodeId> {
        self.closest_node
    }

    pub fn way_index(&self) -> usize {
        self.way_index
    }

    pub fn position(&self) -> SnappedPosition {
        self.position
    }

    pub fn snapped_point(&self) -> Option<GeoPoint> {
        self.snapped_point
    }

    /// Metres between the query point and the snapped point
    pub fn query_distance(&self) -> f64 {
        self.query_distance
    }

    pub(crate) fn set_closest_edge(&mut self, edge: ClosestEdge) {
        self.closest_edge = Some(edge);
    }

    pub fn set_closest_node(&mut self, node: NodeId) {
        self.closest_node = Some(node);
    }

    pub(crate) fn set_way_index(&mut self, way_index: usize) {
        self.way_index = way_index;
    }

    pub(crate) fn set_position(&mut self, position: SnappedPosition) {
        self.position = position;
    }

    pub(crate) fn set_snapped_point(&mut self, point: GeoPoint) {
        self.snapped_point = Some(point);
    }

    pub fn calc_query_distance(&mut self) {
        if let Some(p) = self.snapped_point {
            self.query_distance = haversine_distance(self.query_point.lat, self.query_point.lon, p.lat, p.lon);
        }
    }

    /// Resolve the snapped point from the closest edge geometry.
    ///
    /// Tower and pillar snaps take the point at the way index, tower snaps also
    /// pick their closest node. Edge snaps project the query point onto the
    /// segment starting at the way index.
    pub fn calc_snapped_point(&mut self, graph: &BaseGraph) -> Result<()> {
        let closest = self.closest_edge.ok_or(Error::MissingClosestEdge { index: 0 })?;
        let full = closest.geometry(graph)?;
        if self.way_index >= full.len() {
            return Err(Error::InvalidWayIndex {
                edge: closest.edge,
                way_index: self.way_index,
                points: full.len(),
            });
        }

        let at = full.get(self.way_index);
        match self.position {
            SnappedPosition::Tower => {
                self.closest_node = Some(if self.way_index == 0 {
                    closest.base_node
                } else {
                    closest.adj_node
                });
                self.snapped_point = Some(at);
            }
            SnappedPosition::Pillar => self.snapped_point = Some(at),
            SnappedPosition::Edge => {
                if self.way_index + 1 >= full.len() {
                    return Err(Error::InvalidWayIndex {
                        edge: closest.edge,
                        way_index: self.way_index,
                        points: full.len(),
                    });
                }
                let next = full.get(self.way_index + 1);
                let q = self.query_point;
                let (lat, lon) = crossing_point_to_edge(q.lat, q.lon, at.lat, at.lon, next.lat, next.lon);
                let ele = if full.is_3d() {
                    (at.ele + next.ele) / 2.0
                } else {
                    f64::NAN
                };
                self.snapped_point = Some(GeoPoint::new_3d(lat, lon, ele));
            }
        }
        self.calc_query_distance();
        Ok(())
    }

    pub fn consider_equal(a: GeoPoint, b: GeoPoint) -> bool {
        (a.lat - b.lat).abs() < COORDINATE_EPSILON && (a.lon - b.lon).abs() < COORDINATE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_calc_snapped_point_on_tower() {
        let graph = testutil::one_virtual_node_graph();
        let mut snap = Snap::on_edge(GeoPoint::new(0.0, 0.0), ClosestEdge::new(0, 2, 0, true), 0, SnappedPosition::Tower);
        snap.calc_snapped_point(&graph).unwrap();
        assert_eq!(snap.closest_node(), Some(2));
        assert_eq!(snap.snapped_point().unwrap().lat, 0.0);

        let mut snap = Snap::on_edge(GeoPoint::new(1.0, 0.0), ClosestEdge::new(0, 2, 0, true), 1, SnappedPosition::Tower);
        snap.calc_snapped_point(&graph).unwrap();
        assert_eq!(snap.closest_node(), Some(0));
        assert_eq!(snap.snapped_point().unwrap().lat, 1.0);
        assert!(snap.query_distance() < 1e-6);
    }

    #[test]
    fn test_calc_snapped_point_between_pillars() {
        let graph = testutil::one_virtual_node_graph();
        let mut snap = Snap::on_edge(GeoPoint::new(1.5, 2.0), ClosestEdge::new(1, 1, 0, true), 0, SnappedPosition::Edge);
        snap.calc_snapped_point(&graph).unwrap();
        let p = snap.snapped_point().unwrap();
        assert!((p.lat - 1.300019).abs() < 1e-6);
        assert!((p.lon - 1.899962).abs() < 1e-6);
        assert!(snap.closest_node().is_none());
        assert!(snap.query_distance() > 0.0);
    }

    #[test]
    fn test_calc_snapped_point_uses_mean_elevation() {
        let graph = testutil::elevation_graph();
        let mut snap = Snap::on_edge(GeoPoint::new(0.0005, 0.5), ClosestEdge::new(0, 0, 1, false), 0, SnappedPosition::Edge);
        snap.calc_snapped_point(&graph).unwrap();
        let p = snap.snapped_point().unwrap();
        assert_eq!(p.lat, 0.0);
        assert!((p.ele - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_calc_snapped_point_rejects_bad_way_index() {
        let graph = testutil::one_virtual_node_graph();
        let mut snap = Snap::on_edge(GeoPoint::new(0.5, 0.0), ClosestEdge::new(0, 2, 0, true), 1, SnappedPosition::Edge);
        assert!(matches!(
            snap.calc_snapped_point(&graph),
            Err(Error::InvalidWayIndex { .. })
        ));
    }

    #[test]
    fn test_consider_equal() {
        let a = GeoPoint::new(1.0, 1.0);
        assert!(Snap::consider_equal(a, GeoPoint::new(1.0000005, 0.9999995)));
        assert!(!Snap::consider_equal(a, GeoPoint::new(1.00001, 1.0)));
    }

    #[test]
    fn test_unresolved_snap_is_invalid() {
        let snap = Snap::new(GeoPoint::new(3.0, 3.0));
        assert!(!snap.is_valid());
        assert!(snap.closest_edge().is_none());
    }
}
