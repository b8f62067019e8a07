//! Spatial index for snapping coordinates to edges

pub mod snap;

pub use snap::{ClosestEdge, Snap, SnappedPosition};

use log::debug;
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;

use crate::core::distance::{plane_normalized_distance, projection_factor};
use crate::core::edge::EdgeView;
use crate::core::error::Result;
use crate::core::geometry::GeoPoint;
use crate::core::graph::{BaseGraph, EdgeId, Graph};

/// Nearest segments examined per lookup
const CANDIDATES: usize = 32;

/// Edge segment `[lon, lat] -> [lon, lat]` tagged with (edge, index of its first point)
type Segment = GeomWithData<Line<[f64; 2]>, (EdgeId, usize)>;

/// R-tree over every segment of every edge geometry
pub struct LocationIndex {
    tree: RTree<Segment>,
}

impl LocationIndex {
    pub fn build(graph: &BaseGraph) -> Self {
        let mut segments = Vec::new();
        for edge in 0..graph.edge_count() as EdgeId {
            let geometry = graph.full_geometry(edge, false);
            for (i, w) in geometry.as_slice().windows(2).enumerate() {
                let line = Line::new([w[0].lon, w[0].lat], [w[1].lon, w[1].lat]);
                segments.push(GeomWithData::new(line, (edge, i)));
            }
        }
        debug!("Location index: {} segments over {} edges", segments.len(), graph.edge_count());

        Self {
            tree: RTree::bulk_load(segments),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Snap `(lat, lon)` to the closest edge accepted by `filter`.
    ///
    /// Returns an invalid snap (no closest edge) when nothing is accepted.
    pub fn find_closest(
        &self,
        graph: &BaseGraph,
        lat: f64,
        lon: f64,
        filter: impl Fn(&EdgeView<'_>) -> bool,
    ) -> Result<Snap> {
        let query = GeoPoint::new(lat, lon);
        let mut best: Option<(f64, EdgeId, usize, f64)> = None;

        for segment in self.tree.nearest_neighbor_iter(&[lon, lat]).take(CANDIDATES) {
            let (edge, index) = segment.data;
            if !filter(&graph.edge(edge, None)?) {
                continue;
            }
            let [a_lon, a_lat] = segment.geom().from;
            let [b_lon, b_lat] = segment.geom().to;
            let t = projection_factor(lat, lon, a_lat, a_lon, b_lat, b_lon).clamp(0.0, 1.0);
            let p_lat = a_lat + t * (b_lat - a_lat);
            let p_lon = a_lon + t * (b_lon - a_lon);
            let d = plane_normalized_distance(lat, lon, p_lat, p_lon);
            if best.map_or(true, |(best_d, ..)| d < best_d) {
                best = Some((d, edge, index, t));
            }
        }

        let Some((_, edge, index, t)) = best else {
            return Ok(Snap::new(query));
        };

        let (a, b) = graph.edge_nodes(edge)?;
        let points = graph.full_geometry(edge, false).len();
        let (way_index, position) = if t <= 0.0 {
            if index == 0 {
                (0, SnappedPosition::Tower)
            } else {
                (index, SnappedPosition::Pillar)
            }
        } else if t >= 1.0 {
            if index + 2 == points {
                (points - 1, SnappedPosition::Tower)
            } else {
                (index + 1, SnappedPosition::Pillar)
            }
        } else {
            (index, SnappedPosition::Edge)
        };

        let mut snap = Snap::on_edge(query, ClosestEdge::new(edge, a, b, false), way_index, position);
        snap.calc_snapped_point(graph)?;
        Ok(snap)
    }
}
