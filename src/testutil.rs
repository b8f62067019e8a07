//! Small graphs shared by the unit tests

use crate::ch::{ChEdge, ChEdgeIter, ChGraph, RoutingChGraph};
use crate::core::distance::point_list_distance;
use crate::core::error::Result;
use crate::core::flags::{FlagLayout, RoadClass};
use crate::core::geometry::{GeoPoint, PointList};
use crate::core::graph::{BaseGraph, EdgeId, Graph, NodeId};
use crate::weighting::VehicleEncoding;

/// Edge with pillar geometry and a distance measured along it
pub(crate) fn add_edge(graph: &mut BaseGraph, a: NodeId, b: NodeId, pillars: &[GeoPoint]) -> EdgeId {
    let is_3d = graph.is_3d();
    let edge = graph.add_edge(a, b, 0.0).unwrap();
    graph
        .set_pillars(edge, PointList::from_points(pillars.to_vec(), is_3d))
        .unwrap();
    let distance = point_list_distance(&graph.full_geometry(edge, false));
    graph.set_distance(edge, distance).unwrap();
    edge
}

/// ```text
///        (1.5,1)--(1.5,1.5)
///       /                  \
///  0 (1,0)                  1 (1,2.5)
///     |
///  2 (0,0)
/// ```
pub(crate) fn one_virtual_node_graph() -> BaseGraph {
    let mut graph = BaseGraph::new(false);
    graph.set_node(0, GeoPoint::new(1.0, 0.0));
    graph.set_node(1, GeoPoint::new(1.0, 2.5));
    graph.set_node(2, GeoPoint::new(0.0, 0.0));
    add_edge(&mut graph, 0, 2, &[]);
    add_edge(
        &mut graph,
        0,
        1,
        &[GeoPoint::new(1.5, 1.0), GeoPoint::new(1.5, 1.5)],
    );
    graph
}

/// A single edge 0 -> 1 along the equator
pub(crate) fn straight_edge_graph() -> BaseGraph {
    let mut graph = BaseGraph::new(false);
    graph.set_node(0, GeoPoint::new(0.0, 0.0));
    graph.set_node(1, GeoPoint::new(0.0, 1.0));
    add_edge(&mut graph, 0, 1, &[]);
    graph
}

/// Edge 0 -> 1 plus a loop at node 0 whose stored pillars run north to south
pub(crate) fn loop_graph() -> BaseGraph {
    let mut graph = BaseGraph::new(false);
    graph.set_node(0, GeoPoint::new(0.0, 0.0));
    graph.set_node(1, GeoPoint::new(0.0, -1.0));
    add_edge(&mut graph, 0, 1, &[]);
    add_edge(
        &mut graph,
        0,
        0,
        &[GeoPoint::new(2.0, 1.0), GeoPoint::new(1.0, 1.0)],
    );
    graph
}

pub(crate) fn elevation_graph() -> BaseGraph {
    let mut graph = BaseGraph::new(true);
    graph.set_node(0, GeoPoint::new_3d(0.0, 0.0, 10.0));
    graph.set_node(1, GeoPoint::new_3d(0.0, 1.0, 20.0));
    add_edge(&mut graph, 0, 1, &[]);
    graph
}

fn car_encoding() -> VehicleEncoding {
    VehicleEncoding::register(&mut FlagLayout::new()).unwrap()
}

fn open_both_ways(graph: &BaseGraph, encoding: &VehicleEncoding, edge: EdgeId, speed: f64) {
    let view = graph.edge(edge, None).unwrap();
    view.set_bool_both(&encoding.access, true, true).unwrap();
    view.set_decimal_both(&encoding.speed, speed, speed).unwrap();
    view.set_enum(&encoding.road_class, RoadClass::Residential).unwrap();
}

/// 0 (0,0) -- 1 (0,1) -> 2 (0,2), 50 km/h, the second edge is one-way
pub(crate) fn speed_graph() -> (BaseGraph, VehicleEncoding) {
    let encoding = car_encoding();
    let mut graph = BaseGraph::new(false);
    for i in 0..3 {
        graph.set_node(i, GeoPoint::new(0.0, i as f64));
    }
    add_edge(&mut graph, 0, 1, &[]);
    add_edge(&mut graph, 1, 2, &[]);
    open_both_ways(&graph, &encoding, 0, 50.0);

    let oneway = graph.edge(1, None).unwrap();
    oneway.set_bool(&encoding.access, true).unwrap();
    oneway.set_decimal_both(&encoding.speed, 50.0, 50.0).unwrap();
    (graph, encoding)
}

/// `n x n` grid with 0.01° spacing, node `row * n + col` at `(row, col) * 0.01`.
///
/// Horizontal edges come first, row by row, then vertical edges.
pub(crate) fn grid_graph(n: u32) -> (BaseGraph, VehicleEncoding) {
    let encoding = car_encoding();
    let mut graph = BaseGraph::new(false);
    for row in 0..n {
        for col in 0..n {
            graph.set_node(row * n + col, GeoPoint::new(row as f64 * 0.01, col as f64 * 0.01));
        }
    }
    for row in 0..n {
        for col in 0..n - 1 {
            add_edge(&mut graph, row * n + col, row * n + col + 1, &[]);
        }
    }
    for row in 0..n - 1 {
        for col in 0..n {
            add_edge(&mut graph, row * n + col, (row + 1) * n + col, &[]);
        }
    }
    for edge in 0..graph.edge_count() as EdgeId {
        open_both_ways(&graph, &encoding, edge, 50.0);
    }
    (graph, encoding)
}

/// Contracted graph with overridable capabilities
pub(crate) struct FlaggedCh {
    pub inner: ChGraph,
    pub edge_count: Option<usize>,
    pub turn_costs: bool,
    pub edge_based: bool,
}

impl FlaggedCh {
    pub(crate) fn new(inner: ChGraph) -> Self {
        Self {
            inner,
            edge_count: None,
            turn_costs: false,
            edge_based: false,
        }
    }
}

impl RoutingChGraph for FlaggedCh {
    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn edge_count(&self) -> usize {
        self.edge_count.unwrap_or_else(|| self.inner.edge_count())
    }

    fn base_edge_count(&self) -> usize {
        self.inner.base_edge_count()
    }

    fn out_edges(&self, node: NodeId) -> ChEdgeIter<'_> {
        self.inner.out_edges(node)
    }

    fn in_edges(&self, node: NodeId) -> ChEdgeIter<'_> {
        self.inner.in_edges(node)
    }

    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<ChEdge> {
        self.inner.edge(edge, adj_node)
    }

    fn level(&self, node: NodeId) -> u32 {
        self.inner.level(node)
    }

    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        self.inner.turn_weight(in_edge, via_node, out_edge)
    }

    fn has_turn_costs(&self) -> bool {
        self.turn_costs
    }

    fn is_edge_based(&self) -> bool {
        self.edge_based
    }
}
