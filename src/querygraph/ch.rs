//! Contraction hierarchy view over a query graph
//!
//! Virtual edges get CH ids after every shortcut:
//! `ch_id = virtual_id + (ch_edge_count - base_edge_count)`. Virtual nodes sit
//! at level `u32::MAX`, so an upward search may always enter and leave them.

use log::debug;
use rustc_hash::FxHashMap;

use crate::ch::{ChEdge, ChEdgeIter, RoutingChGraph};
use crate::core::error::{Error, Result};
use crate::core::graph::{EdgeId, Graph, NodeId};
use crate::querygraph::overlay::{Overlay, SNAP_ADJ, SNAP_BASE};
use crate::querygraph::query_graph::QueryGraph;
use crate::querygraph::turn_cost::QueryGraphWeighting;
use crate::weighting::Weighting;

/// [`RoutingChGraph`] over a contracted base graph plus one overlay.
///
/// Virtual edge weights are computed once here, so heading enforcement has to
/// happen on the query graph before this view is built.
pub struct QueryChGraph<'a, C: ?Sized, W: ?Sized> {
    ch: &'a C,
    query_graph: &'a QueryGraph<'a>,
    weighting: QueryGraphWeighting<'a, W>,
    shift: EdgeId,
    /// One entry per overlay arena edge
    virtual_edges: Vec<ChEdge>,
    out: FxHashMap<NodeId, Vec<ChEdge>>,
    inc: FxHashMap<NodeId, Vec<ChEdge>>,
}

impl<'a, C, W> QueryChGraph<'a, C, W>
where
    C: RoutingChGraph + ?Sized,
    W: Weighting + ?Sized,
{
    pub fn new(ch: &'a C, query_graph: &'a QueryGraph<'a>, weighting: &'a W) -> Result<Self> {
        let overlay = query_graph.overlay();
        let ch_edges = ch.edge_count();
        let base_edges = query_graph.base_graph().edge_count();
        let virtual_count = overlay.virtual_edge_count();
        let total = ch_edges.checked_add(virtual_count).filter(|&t| t <= u32::MAX as usize);
        if total.is_none() || ch_edges < base_edges {
            return Err(Error::EdgeIdOverflow {
                ch_edges,
                virtual_edges: virtual_count,
            });
        }
        let shift = (ch_edges - base_edges) as EdgeId;
        let weighting = query_graph.wrap_weighting(weighting);

        let mut virtual_edges = Vec::with_capacity(overlay.edges().len());
        for index in 0..overlay.edges().len() as u32 {
            let view = overlay.view(query_graph.base_graph(), index);
            let edge = overlay.edge_at(index);
            virtual_edges.push(ChEdge {
                edge: edge.id() + shift,
                orig_edge: Some(edge.id()),
                base_node: edge.base_node(),
                adj_node: edge.adj_node(),
                skipped: None,
                weight_fwd: weighting.edge_weight(&view, false),
                weight_bwd: weighting.edge_weight(&view, true),
                millis_fwd: weighting.edge_millis(&view, false),
                millis_bwd: weighting.edge_millis(&view, true),
                distance: edge.distance(),
            });
        }

        let mut view = Self {
            ch,
            query_graph,
            weighting,
            shift,
            virtual_edges,
            out: FxHashMap::default(),
            inc: FxHashMap::default(),
        };
        view.build_lists(overlay);
        debug!(
            "CH query graph: shift {}, {} virtual edges, {} nodes with changed edge lists",
            shift,
            virtual_count,
            view.out.len()
        );
        Ok(view)
    }

    fn build_lists(&mut self, overlay: &Overlay) {
        for (&node, delta) in overlay.deltas() {
            let mut out = Vec::new();
            let mut inc = Vec::new();
            for &index in delta.additions() {
                self.push_virtual(index, &mut out, &mut inc);
            }
            let kept = |e: &ChEdge| e.orig_edge.map_or(true, |orig| !delta.is_removed(orig));
            out.extend(self.ch.out_edges(node).filter(kept));
            inc.extend(self.ch.in_edges(node).filter(kept));
            self.out.insert(node, out);
            self.inc.insert(node, inc);
        }

        for i in 0..overlay.virtual_node_count() as NodeId {
            let node = overlay.first_virtual_node() + i;
            let mut out = Vec::new();
            let mut inc = Vec::new();
            for slot in [SNAP_BASE, SNAP_ADJ] {
                self.push_virtual(overlay.slot_of(node, slot), &mut out, &mut inc);
            }
            self.out.insert(node, out);
            self.inc.insert(node, inc);
        }
    }

    fn push_virtual(&self, index: u32, out: &mut Vec<ChEdge>, inc: &mut Vec<ChEdge>) {
        let edge = self.virtual_edges[index as usize];
        if edge.weight_fwd.is_finite() {
            out.push(edge);
        }
        if edge.weight_bwd.is_finite() {
            inc.push(edge);
        }
    }

    /// CH id of a query graph edge id
    pub fn to_ch_edge(&self, edge: EdgeId) -> EdgeId {
        if self.query_graph.is_virtual_edge(edge) {
            edge + self.shift
        } else {
            edge
        }
    }

    /// Query graph id of a CH edge id; shortcuts map to themselves
    pub fn from_ch_edge(&self, edge: EdgeId) -> EdgeId {
        if edge as usize >= self.ch.edge_count() {
            edge - self.shift
        } else {
            edge
        }
    }

    pub fn query_graph(&self) -> &'a QueryGraph<'a> {
        self.query_graph
    }
}

impl<'a, C, W> RoutingChGraph for QueryChGraph<'a, C, W>
where
    C: RoutingChGraph + ?Sized,
    W: Weighting + ?Sized,
{
    fn node_count(&self) -> usize {
        self.query_graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.ch.edge_count() + self.query_graph.overlay().virtual_edge_count()
    }

    fn base_edge_count(&self) -> usize {
        self.ch.base_edge_count()
    }

    fn out_edges(&self, node: NodeId) -> ChEdgeIter<'_> {
        match self.out.get(&node) {
            Some(edges) => edges.iter().copied(),
            None => self.ch.out_edges(node),
        }
    }

    fn in_edges(&self, node: NodeId) -> ChEdgeIter<'_> {
        match self.inc.get(&node) {
            Some(edges) => edges.iter().copied(),
            None => self.ch.in_edges(node),
        }
    }

    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<ChEdge> {
        if (edge as usize) < self.ch.edge_count() {
            return self.ch.edge(edge, adj_node);
        }
        let overlay = self.query_graph.overlay();
        let index = overlay
            .edge_index(self.from_ch_edge(edge))
            .ok_or(Error::EdgeNotFound(edge))?;
        let found = self.virtual_edges[index as usize];
        match adj_node {
            None => Ok(found),
            Some(adj) if found.adj_node == adj => Ok(found),
            Some(adj) if found.base_node == adj => {
                Ok(self.virtual_edges[overlay.edge_at(index).reverse_edge() as usize])
            }
            Some(adj) => Err(Error::EdgeNotAdjacent { edge, node: adj }),
        }
    }

    fn level(&self, node: NodeId) -> u32 {
        if self.query_graph.is_virtual_node(node) {
            u32::MAX
        } else {
            self.ch.level(node)
        }
    }

    /// `in_edge` and `out_edge` are query graph ids, as found in `orig_edge`
    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        if !self.ch.has_turn_costs() {
            return 0.0;
        }
        self.weighting.turn_weight(in_edge, via_node, out_edge)
    }

    fn has_turn_costs(&self) -> bool {
        self.ch.has_turn_costs()
    }

    fn is_edge_based(&self) -> bool {
        self.ch.is_edge_based()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ch::{contract, ChGraph};
    use crate::core::geometry::GeoPoint;
    use crate::core::graph::BaseGraph;
    use crate::index::{ClosestEdge, Snap, SnappedPosition};
    use crate::querygraph::overlay::{ADJ_SNAP, BASE_SNAP};
    use crate::querygraph::OverlayBuilder;
    use crate::search::{ch_route, dijkstra};
    use crate::testutil;
    use crate::weighting::{SpeedWeighting, WeightingConfig};

    fn snap(graph: &BaseGraph, edge: EdgeId, lat: f64, lon: f64) -> Snap {
        let closest = ClosestEdge::from(graph.edge(edge, None).unwrap());
        let mut snap = Snap::on_edge(GeoPoint::new(lat, lon), closest, 0, SnappedPosition::Edge);
        snap.calc_snapped_point(graph).unwrap();
        snap
    }

    fn no_turn_costs() -> WeightingConfig {
        WeightingConfig {
            turn_costs: false,
            ..WeightingConfig::car()
        }
    }

    #[test]
    fn test_edge_id_shift() {
        let (graph, encoding) = testutil::grid_graph(3);
        let weighting = SpeedWeighting::new(&encoding, no_turn_costs());
        let ch = contract(&graph, &weighting).unwrap();
        let shortcuts = ch.shortcut_count() as EdgeId;
        let base = graph.edge_count() as EdgeId;

        let overlay = OverlayBuilder::build(&graph, &mut [snap(&graph, 0, 0.0, 0.005)]).unwrap();
        let query = QueryGraph::new(&graph, &overlay);
        let view = QueryChGraph::new(&ch, &query, &weighting).unwrap();

        for k in 0..4 {
            assert_eq!(view.to_ch_edge(base + k), base + shortcuts + k);
            assert_eq!(view.from_ch_edge(base + shortcuts + k), base + k);
        }
        assert_eq!(view.to_ch_edge(3), 3);
        assert_eq!(view.edge_count(), ch.edge_count() + 4);
        assert_eq!(view.level(4), ch.level(4));
        assert_eq!(view.level(overlay.first_virtual_node()), u32::MAX);

        let e = view.edge(base + shortcuts, None).unwrap();
        assert_eq!(e.orig_edge, Some(base));
        let back = view.edge(base + shortcuts, Some(e.base_node)).unwrap();
        assert_eq!(back.edge, base + shortcuts + 1);
        assert!(matches!(view.edge(base + shortcuts + 4, None), Err(Error::EdgeNotFound(_))));
    }

    #[test]
    fn test_edge_lists_at_modified_nodes() {
        let (graph, encoding) = testutil::grid_graph(3);
        let weighting = SpeedWeighting::new(&encoding, no_turn_costs());
        let ch = contract(&graph, &weighting).unwrap();
        let overlay = OverlayBuilder::build(&graph, &mut [snap(&graph, 0, 0.0, 0.005)]).unwrap();
        let query = QueryGraph::new(&graph, &overlay);
        let view = QueryChGraph::new(&ch, &query, &weighting).unwrap();
        let node = overlay.first_virtual_node();

        let out: Vec<_> = view.out_edges(node).map(|e| e.adj_node).collect();
        assert_eq!(out, vec![0, 1]);
        assert_eq!(view.in_edges(node).count(), 2);
        for e in view.out_edges(0).chain(view.in_edges(0)) {
            assert_ne!(e.orig_edge, Some(0));
        }
        let first = view.out_edges(0).next().unwrap();
        assert_eq!(first.orig_edge, Some(overlay.first_virtual_edge() + BASE_SNAP as EdgeId));
        assert!(view.in_edges(1).any(|e| e.orig_edge == Some(overlay.first_virtual_edge() + ADJ_SNAP as EdgeId)));
    }

    #[test]
    fn test_overflow_is_rejected() {
        let (graph, encoding) = testutil::grid_graph(2);
        let weighting = SpeedWeighting::new(&encoding, no_turn_costs());
        let overlay = OverlayBuilder::build(&graph, &mut [snap(&graph, 0, 0.0, 0.005)]).unwrap();
        let query = QueryGraph::new(&graph, &overlay);

        // a hierarchy claiming to use up the whole id range
        let mut edges = Vec::new();
        for id in 0..graph.edge_count() as EdgeId {
            let (a, b) = graph.edge_nodes(id).unwrap();
            edges.push(ChEdge {
                edge: id,
                orig_edge: Some(id),
                base_node: a,
                adj_node: b,
                skipped: None,
                weight_fwd: 1.0,
                weight_bwd: 1.0,
                millis_fwd: 1000,
                millis_bwd: 1000,
                distance: 1.0,
            });
        }
        let huge = testutil::FlaggedCh {
            edge_count: Some(u32::MAX as usize - 2),
            ..testutil::FlaggedCh::new(ChGraph::new(graph.edge_count(), edges, vec![0; graph.node_count()]))
        };
        assert!(matches!(
            QueryChGraph::new(&huge, &query, &weighting),
            Err(Error::EdgeIdOverflow { .. })
        ));
    }

    #[test]
    fn test_turn_weight_takes_query_graph_ids() {
        let (mut graph, encoding) = testutil::grid_graph(3);
        // edge 0 (0-1) may not continue onto edge 1 (1-2), edge 2 (3-4) onto edge 3 (4-5) costs extra
        graph.turn_cost_table_mut().restrict(0, 1, 1);
        graph.turn_cost_table_mut().set(2, 4, 3, 99.0);
        let weighting = SpeedWeighting::new(&encoding, WeightingConfig::car()).with_turn_costs(graph.turn_cost_table());
        let contracted = contract(&graph, &weighting).unwrap();
        let shortcuts = contracted.shortcut_count() as EdgeId;
        let ch = testutil::FlaggedCh {
            turn_costs: true,
            ..testutil::FlaggedCh::new(contracted.clone())
        };

        let overlay = OverlayBuilder::build(&graph, &mut [snap(&graph, 0, 0.0, 0.005)]).unwrap();
        let query = QueryGraph::new(&graph, &overlay);
        let view = QueryChGraph::new(&ch, &query, &weighting).unwrap();
        let wrapped = query.wrap_weighting(&weighting);
        let first = overlay.first_virtual_edge();
        let node = overlay.first_virtual_node();
        let id = |slot: usize| first + slot as EdgeId;
        assert!(view.has_turn_costs());

        // the half of edge 0 arriving at node 1 keeps the restriction
        assert!(view.turn_weight(id(SNAP_ADJ), 1, 1).is_infinite());
        assert_eq!(view.turn_weight(id(SNAP_ADJ), 1, 7), 0.0);
        assert_eq!(view.turn_weight(2, 4, 3), 99.0);
        assert_eq!(view.turn_weight(id(BASE_SNAP), node, id(SNAP_ADJ)), 0.0);
        assert!(view.turn_weight(id(BASE_SNAP), node, id(SNAP_BASE)).is_infinite());

        // ids taken from the CH edge lists are resolved like on the query graph
        for in_edge in view.in_edges(1).filter_map(|e| e.orig_edge) {
            for out_edge in view.out_edges(1).filter_map(|e| e.orig_edge) {
                assert_eq!(view.turn_weight(in_edge, 1, out_edge), wrapped.turn_weight(in_edge, 1, out_edge));
            }
        }
        // the first virtual CH id is shifted past the shortcuts and is never a turn argument
        assert_eq!(view.to_ch_edge(id(SNAP_ADJ)), id(SNAP_ADJ) + shortcuts);

        let plain = QueryChGraph::new(&contracted, &query, &weighting).unwrap();
        assert!(!plain.has_turn_costs());
        assert_eq!(plain.turn_weight(id(SNAP_ADJ), 1, 1), 0.0);
    }

    #[test]
    fn test_route_between_snaps_matches_dijkstra() {
        let (graph, encoding) = testutil::grid_graph(4);
        let weighting = SpeedWeighting::new(&encoding, no_turn_costs());
        let ch = contract(&graph, &weighting).unwrap();

        // one snap on the first horizontal edge, one on the last
        let last = 11;
        let (a, b) = graph.edge_nodes(last).unwrap();
        let mid_a = graph.coordinate(a);
        let mid_b = graph.coordinate(b);
        let mut snaps = [
            snap(&graph, 0, 0.0, 0.004),
            snap(&graph, last, (mid_a.lat + mid_b.lat) / 2.0, (mid_a.lon + mid_b.lon) / 2.0),
        ];
        let overlay = OverlayBuilder::build(&graph, &mut snaps).unwrap();
        let query = QueryGraph::new(&graph, &overlay);
        let view = QueryChGraph::new(&ch, &query, &weighting).unwrap();
        let from = snaps[0].closest_node().unwrap();
        let to = snaps[1].closest_node().unwrap();

        let wrapped = query.wrap_weighting(&weighting);
        let expected = dijkstra(&query, &wrapped, from, to).unwrap();
        let actual = ch_route(&view, from, to).unwrap().unwrap();
        assert!((expected.weight - actual.weight).abs() < 1e-3);
        assert!((expected.distance - actual.distance).abs() < 1.0);
        assert_eq!(actual.nodes.first(), Some(&from));
        assert_eq!(actual.nodes.last(), Some(&to));

        let back = ch_route(&view, to, from).unwrap().unwrap();
        assert!((back.weight - actual.weight).abs() < 1e-3);
    }
}
