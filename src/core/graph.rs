//! Graph abstraction and the in-memory base graph
//!
//! [`Graph`] is the read contract every search consumes. [`BaseGraph`] is the
//! prebuilt, shared road graph; the query graph implements the same trait by
//! layering virtual topology over a borrowed base graph.

use crate::core::edge::{EdgeView, RealEdge};
use crate::core::error::{Error, Result};
use crate::core::flags::FlagStore;
use crate::core::geometry::{BBox, GeoPoint, PointList};
use crate::core::turn_cost::{TurnCostLookup, TurnCostTable};
use crate::querygraph::Overlay;

pub type NodeId = u32;
pub type EdgeId = u32;

/// Read contract shared by the base graph and the query graph
pub trait Graph {
    /// The persisted graph underneath, itself for a base graph
    fn base_graph(&self) -> &BaseGraph;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn is_3d(&self) -> bool;

    fn coordinate(&self, node: NodeId) -> GeoPoint;

    fn bounds(&self) -> BBox;

    /// Edges incident to `node`, each oriented with `node` as base
    fn edges(&self, node: NodeId) -> EdgeIter<'_>;

    /// Edge `edge` oriented so that its adjacent node is `adj_node` when given
    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<EdgeView<'_>>;

    fn other_node(&self, edge: EdgeId, node: NodeId) -> Result<NodeId>;

    fn is_adjacent_to_node(&self, edge: EdgeId, node: NodeId) -> bool;

    fn turn_costs(&self) -> &dyn TurnCostLookup;

    fn add_edge(&mut self, a: NodeId, b: NodeId, distance: f64) -> Result<EdgeId>;

    fn set_node(&mut self, node: NodeId, point: GeoPoint) -> Result<()>;

    fn copy_to(&self, target: &mut BaseGraph) -> Result<()>;
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    node_a: NodeId,
    node_b: NodeId,
    distance: f64,
    /// Inner points in `node_a -> node_b` order
    pillars: PointList,
    name: String,
}

/// In-memory road graph: tower nodes, edges with pillar geometry, flags and turn costs
#[derive(Debug, Clone)]
pub struct BaseGraph {
    is_3d: bool,
    nodes: Vec<GeoPoint>,
    edges: Vec<EdgeRecord>,
    adjacency: Vec<Vec<EdgeId>>,
    flags: FlagStore,
    turn_costs: TurnCostTable,
    bounds: BBox,
}

impl BaseGraph {
    pub fn new(is_3d: bool) -> Self {
        Self {
            is_3d,
            nodes: Vec::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            flags: FlagStore::new(),
            turn_costs: TurnCostTable::new(),
            bounds: BBox::empty(),
        }
    }

    /// Place a tower node, growing the node table as needed
    pub fn set_node(&mut self, node: NodeId, point: GeoPoint) {
        let index = node as usize;
        if index >= self.nodes.len() {
            self.nodes.resize(index + 1, GeoPoint::new(0.0, 0.0));
            self.adjacency.resize(index + 1, Vec::new());
        }
        self.nodes[index] = point;
        self.bounds.extend(point.lat, point.lon);
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId, distance: f64) -> Result<EdgeId> {
        for node in [a, b] {
            if node as usize >= self.nodes.len() {
                return Err(Error::NodeNotFound(node));
            }
        }
        let edge = self.edges.len() as EdgeId;
        self.edges.push(EdgeRecord {
            node_a: a,
            node_b: b,
            distance,
            pillars: PointList::new(self.is_3d),
            name: String::new(),
        });
        self.flags.push(0);
        self.adjacency[a as usize].push(edge);
        if a != b {
            self.adjacency[b as usize].push(edge);
        }
        Ok(edge)
    }

    fn record(&self, edge: EdgeId) -> Result<&EdgeRecord> {
        self.edges.get(edge as usize).ok_or(Error::EdgeNotFound(edge))
    }

    fn record_mut(&mut self, edge: EdgeId) -> Result<&mut EdgeRecord> {
        self.edges.get_mut(edge as usize).ok_or(Error::EdgeNotFound(edge))
    }

    /// Pillar points in storage (`node_a -> node_b`) order
    pub fn set_pillars(&mut self, edge: EdgeId, pillars: PointList) -> Result<()> {
        for p in pillars.iter() {
            self.bounds.extend(p.lat, p.lon);
        }
        self.record_mut(edge)?.pillars = pillars;
        Ok(())
    }

    pub fn set_name(&mut self, edge: EdgeId, name: impl Into<String>) -> Result<()> {
        self.record_mut(edge)?.name = name.into();
        Ok(())
    }

    pub fn set_distance(&mut self, edge: EdgeId, distance: f64) -> Result<()> {
        self.record_mut(edge)?.distance = distance;
        Ok(())
    }

    /// Storage orientation of an edge
    pub fn edge_nodes(&self, edge: EdgeId) -> Result<(NodeId, NodeId)> {
        let record = self.record(edge)?;
        Ok((record.node_a, record.node_b))
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn turn_cost_table(&self) -> &TurnCostTable {
        &self.turn_costs
    }

    pub fn turn_cost_table_mut(&mut self) -> &mut TurnCostTable {
        &mut self.turn_costs
    }

    pub(crate) fn edge_distance(&self, edge: EdgeId) -> f64 {
        self.edges.get(edge as usize).map(|e| e.distance).unwrap_or(0.0)
    }

    pub(crate) fn edge_name(&self, edge: EdgeId) -> &str {
        self.edges.get(edge as usize).map(|e| e.name.as_str()).unwrap_or("")
    }

    /// Tower, pillars, tower; reversed when traversing `node_b -> node_a`
    pub fn full_geometry(&self, edge: EdgeId, reverse: bool) -> PointList {
        let Some(record) = self.edges.get(edge as usize) else {
            return PointList::new(self.is_3d);
        };
        let mut points = PointList::with_capacity(record.pillars.len() + 2, self.is_3d);
        points.push(self.nodes[record.node_a as usize]);
        points.extend_from(&record.pillars, 0, record.pillars.len());
        points.push(self.nodes[record.node_b as usize]);
        if reverse {
            points.reversed()
        } else {
            points
        }
    }

    fn real_edge(&self, edge: EdgeId, base: NodeId, adj: NodeId, reverse: bool) -> EdgeView<'_> {
        EdgeView::Real(RealEdge::new(self, edge, base, adj, reverse))
    }
}

impl Graph for BaseGraph {
    fn base_graph(&self) -> &BaseGraph {
        self
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn is_3d(&self) -> bool {
        self.is_3d
    }

    fn coordinate(&self, node: NodeId) -> GeoPoint {
        self.nodes[node as usize]
    }

    fn bounds(&self) -> BBox {
        self.bounds
    }

    fn edges(&self, node: NodeId) -> EdgeIter<'_> {
        let edges = self
            .adjacency
            .get(node as usize)
            .map(|adj| adj.as_slice())
            .unwrap_or(&[]);
        EdgeIter {
            inner: EdgeIterInner::Base {
                graph: self,
                node,
                edges: edges.iter(),
            },
        }
    }

    fn edge(&self, edge: EdgeId, adj_node: Option<NodeId>) -> Result<EdgeView<'_>> {
        let record = self.record(edge)?;
        match adj_node {
            None => Ok(self.real_edge(edge, record.node_a, record.node_b, false)),
            Some(adj) if adj == record.node_b => {
                Ok(self.real_edge(edge, record.node_a, record.node_b, false))
            }
            Some(adj) if adj == record.node_a => {
                Ok(self.real_edge(edge, record.node_b, record.node_a, true))
            }
            Some(adj) => Err(Error::EdgeNotAdjacent { edge, node: adj }),
        }
    }

    fn other_node(&self, edge: EdgeId, node: NodeId) -> Result<NodeId> {
        let record = self.record(edge)?;
        if node == record.node_a {
            Ok(record.node_b)
        } else if node == record.node_b {
            Ok(record.node_a)
        } else {
            Err(Error::EdgeNotAdjacent { edge, node })
        }
    }

    fn is_adjacent_to_node(&self, edge: EdgeId, node: NodeId) -> bool {
        self.record(edge)
            .map(|r| r.node_a == node || r.node_b == node)
            .unwrap_or(false)
    }

    fn turn_costs(&self) -> &dyn TurnCostLookup {
        &self.turn_costs
    }

    fn add_edge(&mut self, a: NodeId, b: NodeId, distance: f64) -> Result<EdgeId> {
        BaseGraph::add_edge(self, a, b, distance)
    }

    fn set_node(&mut self, node: NodeId, point: GeoPoint) -> Result<()> {
        BaseGraph::set_node(self, node, point);
        Ok(())
    }

    fn copy_to(&self, target: &mut BaseGraph) -> Result<()> {
        *target = self.clone();
        Ok(())
    }
}

/// One entry of a precomputed adjacency list in the query graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeSlot {
    Real {
        edge: EdgeId,
        base: NodeId,
        adj: NodeId,
        reverse: bool,
    },
    /// Index into the overlay's edge arena
    Virtual(u32),
}

/// Iterator over the edges of one node
pub struct EdgeIter<'a> {
    pub(crate) inner: EdgeIterInner<'a>,
}

pub(crate) enum EdgeIterInner<'a> {
    Base {
        graph: &'a BaseGraph,
        node: NodeId,
        edges: std::slice::Iter<'a, EdgeId>,
    },
    Overlay {
        graph: &'a BaseGraph,
        overlay: &'a Overlay,
        slots: std::slice::Iter<'a, EdgeSlot>,
    },
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = EdgeView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EdgeIterInner::Base { graph, node, edges } => {
                let edge = *edges.next()?;
                let record = &graph.edges[edge as usize];
                let view = if record.node_a == *node {
                    RealEdge::new(graph, edge, record.node_a, record.node_b, false)
                } else {
                    RealEdge::new(graph, edge, record.node_b, record.node_a, true)
                };
                Some(EdgeView::Real(view))
            }
            EdgeIterInner::Overlay {
                graph,
                overlay,
                slots,
            } => Some(match *slots.next()? {
                EdgeSlot::Real {
                    edge,
                    base,
                    adj,
                    reverse,
                } => EdgeView::Real(RealEdge::new(graph, edge, base, adj, reverse)),
                EdgeSlot::Virtual(index) => overlay.view(graph, index),
            }),
        }
    }
}
