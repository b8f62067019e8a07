//! Edge views handed out by graph iteration
//!
//! A view is either a persisted edge of the base graph or a virtual edge of a
//! query overlay. Consumers never need to tell them apart: geometry, names and
//! typed properties work the same, and property reads and writes on a virtual
//! edge are forwarded to the flag word of its original edge.

use crate::core::error::{Error, Result};
use crate::core::flags::{BoolProperty, DecimalProperty, EnumProperty, EnumValue, IntProperty};
use crate::core::geometry::{FetchMode, PointList};
use crate::core::graph::{BaseGraph, EdgeId, NodeId};
use crate::querygraph::VirtualEdgeView;

/// Persisted edge seen from `base`
#[derive(Clone, Copy)]
pub struct RealEdge<'a> {
    graph: &'a BaseGraph,
    edge: EdgeId,
    base: NodeId,
    adj: NodeId,
    reverse: bool,
}

impl<'a> RealEdge<'a> {
    pub(crate) fn new(graph: &'a BaseGraph, edge: EdgeId, base: NodeId, adj: NodeId, reverse: bool) -> Self {
        Self {
            graph,
            edge,
            base,
            adj,
            reverse,
        }
    }
}

impl std::fmt::Debug for RealEdge<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RealEdge({}: {}->{})", self.edge, self.base, self.adj)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum EdgeView<'a> {
    Real(RealEdge<'a>),
    Virtual(VirtualEdgeView<'a>),
}

impl<'a> EdgeView<'a> {
    pub fn edge(&self) -> EdgeId {
        match self {
            EdgeView::Real(e) => e.edge,
            EdgeView::Virtual(v) => v.inner().id(),
        }
    }

    pub fn base_node(&self) -> NodeId {
        match self {
            EdgeView::Real(e) => e.base,
            EdgeView::Virtual(v) => v.inner().base_node(),
        }
    }

    pub fn adj_node(&self) -> NodeId {
        match self {
            EdgeView::Real(e) => e.adj,
            EdgeView::Virtual(v) => v.inner().adj_node(),
        }
    }

    /// Length in metres
    pub fn distance(&self) -> f64 {
        match self {
            EdgeView::Real(e) => e.graph.edge_distance(e.edge),
            EdgeView::Virtual(v) => v.inner().distance(),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, EdgeView::Virtual(_))
    }

    /// The persisted edge this view belongs to, itself for real edges
    pub fn original_edge(&self) -> EdgeId {
        match self {
            EdgeView::Real(e) => e.edge,
            EdgeView::Virtual(v) => v.inner().original_edge(),
        }
    }

    /// Whether this view runs against the storage orientation of the original edge
    pub fn reverse(&self) -> bool {
        match self {
            EdgeView::Real(e) => e.reverse,
            EdgeView::Virtual(v) => v.inner().reverse(),
        }
    }

    pub fn fetch_geometry(&self, mode: FetchMode) -> PointList {
        match self {
            EdgeView::Real(e) => e.graph.full_geometry(e.edge, e.reverse).fetch(mode),
            EdgeView::Virtual(v) => v.inner().geometry().fetch(mode),
        }
    }

    pub fn name(&self) -> &'a str {
        let graph = self.graph();
        graph.edge_name(self.original_edge())
    }

    /// Request-scoped heading penalty marker, always false for real edges
    pub fn is_unfavored(&self) -> bool {
        match self {
            EdgeView::Real(_) => false,
            EdgeView::Virtual(v) => v.inner().is_unfavored(),
        }
    }

    /// The same edge seen from the other end when `reverse` is set
    pub fn detach(&self, reverse: bool) -> EdgeView<'a> {
        if !reverse {
            return *self;
        }
        match self {
            EdgeView::Real(e) => EdgeView::Real(RealEdge::new(e.graph, e.edge, e.adj, e.base, !e.reverse)),
            EdgeView::Virtual(v) => EdgeView::Virtual(v.reverse_view()),
        }
    }

    pub fn set_distance(&self, _distance: f64) -> Result<()> {
        self.reject_mutation("set_distance")
    }

    pub fn set_way_geometry(&self, _geometry: &PointList) -> Result<()> {
        self.reject_mutation("set_way_geometry")
    }

    fn reject_mutation(&self, operation: &'static str) -> Result<()> {
        match self {
            EdgeView::Real(_) => Err(Error::ReadOnlyGraph(operation)),
            EdgeView::Virtual(v) => Err(Error::VirtualEdgeMutation {
                edge: v.inner().id(),
                operation,
            }),
        }
    }

    fn graph(&self) -> &'a BaseGraph {
        match self {
            EdgeView::Real(e) => e.graph,
            EdgeView::Virtual(v) => v.graph(),
        }
    }

    fn word(&self) -> u64 {
        self.graph().flags().get(self.original_edge())
    }

    fn update(&self, f: impl Fn(u64) -> u64) -> Result<()> {
        self.graph().flags().update(self.original_edge(), f)
    }

    pub fn get_bool(&self, property: &BoolProperty) -> bool {
        property.read(self.reverse(), self.word())
    }

    pub fn get_bool_reverse(&self, property: &BoolProperty) -> bool {
        property.read(!self.reverse(), self.word())
    }

    pub fn set_bool(&self, property: &BoolProperty, value: bool) -> Result<()> {
        let reverse = self.reverse();
        self.update(|w| property.write(reverse, w, value))
    }

    pub fn set_bool_reverse(&self, property: &BoolProperty, value: bool) -> Result<()> {
        let reverse = !self.reverse();
        self.update(|w| property.write(reverse, w, value))
    }

    pub fn set_bool_both(&self, property: &BoolProperty, fwd: bool, bwd: bool) -> Result<()> {
        property.int().require_two_directions()?;
        let reverse = self.reverse();
        self.update(|w| property.write(!reverse, property.write(reverse, w, fwd), bwd))
    }

    pub fn get_int(&self, property: &IntProperty) -> u64 {
        property.read(self.reverse(), self.word())
    }

    pub fn get_int_reverse(&self, property: &IntProperty) -> u64 {
        property.read(!self.reverse(), self.word())
    }

    pub fn set_int(&self, property: &IntProperty, value: u64) -> Result<()> {
        property.check(value)?;
        let reverse = self.reverse();
        self.update(|w| property.write(reverse, w, value))
    }

    pub fn set_int_reverse(&self, property: &IntProperty, value: u64) -> Result<()> {
        property.check(value)?;
        let reverse = !self.reverse();
        self.update(|w| property.write(reverse, w, value))
    }

    pub fn set_int_both(&self, property: &IntProperty, fwd: u64, bwd: u64) -> Result<()> {
        property.require_two_directions()?;
        property.check(fwd)?;
        property.check(bwd)?;
        let reverse = self.reverse();
        self.update(|w| property.write(!reverse, property.write(reverse, w, fwd), bwd))
    }

    pub fn get_decimal(&self, property: &DecimalProperty) -> f64 {
        property.read(self.reverse(), self.word())
    }

    pub fn get_decimal_reverse(&self, property: &DecimalProperty) -> f64 {
        property.read(!self.reverse(), self.word())
    }

    pub fn set_decimal(&self, property: &DecimalProperty, value: f64) -> Result<()> {
        let raw = property.to_raw(value)?;
        let reverse = self.reverse();
        self.update(|w| property.int().write(reverse, w, raw))
    }

    pub fn set_decimal_reverse(&self, property: &DecimalProperty, value: f64) -> Result<()> {
        let raw = property.to_raw(value)?;
        let reverse = !self.reverse();
        self.update(|w| property.int().write(reverse, w, raw))
    }

    pub fn set_decimal_both(&self, property: &DecimalProperty, fwd: f64, bwd: f64) -> Result<()> {
        property.int().require_two_directions()?;
        let fwd = property.to_raw(fwd)?;
        let bwd = property.to_raw(bwd)?;
        let reverse = self.reverse();
        let int = property.int();
        self.update(|w| int.write(!reverse, int.write(reverse, w, fwd), bwd))
    }

    pub fn get_enum<T: EnumValue>(&self, property: &EnumProperty<T>) -> T {
        property.read(self.reverse(), self.word())
    }

    pub fn get_enum_reverse<T: EnumValue>(&self, property: &EnumProperty<T>) -> T {
        property.read(!self.reverse(), self.word())
    }

    pub fn set_enum<T: EnumValue>(&self, property: &EnumProperty<T>, value: T) -> Result<()> {
        let reverse = self.reverse();
        self.update(|w| property.write(reverse, w, value))
    }

    pub fn set_enum_reverse<T: EnumValue>(&self, property: &EnumProperty<T>, value: T) -> Result<()> {
        let reverse = !self.reverse();
        self.update(|w| property.write(reverse, w, value))
    }

    pub fn set_enum_both<T: EnumValue>(&self, property: &EnumProperty<T>, fwd: T, bwd: T) -> Result<()> {
        property.int().require_two_directions()?;
        let reverse = self.reverse();
        self.update(|w| property.write(!reverse, property.write(reverse, w, fwd), bwd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flags::{FlagLayout, RoadClass};
    use crate::core::graph::Graph;
    use crate::testutil;

    #[test]
    fn test_properties_follow_direction() {
        let graph = testutil::one_virtual_node_graph();
        let mut layout = FlagLayout::new();
        let access = layout.bool_property("access", true).unwrap();
        let speed = layout.decimal_property("speed", 5, 5.0, true).unwrap();

        let forward = graph.edge(1, Some(1)).unwrap();
        forward.set_bool(&access, true).unwrap();
        forward.set_decimal_both(&speed, 50.0, 20.0).unwrap();

        let backward = graph.edge(1, Some(0)).unwrap();
        assert!(!backward.get_bool(&access));
        assert!(backward.get_bool_reverse(&access));
        assert_eq!(backward.get_decimal(&speed), 20.0);
        assert_eq!(backward.get_decimal_reverse(&speed), 50.0);
    }

    #[test]
    fn test_both_directions_needs_two_directional_property() {
        let graph = testutil::one_virtual_node_graph();
        let mut layout = FlagLayout::new();
        let class = layout.enum_property::<RoadClass>("road_class", false).unwrap();
        let edge = graph.edge(0, None).unwrap();
        assert!(matches!(
            edge.set_enum_both(&class, RoadClass::Primary, RoadClass::Track),
            Err(Error::SingleDirectionProperty(_))
        ));
        edge.set_enum(&class, RoadClass::Primary).unwrap();
        assert_eq!(edge.detach(true).get_enum(&class), RoadClass::Primary);
    }

    #[test]
    fn test_detach_real_edge() {
        let graph = testutil::one_virtual_node_graph();
        let edge = graph.edge(1, None).unwrap();
        let back = edge.detach(true);
        assert_eq!(back.base_node(), 1);
        assert_eq!(back.adj_node(), 0);
        assert!(back.reverse());
        assert_eq!(edge.detach(false).base_node(), 0);
    }

    #[test]
    fn test_real_edge_is_read_only_through_views() {
        let graph = testutil::one_virtual_node_graph();
        let edge = graph.edge(0, None).unwrap();
        assert!(matches!(edge.set_distance(3.0), Err(Error::ReadOnlyGraph(_))));
        assert_eq!(edge.name(), "");
        assert!(!edge.is_unfavored());
    }
}
