//! Turn cost storage and lookup

use rustc_hash::FxHashMap;

use crate::core::graph::{EdgeId, NodeId};

/// Cost of turning from one edge onto another at a node.
///
/// `f64::INFINITY` means the turn is not allowed.
pub trait TurnCostLookup {
    fn turn_cost(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64;

    fn is_turn_allowed(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> bool {
        self.turn_cost(in_edge, via_node, out_edge).is_finite()
    }
}

/// Sparse `(in_edge, via, out_edge) -> cost` table, unlisted turns are free
#[derive(Debug, Clone, Default)]
pub struct TurnCostTable {
    costs: FxHashMap<(EdgeId, NodeId, EdgeId), f64>,
}

impl TurnCostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId, cost: f64) {
        self.costs.insert((in_edge, via_node, out_edge), cost);
    }

    /// Forbid a turn
    pub fn restrict(&mut self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) {
        self.set(in_edge, via_node, out_edge, f64::INFINITY);
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl TurnCostLookup for TurnCostTable {
    fn turn_cost(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        self.costs
            .get(&(in_edge, via_node, out_edge))
            .copied()
            .unwrap_or(0.0)
    }
}
