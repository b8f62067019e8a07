//! Edge and turn weights
//!
//! Weights are travel times in seconds. An infinite weight means the edge or
//! turn cannot be used.

use log::debug;

use crate::core::edge::EdgeView;
use crate::core::error::Result;
use crate::core::flags::{BoolProperty, DecimalProperty, EnumProperty, FlagLayout, RoadClass};
use crate::core::graph::{EdgeId, NodeId};
use crate::core::turn_cost::TurnCostLookup;

/// Cost model consumed by the searches
pub trait Weighting {
    /// Weight of traversing `edge`; `reverse` means traversing it from adjacent to base node
    fn edge_weight(&self, edge: &EdgeView<'_>, reverse: bool) -> f64;

    /// Travel time in milliseconds, `u64::MAX` when the edge cannot be used
    fn edge_millis(&self, edge: &EdgeView<'_>, reverse: bool) -> u64;

    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64;

    fn turn_millis(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> u64;

    fn has_turn_costs(&self) -> bool;
}

/// Flag properties a car profile reads
#[derive(Debug, Clone)]
pub struct VehicleEncoding {
    pub access: BoolProperty,
    pub speed: DecimalProperty,
    pub road_class: EnumProperty<RoadClass>,
}

impl VehicleEncoding {
    /// Allocate the car properties in `layout`
    pub fn register(layout: &mut FlagLayout) -> Result<Self> {
        let access = layout.bool_property("car_access", true)?;
        let speed = layout.decimal_property("car_average_speed", 5, 5.0, true)?;
        let road_class = layout.enum_property("road_class", false)?;
        debug!("Registered car encoding, {} bits used", layout.used_bits());
        Ok(Self {
            access,
            speed,
            road_class,
        })
    }
}

/// Tunables of [`SpeedWeighting`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightingConfig {
    /// Added to edges marked unfavored by heading enforcement
    pub heading_penalty_s: f64,
    /// Cost of turning back onto the same edge, infinite forbids it
    pub u_turn_cost_s: f64,
    /// Whether the turn cost table is consulted at all
    pub turn_costs: bool,
}

impl WeightingConfig {
    pub fn car() -> Self {
        Self {
            heading_penalty_s: 300.0,
            u_turn_cost_s: 40.0,
            turn_costs: true,
        }
    }
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self::car()
    }
}

/// Fastest-path weighting from the stored average speed
pub struct SpeedWeighting<'a> {
    encoding: &'a VehicleEncoding,
    config: WeightingConfig,
    turn_costs: Option<&'a dyn TurnCostLookup>,
}

impl<'a> SpeedWeighting<'a> {
    pub fn new(encoding: &'a VehicleEncoding, config: WeightingConfig) -> Self {
        Self {
            encoding,
            config,
            turn_costs: None,
        }
    }

    /// Consult `turn_costs` for turns between distinct edges
    pub fn with_turn_costs(mut self, turn_costs: &'a dyn TurnCostLookup) -> Self {
        self.turn_costs = Some(turn_costs);
        self
    }

    pub fn config(&self) -> &WeightingConfig {
        &self.config
    }

    fn seconds(&self, edge: &EdgeView<'_>, reverse: bool) -> Option<f64> {
        let (access, speed) = if reverse {
            (
                edge.get_bool_reverse(&self.encoding.access),
                edge.get_decimal_reverse(&self.encoding.speed),
            )
        } else {
            (
                edge.get_bool(&self.encoding.access),
                edge.get_decimal(&self.encoding.speed),
            )
        };
        if !access || speed <= 0.0 {
            return None;
        }
        Some(edge.distance() / (speed / 3.6))
    }

    fn turn_seconds(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        if in_edge == out_edge {
            return self.config.u_turn_cost_s;
        }
        match self.turn_costs {
            Some(lookup) => lookup.turn_cost(in_edge, via_node, out_edge),
            None => 0.0,
        }
    }
}

impl Weighting for SpeedWeighting<'_> {
    fn edge_weight(&self, edge: &EdgeView<'_>, reverse: bool) -> f64 {
        match self.seconds(edge, reverse) {
            Some(seconds) if edge.is_unfavored() => seconds + self.config.heading_penalty_s,
            Some(seconds) => seconds,
            None => f64::INFINITY,
        }
    }

    fn edge_millis(&self, edge: &EdgeView<'_>, reverse: bool) -> u64 {
        self.seconds(edge, reverse)
            .map(|s| (s * 1000.0).round() as u64)
            .unwrap_or(u64::MAX)
    }

    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        if !self.has_turn_costs() {
            return 0.0;
        }
        self.turn_seconds(in_edge, via_node, out_edge)
    }

    fn turn_millis(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> u64 {
        let weight = self.turn_weight(in_edge, via_node, out_edge);
        if weight.is_finite() {
            (weight * 1000.0).round() as u64
        } else {
            0
        }
    }

    fn has_turn_costs(&self) -> bool {
        self.config.turn_costs
    }
}
