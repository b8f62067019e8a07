//! JSON graph fixtures
//!
//! A small, human-editable graph format used by the CLI and the end-to-end
//! tests. Node ids are positions in the `nodes` array, edge ids positions in
//! `edges`.
//!
//! ```json
//! {
//!   "nodes": [{ "lat": 0.0, "lon": 0.0 }, { "lat": 0.0, "lon": 0.01 }],
//!   "edges": [{ "from": 0, "to": 1, "speed": 50, "name": "Main Street" }],
//!   "turn_costs": [{ "from_edge": 0, "via": 1, "to_edge": 0 }]
//! }
//! ```

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::distance::point_list_distance;
use crate::core::error::{Error, Result};
use crate::core::flags::{FlagLayout, RoadClass};
use crate::core::geometry::{GeoPoint, PointList};
use crate::core::graph::{BaseGraph, EdgeId, Graph, NodeId};
use crate::weighting::VehicleEncoding;

fn default_speed() -> f64 {
    50.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointFixture {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ele: Option<f64>,
}

impl PointFixture {
    fn to_point(self, is_3d: bool) -> Result<GeoPoint> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            warn!("Rejecting coordinate ({}, {})", self.lat, self.lon);
            return Err(Error::InvalidInput(format!(
                "coordinate ({}, {}) is outside the valid range",
                self.lat, self.lon
            )));
        }
        Ok(if is_3d {
            GeoPoint::new_3d(self.lat, self.lon, self.ele.unwrap_or(0.0))
        } else {
            GeoPoint::new(self.lat, self.lon)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFixture {
    pub from: NodeId,
    pub to: NodeId,
    /// Inner points from `from` to `to`
    #[serde(default)]
    pub pillars: Vec<PointFixture>,
    #[serde(default)]
    pub name: String,
    /// km/h, both directions
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Only `from -> to` is accessible
    #[serde(default)]
    pub oneway: bool,
    #[serde(default)]
    pub road_class: RoadClass,
    /// Metres; measured along the geometry when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Entry of the turn cost table, a missing cost forbids the turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnCostFixture {
    pub from_edge: EdgeId,
    pub via: NodeId,
    pub to_edge: EdgeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFixture {
    /// Read node and pillar elevations
    #[serde(default)]
    pub elevation: bool,
    pub nodes: Vec<PointFixture>,
    #[serde(default)]
    pub edges: Vec<EdgeFixture>,
    #[serde(default)]
    pub turn_costs: Vec<TurnCostFixture>,
}

impl GraphFixture {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Materialize the fixture as a base graph with a car encoding
    pub fn build(&self) -> Result<(BaseGraph, VehicleEncoding)> {
        let mut layout = FlagLayout::new();
        let encoding = VehicleEncoding::register(&mut layout)?;
        let mut graph = BaseGraph::new(self.elevation);

        for (id, node) in self.nodes.iter().enumerate() {
            graph.set_node(id as NodeId, node.to_point(self.elevation)?);
        }

        for edge_fixture in &self.edges {
            let edge = graph.add_edge(edge_fixture.from, edge_fixture.to, 0.0)?;
            let pillars = edge_fixture
                .pillars
                .iter()
                .map(|p| p.to_point(self.elevation))
                .collect::<Result<Vec<_>>>()?;
            graph.set_pillars(edge, PointList::from_points(pillars, self.elevation))?;
            if !edge_fixture.name.is_empty() {
                graph.set_name(edge, edge_fixture.name.as_str())?;
            }
            let distance = match edge_fixture.distance {
                Some(d) => d,
                None => point_list_distance(&graph.full_geometry(edge, false)),
            };
            graph.set_distance(edge, distance)?;

            let view = graph.edge(edge, None)?;
            view.set_bool_both(&encoding.access, true, !edge_fixture.oneway)?;
            view.set_decimal_both(&encoding.speed, edge_fixture.speed, edge_fixture.speed)?;
            view.set_enum(&encoding.road_class, edge_fixture.road_class)?;
        }

        let edge_count = graph.edge_count();
        for turn in &self.turn_costs {
            for edge in [turn.from_edge, turn.to_edge] {
                if edge as usize >= edge_count {
                    return Err(Error::EdgeNotFound(edge));
                }
            }
            let table = graph.turn_cost_table_mut();
            match turn.cost {
                Some(cost) => table.set(turn.from_edge, turn.via, turn.to_edge, cost),
                None => table.restrict(turn.from_edge, turn.via, turn.to_edge),
            }
        }

        debug!(
            "Fixture graph: {} nodes, {} edges, {} turn costs",
            graph.node_count(),
            graph.edge_count(),
            self.turn_costs.len()
        );
        Ok((graph, encoding))
    }
}
