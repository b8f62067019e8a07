//! Route summary printed by the CLI, as text or JSON

use std::fmt;

use serde::Serialize;

use butterfly_overlay::{NodeId, PointList, Snap, SnappedPosition};

#[derive(Debug, Clone, Serialize)]
pub struct SnapReport {
    pub query: [f64; 2],
    pub snapped: Option<[f64; 2]>,
    pub position: SnappedPosition,
    pub node: Option<NodeId>,
    pub virtual_node: bool,
    /// Metres between the query and the snapped point
    pub distance: f64,
}

impl SnapReport {
    pub fn new(snap: &Snap, first_virtual_node: NodeId) -> Self {
        let query = snap.query_point();
        Self {
            query: [query.lat, query.lon],
            snapped: snap.snapped_point().map(|p| [p.lat, p.lon]),
            position: snap.position(),
            node: snap.closest_node(),
            virtual_node: snap.closest_node().is_some_and(|n| n >= first_virtual_node),
            distance: snap.query_distance(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LegReport {
    pub from: NodeId,
    pub to: NodeId,
    pub distance: f64,
    pub weight: f64,
    pub millis: u64,
    pub edges: usize,
    pub virtual_edges: usize,
    /// Weight found by the contraction hierarchy search, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ch_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub snaps: Vec<SnapReport>,
    pub legs: Vec<LegReport>,
    pub distance: f64,
    pub weight: f64,
    pub millis: u64,
    pub points: Vec<[f64; 2]>,
}

impl RouteReport {
    pub fn new(snaps: Vec<SnapReport>) -> Self {
        Self {
            snaps,
            legs: Vec::new(),
            distance: 0.0,
            weight: 0.0,
            millis: 0,
            points: Vec::new(),
        }
    }

    /// Append a leg and its geometry; the first point repeats the previous leg's last one
    pub fn push_leg(&mut self, leg: LegReport, geometry: &PointList) {
        self.distance += leg.distance;
        self.weight += leg.weight;
        self.millis = self.millis.saturating_add(leg.millis);
        let skip = usize::from(!self.points.is_empty());
        self.points
            .extend(geometry.iter().skip(skip).map(|p| [p.lat, p.lon]));
        self.legs.push(leg);
    }
}

impl fmt::Display for RouteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, snap) in self.snaps.iter().enumerate() {
            let kind = if snap.virtual_node { "virtual" } else { "tower" };
            match (snap.node, snap.snapped) {
                (Some(node), Some([lat, lon])) => writeln!(
                    f,
                    "📍 #{i}: {:.6},{:.6} -> {kind} node {node} at {lat:.6},{lon:.6} ({:.1} m, {:?})",
                    snap.query[0], snap.query[1], snap.distance, snap.position
                )?,
                _ => writeln!(f, "📍 #{i}: {:.6},{:.6} not snapped", snap.query[0], snap.query[1])?,
            }
        }
        for (i, leg) in self.legs.iter().enumerate() {
            write!(
                f,
                "🛣️  leg {i}: {} -> {}: {:.1} m, {:.1} s, {} edges ({} virtual)",
                leg.from,
                leg.to,
                leg.distance,
                leg.millis as f64 / 1000.0,
                leg.edges,
                leg.virtual_edges
            )?;
            if let Some(ch) = leg.ch_weight {
                write!(f, ", CH weight {ch:.3}")?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "✅ total: {:.1} m, {:.1} s, weight {:.3}, {} points",
            self.distance,
            self.millis as f64 / 1000.0,
            self.weight,
            self.points.len()
        )
    }
}
