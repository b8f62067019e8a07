//! # Butterfly-overlay Library
//!
//! Splices GPS fixes into a prebuilt road graph at query time. Each request
//! snaps its coordinates onto edges, and every snap that falls between two
//! intersections becomes a virtual node with virtual edges around it. The
//! shared base graph is only borrowed, so any number of requests can overlay
//! it concurrently.
//!
//! ## Features
//!
//! - **Virtual topology**: virtual nodes and edges with contiguous ids after the base graph
//! - **Transparent graph view**: [`QueryGraph`] implements the same [`Graph`] trait as [`BaseGraph`]
//! - **Heading enforcement**: penalize virtual edges that leave a snap in the wrong direction
//! - **Contraction hierarchies**: [`QueryChGraph`] splices the overlay into a prepared hierarchy
//! - **Turn costs**: original restrictions survive, U-turns at virtual nodes are forbidden
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use butterfly_overlay::{dijkstra, GraphFixture, LocationIndex, Overlay, QueryGraph};
//! use butterfly_overlay::{SpeedWeighting, WeightingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (graph, encoding) = GraphFixture::load("city.json")?.build()?;
//!     let index = LocationIndex::build(&graph);
//!
//!     let mut snaps = vec![
//!         index.find_closest(&graph, 50.8503, 4.3517, |_| true)?,
//!         index.find_closest(&graph, 50.8466, 4.3528, |_| true)?,
//!     ];
//!     let overlay = Overlay::build(&graph, &mut snaps)?;
//!     let query = QueryGraph::new(&graph, &overlay);
//!
//!     let weighting = SpeedWeighting::new(&encoding, WeightingConfig::car());
//!     let weighting = query.wrap_weighting(&weighting);
//!     let from = snaps[0].closest_node().ok_or("no start")?;
//!     let to = snaps[1].closest_node().ok_or("no destination")?;
//!     if let Some(path) = dijkstra(&query, &weighting, from, to) {
//!         println!("{:.0} m in {} ms", path.distance, path.millis);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ch;
pub mod core;
pub mod fixture;
pub mod index;
pub mod querygraph;
pub mod search;
pub mod weighting;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::ch::{contract, ChEdge, ChGraph, RoutingChGraph};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::{BaseGraph, EdgeId, EdgeView, GeoPoint, Graph, NodeId, PointList};
pub use crate::fixture::GraphFixture;
pub use crate::index::{LocationIndex, Snap, SnappedPosition};
pub use crate::querygraph::{Overlay, OverlayBuilder, QueryChGraph, QueryGraph};
pub use crate::search::{ch_route, dijkstra, Path};
pub use crate::weighting::{SpeedWeighting, VehicleEncoding, Weighting, WeightingConfig};
