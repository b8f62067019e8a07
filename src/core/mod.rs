//! Core graph model for butterfly-overlay
//!
//! The base graph, its edge views, flag encoding, geometry and distance helpers.

pub mod angle;
pub mod distance;
pub mod edge;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod graph;
pub mod turn_cost;

pub use edge::{EdgeView, RealEdge};
pub use geometry::{BBox, FetchMode, GeoPoint, PointList};
pub use graph::{BaseGraph, EdgeId, EdgeIter, Graph, NodeId};
pub use turn_cost::{TurnCostLookup, TurnCostTable};
