//! Query-time graph overlay
//!
//! A request snaps its coordinates onto edges of the shared base graph. Each
//! snap that lands between two tower nodes becomes a virtual node, and the
//! original edge is split into virtual edges around it. The base graph is
//! never modified: [`QueryGraph`] layers the [`Overlay`] over it by id range,
//! so a search sees one consistent graph that exists only for this request.
//!
//! ```text
//!   base graph:      0 -------------------- 1
//!   with one snap:   0 --------- 2 -------- 1     (2 = first virtual node)
//! ```

pub mod builder;
pub mod ch;
pub mod edge_delta;
pub mod overlay;
pub mod query_graph;
pub mod turn_cost;
pub mod virtual_edge;

pub use builder::OverlayBuilder;
pub use ch::QueryChGraph;
pub use edge_delta::EdgeDeltaBuilder;
pub use overlay::{EdgeDelta, Overlay, ADJ_SNAP, BASE_SNAP, SLOTS_PER_NODE, SNAP_ADJ, SNAP_BASE};
pub use query_graph::{QueryGraph, HEADING_DEVIATION_THRESHOLD};
pub use turn_cost::{QueryGraphWeighting, QueryTurnCosts};
pub use virtual_edge::{VirtualEdge, VirtualEdgeView};
