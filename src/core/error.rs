//! Error types for butterfly-overlay
//!
//! Every failure is reported synchronously by the operation that detects it.
//! Nothing is retried; an overlay is either built completely or not at all.

use crate::core::graph::{EdgeId, NodeId};

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller broke a precondition of the API
    ContractViolation,
    /// Input data produced a state that can never be valid
    InvariantViolation,
    /// Bad user or file input
    Input,
}

/// Main error type for butterfly-overlay operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A snap handed to the overlay builder has no closest edge
    #[error("snap #{index} has no closest edge, only valid snaps can be spliced into the graph")]
    MissingClosestEdge { index: usize },

    /// Re-orienting an edge moved a way index before the first point
    #[error("way index {way_index} of edge {edge} became negative after reversing {points} points")]
    InvalidWayIndex {
        edge: EdgeId,
        way_index: usize,
        points: usize,
    },

    /// Snaps grouped on one edge disagree about its base node
    #[error("snaps on edge {edge} disagree on the base node: expected {expected}, got {actual}")]
    InconsistentBaseNode {
        edge: EdgeId,
        expected: NodeId,
        actual: NodeId,
    },

    /// The edge-delta map handed to the delta builder was already populated
    #[error("edge delta map must be empty before building, found {0} entries")]
    DeltaMapNotEmpty(usize),

    #[error("edge {edge} is not adjacent to node {node}")]
    EdgeNotAdjacent { edge: EdgeId, node: NodeId },

    #[error("edge {0} does not exist")]
    EdgeNotFound(EdgeId),

    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("node {0} is not a virtual node")]
    NotVirtualNode(NodeId),

    #[error("edge {0} is not a virtual edge")]
    NotVirtualEdge(EdgeId),

    /// Shifting virtual edge ids past the shortcut range does not fit in 32 bits
    #[error("virtual edge ids overflow: {ch_edges} CH edges + {virtual_edges} virtual edges exceed the edge id range")]
    EdgeIdOverflow { ch_edges: usize, virtual_edges: usize },

    #[error("edge-based hierarchies need an edge-based search, ch_route is node-based")]
    EdgeBasedHierarchy,

    #[error("virtual edge {edge} cannot be modified ({operation})")]
    VirtualEdgeMutation {
        edge: EdgeId,
        operation: &'static str,
    },

    #[error("graph is read-only, {0} is not supported")]
    ReadOnlyGraph(&'static str),

    #[error("property '{0}' stores a single direction")]
    SingleDirectionProperty(String),

    #[error("value {value} is out of range for property '{name}' (max {max})")]
    PropertyValueOutOfRange { name: String, value: f64, max: f64 },

    #[error("flag layout is full: '{name}' needs {bits} bits but only {available} are left")]
    FlagLayoutFull {
        name: String,
        bits: u32,
        available: u32,
    },

    #[error("heading {0} is outside [0, 360]")]
    InvalidHeading(f64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidWayIndex { .. } => ErrorKind::InvariantViolation,
            Error::InvalidHeading(_)
            | Error::PropertyValueOutOfRange { .. }
            | Error::FlagLayoutFull { .. }
            | Error::InvalidInput(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Input,
            _ => ErrorKind::ContractViolation,
        }
    }
}

/// Convenience result type for butterfly-overlay operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::MissingClosestEdge { index: 0 }.kind(),
            ErrorKind::ContractViolation
        );
        assert_eq!(
            Error::InvalidWayIndex {
                edge: 1,
                way_index: 3,
                points: 2
            }
            .kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(Error::InvalidHeading(400.0).kind(), ErrorKind::Input);
        assert_eq!(Error::ReadOnlyGraph("add_edge").kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::EdgeNotAdjacent { edge: 7, node: 3 };
        assert_eq!(err.to_string(), "edge 7 is not adjacent to node 3");

        let err = Error::MissingClosestEdge { index: 2 };
        assert!(err.to_string().contains("snap #2"));
    }
}
