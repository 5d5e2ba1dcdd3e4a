//! Graph build and run errors.

use thiserror::Error;

/// Errors raised while compiling or running a state graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("no entry point: add an edge from START or call set_entry_point")]
    MissingEntryPoint,

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node id is reserved: {0}")]
    ReservedId(String),

    #[error("node {0} already has an outgoing edge")]
    DuplicateEdge(String),

    #[error("router on node {node} returned unknown branch '{label}'")]
    UnknownBranch { node: String, label: String },

    #[error("recursion limit of {0} steps reached without hitting END")]
    RecursionLimit(usize),
}
