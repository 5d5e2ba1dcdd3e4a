//! State graph engine.
//!
//! Build a [`StateGraph`] from nodes, direct edges and conditional edges,
//! then [`compile`](StateGraph::compile) it into a [`CompiledGraph`] that can be
//! invoked or streamed step by step.
//!
//! ```rust
//! use agentgraph::graph::{RunConfig, StateGraph, END, START};
//!
//! # tokio_test::block_on(async {
//! let mut graph = StateGraph::new();
//! graph
//!     .add_fn_node("double", |n: i64| n * 2)
//!     .add_edge(START, "double")
//!     .add_edge("double", END);
//!
//! let app = graph.compile().unwrap();
//! assert_eq!(app.invoke(21, &RunConfig::default()).await.unwrap(), 42);
//! # });
//! ```

mod compiled;
mod error;
mod node;
mod state_graph;

pub use compiled::{CompiledGraph, RunConfig, StepEvent, DEFAULT_RECURSION_LIMIT};
pub use error::GraphError;
pub use node::{FnNode, Next, Node};
pub use state_graph::{Router, StateGraph};

/// Virtual entry node id.
pub const START: &str = "__start__";

/// Virtual terminal node id.
pub const END: &str = "__end__";
