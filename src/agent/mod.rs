//! Prebuilt agent graphs.
//!
//! Every agent is a [`CompiledGraph`](crate::graph::CompiledGraph) built from
//! the reason/act pair in [`react`]; the others bind different tools and
//! prompts to it or compose several of them.

pub mod collaboration;
pub mod developer;
pub mod react;
pub mod research;
pub mod sql;

pub use collaboration::{create_collaboration_graph, CHART_GENERATOR, FINAL_ANSWER, RESEARCHER};
pub use developer::{create_developer_graph, DeveloperState, AGENT_NODE};
pub use react::{create_react_agent, demo_tools, should_continue, ReasoningNode, ToolNode, ACT, AGENT_REASON};
pub use research::create_research_agent;
pub use sql::{create_sql_agent, sql_system_prompt};
