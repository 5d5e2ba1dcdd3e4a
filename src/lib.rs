//! agentgraph - tool-calling agents on a small state-graph engine
//!
//! Agents are explicit state graphs: a reasoning node asks the chat model
//! what to do next, a tool node executes the requested tool calls, and
//! conditional edges loop between the two until the model answers.
//!
//! # Overview
//!
//! agentgraph ships these workflows:
//! - A reason/act agent over two toy tools (`db_connect`, `triple_number`)
//! - A web research agent backed by Tavily search
//! - A Python developer agent running code in a local sandbox
//! - A researcher and a chart generator handing work to each other
//! - A SQL agent answering questions about a SQLite database
//! - Two plain-state demo graphs that need no model
//!
//! # Architecture
//!
//! - `graph` - State graph builder, compiler and executor
//! - `message` - Chat messages and the message-list state
//! - `model` - Chat model abstraction (Azure OpenAI, scripted)
//! - `tools` - Tool trait, tool box and the built-in tools
//! - `agent` - Agent graphs assembled from models and tools
//! - `workflows` - Named workflows and the demo graphs
//! - `orchestrator` - Builds and runs a workflow from configuration
//! - `config` - Settings and prompt templates
//!
//! # Example
//!
//! ```rust,no_run
//! use agentgraph::config::Settings;
//! use agentgraph::orchestrator::Orchestrator;
//! use agentgraph::workflows::Workflow;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator
//!         .run(Workflow::React, "What is the database value tripled?", |_| {})
//!         .await?;
//!     println!("{} ({} steps)", result.answer, result.steps.len());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod message;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod tools;
pub mod workflows;

pub use error::{AgentGraphError, Result};
