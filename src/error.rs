//! Error types for agentgraph.

use crate::graph::GraphError;
use thiserror::Error;

/// Library-level error type for agentgraph operations.
#[derive(Error, Debug)]
pub enum AgentGraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("SQL error: {0}")]
    Sql(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for agentgraph operations.
pub type Result<T> = std::result::Result<T, AgentGraphError>;
