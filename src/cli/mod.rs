//! CLI module for agentgraph.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::workflows::Workflow;
use clap::{Parser, Subcommand};

/// agentgraph - tool-calling agents on a small state-graph engine
///
/// Runs reason/act agents, a Python developer, a researcher/chart-generator
/// pair and a SQL agent against an Azure OpenAI deployment.
#[derive(Parser, Debug)]
#[command(name = "agentgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Print every executed graph step
    #[arg(long, global = true)]
    pub steps: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the model a single question (no tools)
    Ask {
        /// The question to ask
        question: String,
    },

    /// Run the reason/act agent with the db_connect and triple_number tools
    React {
        /// Question for the agent (defaults to the database/triple demo)
        question: Option<String>,
    },

    /// Run the web research agent
    Research {
        /// What to research
        query: String,
    },

    /// Run the Python developer agent
    Develop {
        /// The programming task
        task: String,
    },

    /// Run the researcher and chart generator together
    Collaborate {
        /// The task (defaults to the UK GDP chart)
        task: Option<String>,

        /// Maximum handoffs plus agent turns
        #[arg(long)]
        recursion_limit: Option<usize>,
    },

    /// Ask a question about the SQL database
    Sql {
        /// The question
        question: String,

        /// SQLite database file (overrides the config)
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Run one of the plain-state demo graphs
    Demo {
        #[command(subcommand)]
        demo: DemoKind,
    },

    /// Print the Mermaid diagram of a workflow
    Graph {
        /// Workflow to draw
        #[arg(value_enum)]
        workflow: Workflow,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start the HTTP server with the web page
    Serve {
        /// Host to bind to (overrides the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration and external requirements
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DemoKind {
    /// START -> node_1 -> node_2 -> END over a name and an age
    Basic {
        #[arg(long, default_value = "Prince")]
        name: String,

        #[arg(long, default_value = "80")]
        age: u32,
    },

    /// Counter loop that stops once the value reaches 5
    Counter {
        #[arg(long, default_value = "a")]
        string_value: String,

        #[arg(long, default_value = "1")]
        int_value: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
