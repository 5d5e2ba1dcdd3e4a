//! agentgraph CLI entry point.

use agentgraph::cli::{commands, Cli, Commands};
use agentgraph::config::Settings;
use agentgraph::workflows::Workflow;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a .env file next to the working directory
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("agentgraph={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let mut settings = Settings::load_from(config_path.as_ref())?;

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::React { question } => {
            commands::run_agent(Workflow::React, question.clone(), cli.steps, settings).await?;
        }

        Commands::Research { query } => {
            commands::run_agent(Workflow::Research, Some(query.clone()), cli.steps, settings).await?;
        }

        Commands::Develop { task } => {
            commands::run_agent(Workflow::Developer, Some(task.clone()), cli.steps, settings).await?;
        }

        Commands::Collaborate {
            task,
            recursion_limit,
        } => {
            if let Some(limit) = recursion_limit {
                settings.agent.collaboration_recursion_limit = *limit;
            }
            commands::run_agent(Workflow::Collaboration, task.clone(), cli.steps, settings).await?;
        }

        Commands::Sql { question, database } => {
            if let Some(database) = database {
                settings.sql.database_path = database.clone();
            }
            commands::run_agent(Workflow::Sql, Some(question.clone()), cli.steps, settings).await?;
        }

        Commands::Demo { demo } => {
            commands::run_demo(demo).await?;
        }

        Commands::Graph { workflow, output } => {
            commands::run_graph(*workflow, output.as_deref(), settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.as_deref(), *port, settings).await?;
        }

        Commands::Doctor => {
            let path = config_path.unwrap_or_else(Settings::default_config_path);
            commands::run_doctor(&settings, &path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
