//! Ask command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::model::AzureChatModel;
use crate::workflows::{simple_call, Workflow};
use anyhow::Result;

/// Run the ask command: one model call, no tools, no graph.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Workflow::Simple, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'agentgraph doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let model = AzureChatModel::new(settings.model.clone());

    let spinner = Output::spinner("Thinking...");
    let answer = simple_call(&model, &prompts.react.assistant, question).await;
    spinner.finish_and_clear();

    println!("\n{}\n", answer?);
    Ok(())
}
