//! Agent commands: react, research, develop, collaborate, sql.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunResult};
use crate::workflows::Workflow;
use anyhow::Result;

/// Run one workflow end to end and print its answer.
pub async fn run_agent(
    workflow: Workflow,
    input: Option<String>,
    show_steps: bool,
    settings: Settings,
) -> Result<RunResult> {
    // Pre-flight checks
    if let Err(e) = preflight::check(workflow, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'agentgraph doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let sandbox_dir = settings.sandbox_dir();
    let orchestrator = Orchestrator::new(settings)?;
    let input = input.unwrap_or_else(|| orchestrator.default_input(workflow));

    Output::info(&format!("{}: {}", workflow, truncate(&input, 100)));

    let spinner = Output::spinner("Agent working...");
    let spinner_for_steps = spinner.clone();

    let result = orchestrator
        .run(workflow, &input, |record| {
            if show_steps {
                spinner_for_steps.suspend(|| Output::step(record));
            }
        })
        .await;

    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            println!("\n{}\n", result.answer);

            if !result.files.is_empty() {
                Output::header(&format!("Generated files ({})", result.files.len()));
                for file in &result.files {
                    Output::list_item(&sandbox_dir.join(file).display().to_string());
                }
                println!();
            }

            Output::info(&format!("Completed in {} step(s)", result.steps.len()));
            Ok(result)
        }
        Err(e) => {
            Output::error(&format!("Agent failed: {}", e));
            Err(e.into())
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars.saturating_sub(3)).collect::<String>())
    }
}
