//! Graph command: print a workflow as a Mermaid diagram.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::workflows::Workflow;
use anyhow::Result;

pub fn run_graph(workflow: Workflow, output: Option<&str>, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let mermaid = orchestrator.draw(workflow)?;

    match output {
        Some(path) => {
            let path = Settings::expand_path(path);
            std::fs::write(&path, &mermaid)?;
            Output::success(&format!("Wrote {} diagram to {}", workflow, path.display()));
        }
        None => print!("{}", mermaid),
    }

    Ok(())
}
