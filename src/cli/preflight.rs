//! Pre-flight checks before running a workflow.
//!
//! Validates that credentials and external tools are available before
//! starting a run that would otherwise fail midway.

use crate::config::{Settings, ENV_SEARCH_API_KEY};
use crate::error::{AgentGraphError, Result};
use crate::workflows::Workflow;
use std::process::Command;

/// Run pre-flight checks for the given workflow.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(workflow: Workflow, settings: &Settings) -> Result<()> {
    if workflow.needs_model() {
        settings.model.validate()?;
    }

    if matches!(workflow, Workflow::Research | Workflow::Collaboration) {
        check_search_key(settings)?;
    }

    if matches!(workflow, Workflow::Developer | Workflow::Collaboration) {
        check_tool(&settings.sandbox.interpreter)?;
    }

    Ok(())
}

/// Check that a search API key is configured.
fn check_search_key(settings: &Settings) -> Result<()> {
    match settings.search.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(AgentGraphError::Config(format!(
            "{} not set. Set it with: export {}='tvly-...'",
            ENV_SEARCH_API_KEY, ENV_SEARCH_API_KEY
        ))),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(AgentGraphError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AgentGraphError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(AgentGraphError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demos_have_no_requirements() {
        let settings = Settings::default();
        assert!(check(Workflow::Basic, &settings).is_ok());
        assert!(check(Workflow::Counter, &settings).is_ok());
    }

    #[test]
    fn test_model_workflows_need_credentials() {
        let err = check(Workflow::React, &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("OPEN_API_KEY"));
    }

    #[test]
    fn test_research_needs_search_key() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("k".to_string());
        settings.model.deployment = Some("gpt-4o".to_string());
        settings.model.endpoint = Some("https://example.openai.azure.com".to_string());
        settings.model.api_version = Some("2024-10-21".to_string());

        assert!(check(Workflow::React, &settings).is_ok());
        let err = check(Workflow::Research, &settings).unwrap_err();
        assert!(err.to_string().contains(ENV_SEARCH_API_KEY));
    }

    #[test]
    fn test_missing_interpreter() {
        assert!(matches!(
            check_tool("definitely-not-installed-anywhere"),
            Err(AgentGraphError::ToolNotFound(_))
        ));
    }
}
