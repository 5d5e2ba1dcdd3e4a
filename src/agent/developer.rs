//! Python developer: one react agent node that writes and runs code.

use super::react::create_react_agent;
use crate::error::Result;
use crate::graph::{CompiledGraph, Next, Node, RunConfig, StateGraph, END, START};
use crate::message::MessagesState;
use crate::model::ChatModel;
use crate::tools::{ArtifactTracker, PythonReplTool, PythonSandbox, ToolBox};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Node id of the developer graph's only node.
pub const AGENT_NODE: &str = "agent_node";

/// Conversation plus the images written while answering it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeveloperState {
    pub messages: MessagesState,
    pub generated_files: Vec<String>,
}

impl DeveloperState {
    pub fn from_task(task: impl Into<String>) -> Self {
        Self {
            messages: MessagesState::from_human(task),
            generated_files: Vec::new(),
        }
    }
}

struct DeveloperNode {
    agent: CompiledGraph<MessagesState>,
    artifacts: ArtifactTracker,
    config: RunConfig,
}

#[async_trait]
impl Node<DeveloperState> for DeveloperNode {
    async fn run(&self, mut state: DeveloperState) -> Result<(DeveloperState, Next)> {
        // Files left over from an earlier run of the same sandbox are not ours.
        self.artifacts.take();

        state.messages = self.agent.invoke(state.messages, &self.config).await?;

        let files = self.artifacts.take();
        if !files.is_empty() {
            info!("Developer agent generated {} files", files.len());
        }
        for file in files {
            if !state.generated_files.contains(&file) {
                state.generated_files.push(file);
            }
        }
        Ok((state, Next::Continue))
    }
}

/// `START -> agent_node -> END`, with the sandbox's new images collected into
/// [`DeveloperState::generated_files`].
pub fn create_developer_graph(
    model: Arc<dyn ChatModel>,
    sandbox: PythonSandbox,
    system_prompt: &str,
    config: RunConfig,
) -> Result<CompiledGraph<DeveloperState>> {
    let artifacts = sandbox.artifacts().clone();
    let tools = ToolBox::new().with(PythonReplTool::new(sandbox));
    let agent = create_react_agent(model, tools, Some(system_prompt.to_string()))?;

    let mut graph = StateGraph::new();
    graph
        .add_node(
            AGENT_NODE,
            DeveloperNode {
                agent,
                artifacts,
                config,
            },
        )
        .add_edge(START, AGENT_NODE)
        .add_edge(AGENT_NODE, END);

    Ok(graph.compile()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxSettings;
    use crate::message::{Message, ToolCall};
    use crate::model::ScriptedModel;

    #[tokio::test]
    async fn test_generated_files_collected() {
        let dir = tempfile::tempdir().unwrap();
        // `sh` stands in for python so the test does not need an interpreter.
        let settings = SandboxSettings {
            interpreter: "sh".to_string(),
            ..SandboxSettings::default()
        };
        let sandbox = PythonSandbox::new(&settings, dir.path().to_path_buf());

        let model = Arc::new(ScriptedModel::new(vec![
            Message::ai_with_tool_calls(
                "",
                vec![ToolCall::new("p1", "python_repl", r#"{"code": "touch sine.png; echo saved"}"#)],
            ),
            Message::ai("FINAL ANSWER: saved sine.png"),
        ]));
        let graph = create_developer_graph(model, sandbox, "dev", RunConfig::default()).unwrap();

        let out = graph
            .invoke(DeveloperState::from_task("plot a sine wave"), &RunConfig::default())
            .await
            .unwrap();

        assert_eq!(out.generated_files, vec!["sine.png"]);
        assert!(out.messages.messages[2].content.contains("Generated image files: [\"sine.png\"]"));
        assert_eq!(out.messages.last_content(), "FINAL ANSWER: saved sine.png");
    }
}
