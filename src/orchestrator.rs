//! Workflow orchestrator for agentgraph.
//!
//! Builds the graph a [`Workflow`] needs from configuration, runs it once on
//! one input and reports every executed step. The CLI and the HTTP server
//! both go through here.

use crate::agent::{
    create_collaboration_graph, create_developer_graph, create_react_agent, create_research_agent,
    create_sql_agent, demo_tools, DeveloperState,
};
use crate::config::{Prompts, Settings};
use crate::error::{AgentGraphError, Result};
use crate::graph::{CompiledGraph, RunConfig, StateGraph, END, START};
use crate::message::{Message, MessagesState};
use crate::model::{AzureChatModel, ChatModel, ScriptedModel};
use crate::tools::{PythonReplTool, PythonSandbox, SqlDatabase, ToolBox, WebSearchTool};
use crate::workflows::{basic_graph, counter_graph, simple_call, BasicState, CounterState, Workflow};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument};
use uuid::Uuid;

/// One executed node, summarised for display.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub node: String,
    pub summary: String,
    /// When the node finished.
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub id: Uuid,
    pub workflow: Workflow,
    pub started_at: DateTime<Utc>,
    /// Final text: the last message, or the final state as JSON for the demos.
    pub answer: String,
    /// Full conversation for message-based workflows.
    pub messages: Vec<Message>,
    /// Image files written to the sandbox directory during this run.
    pub files: Vec<String>,
    pub steps: Vec<StepRecord>,
}

/// Runs workflows against one configuration and one model.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    model: Arc<dyn ChatModel>,
    /// Shared by every sandbox this orchestrator hands out, since they all
    /// use the same working directory.
    sandbox_lock: Arc<AsyncMutex<()>>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the configured Azure deployment.
    ///
    /// Missing model credentials do not fail here; they fail the first
    /// workflow that calls the model.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let model: Arc<dyn ChatModel> = Arc::new(AzureChatModel::new(settings.model.clone()));

        Ok(Self::with_components(settings, prompts, model))
    }

    /// Create an orchestrator with a custom model.
    pub fn with_components(settings: Settings, prompts: Prompts, model: Arc<dyn ChatModel>) -> Self {
        Self {
            settings,
            prompts,
            model,
            sandbox_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Input used when the caller gives none.
    pub fn default_input(&self, workflow: Workflow) -> String {
        match workflow {
            Workflow::Basic => r#"{"name": "Prince", "age": 80}"#.to_string(),
            Workflow::Counter => r#"{"string_value": "a", "int_value": 1}"#.to_string(),
            Workflow::Simple => "What is the capital of France?".to_string(),
            Workflow::React => self.prompts.react.default_question.clone(),
            Workflow::Research => "What are the latest developments in AI?".to_string(),
            Workflow::Developer => {
                "Write a function that computes the first 10 Fibonacci numbers and plot them as a bar chart."
                    .to_string()
            }
            Workflow::Collaboration => self.prompts.collaboration.default_task.clone(),
            Workflow::Sql => "Which tables are in the database and how many rows does each have?".to_string(),
        }
    }

    fn agent_config(&self) -> RunConfig {
        RunConfig::with_recursion_limit(self.settings.agent.recursion_limit)
    }

    fn sandbox(&self) -> PythonSandbox {
        PythonSandbox::new(&self.settings.sandbox, self.settings.sandbox_dir())
            .with_lock(self.sandbox_lock.clone())
    }

    /// Run `workflow` once on `input`, calling `on_step` after every node.
    #[instrument(skip(self, input, on_step), fields(workflow = %workflow))]
    pub async fn run<F>(&self, workflow: Workflow, input: &str, mut on_step: F) -> Result<RunResult>
    where
        F: FnMut(&StepRecord) + Send,
    {
        let started_at = Utc::now();
        let mut steps = Vec::new();
        let mut files = Vec::new();
        let config = self.agent_config();

        info!("Running workflow {}", workflow);

        let (answer, messages) = match workflow {
            Workflow::Basic => {
                let state: BasicState = parse_json_input(input)?;
                let out = drive(&basic_graph()?, state, config, json_summary, &mut on_step, &mut steps).await?;
                (json_summary(&out), Vec::new())
            }
            Workflow::Counter => {
                let state: CounterState = if input.trim().is_empty() {
                    CounterState::default()
                } else {
                    parse_json_input(input)?
                };
                let out = drive(&counter_graph()?, state, config, json_summary, &mut on_step, &mut steps).await?;
                (json_summary(&out), Vec::new())
            }
            Workflow::Simple => {
                let answer = simple_call(self.model.as_ref(), &self.prompts.react.assistant, input).await?;
                let record = StepRecord {
                    step: 1,
                    node: "model".to_string(),
                    summary: preview(&answer),
                    timestamp: Utc::now(),
                };
                on_step(&record);
                steps.push(record);
                let messages = vec![Message::human(input), Message::ai(answer.clone())];
                (answer, messages)
            }
            Workflow::React => {
                let agent = create_react_agent(
                    self.model.clone(),
                    demo_tools(),
                    Some(self.prompts.react.system.clone()),
                )?;
                self.drive_messages(&agent, input, config, &mut on_step, &mut steps).await?
            }
            Workflow::Research => {
                let search = Arc::new(WebSearchTool::new(&self.settings.search)?);
                let agent = create_research_agent(self.model.clone(), search, &self.prompts)?;
                self.drive_messages(&agent, input, config, &mut on_step, &mut steps).await?
            }
            Workflow::Developer => {
                let graph = create_developer_graph(
                    self.model.clone(),
                    self.sandbox(),
                    &self.prompts.developer.system,
                    config,
                )?;
                let out = drive(
                    &graph,
                    DeveloperState::from_task(input),
                    RunConfig::default(),
                    |s: &DeveloperState| messages_summary(&s.messages),
                    &mut on_step,
                    &mut steps,
                )
                .await?;
                files = out.generated_files;
                (out.messages.last_content().to_string(), out.messages.messages)
            }
            Workflow::Collaboration => {
                let sandbox = self.sandbox();
                let artifacts = sandbox.artifacts().clone();
                let research_tools = ToolBox::new().with(WebSearchTool::new(&self.settings.search)?);
                let chart_tools = ToolBox::new().with(PythonReplTool::new(sandbox));
                let graph = create_collaboration_graph(
                    self.model.clone(),
                    research_tools,
                    chart_tools,
                    &self.prompts,
                    config,
                )?;
                let outer = RunConfig::with_recursion_limit(self.settings.agent.collaboration_recursion_limit);
                let result = self.drive_messages(&graph, input, outer, &mut on_step, &mut steps).await?;
                files = artifacts.take();
                result
            }
            Workflow::Sql => {
                let db = Arc::new(SqlDatabase::from_settings(&self.settings.sql_path(), &self.settings.sql)?);
                let agent = create_sql_agent(self.model.clone(), db, &self.prompts, self.settings.sql.top_k)?;
                self.drive_messages(&agent, input, config, &mut on_step, &mut steps).await?
            }
        };

        info!("Workflow {} finished after {} steps", workflow, steps.len());

        Ok(RunResult {
            id: Uuid::new_v4(),
            workflow,
            started_at,
            answer,
            messages,
            files,
            steps,
        })
    }

    async fn drive_messages<F>(
        &self,
        graph: &CompiledGraph<MessagesState>,
        input: &str,
        config: RunConfig,
        on_step: &mut F,
        steps: &mut Vec<StepRecord>,
    ) -> Result<(String, Vec<Message>)>
    where
        F: FnMut(&StepRecord) + Send,
    {
        let out = drive(graph, MessagesState::from_human(input), config, messages_summary, on_step, steps).await?;
        Ok((out.last_content().to_string(), out.messages))
    }

    /// Mermaid rendering of the graph behind `workflow`.
    ///
    /// Agent graphs are built with a placeholder model, so no credentials are
    /// needed.
    pub fn draw(&self, workflow: Workflow) -> Result<String> {
        let model: Arc<dyn ChatModel> = Arc::new(ScriptedModel::default());

        let mermaid = match workflow {
            Workflow::Basic => basic_graph()?.draw_mermaid(),
            Workflow::Counter => counter_graph()?.draw_mermaid(),
            Workflow::Simple => {
                let mut graph: StateGraph<MessagesState> = StateGraph::new();
                graph
                    .add_fn_node("model", |s: MessagesState| s)
                    .add_edge(START, "model")
                    .add_edge("model", END);
                graph.compile()?.draw_mermaid()
            }
            Workflow::React => create_react_agent(model, demo_tools(), None)?.draw_mermaid(),
            Workflow::Research | Workflow::Sql => create_react_agent(model, ToolBox::new(), None)?.draw_mermaid(),
            Workflow::Developer => {
                create_developer_graph(model, self.sandbox(), "", RunConfig::default())?.draw_mermaid()
            }
            Workflow::Collaboration => create_collaboration_graph(
                model,
                ToolBox::new(),
                ToolBox::new(),
                &self.prompts,
                RunConfig::default(),
            )?
            .draw_mermaid(),
        };
        Ok(mermaid)
    }
}

/// Stream `graph` to completion, recording a summary of every step.
async fn drive<S, G, F>(
    graph: &CompiledGraph<S>,
    state: S,
    config: RunConfig,
    summarize: G,
    on_step: &mut F,
    steps: &mut Vec<StepRecord>,
) -> Result<S>
where
    S: Clone + Send + Sync + 'static,
    G: Fn(&S) -> String,
    F: FnMut(&StepRecord) + Send,
{
    let mut stream = Box::pin(graph.stream(state, config));
    let mut last = None;

    while let Some(event) = stream.next().await {
        let event = event?;
        let record = StepRecord {
            step: event.step,
            node: event.node,
            summary: summarize(&event.state),
            timestamp: Utc::now(),
        };
        on_step(&record);
        steps.push(record);
        last = Some(event.state);
    }

    last.ok_or_else(|| AgentGraphError::Agent("graph finished without running a node".to_string()))
}

fn parse_json_input<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input)
        .map_err(|e| AgentGraphError::InvalidInput(format!("expected a JSON object ({}): {}", e, input)))
}

fn json_summary<S: Serialize>(state: &S) -> String {
    serde_json::to_string(state).unwrap_or_default()
}

fn messages_summary(state: &MessagesState) -> String {
    match state.last() {
        Some(m) if m.has_tool_calls() => {
            let calls: Vec<String> = m.tool_calls.iter().map(|c| c.to_string()).collect();
            format!("ai -> {}", calls.join(", "))
        }
        Some(m) => format!("{}: {}", m.role, preview(&m.content)),
        None => String::new(),
    }
}

/// First 200 characters on one line.
fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= 200 {
        flat
    } else {
        format!("{}...", flat.chars().take(200).collect::<String>())
    }
}
