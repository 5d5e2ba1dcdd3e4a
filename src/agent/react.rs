//! Reason/act agent: the model thinks, tools run, repeat until it answers.

use crate::error::{AgentGraphError, Result};
use crate::graph::{CompiledGraph, Next, Node, StateGraph, END, START};
use crate::message::{Message, MessagesState};
use crate::model::ChatModel;
use crate::tools::{DbConnectTool, ToolBox, TripleNumberTool};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Node that calls the model.
pub const AGENT_REASON: &str = "agent_reason";
/// Node that runs the requested tools.
pub const ACT: &str = "act";

/// Route after reasoning: run tools if the model asked for any, else stop.
pub fn should_continue(state: &MessagesState) -> &'static str {
    match state.last() {
        Some(message) if message.has_tool_calls() => ACT,
        _ => END,
    }
}

/// Calls the model with the conversation and appends its reply.
pub struct ReasoningNode {
    model: Arc<dyn ChatModel>,
    tools: ToolBox,
    system_prompt: Option<String>,
}

impl ReasoningNode {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolBox, system_prompt: Option<String>) -> Self {
        Self {
            model,
            tools,
            system_prompt,
        }
    }
}

#[async_trait]
impl Node<MessagesState> for ReasoningNode {
    #[instrument(skip_all, fields(model = self.model.name()))]
    async fn run(&self, mut state: MessagesState) -> Result<(MessagesState, Next)> {
        let reply = match &self.system_prompt {
            Some(prompt) => {
                let mut messages = Vec::with_capacity(state.messages.len() + 1);
                messages.push(Message::system(prompt.clone()));
                messages.extend(state.messages.iter().cloned());
                self.model.invoke(&messages, &self.tools.specs()).await?
            }
            None => self.model.invoke(&state.messages, &self.tools.specs()).await?,
        };

        debug!("Model replied with {} tool calls", reply.tool_calls.len());
        state.push(reply);
        Ok((state, Next::Continue))
    }
}

/// Runs every tool call of the last AI message, in order.
pub struct ToolNode {
    tools: ToolBox,
}

impl ToolNode {
    pub fn new(tools: ToolBox) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Node<MessagesState> for ToolNode {
    async fn run(&self, mut state: MessagesState) -> Result<(MessagesState, Next)> {
        let calls = match state.last() {
            Some(message) if message.has_tool_calls() => message.tool_calls.clone(),
            _ => {
                return Err(AgentGraphError::Agent(
                    "tool node reached without pending tool calls".to_string(),
                ))
            }
        };

        for call in &calls {
            let result = self.tools.execute(call).await;
            state.push(result);
        }
        Ok((state, Next::Continue))
    }
}

/// Build the two-node reason/act graph.
///
/// `prompt` is prepended as a system message on every model call; it is not
/// stored in the returned state.
pub fn create_react_agent(
    model: Arc<dyn ChatModel>,
    tools: ToolBox,
    prompt: Option<String>,
) -> Result<CompiledGraph<MessagesState>> {
    let mut graph = StateGraph::new();
    graph
        .add_node(AGENT_REASON, ReasoningNode::new(model, tools.clone(), prompt))
        .add_node(ACT, ToolNode::new(tools))
        .add_edge(START, AGENT_REASON)
        .add_conditional_edges(AGENT_REASON, should_continue, [(ACT, ACT), (END, END)])
        .add_edge(ACT, AGENT_REASON);

    Ok(graph.compile()?)
}

/// The toy tools of the react demo.
pub fn demo_tools() -> ToolBox {
    ToolBox::new().with(TripleNumberTool).with(DbConnectTool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RunConfig;
    use crate::message::{Role, ToolCall};
    use crate::model::ScriptedModel;

    #[test]
    fn test_should_continue() {
        assert_eq!(should_continue(&MessagesState::default()), END);
        assert_eq!(should_continue(&MessagesState::from_human("hi")), END);

        let mut state = MessagesState::from_human("hi");
        state.push(Message::ai("done"));
        assert_eq!(should_continue(&state), END);

        state.push(Message::ai_with_tool_calls("", vec![ToolCall::new("1", "db_connect", "{}")]));
        assert_eq!(should_continue(&state), ACT);
    }

    #[tokio::test]
    async fn test_db_then_triple_flow() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::ai_with_tool_calls("", vec![ToolCall::new("c1", "db_connect", "{}")]),
            Message::ai_with_tool_calls("", vec![ToolCall::new("c2", "triple_number", r#"{"number": 15}"#)]),
            Message::ai("The result is 45."),
        ]));
        let agent = create_react_agent(model.clone(), demo_tools(), Some("Be brief.".to_string())).unwrap();

        let out = agent
            .invoke(MessagesState::from_human("triple the stored number"), &RunConfig::default())
            .await
            .unwrap();

        let roles: Vec<Role> = out.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::Human, Role::Ai, Role::Tool, Role::Ai, Role::Tool, Role::Ai]
        );
        assert_eq!(out.messages[2].content, "15");
        assert_eq!(out.messages[4].content, "45");
        assert_eq!(out.last_content(), "The result is 45.");

        // the system prompt goes to the model but never into the state
        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0][0], Message::system("Be brief."));
        assert!(out.messages.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn test_several_calls_in_one_reply_answer_in_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::ai_with_tool_calls(
                "",
                vec![
                    ToolCall::new("c1", "db_connect", "{}"),
                    ToolCall::new("c2", "triple_number", r#"{"number": 15}"#),
                ],
            ),
            Message::ai("Done."),
        ]));
        let agent = create_react_agent(model.clone(), demo_tools(), None).unwrap();

        let out = agent
            .invoke(MessagesState::from_human("both at once"), &RunConfig::default())
            .await
            .unwrap();

        let roles: Vec<Role> = out.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Human, Role::Ai, Role::Tool, Role::Tool, Role::Ai]);
        assert_eq!(out.messages[2], Message::tool("c1", "db_connect", "15"));
        assert_eq!(out.messages[3], Message::tool("c2", "triple_number", "45"));

        // both results reach the model before it answers
        let requests = model.requests();
        let second = &requests[1];
        assert_eq!(second[second.len() - 2..], out.messages[2..4]);
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::ai_with_tool_calls("", vec![ToolCall::new("c1", "launch_rocket", "{}")]),
            Message::ai("I cannot do that."),
        ]));
        let agent = create_react_agent(model, demo_tools(), None).unwrap();

        let out = agent
            .invoke(MessagesState::from_human("go"), &RunConfig::default())
            .await
            .unwrap();

        assert!(out.messages[2].content.starts_with("Error: Unknown tool"));
        assert_eq!(out.last_content(), "I cannot do that.");
    }

    #[tokio::test]
    async fn test_endless_tool_calls_hit_recursion_limit() {
        let replies = (0..10).map(|i| {
            Message::ai_with_tool_calls("", vec![ToolCall::new(format!("c{}", i), "db_connect", "{}")])
        });
        let agent = create_react_agent(Arc::new(ScriptedModel::new(replies)), demo_tools(), None).unwrap();

        let err = agent
            .invoke(MessagesState::from_human("loop"), &RunConfig::with_recursion_limit(4))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentGraphError::Graph(crate::graph::GraphError::RecursionLimit(4))
        ));
    }
}
