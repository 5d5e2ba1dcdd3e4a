//! Researcher and chart generator taking turns on one conversation.
//!
//! Each turn runs a full react agent. Its final reply is re-tagged as a human
//! message carrying the agent's name, since not every provider accepts an AI
//! message in last position. A reply containing `FINAL ANSWER` ends the run;
//! anything else hands the conversation to the other agent.

use super::react::create_react_agent;
use crate::config::{make_system_prompt, Prompts};
use crate::error::{AgentGraphError, Result};
use crate::graph::{CompiledGraph, Next, Node, RunConfig, StateGraph, START};
use crate::message::{Message, MessagesState};
use crate::model::ChatModel;
use crate::tools::ToolBox;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const RESEARCHER: &str = "researcher";
pub const CHART_GENERATOR: &str = "chart_generator";

/// Marker an agent puts in its reply when the task is complete.
pub const FINAL_ANSWER: &str = "FINAL ANSWER";

/// Where to go after `last`: stop on a final answer, else `peer`.
pub fn next_after(last: &Message, peer: &str) -> Next {
    if last.content.contains(FINAL_ANSWER) {
        Next::End
    } else {
        Next::Goto(peer.to_string())
    }
}

struct CollaboratorNode {
    name: &'static str,
    peer: &'static str,
    agent: CompiledGraph<MessagesState>,
    config: RunConfig,
}

#[async_trait]
impl Node<MessagesState> for CollaboratorNode {
    async fn run(&self, state: MessagesState) -> Result<(MessagesState, Next)> {
        let mut result = self.agent.invoke(state, &self.config).await?;

        let last = result
            .messages
            .pop()
            .ok_or_else(|| AgentGraphError::Agent(format!("{} produced no messages", self.name)))?;

        let next = next_after(&last, self.peer);
        info!("{} finished its turn, next: {:?}", self.name, next);

        result.push(Message::human(last.content).with_name(self.name));
        Ok((result, next))
    }
}

/// Build the two-agent graph. `inner` bounds each agent's own loop.
pub fn create_collaboration_graph(
    model: Arc<dyn ChatModel>,
    research_tools: ToolBox,
    chart_tools: ToolBox,
    prompts: &Prompts,
    inner: RunConfig,
) -> Result<CompiledGraph<MessagesState>> {
    let researcher = create_react_agent(
        model.clone(),
        research_tools,
        Some(make_system_prompt(&prompts.collaboration.researcher)),
    )?;
    let chart_generator = create_react_agent(
        model,
        chart_tools,
        Some(make_system_prompt(&prompts.collaboration.chart_generator)),
    )?;

    let mut graph = StateGraph::new();
    graph
        .add_node(
            RESEARCHER,
            CollaboratorNode {
                name: RESEARCHER,
                peer: CHART_GENERATOR,
                agent: researcher,
                config: inner,
            },
        )
        .add_node(
            CHART_GENERATOR,
            CollaboratorNode {
                name: CHART_GENERATOR,
                peer: RESEARCHER,
                agent: chart_generator,
                config: inner,
            },
        )
        .add_edge(START, RESEARCHER);

    Ok(graph.compile()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;
    use crate::message::Role;
    use crate::model::ScriptedModel;

    fn graph(model: ScriptedModel) -> CompiledGraph<MessagesState> {
        create_collaboration_graph(
            Arc::new(model),
            ToolBox::new(),
            ToolBox::new(),
            &Prompts::default(),
            RunConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_next_after() {
        assert_eq!(next_after(&Message::ai("FINAL ANSWER: done"), RESEARCHER), Next::End);
        assert_eq!(
            next_after(&Message::ai("here is the data"), CHART_GENERATOR),
            Next::Goto(CHART_GENERATOR.to_string())
        );
    }

    #[tokio::test]
    async fn test_handoff_until_final_answer() {
        let graph = graph(ScriptedModel::new(vec![
            Message::ai("GDP: 2019 2.8T, 2020 2.7T"),
            Message::ai("FINAL ANSWER: chart saved to gdp.png"),
        ]));

        let mut steps = Vec::new();
        let mut stream = Box::pin(graph.stream(MessagesState::from_human("chart uk gdp"), RunConfig::default()));
        while let Some(event) = futures::StreamExt::next(&mut stream).await {
            steps.push(event.unwrap());
        }

        let nodes: Vec<&str> = steps.iter().map(|s| s.node.as_str()).collect();
        assert_eq!(nodes, vec![RESEARCHER, CHART_GENERATOR]);

        let final_state = &steps[1].state;
        assert_eq!(final_state.messages.len(), 3);
        let handoff = &final_state.messages[1];
        assert_eq!(handoff.role, Role::Human);
        assert_eq!(handoff.name.as_deref(), Some(RESEARCHER));
        let last = &final_state.messages[2];
        assert_eq!(last.name.as_deref(), Some(CHART_GENERATOR));
        assert!(last.content.starts_with("FINAL ANSWER"));
    }

    #[tokio::test]
    async fn test_outer_limit_caps_ping_pong() {
        let graph = graph(ScriptedModel::new((0..10).map(|i| Message::ai(format!("turn {}", i)))));

        let err = graph
            .invoke(MessagesState::from_human("never finish"), &RunConfig::with_recursion_limit(3))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentGraphError::Graph(GraphError::RecursionLimit(3))));
    }

    #[tokio::test]
    async fn test_roles_prompted_separately() {
        let model = Arc::new(ScriptedModel::new(vec![Message::ai("data"), Message::ai("FINAL ANSWER")]));
        let graph = create_collaboration_graph(
            model.clone(),
            ToolBox::new(),
            ToolBox::new(),
            &Prompts::default(),
            RunConfig::default(),
        )
        .unwrap();
        graph
            .invoke(MessagesState::from_human("task"), &RunConfig::default())
            .await
            .unwrap();

        let requests = model.requests();
        assert!(requests[0][0].content.contains("You can only do research."));
        assert!(requests[1][0].content.contains("You can only generate charts"));
    }
}
