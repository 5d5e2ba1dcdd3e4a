//! Named workflows and the two plain-state demo graphs.

use crate::error::{AgentGraphError, Result};
use crate::graph::{CompiledGraph, StateGraph, END, START};
use crate::message::Message;
use crate::model::ChatModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every workflow the CLI and the server can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    /// Two pass-through nodes over `{ name, age }`.
    Basic,
    /// Two incrementing nodes looping until the counter reaches 5.
    Counter,
    /// One model call, no tools.
    Simple,
    /// Reason/act agent with the toy database and math tools.
    React,
    /// Reason/act agent with web search.
    Research,
    /// Python developer agent with the code sandbox.
    Developer,
    /// Researcher and chart generator handing off to each other.
    Collaboration,
    /// Question answering over the SQL database.
    Sql,
}

impl Workflow {
    pub const ALL: [Workflow; 8] = [
        Workflow::Basic,
        Workflow::Counter,
        Workflow::Simple,
        Workflow::React,
        Workflow::Research,
        Workflow::Developer,
        Workflow::Collaboration,
        Workflow::Sql,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Workflow::Basic => "basic",
            Workflow::Counter => "counter",
            Workflow::Simple => "simple",
            Workflow::React => "react",
            Workflow::Research => "research",
            Workflow::Developer => "developer",
            Workflow::Collaboration => "collaboration",
            Workflow::Sql => "sql",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Workflow::Basic => "Two pass-through nodes over a name and an age",
            Workflow::Counter => "Counter loop that stops once the value reaches 5",
            Workflow::Simple => "A single model call",
            Workflow::React => "Agent with db_connect and triple_number tools",
            Workflow::Research => "Agent with web search",
            Workflow::Developer => "Python developer that writes, runs and plots",
            Workflow::Collaboration => "Researcher and chart generator working together",
            Workflow::Sql => "Answers questions from the SQL database",
        }
    }

    /// Whether running it calls the model.
    pub fn needs_model(&self) -> bool {
        !matches!(self, Workflow::Basic | Workflow::Counter)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Workflow {
    type Err = AgentGraphError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Workflow::ALL
            .into_iter()
            .find(|w| w.name() == wanted)
            .ok_or_else(|| AgentGraphError::InvalidInput(format!("unknown workflow: {}", s)))
    }
}

/// State of the basic demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicState {
    pub name: String,
    pub age: u32,
}

/// `START -> node_1 -> node_2 -> END`; both nodes pass the state through.
pub fn basic_graph() -> Result<CompiledGraph<BasicState>> {
    let mut graph = StateGraph::new();
    graph
        .add_fn_node("node_1", |s: BasicState| BasicState { name: s.name, age: s.age })
        .add_fn_node("node_2", |s: BasicState| BasicState { name: s.name, age: s.age })
        .add_edge(START, "node_1")
        .add_edge("node_1", "node_2")
        .add_edge("node_2", END);

    Ok(graph.compile()?)
}

/// State of the counter demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    pub string_value: String,
    pub int_value: i64,
}

impl Default for CounterState {
    fn default() -> Self {
        Self {
            string_value: "a".to_string(),
            int_value: 1,
        }
    }
}

fn modify_state(mut state: CounterState) -> CounterState {
    state.string_value.push('a');
    state.int_value += 1;
    state
}

/// Loop back to `node_1` while the counter is below 5.
pub fn counter_router(state: &CounterState) -> &'static str {
    if state.int_value < 5 {
        "node_1"
    } else {
        END
    }
}

/// `node_1 -> node_2`, then `node_2 -> node_1` or `END` via [`counter_router`].
pub fn counter_graph() -> Result<CompiledGraph<CounterState>> {
    let mut graph = StateGraph::new();
    graph
        .add_fn_node("node_1", modify_state)
        .add_fn_node("node_2", modify_state)
        .add_edge(START, "node_1")
        .add_edge("node_1", "node_2")
        .add_conditional_edges("node_2", counter_router, [("node_1", "node_1"), (END, END)]);

    Ok(graph.compile()?)
}

/// The smallest model call: a system prompt and one question.
pub async fn simple_call(model: &dyn ChatModel, system: &str, question: &str) -> Result<String> {
    let reply = model
        .invoke(&[Message::system(system), Message::human(question)], &[])
        .await?;
    Ok(reply.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RunConfig;
    use crate::model::ScriptedModel;

    #[tokio::test]
    async fn test_basic_passes_state_through() {
        let graph = basic_graph().unwrap();
        let input = BasicState {
            name: "Prince".to_string(),
            age: 80,
        };
        let out = graph.invoke(input.clone(), &RunConfig::default()).await.unwrap();
        assert_eq!(out, input);
        assert_eq!(graph.node_ids(), &["node_1".to_string(), "node_2".to_string()]);
    }

    #[tokio::test]
    async fn test_counter_stops_at_five() {
        let graph = counter_graph().unwrap();
        let out = graph.invoke(CounterState::default(), &RunConfig::default()).await.unwrap();
        assert_eq!(out.int_value, 5);
        assert_eq!(out.string_value, "aaaaa");
    }

    #[tokio::test]
    async fn test_counter_starting_high_runs_each_node_once() {
        let graph = counter_graph().unwrap();
        let start = CounterState {
            string_value: String::new(),
            int_value: 10,
        };
        let out = graph.invoke(start, &RunConfig::default()).await.unwrap();
        assert_eq!(out.int_value, 12);
        assert_eq!(out.string_value, "aa");
    }

    #[test]
    fn test_counter_router() {
        let mut state = CounterState::default();
        assert_eq!(counter_router(&state), "node_1");
        state.int_value = 5;
        assert_eq!(counter_router(&state), END);
    }

    #[test]
    fn test_workflow_names_round_trip() {
        for workflow in Workflow::ALL {
            assert_eq!(workflow.name().parse::<Workflow>().unwrap(), workflow);
        }
        assert!("nope".parse::<Workflow>().is_err());
        assert!(!Workflow::Counter.needs_model());
        assert!(Workflow::Sql.needs_model());
    }

    #[tokio::test]
    async fn test_simple_call_sends_system_and_question() {
        let model = ScriptedModel::new(vec![Message::ai("Paris")]);
        let answer = simple_call(&model, "You are a helpful assistant.", "Capital of France?")
            .await
            .unwrap();

        assert_eq!(answer, "Paris");
        let sent = &model.requests()[0];
        assert_eq!(sent[0], Message::system("You are a helpful assistant."));
        assert_eq!(sent[1], Message::human("Capital of France?"));
    }
}
