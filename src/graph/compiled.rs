//! Compiled state graph: immutable, supports `invoke` and `stream`.

use super::error::GraphError;
use super::node::{Next, Node};
use super::state_graph::Edge;
use super::{END, START};
use crate::error::{AgentGraphError, Result};
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default cap on executed steps per invocation.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Per-invocation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum number of node executions before the run fails.
    pub recursion_limit: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl RunConfig {
    pub fn with_recursion_limit(recursion_limit: usize) -> Self {
        Self { recursion_limit }
    }
}

/// One executed node, as yielded by [`CompiledGraph::stream`].
#[derive(Debug, Clone)]
pub struct StepEvent<S> {
    /// 1-based step number.
    pub step: usize,
    /// Id of the node that ran.
    pub node: String,
    /// State after the node ran.
    pub state: S,
}

struct Cursor<S> {
    state: S,
    next: Option<String>,
    step: usize,
}

/// Validated, executable graph. Built by [`StateGraph::compile`](super::StateGraph::compile).
pub struct CompiledGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) order: Vec<String>,
    pub(super) edges: HashMap<String, Edge<S>>,
    pub(super) entry: String,
}

impl<S> CompiledGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Node ids in registration order.
    pub fn node_ids(&self) -> &[String] {
        &self.order
    }

    /// Id of the first node to run.
    pub fn entry_point(&self) -> &str {
        &self.entry
    }

    /// Run the graph to completion and return the final state.
    #[instrument(skip_all, fields(entry = %self.entry, limit = config.recursion_limit))]
    pub async fn invoke(&self, state: S, config: &RunConfig) -> Result<S> {
        let mut steps = Box::pin(self.stream(state, *config));
        let mut last = None;

        while let Some(event) = steps.next().await {
            last = Some(event?.state);
        }

        last.ok_or_else(|| GraphError::RecursionLimit(config.recursion_limit).into())
    }

    /// Run the graph, yielding the state after every node.
    ///
    /// The stream ends after the final step, or after yielding the first error.
    pub fn stream(&self, state: S, config: RunConfig) -> impl Stream<Item = Result<StepEvent<S>>> + Send + '_ {
        let start = Cursor {
            state,
            next: Some(self.entry.clone()),
            step: 0,
        };

        futures::stream::unfold(Some(start), move |cursor| async move {
            let Some(Cursor {
                state,
                next: Some(node_id),
                step,
            }) = cursor
            else {
                return None;
            };

            if step >= config.recursion_limit {
                let err = AgentGraphError::from(GraphError::RecursionLimit(config.recursion_limit));
                return Some((Err(err), None));
            }

            match self.run_node(&node_id, state).await {
                Ok((state, following)) => {
                    let step = step + 1;
                    let event = StepEvent {
                        step,
                        node: node_id,
                        state: state.clone(),
                    };
                    Some((
                        Ok(event),
                        Some(Cursor {
                            state,
                            next: following,
                            step,
                        }),
                    ))
                }
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    async fn run_node(&self, node_id: &str, state: S) -> Result<(S, Option<String>)> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        debug!("Running node {}", node_id);
        let (state, next) = node.run(state).await?;
        let following = self.resolve(node_id, &state, next)?;
        debug!("Node {} -> {}", node_id, following.as_deref().unwrap_or(END));

        Ok((state, following))
    }

    /// Pick the node after `current`. `None` means the run is over.
    fn resolve(&self, current: &str, state: &S, next: Next) -> std::result::Result<Option<String>, GraphError> {
        let target = match next {
            Next::End => return Ok(None),
            Next::Goto(id) => id,
            Next::Continue => match self.edges.get(current) {
                None => return Ok(None),
                Some(Edge::Direct(to)) => to.clone(),
                Some(Edge::Conditional { router, branches }) => {
                    let label = router(state);
                    if branches.is_empty() {
                        label
                    } else {
                        branches.get(&label).cloned().ok_or_else(|| GraphError::UnknownBranch {
                            node: current.to_string(),
                            label,
                        })?
                    }
                }
            },
        };

        if target == END {
            Ok(None)
        } else if self.nodes.contains_key(&target) {
            Ok(Some(target))
        } else {
            Err(GraphError::NodeNotFound(target))
        }
    }

    /// Render the graph as a Mermaid flowchart.
    pub fn draw_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        let _ = writeln!(out, "    {START}([START])");
        for id in &self.order {
            let _ = writeln!(out, "    {id}[{id}]");
        }
        let _ = writeln!(out, "    {END}([END])");

        let _ = writeln!(out, "    {START} --> {}", self.entry);
        for from in &self.order {
            match self.edges.get(from) {
                Some(Edge::Direct(to)) => {
                    let _ = writeln!(out, "    {from} --> {to}");
                }
                Some(Edge::Conditional { branches, .. }) if branches.is_empty() => {
                    for to in self.order.iter().map(String::as_str).chain([END]) {
                        let _ = writeln!(out, "    {from} -.-> {to}");
                    }
                }
                Some(Edge::Conditional { branches, .. }) => {
                    for (label, to) in branches {
                        let _ = writeln!(out, "    {from} -.->|{label}| {to}");
                    }
                }
                None => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StateGraph;
    use async_trait::async_trait;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        text: String,
        value: i32,
    }

    fn bump(mut s: Counter) -> Counter {
        s.text.push('a');
        s.value += 1;
        s
    }

    fn counter_graph() -> CompiledGraph<Counter> {
        let mut graph = StateGraph::new();
        graph
            .add_fn_node("node_1", bump)
            .add_fn_node("node_2", bump)
            .add_edge(START, "node_1")
            .add_edge("node_1", "node_2")
            .add_conditional_edges(
                "node_2",
                |s: &Counter| if s.value < 5 { "node_1" } else { END },
                [("node_1", "node_1"), (END, END)],
            );
        graph.compile().unwrap()
    }

    #[tokio::test]
    async fn test_conditional_loop_until_threshold() {
        let app = counter_graph();
        let out = app
            .invoke(Counter { text: "a".into(), value: 1 }, &RunConfig::default())
            .await
            .unwrap();
        assert_eq!(out.value, 5);
        assert_eq!(out.text, "aaaaa");
    }

    #[tokio::test]
    async fn test_stream_yields_each_step_in_order() {
        let app = counter_graph();
        let events: Vec<_> = app
            .stream(Counter { text: String::new(), value: 3 }, RunConfig::default())
            .collect()
            .await;

        let nodes: Vec<_> = events
            .into_iter()
            .map(|e| e.unwrap())
            .map(|e| (e.step, e.node, e.state.value))
            .collect();
        assert_eq!(
            nodes,
            vec![(1, "node_1".to_string(), 4), (2, "node_2".to_string(), 5)]
        );
    }

    #[tokio::test]
    async fn test_recursion_limit_stops_endless_loop() {
        let mut graph = StateGraph::new();
        graph
            .add_fn_node("spin", |n: u32| n + 1)
            .set_entry_point("spin")
            .add_edge("spin", "spin");
        let app = graph.compile().unwrap();

        let err = app.invoke(0, &RunConfig::with_recursion_limit(10)).await.unwrap_err();
        assert!(matches!(
            err,
            AgentGraphError::Graph(GraphError::RecursionLimit(10))
        ));
    }

    #[tokio::test]
    async fn test_node_without_edge_ends_run() {
        let mut graph = StateGraph::new();
        graph.add_fn_node("only", |n: u32| n + 1).set_entry_point("only");
        let app = graph.compile().unwrap();
        assert_eq!(app.invoke(1, &RunConfig::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_branch_label_is_an_error() {
        let mut graph = StateGraph::new();
        graph
            .add_fn_node("a", |n: u32| n)
            .set_entry_point("a")
            .add_conditional_edges("a", |_: &u32| "elsewhere", [("here", END)]);
        let app = graph.compile().unwrap();

        let err = app.invoke(0, &RunConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentGraphError::Graph(GraphError::UnknownBranch { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_branch_table_routes_by_label() {
        let mut graph = StateGraph::new();
        graph
            .add_fn_node("a", |n: u32| n + 1)
            .add_fn_node("b", |n: u32| n * 10)
            .set_entry_point("a")
            .add_conditional_edges("a", |_: &u32| "b", std::iter::empty::<(&str, &str)>());
        let app = graph.compile().unwrap();

        assert_eq!(app.invoke(1, &RunConfig::default()).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_empty_branch_table_with_missing_node_fails_at_run() {
        let mut graph = StateGraph::new();
        graph
            .add_fn_node("a", |n: u32| n)
            .set_entry_point("a")
            .add_conditional_edges("a", |_: &u32| "ghost", std::iter::empty::<(&str, &str)>());
        let app = graph.compile().unwrap();

        let err = app.invoke(0, &RunConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentGraphError::Graph(GraphError::NodeNotFound(ref name)) if name == "ghost"
        ));
    }

    struct Handoff;

    #[async_trait]
    impl Node<Vec<&'static str>> for Handoff {
        async fn run(&self, mut state: Vec<&'static str>) -> Result<(Vec<&'static str>, Next)> {
            state.push("handoff");
            Ok((state, Next::Goto("target".to_string())))
        }
    }

    #[tokio::test]
    async fn test_goto_overrides_edges() {
        let mut graph = StateGraph::new();
        graph
            .add_node("handoff", Handoff)
            .add_fn_node("target", |mut s: Vec<&'static str>| {
                s.push("target");
                s
            })
            .add_fn_node("skipped", |mut s: Vec<&'static str>| {
                s.push("skipped");
                s
            })
            .set_entry_point("handoff")
            .add_edge("handoff", "skipped");
        let app = graph.compile().unwrap();

        let out = app.invoke(Vec::new(), &RunConfig::default()).await.unwrap();
        assert_eq!(out, vec!["handoff", "target"]);
    }

    #[test]
    fn test_draw_mermaid_lists_edges() {
        let diagram = counter_graph().draw_mermaid();
        assert!(diagram.starts_with("graph TD\n"));
        assert!(diagram.contains("__start__ --> node_1"));
        assert!(diagram.contains("node_1 --> node_2"));
        assert!(diagram.contains("node_2 -.->|node_1| node_1"));
        assert!(diagram.contains("node_2 -.->|__end__| __end__"));
    }
}
