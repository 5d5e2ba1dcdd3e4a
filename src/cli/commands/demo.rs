//! Demo command: the plain-state graphs, no model involved.

use crate::cli::{DemoKind, Output};
use crate::graph::RunConfig;
use crate::workflows::{basic_graph, counter_graph, BasicState, CounterState};
use anyhow::Result;
use futures::StreamExt;

/// Run a demo graph, printing the state after every node.
pub async fn run_demo(demo: &DemoKind) -> Result<()> {
    match demo {
        DemoKind::Basic { name, age } => {
            Output::header("Basic graph");
            let graph = basic_graph()?;
            let state = BasicState {
                name: name.clone(),
                age: *age,
            };

            let mut steps = Box::pin(graph.stream(state, RunConfig::default()));
            while let Some(event) = steps.next().await {
                let event = event?;
                Output::kv(&event.node, &format!("{:?}", event.state));
            }
        }
        DemoKind::Counter {
            string_value,
            int_value,
        } => {
            Output::header("Counter graph");
            let graph = counter_graph()?;
            let state = CounterState {
                string_value: string_value.clone(),
                int_value: *int_value,
            };

            let mut steps = Box::pin(graph.stream(state, RunConfig::default()));
            while let Some(event) = steps.next().await {
                let event = event?;
                Output::kv(&event.node, &format!("{:?}", event.state));
            }
        }
    }

    Output::success("Demo completed");
    Ok(())
}
