//! Graph node trait: one step in a [`StateGraph`](super::StateGraph).

use crate::error::Result;
use async_trait::async_trait;

/// What the runner should do after a node finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Follow the node's outgoing edge (or stop if it has none).
    Continue,
    /// Hand off to the named node, ignoring outgoing edges.
    Goto(String),
    /// Stop and return the current state.
    End,
}

/// One step in a graph: state in, updated state and routing out.
#[async_trait]
pub trait Node<S>: Send + Sync {
    async fn run(&self, state: S) -> Result<(S, Next)>;
}

/// Adapter turning a plain synchronous `Fn(S) -> S` into a node.
pub struct FnNode<F> {
    f: F,
}

impl<F> FnNode<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F> Node<S> for FnNode<F>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S) -> S + Send + Sync,
{
    async fn run(&self, state: S) -> Result<(S, Next)> {
        Ok(((self.f)(state), Next::Continue))
    }
}
