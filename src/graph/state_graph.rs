//! Graph builder: nodes, direct edges and conditional edges.

use super::compiled::CompiledGraph;
use super::error::GraphError;
use super::node::{FnNode, Node};
use super::{END, START};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Routing function of a conditional edge: state in, branch label out.
pub type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Outgoing edge of a node.
pub(super) enum Edge<S> {
    Direct(String),
    Conditional {
        router: Router<S>,
        /// Label -> target. Empty means the label is itself the target id.
        branches: BTreeMap<String, String>,
    },
}

/// Mutable graph under construction.
///
/// Builder calls never fail; problems are collected and reported by
/// [`compile`](Self::compile).
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    order: Vec<String>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
    problems: Vec<GraphError>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            entry: None,
            problems: Vec::new(),
        }
    }

    /// Register a node. Re-adding an id replaces the node.
    pub fn add_node(&mut self, id: impl Into<String>, node: impl Node<S> + 'static) -> &mut Self {
        let id = id.into();
        if id == START || id == END {
            self.problems.push(GraphError::ReservedId(id));
            return self;
        }
        if !self.nodes.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.nodes.insert(id, Arc::new(node));
        self
    }

    /// Register a plain `state -> state` function as a node.
    pub fn add_fn_node<F>(&mut self, id: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.add_node(id, FnNode::new(f))
    }

    /// Add a direct edge. `from` may be [`START`], `to` may be [`END`].
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        let from = from.into();
        let to = to.into();

        if from == START {
            self.set_entry(to);
        } else {
            self.insert_edge(from, Edge::Direct(to));
        }
        self
    }

    /// Add a conditional edge leaving `from`.
    ///
    /// After `from` runs, `router` picks a label which is mapped through
    /// `branches`. With no branches, the label is used as the target id.
    pub fn add_conditional_edges<R, L, I, K, V>(
        &mut self,
        from: impl Into<String>,
        router: R,
        branches: I,
    ) -> &mut Self
    where
        R: Fn(&S) -> L + Send + Sync + 'static,
        L: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let router: Router<S> = Arc::new(move |state: &S| router(state).into());
        let branches = branches
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert_edge(from.into(), Edge::Conditional { router, branches });
        self
    }

    /// Set the first node to run. Same as `add_edge(START, id)`.
    pub fn set_entry_point(&mut self, id: impl Into<String>) -> &mut Self {
        self.set_entry(id.into());
        self
    }

    fn set_entry(&mut self, id: String) {
        match &self.entry {
            Some(existing) if *existing != id => {
                self.problems.push(GraphError::DuplicateEdge(START.to_string()));
            }
            _ => self.entry = Some(id),
        }
    }

    fn insert_edge(&mut self, from: String, edge: Edge<S>) {
        if self.edges.contains_key(&from) {
            self.problems.push(GraphError::DuplicateEdge(from));
            return;
        }
        self.edges.insert(from, edge);
    }

    /// Validate and freeze the graph.
    pub fn compile(mut self) -> Result<CompiledGraph<S>, GraphError> {
        if let Some(problem) = self.problems.drain(..).next() {
            return Err(problem);
        }

        let entry = self.entry.take().ok_or(GraphError::MissingEntryPoint)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::NodeNotFound(entry));
        }

        let known = |id: &str| id == END || self.nodes.contains_key(id);

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::NodeNotFound(from.clone()));
            }
            match edge {
                Edge::Direct(to) if !known(to) => {
                    return Err(GraphError::NodeNotFound(to.clone()));
                }
                Edge::Conditional { branches, .. } => {
                    if let Some(target) = branches.values().find(|t| !known(t)) {
                        return Err(GraphError::NodeNotFound(target.clone()));
                    }
                }
                Edge::Direct(_) => {}
            }
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            order: self.order,
            edges: self.edges,
            entry,
        })
    }
}
