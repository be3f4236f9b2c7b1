use std::collections::HashMap;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    Static,
    /// Reached when the router yields this key.
    Conditional(String),
}

/// Topology of a built graph, used for validation and introspection.
#[derive(Clone, Debug)]
pub struct GraphProgram {
    graph: DiGraph<String, EdgeKind>,
    name_to_index: HashMap<String, NodeIndex>,
}

impl GraphProgram {
    pub(crate) fn new<'a>(nodes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut graph = DiGraph::new();
        let mut name_to_index = HashMap::new();
        for name in nodes {
            let index = graph.add_node(name.to_string());
            name_to_index.insert(name.to_string(), index);
        }
        Self {
            graph,
            name_to_index,
        }
    }

    /// Returns false when either endpoint is not a registered node.
    pub(crate) fn connect(&mut self, from: &str, to: &str, kind: EdgeKind) -> bool {
        match (self.name_to_index.get(from), self.name_to_index.get(to)) {
            (Some(&a), Some(&b)) => {
                self.graph.add_edge(a, b, kind);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, node: &str) -> bool {
        self.name_to_index.contains_key(node)
    }

    pub fn reachable(&self, from: &str, to: &str) -> bool {
        match (self.name_to_index.get(from), self.name_to_index.get(to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.name_to_index.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn edge_names(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let from = self.graph.node_weight(edge.source())?;
                let to = self.graph.node_weight(edge.target())?;
                Some((from.clone(), to.clone()))
            })
            .collect();
        edges.sort();
        edges.dedup();
        edges
    }
}
