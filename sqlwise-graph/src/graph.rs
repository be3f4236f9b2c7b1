use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use sqlwise_core::SqlwiseError;
use tracing::{info, Instrument};

use crate::program::{EdgeKind, GraphProgram};
use crate::{ExecutionConfig, GraphError, GraphState, Observer, StateSchema, StateUpdate};

/// One stage of a workflow: consumes the current state, returns its replacement.
#[async_trait::async_trait]
pub trait GraphNode<S: StateSchema>: Send + Sync {
    async fn invoke(&self, state: GraphState<S>) -> Result<StateUpdate<S>, SqlwiseError>;
}

/// Picks a route key from the state; `None` means the node left it unset.
pub type Router<S> = Arc<dyn Fn(&GraphState<S>) -> Option<String> + Send + Sync>;

enum Edge<S: StateSchema> {
    Static(String),
    Conditional {
        router: Router<S>,
        paths: BTreeMap<String, String>,
    },
}

pub struct GraphBuilder<S: StateSchema> {
    nodes: HashMap<String, Arc<dyn GraphNode<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
    finish: Option<String>,
    observer: Option<Arc<dyn Observer>>,
    config: ExecutionConfig,
}

impl<S: StateSchema> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateSchema> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            finish: None,
            observer: None,
            config: ExecutionConfig::default(),
        }
    }

    pub fn add_node<N>(mut self, name: &str, node: N) -> Self
    where
        N: GraphNode<S> + 'static,
    {
        self.nodes.insert(name.to_string(), Arc::new(node));
        self
    }

    pub fn set_entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    /// Execution stops after this node runs.
    pub fn set_finish(mut self, name: &str) -> Self {
        self.finish = Some(name.to_string());
        self
    }

    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges
            .insert(from.to_string(), Edge::Static(to.to_string()));
        self
    }

    /// Routes out of `from` by looking the router's key up in `paths`.
    pub fn add_conditional_edge<F, I, K, V>(mut self, from: &str, router: F, paths: I) -> Self
    where
        F: Fn(&GraphState<S>) -> Option<String> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let paths = paths
            .into_iter()
            .map(|(key, target)| (key.into(), target.into()))
            .collect();
        self.edges.insert(
            from.to_string(),
            Edge::Conditional {
                router: Arc::new(router),
                paths,
            },
        );
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ExecutableGraph<S>, GraphError> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        let mut program = GraphProgram::new(self.nodes.keys().map(String::as_str));

        if !program.contains(&entry) {
            return Err(GraphError::MissingNode { node: entry });
        }
        if let Some(finish) = &self.finish {
            if !program.contains(finish) {
                return Err(GraphError::MissingNode {
                    node: finish.clone(),
                });
            }
        }

        for (from, edge) in &self.edges {
            if !program.contains(from) {
                return Err(GraphError::MissingNode { node: from.clone() });
            }
            let targets: Vec<(&String, EdgeKind)> = match edge {
                Edge::Static(to) => vec![(to, EdgeKind::Static)],
                Edge::Conditional { paths, .. } => paths
                    .iter()
                    .map(|(key, to)| (to, EdgeKind::Conditional(key.clone())))
                    .collect(),
            };
            for (to, kind) in targets {
                if !program.connect(from, to, kind) {
                    return Err(GraphError::InvalidEdge {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        if let Some(finish) = &self.finish {
            let mut names: Vec<&String> = self.nodes.keys().collect();
            names.sort();
            if let Some(dead) = names
                .into_iter()
                .find(|name| *name != finish && !self.edges.contains_key(*name))
            {
                return Err(GraphError::DeadEnd { node: dead.clone() });
            }
            if !program.reachable(&entry, finish) {
                return Err(GraphError::Unreachable {
                    entry,
                    finish: finish.clone(),
                });
            }
        }

        Ok(ExecutableGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            finish: self.finish,
            observer: self.observer,
            config: self.config,
            program,
        })
    }
}

pub struct ExecutableGraph<S: StateSchema> {
    nodes: HashMap<String, Arc<dyn GraphNode<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: String,
    finish: Option<String>,
    observer: Option<Arc<dyn Observer>>,
    config: ExecutionConfig,
    program: GraphProgram,
}

impl<S: StateSchema> std::fmt::Debug for ExecutableGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableGraph")
            .field("entry", &self.entry)
            .field("finish", &self.finish)
            .field("program", &self.program)
            .field("config", &self.config)
            .finish()
    }
}

impl<S: StateSchema> ExecutableGraph<S> {
    pub fn program(&self) -> &GraphProgram {
        &self.program
    }

    /// Runs from the entry node until the finish node has run, or until a
    /// node without outgoing edges when no finish node is set.
    pub async fn invoke(&self, mut state: GraphState<S>) -> Result<GraphState<S>, GraphError> {
        let mut current = self.entry.clone();
        let mut steps = 0usize;

        loop {
            if let Some(max) = self.config.max_steps {
                if steps >= max {
                    let err = GraphError::MaxStepsExceeded {
                        max,
                        reached: steps,
                    };
                    return Err(self.fail(&current, err).await);
                }
            }
            steps += 1;

            let Some(node) = self.nodes.get(&current) else {
                let err = GraphError::MissingNode {
                    node: current.clone(),
                };
                return Err(self.fail(&current, err).await);
            };

            if let Some(observer) = &self.observer {
                observer.on_node_start(&current, &snapshot(&state)).await;
            }
            let started = Instant::now();
            let span = tracing::info_span!("graph_node", node = %current, step = steps);
            let update = node.invoke(state).instrument(span).await;
            state = match update {
                Ok(update) => GraphState::new(update.data),
                Err(source) => {
                    let err = GraphError::NodeFailed {
                        node: current.clone(),
                        source,
                    };
                    return Err(self.fail(&current, err).await);
                }
            };
            if let Some(observer) = &self.observer {
                observer
                    .on_node_end(&current, &snapshot(&state), started.elapsed().as_millis())
                    .await;
            }

            if self.finish.as_deref() == Some(current.as_str()) {
                break;
            }

            let next = match self.edges.get(&current) {
                None if self.finish.is_none() => break,
                None => Err(GraphError::DeadEnd {
                    node: current.clone(),
                }),
                Some(Edge::Static(to)) => Ok(to.clone()),
                Some(Edge::Conditional { router, paths }) => match router(&state) {
                    None => Err(GraphError::UnsetRoute {
                        node: current.clone(),
                    }),
                    Some(key) => paths.get(&key).cloned().ok_or(GraphError::InvalidEdge {
                        from: current.clone(),
                        to: key,
                    }),
                },
            };
            match next {
                Ok(next) => {
                    info!(from = %current, to = %next, "graph transition");
                    current = next;
                }
                Err(err) => return Err(self.fail(&current, err).await),
            }
        }

        Ok(state)
    }

    async fn fail(&self, node: &str, err: GraphError) -> GraphError {
        if let Some(observer) = &self.observer {
            observer.on_error(node, &err).await;
        }
        err
    }
}

fn snapshot<S: StateSchema>(state: &GraphState<S>) -> Value {
    serde_json::to_value(&state.data).unwrap_or(Value::Null)
}
