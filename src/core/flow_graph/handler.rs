#![allow(clippy::result_large_err)] // Handler trait and registry return FlowError directly for structured diagnostics without boxing.

use crate::core::error::FlowError;
use crate::core::flow_graph::graph::FlowGraph;
use crate::core::flow_graph::schema::{Node, NodeKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Transition directive returned by a node handler.
#[derive(Debug, Default)]
pub struct NodeResult {
    /// Node to dispatch next. `None` with no wait means the execution completes.
    pub next_node_id: Option<String>,
    /// Suspend the execution until the next inbound user message.
    pub wait_for_input: bool,
    /// Values merged into the execution context; patch wins on key conflicts.
    pub context_patch: Option<Value>,
    /// Non-blocking suspension before dispatching `next_node_id` (delay nodes).
    pub resume_after: Option<Duration>,
}

impl NodeResult {
    pub fn next<T: Into<String>>(node_id: T) -> Self {
        NodeResult {
            next_node_id: Some(node_id.into()),
            ..Default::default()
        }
    }

    pub fn maybe_next(node_id: Option<String>) -> Self {
        NodeResult {
            next_node_id: node_id,
            ..Default::default()
        }
    }

    pub fn wait() -> Self {
        NodeResult {
            wait_for_input: true,
            ..Default::default()
        }
    }

    pub fn complete() -> Self {
        NodeResult::default()
    }

    pub fn with_patch(mut self, patch: Value) -> Self {
        self.context_patch = Some(patch);
        self
    }

    pub fn with_resume_after(mut self, duration: Duration) -> Self {
        self.resume_after = Some(duration);
        self
    }
}

/// Everything a handler may read while executing one node: the node itself,
/// the compiled graph for edge resolution, and a snapshot of the execution.
#[derive(Clone)]
pub struct HandlerContext {
    pub execution_id: Uuid,
    pub tenant_id: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub node: Node,
    pub graph: Arc<FlowGraph>,
    pub context: Value,
}

impl HandlerContext {
    /// Target of the node's default outgoing edge, if any.
    pub fn default_target(&self) -> Option<String> {
        self.graph.default_target(&self.node.id)
    }

    /// Target of the edge tagged `handle`, if declared.
    pub fn target_for_handle(&self, handle: &str) -> Option<String> {
        self.graph
            .edge_for_handle(&self.node.id, Some(handle))
            .map(|edge| edge.target.clone())
    }
}

/// Trait implemented by node handlers.
#[async_trait]
pub trait NodeHandler: Send + Sync + 'static {
    /// Node kind this handler executes.
    fn kind(&self) -> NodeKind;

    /// Execute the node and return a transition directive. An `Err` is a
    /// handler-level exception and fails the whole execution; modeled
    /// failures (error edges) are expressed through the returned result.
    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError>;
}

/// Builder used to register handlers before execution.
pub struct HandlerRegistryBuilder {
    handlers: HashMap<NodeKind, Arc<dyn NodeHandler>>,
}

impl Default for HandlerRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: NodeHandler>(&mut self, handler: T) -> &mut Self {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            panic!("duplicate handler registered for node kind: {}", kind);
        }
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            inner: Arc::new(self.handlers),
        }
    }
}

/// Immutable routing table from node kind to handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    inner: Arc<HashMap<NodeKind, Arc<dyn NodeHandler>>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistryBuilder::new().build()
    }

    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeHandler>> {
        self.inner.get(&kind).cloned()
    }
}
