#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::schema::NodeKind;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Suspends the execution for a configured duration before following its
/// outgoing edge. The suspension is a scheduling request surfaced to the run
/// loop, never a blocking sleep inside the handler.
pub struct DelayHandler {
    max_delay: Duration,
}

impl DelayHandler {
    pub fn new(max_delay: Duration) -> Self {
        Self { max_delay }
    }
}

#[async_trait]
impl NodeHandler for DelayHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Delay
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let seconds = ctx
            .node
            .data
            .get("seconds")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let Some(next) = ctx.default_target() else {
            return Ok(NodeResult::complete());
        };
        if seconds == 0 {
            return Ok(NodeResult::next(next));
        }
        let requested = Duration::from_secs(seconds);
        let duration = requested.min(self.max_delay);
        if duration < requested {
            tracing::warn!(
                node_id = %ctx.node.id,
                requested_seconds = seconds,
                capped_seconds = duration.as_secs(),
                "delay capped by engine configuration"
            );
        }
        Ok(NodeResult::next(next).with_resume_after(duration))
    }
}
