#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::graph::DEFAULT_HANDLE;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::rules::{self, Rule};
use crate::core::flow_graph::schema::NodeKind;
use async_trait::async_trait;
use serde_json::Value;

/// Evaluates the node's ordered rule list against context. The first true
/// rule selects the edge tagged with the rule's id; no match falls back to
/// the `default` edge. No default edge and no match yields no next node,
/// which the run loop treats as normal completion.
pub struct ConditionHandler;

fn parse_rules(data: &Value) -> Result<Vec<Rule>, FlowError> {
    match data.get("rules") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
            FlowError::new(
                crate::core::types::ErrorCategory::HandlerError,
                format!("condition node has malformed rules: {}", e),
            )
        }),
    }
}

#[async_trait]
impl NodeHandler for ConditionHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Condition
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let rules = parse_rules(&ctx.node.data)?;
        let handle = rules::first_matching(&rules, &ctx.context)
            .map(|rule| rule.id.as_str())
            .unwrap_or(DEFAULT_HANDLE);
        tracing::debug!(node_id = %ctx.node.id, handle, "condition branch selected");
        Ok(NodeResult::maybe_next(ctx.target_for_handle(handle)))
    }
}
