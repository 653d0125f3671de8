#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::ConversationService;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::handlers::route_failure;
use crate::core::flow_graph::interpolate::interpolate;
use crate::core::flow_graph::schema::NodeKind;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Routes the conversation to a human agent. Failures follow the node's
/// `error` edge when declared.
pub struct AssignConversationHandler {
    conversations: Arc<dyn ConversationService>,
}

impl AssignConversationHandler {
    pub fn new(conversations: Arc<dyn ConversationService>) -> Self {
        Self { conversations }
    }
}

#[async_trait]
impl NodeHandler for AssignConversationHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::AssignConversation
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let agent_id = ctx
            .node
            .data
            .get("agentId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                FlowError::new(
                    ErrorCategory::HandlerError,
                    "assignConversation node requires an agentId",
                )
            })?;
        let agent_id = interpolate(agent_id, &ctx.context);

        match self
            .conversations
            .assign_conversation(&ctx.tenant_id, &ctx.conversation_id, &agent_id)
            .await
        {
            Ok(()) => Ok(NodeResult::maybe_next(ctx.default_target())),
            Err(error) => {
                tracing::warn!(node_id = %ctx.node.id, %error, "assignConversation node failed");
                Ok(route_failure(&ctx, "lastAssignError", error.message))
            }
        }
    }
}
