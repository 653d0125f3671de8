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

/// Applies one or more tags to the conversation. Accepts a single `tag` or a
/// `tags` list; failures follow the node's `error` edge when declared.
pub struct TagManagementHandler {
    conversations: Arc<dyn ConversationService>,
}

impl TagManagementHandler {
    pub fn new(conversations: Arc<dyn ConversationService>) -> Self {
        Self { conversations }
    }
}

fn parse_tags(data: &Value) -> Result<Vec<String>, FlowError> {
    if let Some(tag) = data.get("tag").and_then(Value::as_str) {
        return Ok(vec![tag.to_string()]);
    }
    let tags: Vec<String> = data
        .get("tags")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if tags.is_empty() {
        return Err(FlowError::new(
            ErrorCategory::HandlerError,
            "tagManagement node requires a tag or a non-empty tags list",
        ));
    }
    Ok(tags)
}

#[async_trait]
impl NodeHandler for TagManagementHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::TagManagement
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let tags = parse_tags(&ctx.node.data)?;
        for tag in &tags {
            let tag = interpolate(tag, &ctx.context);
            if let Err(error) = self
                .conversations
                .add_tag(&ctx.tenant_id, &ctx.conversation_id, &tag)
                .await
            {
                tracing::warn!(node_id = %ctx.node.id, %error, "tagManagement node failed");
                return Ok(route_failure(&ctx, "lastTagError", error.message));
            }
        }
        Ok(NodeResult::maybe_next(ctx.default_target()))
    }
}
