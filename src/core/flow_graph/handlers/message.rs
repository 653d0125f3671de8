#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::MessagingService;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::interpolate::interpolate;
use crate::core::flow_graph::schema::NodeKind;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

struct MessageParams {
    template: String,
}

impl MessageParams {
    fn parse(value: &Value) -> Result<Self, FlowError> {
        let template = value
            .get("message")
            .or_else(|| value.get("text"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                FlowError::new(
                    ErrorCategory::HandlerError,
                    "message node requires a non-empty message",
                )
            })?
            .to_string();
        Ok(Self { template })
    }
}

/// Interpolates the configured template and delivers it through the
/// messaging collaborator. Send failures propagate to the run loop's
/// failure handling; there is no retry here.
pub struct MessageHandler {
    messaging: Arc<dyn MessagingService>,
}

impl MessageHandler {
    pub fn new(messaging: Arc<dyn MessagingService>) -> Self {
        Self { messaging }
    }
}

#[async_trait]
impl NodeHandler for MessageHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Message
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let params = MessageParams::parse(&ctx.node.data)?;
        let text = interpolate(&params.template, &ctx.context);
        self.messaging
            .send_outbound_message(&ctx.conversation_id, &text)
            .await?;
        Ok(NodeResult::maybe_next(ctx.default_target()))
    }
}
