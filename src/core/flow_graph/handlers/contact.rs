#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::ContactService;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::handlers::route_failure;
use crate::core::flow_graph::interpolate::interpolate_value;
use crate::core::flow_graph::schema::NodeKind;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Writes interpolated field values onto the contact record. Failures follow
/// the node's `error` edge when declared, matching the apiRequest policy.
pub struct UpdateContactHandler {
    contacts: Arc<dyn ContactService>,
}

impl UpdateContactHandler {
    pub fn new(contacts: Arc<dyn ContactService>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl NodeHandler for UpdateContactHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::UpdateContact
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let fields: Map<String, Value> = ctx
            .node
            .data
            .get("fields")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(key, value)| (key.clone(), interpolate_value(value, &ctx.context)))
                    .collect()
            })
            .unwrap_or_default();

        match self
            .contacts
            .update_contact(&ctx.tenant_id, &ctx.contact_id, &fields)
            .await
        {
            Ok(()) => Ok(NodeResult::maybe_next(ctx.default_target())),
            Err(error) => {
                tracing::warn!(node_id = %ctx.node.id, %error, "updateContact node failed");
                Ok(route_failure(&ctx, "lastContactError", error.message))
            }
        }
    }
}
