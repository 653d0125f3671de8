#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::{ContactService, ConversationService};
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::handlers::route_failure;
use crate::core::flow_graph::interpolate::{interpolate, interpolate_value};
use crate::core::flow_graph::schema::NodeKind;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ActionType {
    UpdateContact,
    AddTag,
    AssignAgent,
}

struct ActionParams {
    action_type: ActionType,
    fields: Map<String, Value>,
    tag: Option<String>,
    agent_id: Option<String>,
}

impl ActionParams {
    fn parse(value: &Value) -> Result<Self, FlowError> {
        let action_type = value
            .get("actionType")
            .cloned()
            .ok_or_else(|| {
                FlowError::new(ErrorCategory::HandlerError, "action node requires actionType")
            })
            .and_then(|raw| {
                serde_json::from_value(raw.clone()).map_err(|_| {
                    FlowError::new(
                        ErrorCategory::HandlerError,
                        format!("action node has unsupported actionType: {}", raw),
                    )
                })
            })?;
        let fields = value
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let tag = value.get("tag").and_then(Value::as_str).map(str::to_string);
        let agent_id = value
            .get("agentId")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            action_type,
            fields,
            tag,
            agent_id,
        })
    }
}

/// Dispatches an action sub-type to the contact/conversation collaborators.
/// Collaborator failures follow the node's `error` edge when declared.
pub struct ActionHandler {
    contacts: Arc<dyn ContactService>,
    conversations: Arc<dyn ConversationService>,
}

impl ActionHandler {
    pub fn new(contacts: Arc<dyn ContactService>, conversations: Arc<dyn ConversationService>) -> Self {
        Self {
            contacts,
            conversations,
        }
    }

    async fn run_action(&self, params: &ActionParams, ctx: &HandlerContext) -> Result<(), FlowError> {
        match params.action_type {
            ActionType::UpdateContact => {
                let mut fields = Map::new();
                for (key, value) in &params.fields {
                    fields.insert(key.clone(), interpolate_value(value, &ctx.context));
                }
                self.contacts
                    .update_contact(&ctx.tenant_id, &ctx.contact_id, &fields)
                    .await
            }
            ActionType::AddTag => {
                let tag = params.tag.as_deref().ok_or_else(|| {
                    FlowError::new(ErrorCategory::HandlerError, "addTag action requires a tag")
                })?;
                let tag = interpolate(tag, &ctx.context);
                self.conversations
                    .add_tag(&ctx.tenant_id, &ctx.conversation_id, &tag)
                    .await
            }
            ActionType::AssignAgent => {
                let agent_id = params.agent_id.as_deref().ok_or_else(|| {
                    FlowError::new(
                        ErrorCategory::HandlerError,
                        "assignAgent action requires an agentId",
                    )
                })?;
                self.conversations
                    .assign_conversation(&ctx.tenant_id, &ctx.conversation_id, agent_id)
                    .await
            }
        }
    }
}

#[async_trait]
impl NodeHandler for ActionHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let params = ActionParams::parse(&ctx.node.data)?;
        match self.run_action(&params, &ctx).await {
            Ok(()) => Ok(NodeResult::maybe_next(ctx.default_target())),
            Err(error) => {
                tracing::warn!(node_id = %ctx.node.id, %error, "action node failed");
                Ok(route_failure(&ctx, "lastActionError", error.message))
            }
        }
    }
}
