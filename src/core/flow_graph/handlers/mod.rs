pub mod action;
pub mod api_request;
pub mod condition;
pub mod contact;
pub mod conversation;
pub mod delay;
pub mod end;
pub mod input;
pub mod message;
pub mod sheets;
pub mod start;
pub mod tags;

use crate::core::config::EngineConfig;
use crate::core::flow_graph::collaborators::{
    ContactService, ConversationService, HttpClient, MessagingService,
};
use crate::core::flow_graph::handler::{HandlerContext, HandlerRegistryBuilder, NodeResult};
use crate::core::flow_graph::schema::NodeKind;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators injected into the built-in handlers.
#[derive(Clone)]
pub struct BuiltinHandlerDeps {
    pub messaging: Arc<dyn MessagingService>,
    pub contacts: Arc<dyn ContactService>,
    pub conversations: Arc<dyn ConversationService>,
    pub http: Arc<dyn HttpClient>,
}

/// Register built-in handlers into the supplied builder.
pub fn register_builtins(
    builder: &mut HandlerRegistryBuilder,
    config: &EngineConfig,
    deps: BuiltinHandlerDeps,
) {
    let http_timeout = Duration::from_secs(config.http_timeout_seconds);
    builder
        .register(start::StartHandler)
        .register(end::EndHandler)
        .register(message::MessageHandler::new(deps.messaging.clone()))
        .register(input::InputHandler::new(deps.messaging.clone()))
        .register(condition::ConditionHandler)
        .register(delay::DelayHandler::new(Duration::from_secs(
            config.max_delay_seconds,
        )))
        .register(action::ActionHandler::new(
            deps.contacts.clone(),
            deps.conversations.clone(),
        ))
        .register(api_request::ApiRequestHandler::new(
            NodeKind::ApiRequest,
            deps.http.clone(),
            http_timeout,
        ))
        .register(api_request::ApiRequestHandler::new(
            NodeKind::Webhook,
            deps.http.clone(),
            http_timeout,
        ))
        .register(sheets::GoogleSheetsHandler::new(
            deps.http,
            config.sheets_base_url.clone(),
            http_timeout,
        ))
        .register(contact::UpdateContactHandler::new(deps.contacts))
        .register(conversation::AssignConversationHandler::new(
            deps.conversations.clone(),
        ))
        .register(tags::TagManagementHandler::new(deps.conversations));
}

/// Shared failure routing for side-effecting nodes: follow the `error` edge
/// when the author declared one, otherwise record the failure in context and
/// continue along the default edge. A modeled failure alone never kills the
/// execution.
pub(crate) fn route_failure(ctx: &HandlerContext, error_key: &str, message: String) -> NodeResult {
    let patch = json!({ error_key: message });
    match ctx.target_for_handle("error") {
        Some(target) => NodeResult::next(target).with_patch(patch),
        None => NodeResult::maybe_next(ctx.default_target()).with_patch(patch),
    }
}
