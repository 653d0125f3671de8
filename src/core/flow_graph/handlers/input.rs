#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::MessagingService;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::interpolate::interpolate;
use crate::core::flow_graph::schema::NodeKind;
use crate::core::flow_graph::state::{resolve_path, LAST_USER_INPUT_KEY};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

/// Declared validation applied to a reply before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Email,
    Phone,
    Number,
    Url,
}

impl ValidationKind {
    fn accepts(&self, input: &str) -> bool {
        match self {
            ValidationKind::Email => email_pattern().is_match(input),
            ValidationKind::Phone => phone_pattern().is_match(input),
            ValidationKind::Number => input.trim().parse::<f64>().is_ok(),
            ValidationKind::Url => url::Url::parse(input.trim()).is_ok(),
        }
    }

    fn fallback_error_message(&self) -> &'static str {
        match self {
            ValidationKind::Email => "Please enter a valid email address.",
            ValidationKind::Phone => "Please enter a valid phone number.",
            ValidationKind::Number => "Please enter a number.",
            ValidationKind::Url => "Please enter a valid URL.",
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9 ().-]{7,20}$").expect("phone pattern"))
}

struct InputParams {
    variable: String,
    validation: Option<ValidationKind>,
    error_message: Option<String>,
}

impl InputParams {
    fn parse(value: &Value) -> Result<Self, FlowError> {
        let variable = value
            .get("variable")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("lastInput")
            .to_string();
        let validation = match value.get("validationType").or_else(|| value.get("validation")) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value(raw.clone()).map_err(|_| {
                FlowError::new(
                    crate::core::types::ErrorCategory::HandlerError,
                    format!("input node has unsupported validationType: {}", raw),
                )
            })?),
        };
        let error_message = value
            .get("errorMessage")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            variable,
            validation,
            error_message,
        })
    }
}

/// Consumes `lastUserInput` from context. Absent input pauses the execution;
/// a reply failing validation sends the configured error message and pauses
/// again on the same node. There is deliberately no retry cap: the user may
/// correct themselves indefinitely.
pub struct InputHandler {
    messaging: Arc<dyn MessagingService>,
}

impl InputHandler {
    pub fn new(messaging: Arc<dyn MessagingService>) -> Self {
        Self { messaging }
    }
}

#[async_trait]
impl NodeHandler for InputHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Input
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let params = InputParams::parse(&ctx.node.data)?;

        let Some(raw) = resolve_path(&ctx.context, LAST_USER_INPUT_KEY) else {
            return Ok(NodeResult::wait());
        };
        let input = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        if let Some(validation) = params.validation {
            if !validation.accepts(&input) {
                let template = params
                    .error_message
                    .as_deref()
                    .unwrap_or_else(|| validation.fallback_error_message());
                let text = interpolate(template, &ctx.context);
                self.messaging
                    .send_outbound_message(&ctx.conversation_id, &text)
                    .await?;
                return Ok(
                    NodeResult::wait().with_patch(json!({ LAST_USER_INPUT_KEY: Value::Null }))
                );
            }
        }

        let mut patch = serde_json::Map::new();
        patch.insert(params.variable, Value::String(input));
        patch.insert(LAST_USER_INPUT_KEY.to_string(), Value::Null);
        Ok(NodeResult::maybe_next(ctx.default_target()).with_patch(Value::Object(patch)))
    }
}
