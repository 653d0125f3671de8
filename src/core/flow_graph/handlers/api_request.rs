#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::{HttpClient, OutboundRequest};
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::handlers::route_failure;
use crate::core::flow_graph::interpolate::{interpolate, interpolate_value};
use crate::core::flow_graph::schema::NodeKind;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct RequestParams {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    response_variable: String,
}

impl RequestParams {
    fn parse(value: &Value) -> Result<Self, FlowError> {
        let url = value
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                FlowError::new(
                    ErrorCategory::HandlerError,
                    "apiRequest node requires a non-empty url",
                )
            })?
            .to_string();
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_string();
        let headers = value
            .get("headers")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(name, v)| v.as_str().map(|v| (name.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let body = value.get("body").filter(|b| !b.is_null()).cloned();
        let response_variable = value
            .get("responseVariable")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("apiResponse")
            .to_string();
        Ok(Self {
            method,
            url,
            headers,
            body,
            response_variable,
        })
    }
}

/// Performs an outbound HTTP call with URL/header/body interpolation. A
/// delivered response is stored under the configured variable; failures
/// (transport errors and non-2xx statuses) follow the `error` edge when one
/// is declared, otherwise the default edge with the error noted in context.
/// Serves both the apiRequest and the outbound webhook node kinds.
pub struct ApiRequestHandler {
    kind: NodeKind,
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl ApiRequestHandler {
    pub fn new(kind: NodeKind, http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        debug_assert!(matches!(kind, NodeKind::ApiRequest | NodeKind::Webhook));
        Self {
            kind,
            http,
            timeout,
        }
    }

    fn success_target(ctx: &HandlerContext) -> Option<String> {
        ctx.target_for_handle("success").or_else(|| ctx.default_target())
    }
}

#[async_trait]
impl NodeHandler for ApiRequestHandler {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let params = RequestParams::parse(&ctx.node.data)?;
        let request = OutboundRequest {
            method: params.method.clone(),
            url: interpolate(&params.url, &ctx.context),
            headers: params
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), interpolate(value, &ctx.context)))
                .collect(),
            body: params.body.as_ref().map(|b| interpolate_value(b, &ctx.context)),
            timeout: self.timeout,
        };

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                let mut patch = serde_json::Map::new();
                patch.insert(
                    params.response_variable,
                    json!({ "status": response.status, "body": response.body }),
                );
                Ok(NodeResult::maybe_next(Self::success_target(&ctx))
                    .with_patch(Value::Object(patch)))
            }
            Ok(response) => {
                let message = format!("request returned status {}", response.status);
                tracing::warn!(node_id = %ctx.node.id, status = response.status, "outbound request failed");
                Ok(route_failure(&ctx, "lastApiError", message))
            }
            Err(error) => {
                tracing::warn!(node_id = %ctx.node.id, %error, "outbound request failed");
                Ok(route_failure(&ctx, "lastApiError", error.message))
            }
        }
    }
}
