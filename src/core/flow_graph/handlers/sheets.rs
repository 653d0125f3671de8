#![allow(clippy::result_large_err)] // Handler param parsing returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::{HttpClient, OutboundRequest};
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::handlers::route_failure;
use crate::core::flow_graph::interpolate::interpolate;
use crate::core::flow_graph::schema::NodeKind;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct SheetsParams {
    spreadsheet_id: String,
    range: String,
    values: Vec<Value>,
}

impl SheetsParams {
    fn parse(value: &Value) -> Result<Self, FlowError> {
        let spreadsheet_id = value
            .get("spreadsheetId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                FlowError::new(
                    ErrorCategory::HandlerError,
                    "googleSheets node requires a spreadsheetId",
                )
            })?
            .to_string();
        let range = value
            .get("range")
            .and_then(Value::as_str)
            .unwrap_or("A1")
            .to_string();
        let values = value
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Self {
            spreadsheet_id,
            range,
            values,
        })
    }
}

/// Appends a row to a spreadsheet through the HTTP collaborator. Cell values
/// are interpolated against context; the failure policy matches apiRequest.
pub struct GoogleSheetsHandler {
    http: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl GoogleSheetsHandler {
    pub fn new(http: Arc<dyn HttpClient>, base_url: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl NodeHandler for GoogleSheetsHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::GoogleSheets
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        let params = SheetsParams::parse(&ctx.node.data)?;
        let spreadsheet_id = interpolate(&params.spreadsheet_id, &ctx.context);
        let range = interpolate(&params.range, &ctx.context);
        let row: Vec<Value> = params
            .values
            .iter()
            .map(|cell| match cell {
                Value::String(s) => Value::String(interpolate(s, &ctx.context)),
                other => other.clone(),
            })
            .collect();

        let request = OutboundRequest {
            method: "POST".to_string(),
            url: format!(
                "{}/{}/values/{}:append",
                self.base_url.trim_end_matches('/'),
                spreadsheet_id,
                range
            ),
            headers: Vec::new(),
            body: Some(json!({ "values": [row] })),
            timeout: self.timeout,
        };

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                let mut patch = serde_json::Map::new();
                patch.insert(
                    "sheetsResponse".to_string(),
                    json!({ "status": response.status, "body": response.body }),
                );
                Ok(NodeResult::maybe_next(ctx.default_target()).with_patch(Value::Object(patch)))
            }
            Ok(response) => {
                let message = format!("sheets append returned status {}", response.status);
                Ok(route_failure(&ctx, "lastSheetsError", message))
            }
            Err(error) => {
                tracing::warn!(node_id = %ctx.node.id, %error, "sheets append failed");
                Ok(route_failure(&ctx, "lastSheetsError", error.message))
            }
        }
    }
}
