#![allow(clippy::result_large_err)] // Collaborator traits return FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// Identifier of a delivered outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

/// Outbound delivery into the conversation subsystem.
#[async_trait]
pub trait MessagingService: Send + Sync + 'static {
    async fn send_outbound_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<MessageId, FlowError>;
}

/// Contact-record mutations.
#[async_trait]
pub trait ContactService: Send + Sync + 'static {
    async fn update_contact(
        &self,
        tenant_id: &str,
        contact_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), FlowError>;
}

/// Conversation-record mutations.
#[async_trait]
pub trait ConversationService: Send + Sync + 'static {
    async fn assign_conversation(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        agent_id: &str,
    ) -> Result<(), FlowError>;

    async fn add_tag(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        tag: &str,
    ) -> Result<(), FlowError>;
}

/// Outbound HTTP request issued by apiRequest/webhook/googleSheets nodes.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Response surface the engine cares about. Transport failures are errors;
/// a delivered non-2xx response is a modeled failure routed to the flow's
/// `error` edge, not an exception.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: u16,
    pub body: Value,
}

impl OutboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Generic outbound request execution with timeout.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    async fn execute(&self, request: OutboundRequest) -> Result<OutboundResponse, FlowError>;
}

/// Production HTTP client backed by reqwest.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, FlowError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            FlowError::new(
                ErrorCategory::InternalError,
                format!("failed to build HTTP client: {}", e),
            )
        })?;
        Ok(ReqwestHttpClient { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: OutboundRequest) -> Result<OutboundResponse, FlowError> {
        let url = url::Url::parse(&request.url).map_err(|e| {
            FlowError::new(
                ErrorCategory::HttpError,
                format!("invalid request URL {}: {}", request.url, e),
            )
            .with_code("FLW-HTTP-001")
        })?;
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                FlowError::new(
                    ErrorCategory::HttpError,
                    format!("invalid HTTP method {}", request.method),
                )
                .with_code("FLW-HTTP-001")
            })?;

        let mut builder = self.client.request(method, url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            FlowError::new(
                ErrorCategory::HttpError,
                format!("request to {} failed: {}", request.url, e),
            )
            .with_code("FLW-HTTP-002")
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            FlowError::new(
                ErrorCategory::HttpError,
                format!("failed to read response body: {}", e),
            )
            .with_code("FLW-HTTP-002")
        })?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(OutboundResponse { status, body })
    }
}
