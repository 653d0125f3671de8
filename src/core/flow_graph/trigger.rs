#![allow(clippy::result_large_err)] // Trigger matching returns FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::executor::FlowEngine;
use crate::core::flow_graph::repository::FlowRepository;
use crate::core::flow_graph::schema::{Flow, TriggerConfig};
use crate::core::flow_graph::state::FlowExecution;
use regex::RegexBuilder;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Inbound signal that may start a flow execution.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A new inbound text message on an existing conversation.
    Message {
        tenant_id: String,
        conversation_id: String,
        contact_id: String,
        text: String,
    },
    /// Fired once when a conversation is first created.
    Welcome {
        tenant_id: String,
        conversation_id: String,
        contact_id: String,
    },
    /// An upstream webhook payload with no conversation association yet.
    Webhook { tenant_id: String, payload: Value },
}

/// What the matcher decided for one inbound event.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A flow matched and an execution was started.
    Started(FlowExecution),
    /// A webhook-triggered flow matched. No execution is started: a webhook
    /// payload has no conversation/contact to run against yet. Resolving or
    /// creating that association is the extension point for callers.
    WebhookMatched { flow_id: String },
    NoMatch,
}

/// Decides which flow, if any, an inbound event starts. At most one flow
/// triggers per event: flows are scanned in stable repository order and the
/// first match wins.
pub struct TriggerMatcher {
    flows: Arc<dyn FlowRepository>,
    engine: FlowEngine,
}

impl TriggerMatcher {
    pub fn new(flows: Arc<dyn FlowRepository>, engine: FlowEngine) -> Self {
        Self { flows, engine }
    }

    pub async fn dispatch(&self, event: InboundEvent) -> Result<TriggerOutcome, FlowError> {
        match event {
            InboundEvent::Message {
                tenant_id,
                conversation_id,
                contact_id,
                text,
            } => {
                let flows = self.flows.list_active_flows(&tenant_id).await?;
                for flow in &flows {
                    let TriggerConfig::Keyword { keywords } = &flow.trigger else {
                        continue;
                    };
                    if let Some(keyword) = match_keyword(keywords, &text) {
                        info!(flow_id = %flow.id, keyword, "keyword trigger matched");
                        let initial_context = json!({
                            "lastInboundMessage": text,
                            "trigger": { "type": "keyword", "keyword": keyword },
                        });
                        let execution = self
                            .engine
                            .start_execution(&flow.id, &conversation_id, &contact_id, initial_context)
                            .await?;
                        return Ok(TriggerOutcome::Started(execution));
                    }
                }
                debug!(tenant_id = %tenant_id, "no keyword trigger matched");
                Ok(TriggerOutcome::NoMatch)
            }
            InboundEvent::Welcome {
                tenant_id,
                conversation_id,
                contact_id,
            } => {
                let flows = self.flows.list_active_flows(&tenant_id).await?;
                for flow in &flows {
                    if matches!(flow.trigger, TriggerConfig::Welcome) {
                        info!(flow_id = %flow.id, "welcome trigger matched");
                        let initial_context = json!({ "trigger": { "type": "welcome" } });
                        let execution = self
                            .engine
                            .start_execution(&flow.id, &conversation_id, &contact_id, initial_context)
                            .await?;
                        return Ok(TriggerOutcome::Started(execution));
                    }
                }
                Ok(TriggerOutcome::NoMatch)
            }
            InboundEvent::Webhook { tenant_id, payload } => {
                let flows = self.flows.list_active_flows(&tenant_id).await?;
                for flow in &flows {
                    if webhook_conditions_match(flow, &payload) {
                        info!(flow_id = %flow.id, "webhook trigger matched");
                        return Ok(TriggerOutcome::WebhookMatched {
                            flow_id: flow.id.clone(),
                        });
                    }
                }
                Ok(TriggerOutcome::NoMatch)
            }
        }
    }
}

/// Case-insensitive keyword match: the trimmed message equals the keyword, or
/// the keyword appears as a whole word inside the message.
fn match_keyword<'a>(keywords: &'a [String], text: &str) -> Option<&'a str> {
    let trimmed = text.trim();
    for keyword in keywords {
        let keyword_trimmed = keyword.trim();
        if keyword_trimmed.is_empty() {
            continue;
        }
        if trimmed.to_lowercase() == keyword_trimmed.to_lowercase() {
            return Some(keyword);
        }
        let pattern = format!(r"\b{}\b", regex::escape(keyword_trimmed));
        let matched = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(text))
            .unwrap_or(false);
        if matched {
            return Some(keyword);
        }
    }
    None
}

/// Every declared condition key must equal the corresponding top-level
/// payload field.
fn webhook_conditions_match(flow: &Flow, payload: &Value) -> bool {
    let TriggerConfig::Webhook { conditions } = &flow.trigger else {
        return false;
    };
    conditions
        .iter()
        .all(|(key, expected)| payload.get(key) == Some(expected))
}
