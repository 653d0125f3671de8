//! Side-effect-free replica of the run loop for authoring-time testing.
//!
//! Nothing here touches the collaborators: messages are logged, outbound
//! calls fabricate a fixed mock response, and record mutations only appear
//! in the step log. Branching nodes always take their first outgoing edge,
//! a documented simplification that keeps dry runs deterministic.

use crate::core::flow_graph::graph::FlowGraph;
use crate::core::flow_graph::interpolate::interpolate;
use crate::core::flow_graph::schema::{Flow, NodeKind};
use crate::core::flow_graph::state::apply_patch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;

/// One structured record per node visited during a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct SandboxStep {
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub node_name: String,
    pub kind: NodeKind,
    pub action: SandboxAction,
    pub payload: Value,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxAction {
    Enter,
    Execute,
    Branch,
    Exit,
}

/// Result of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct SandboxReport {
    pub success: bool,
    pub error: Option<String>,
    pub steps: Vec<SandboxStep>,
}

/// Walks a flow graph without performing side effects, logging one step per
/// node and enforcing a hard iteration cap so cyclic graphs terminate.
pub struct DryRunExecutor {
    max_iterations: usize,
}

impl DryRunExecutor {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub fn run(&self, flow: &Flow, graph: &FlowGraph, test_data: Value) -> SandboxReport {
        let test_data = if test_data.is_object() {
            test_data
        } else {
            json!({})
        };
        let mut context = json!({});
        let mut steps: Vec<SandboxStep> = Vec::new();
        let mut current = graph.start_node().id.clone();
        let mut iterations = 0usize;

        tracing::debug!(flow_id = %flow.id, "starting dry run");
        loop {
            if iterations >= self.max_iterations {
                return SandboxReport {
                    success: false,
                    error: Some(format!(
                        "Maximum iteration limit exceeded ({})",
                        self.max_iterations
                    )),
                    steps,
                };
            }
            iterations += 1;

            let Some(node) = graph.node(&current) else {
                return SandboxReport {
                    success: false,
                    error: Some(format!("node {} not found in flow graph", current)),
                    steps,
                };
            };

            let started = Instant::now();
            let payload = simulate(node.kind, &node.data, &mut context, &test_data);
            let outgoing = graph.outgoing(&current);
            let action = match node.kind {
                NodeKind::Start => SandboxAction::Enter,
                NodeKind::End => SandboxAction::Exit,
                _ if outgoing.len() > 1 => SandboxAction::Branch,
                _ => SandboxAction::Execute,
            };
            steps.push(SandboxStep {
                timestamp: Utc::now(),
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                kind: node.kind,
                action,
                payload,
                duration_ms: started.elapsed().as_millis() as u64,
            });

            if node.kind == NodeKind::End {
                return SandboxReport {
                    success: true,
                    error: None,
                    steps,
                };
            }

            // Deterministic traversal: always the first outgoing edge.
            match outgoing.first() {
                Some(edge) => current = edge.target.clone(),
                None => {
                    return SandboxReport {
                        success: true,
                        error: None,
                        steps,
                    }
                }
            }
        }
    }
}

fn simulate(kind: NodeKind, data: &Value, context: &mut Value, test_data: &Value) -> Value {
    match kind {
        NodeKind::Start => json!({}),
        NodeKind::End => json!({}),
        NodeKind::Message => {
            let template = data
                .get("message")
                .or_else(|| data.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("");
            json!({ "message": interpolate(template, context) })
        }
        NodeKind::Input => {
            let variable = data
                .get("variable")
                .and_then(Value::as_str)
                .unwrap_or("lastInput");
            match test_data
                .get(variable)
                .or_else(|| test_data.get("lastUserInput"))
            {
                Some(value) => {
                    apply_patch(context, &json!({ variable: value.clone() }));
                    json!({ "variable": variable, "value": value })
                }
                None => json!({ "variable": variable, "note": "no test input provided" }),
            }
        }
        NodeKind::Condition => {
            json!({ "note": "dry run always follows the first outgoing edge" })
        }
        NodeKind::Delay => {
            let seconds = data.get("seconds").and_then(Value::as_u64).unwrap_or(0);
            json!({ "seconds": seconds, "skipped": true })
        }
        NodeKind::ApiRequest | NodeKind::Webhook | NodeKind::GoogleSheets => {
            let variable = data
                .get("responseVariable")
                .and_then(Value::as_str)
                .unwrap_or(if kind == NodeKind::GoogleSheets {
                    "sheetsResponse"
                } else {
                    "apiResponse"
                });
            let mock = json!({ "status": 200, "body": { "mock": true } });
            apply_patch(context, &json!({ variable: mock.clone() }));
            json!({ "mockResponse": mock })
        }
        NodeKind::Action => {
            json!({ "actionType": data.get("actionType").cloned().unwrap_or(Value::Null), "simulated": true })
        }
        NodeKind::UpdateContact => {
            json!({ "fields": data.get("fields").cloned().unwrap_or(Value::Null), "simulated": true })
        }
        NodeKind::AssignConversation => {
            json!({ "agentId": data.get("agentId").cloned().unwrap_or(Value::Null), "simulated": true })
        }
        NodeKind::TagManagement => {
            json!({ "tags": data.get("tags").or_else(|| data.get("tag")).cloned().unwrap_or(Value::Null), "simulated": true })
        }
    }
}
