use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_data_value() -> Value {
    Value::Object(Map::new())
}

/// Publication status of a flow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Draft,
    Active,
    Inactive,
}

/// Immutable-per-version flow definition authored by a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub name: String,
    pub status: FlowStatus,
    pub version: u32,
    pub graph: FlowGraphDef,
    pub trigger: TriggerConfig,
}

/// Raw node/edge lists as stored; compiled into a [`crate::core::flow_graph::FlowGraph`]
/// before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraphDef {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// One step in a flow. `position` is UI layout data and ignored by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default = "default_data_value")]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Closed set of node kinds. Unknown kinds are rejected at deserialization,
/// and a kind without a registered handler is a fatal execution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Start,
    Message,
    Input,
    Condition,
    Delay,
    Action,
    ApiRequest,
    Webhook,
    GoogleSheets,
    UpdateContact,
    AssignConversation,
    TagManagement,
    End,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Message => "message",
            NodeKind::Input => "input",
            NodeKind::Condition => "condition",
            NodeKind::Delay => "delay",
            NodeKind::Action => "action",
            NodeKind::ApiRequest => "apiRequest",
            NodeKind::Webhook => "webhook",
            NodeKind::GoogleSheets => "googleSheets",
            NodeKind::UpdateContact => "updateContact",
            NodeKind::AssignConversation => "assignConversation",
            NodeKind::TagManagement => "tagManagement",
            NodeKind::End => "end",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directed connection between two nodes. `source_handle` tags the edge so
/// branching nodes can pick among several outgoing edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default)]
    pub source_handle: Option<String>,
}

/// How an inbound event selects this flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TriggerConfig {
    Keyword { keywords: Vec<String> },
    Welcome,
    Manual,
    Webhook { conditions: IndexMap<String, Value> },
}

impl TriggerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerConfig::Keyword { .. } => "keyword",
            TriggerConfig::Welcome => "welcome",
            TriggerConfig::Manual => "manual",
            TriggerConfig::Webhook { .. } => "webhook",
        }
    }
}
