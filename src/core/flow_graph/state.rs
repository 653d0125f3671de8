use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Version embedded in persisted execution records.
pub const EXECUTION_FORMAT_VERSION: &str = "1";

fn default_context_value() -> Value {
    Value::Object(Map::new())
}

/// Context key an inbound reply is staged under until an input node consumes it.
pub const LAST_USER_INPUT_KEY: &str = "lastUserInput";

/// Execution status enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[default]
    Running,
    Paused,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Paused => "Paused",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Mutable run record for one flow execution. Mutated exclusively by the
/// executor, one persisted checkpoint per node step; terminal once
/// Completed or Failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowExecution {
    pub format_version: String,
    pub id: Uuid,
    pub flow_id: String,
    /// Fingerprint of the graph this execution started against; a mismatch on
    /// resume means the flow was edited underneath the execution.
    pub flow_fingerprint: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub status: ExecutionStatus,
    pub current_node_id: Option<String>,
    #[serde(default = "default_context_value")]
    pub context: Value,
    #[serde(default)]
    pub execution_path: Vec<String>,
    pub error_message: Option<String>,
    /// Set while a delay node's continuation is outstanding.
    pub resume_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl FlowExecution {
    pub fn new(
        flow_id: String,
        flow_fingerprint: String,
        conversation_id: String,
        contact_id: String,
        start_node_id: String,
        initial_context: Value,
    ) -> Self {
        let context = if initial_context.is_object() {
            initial_context
        } else {
            default_context_value()
        };
        FlowExecution {
            format_version: EXECUTION_FORMAT_VERSION.to_string(),
            id: Uuid::new_v4(),
            flow_id,
            flow_fingerprint,
            conversation_id,
            contact_id,
            status: ExecutionStatus::Running,
            current_node_id: Some(start_node_id.clone()),
            context,
            execution_path: vec![start_node_id],
            error_message: None,
            resume_at: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Read a dotted path out of the execution context.
    pub fn context_value(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.context, path)
    }
}

/// Merge a handler's context patch into the accumulated context. Patch keys
/// win on conflict; a `null` patch value removes the key.
pub fn apply_patch(context: &mut Value, patch: &Value) {
    let (Value::Object(target), Value::Object(source)) = (context, patch) else {
        return;
    };
    for (key, value) in source {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Resolve a `a.b.c` path through nested objects.
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Redact sensitive keys in the given JSON value before persistence.
pub fn redact_value(value: &mut Value, redact_keys: &[String]) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if should_redact(key, redact_keys) {
                    *child = Value::String("[REDACTED]".to_string());
                    continue;
                }
                redact_value(child, redact_keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item, redact_keys);
            }
        }
        _ => {}
    }
}

fn should_redact(key: &str, redact_keys: &[String]) -> bool {
    let key_lower = key.to_lowercase();
    redact_keys
        .iter()
        .any(|pattern| key_lower.contains(&pattern.to_lowercase()))
}
