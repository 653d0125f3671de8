#![allow(dead_code)]

use botflow::core::config::EngineConfig;
use botflow::core::flow_graph::collaborators::HttpClient;
use botflow::core::flow_graph::handler::HandlerRegistry;
use botflow::core::flow_graph::handlers::{register_builtins, BuiltinHandlerDeps};
use botflow::core::flow_graph::memory::{
    InMemoryExecutionRepository, InMemoryFlowRepository, RecordingContactService,
    RecordingConversationService, RecordingMessagingService, ScriptedHttpClient,
};
use botflow::core::flow_graph::schema::Flow;
use botflow::core::flow_graph::FlowEngine;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct TestHarness {
    pub engine: FlowEngine,
    pub flows: Arc<InMemoryFlowRepository>,
    pub executions: Arc<InMemoryExecutionRepository>,
    pub messaging: Arc<RecordingMessagingService>,
    pub contacts: Arc<RecordingContactService>,
    pub conversations: Arc<RecordingConversationService>,
    pub http: Arc<ScriptedHttpClient>,
}

pub fn harness() -> TestHarness {
    harness_with_config(EngineConfig::default())
}

pub fn harness_with_config(config: EngineConfig) -> TestHarness {
    let http = Arc::new(ScriptedHttpClient::new());
    harness_with_http(config, http.clone(), Some(http))
}

/// Harness wired against an arbitrary HTTP collaborator (e.g. the reqwest
/// client pointed at a wiremock server). The scripted client handle is kept
/// only when it is the one in use.
pub fn harness_with_http(
    config: EngineConfig,
    http: Arc<dyn HttpClient>,
    scripted: Option<Arc<ScriptedHttpClient>>,
) -> TestHarness {
    let flows = Arc::new(InMemoryFlowRepository::new());
    let executions = Arc::new(InMemoryExecutionRepository::new());
    let messaging = Arc::new(RecordingMessagingService::new());
    let contacts = Arc::new(RecordingContactService::new());
    let conversations = Arc::new(RecordingConversationService::new());

    let deps = BuiltinHandlerDeps {
        messaging: messaging.clone(),
        contacts: contacts.clone(),
        conversations: conversations.clone(),
        http,
    };
    let mut builder = HandlerRegistry::builder();
    register_builtins(&mut builder, &config, deps);
    let registry = builder.build();

    let engine = FlowEngine::new(flows.clone(), executions.clone(), registry, config)
        .expect("engine config is valid");

    TestHarness {
        engine,
        flows,
        executions,
        messaging,
        contacts,
        conversations,
        http: scripted.unwrap_or_else(|| Arc::new(ScriptedHttpClient::new())),
    }
}

/// Build a flow from JSON fragments, defaulting to a manual trigger.
pub fn flow(id: &str, nodes: Value, edges: Value) -> Flow {
    flow_with_trigger(id, json!({"type": "manual"}), nodes, edges)
}

pub fn flow_with_trigger(id: &str, trigger: Value, nodes: Value, edges: Value) -> Flow {
    serde_json::from_value(json!({
        "id": id,
        "tenantId": "tenant-1",
        "name": format!("flow {}", id),
        "status": "active",
        "version": 1,
        "graph": { "nodes": nodes, "edges": edges },
        "trigger": trigger,
    }))
    .expect("test flow json is well-formed")
}

/// start -> message -> end, with the message template configurable.
pub fn linear_message_flow(id: &str, template: &str) -> Flow {
    flow(
        id,
        json!([
            {"id": "start", "type": "start"},
            {"id": "say", "type": "message", "data": {"message": template}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "say"},
            {"id": "e2", "source": "say", "target": "done"}
        ]),
    )
}

/// start -> input(email validation) -> message -> end.
pub fn email_input_flow(id: &str) -> Flow {
    flow(
        id,
        json!([
            {"id": "start", "type": "start"},
            {"id": "ask", "type": "input", "data": {
                "variable": "email",
                "validationType": "email",
                "errorMessage": "Please enter a valid email address."
            }},
            {"id": "thanks", "type": "message", "data": {"message": "Saved {{email}}"}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "ask"},
            {"id": "e2", "source": "ask", "target": "thanks"},
            {"id": "e3", "source": "thanks", "target": "done"}
        ]),
    )
}
