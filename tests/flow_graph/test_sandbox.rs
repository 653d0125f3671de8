mod support;

use botflow::core::flow_graph::sandbox::SandboxAction;
use serde_json::json;
use support::{flow, harness};

#[tokio::test]
async fn cyclic_graph_is_capped_at_one_hundred_steps() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "m1", "type": "message", "data": {"message": "ping"}},
            {"id": "m2", "type": "message", "data": {"message": "pong"}}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "m1"},
            {"id": "e2", "source": "m1", "target": "m2"},
            {"id": "e3", "source": "m2", "target": "m1"}
        ]),
    ));

    let report = h
        .engine
        .test_flow_execution("flow-1", json!({}))
        .await
        .unwrap();

    assert!(!report.success);
    assert!(report.error.unwrap().contains("Maximum iteration limit"));
    assert_eq!(report.steps.len(), 100);
}

#[tokio::test]
async fn linear_dry_run_logs_one_step_per_node() {
    let h = harness();
    h.flows.insert(support::linear_message_flow("flow-1", "hi {{name}}"));

    let report = h
        .engine
        .test_flow_execution("flow-1", json!({}))
        .await
        .unwrap();

    assert!(report.success);
    assert!(report.error.is_none());
    let kinds: Vec<_> = report.steps.iter().map(|s| s.action).collect();
    assert_eq!(
        kinds,
        vec![SandboxAction::Enter, SandboxAction::Execute, SandboxAction::Exit]
    );
    assert_eq!(report.steps[1].node_id, "say");
}

#[tokio::test]
async fn outbound_nodes_fabricate_a_mock_response() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "call", "type": "apiRequest", "data": {
                "url": "https://api.example.com/things",
                "method": "POST"
            }},
            {"id": "say", "type": "message", "data": {"message": "mock={{apiResponse.body.mock}}"}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "call"},
            {"id": "e2", "source": "call", "target": "say"},
            {"id": "e3", "source": "say", "target": "done"}
        ]),
    ));

    let report = h
        .engine
        .test_flow_execution("flow-1", json!({}))
        .await
        .unwrap();

    assert!(report.success);
    // No real call went out.
    assert!(h.http.requests().is_empty());
    assert_eq!(report.steps[1].payload["mockResponse"]["status"], json!(200));
    assert_eq!(report.steps[2].payload["message"], json!("mock=true"));
}

#[tokio::test]
async fn input_nodes_consume_simulated_test_data() {
    let h = harness();
    h.flows.insert(support::email_input_flow("flow-1"));

    let report = h
        .engine
        .test_flow_execution("flow-1", json!({"email": "test@example.com"}))
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.steps[1].payload["value"], json!("test@example.com"));
    assert_eq!(report.steps[2].payload["message"], json!("Saved test@example.com"));
}

#[tokio::test]
async fn branching_nodes_always_take_the_first_edge() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "check", "type": "condition", "data": {
                "rules": [
                    {"id": "r1", "field": "age", "operator": "greaterThan", "value": 18}
                ]
            }},
            {"id": "first", "type": "message", "data": {"message": "first branch"}},
            {"id": "second", "type": "message", "data": {"message": "second branch"}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "check"},
            {"id": "e2", "source": "check", "target": "first", "sourceHandle": "r1"},
            {"id": "e3", "source": "check", "target": "second", "sourceHandle": "default"},
            {"id": "e4", "source": "first", "target": "done"},
            {"id": "e5", "source": "second", "target": "done"}
        ]),
    ));

    // Production would take the default branch for this context; the sandbox
    // deterministically takes the first declared edge instead.
    let report = h
        .engine
        .test_flow_execution("flow-1", json!({}))
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.steps[1].action, SandboxAction::Branch);
    assert_eq!(report.steps[2].node_id, "first");
}
