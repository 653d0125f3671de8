mod support;

use botflow::core::flow_graph::graph::{validate_graph, FlowGraph, GraphError};
use botflow::core::types::ErrorCategory;
use serde_json::json;
use support::{flow, harness};

#[tokio::test]
async fn start_execution_without_start_node_fails_and_creates_no_record() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([{"id": "say", "type": "message", "data": {"message": "hi"}}]),
        json!([]),
    ));

    let err = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .expect_err("graph without start must be rejected");

    assert_eq!(err.category, ErrorCategory::FlowInvalid);
    assert!(h.executions.is_empty());
}

#[tokio::test]
async fn dangling_edge_is_rejected_before_start() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([{"id": "start", "type": "start"}]),
        json!([{"id": "e1", "source": "start", "target": "ghost"}]),
    ));

    let err = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .expect_err("dangling edge must be rejected");

    assert_eq!(err.category, ErrorCategory::FlowInvalid);
    assert!(err.message.contains("ghost"));
    assert!(h.executions.is_empty());
}

#[tokio::test]
async fn duplicate_node_ids_are_rejected() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "start", "type": "end"}
        ]),
        json!([]),
    ));

    let err = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .expect_err("duplicate node ids must be rejected");
    assert_eq!(err.category, ErrorCategory::FlowInvalid);
}

#[tokio::test]
async fn unknown_flow_is_flow_not_found() {
    let h = harness();
    let err = h
        .engine
        .start_execution("missing", "conv-1", "contact-1", json!({}))
        .await
        .expect_err("unknown flow id");
    assert_eq!(err.category, ErrorCategory::FlowNotFound);
}

#[test]
fn unreachable_nodes_are_lint_findings_only() {
    let def = serde_json::from_value(json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "done", "type": "end"},
            {"id": "island", "type": "message", "data": {"message": "hi"}}
        ],
        "edges": [{"id": "e1", "source": "start", "target": "done"}]
    }))
    .unwrap();

    let findings = validate_graph(&def);
    assert_eq!(findings, vec![GraphError::UnreachableNode("island".into())]);
    assert!(findings.iter().all(|f| !f.is_blocking()));
    assert!(FlowGraph::compile(&def).is_ok());
}

#[test]
fn fingerprint_changes_when_graph_changes() {
    let def_a = serde_json::from_value(json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "done", "type": "end"}
        ],
        "edges": [{"id": "e1", "source": "start", "target": "done"}]
    }))
    .unwrap();
    let def_b = serde_json::from_value(json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "say", "type": "message", "data": {"message": "hi"}},
            {"id": "done", "type": "end"}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "say"},
            {"id": "e2", "source": "say", "target": "done"}
        ]
    }))
    .unwrap();

    let a = FlowGraph::compile(&def_a).unwrap();
    let b = FlowGraph::compile(&def_b).unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
}
