mod support;

use botflow::core::flow_graph::state::ExecutionStatus;
use serde_json::json;
use support::{email_input_flow, flow, harness};

#[tokio::test]
async fn input_node_pauses_until_input_arrives() {
    let h = harness();
    h.flows.insert(email_input_flow("flow-1"));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Paused);
    assert_eq!(execution.current_node_id.as_deref(), Some("ask"));
    assert!(h.messaging.sent().is_empty());
}

#[tokio::test]
async fn invalid_reply_loops_in_place_then_valid_reply_proceeds() {
    let h = harness();
    h.flows.insert(email_input_flow("flow-1"));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    // First reply fails validation: the error message goes out and the
    // execution stays paused on the same node.
    let after_invalid = h
        .engine
        .resume_execution(execution.id, "not-an-email")
        .await
        .unwrap();
    assert_eq!(after_invalid.status, ExecutionStatus::Paused);
    assert_eq!(after_invalid.current_node_id.as_deref(), Some("ask"));
    assert_eq!(
        h.messaging.sent(),
        vec![(
            "conv-1".to_string(),
            "Please enter a valid email address.".to_string()
        )]
    );

    // Second reply passes: variable stored, flow continues to completion.
    let after_valid = h
        .engine
        .resume_execution(execution.id, "a@b.com")
        .await
        .unwrap();
    assert_eq!(after_valid.status, ExecutionStatus::Completed);
    assert_eq!(after_valid.context_value("email"), Some(&json!("a@b.com")));
    assert_eq!(after_valid.context_value("lastUserInput"), None);
    assert_eq!(h.messaging.sent()[1].1, "Saved a@b.com");
}

#[tokio::test]
async fn validation_retries_are_unbounded() {
    let h = harness();
    h.flows.insert(email_input_flow("flow-1"));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    // No retry cap: every bad reply keeps the execution paused on the node.
    for attempt in 0..5 {
        let paused = h
            .engine
            .resume_execution(execution.id, &format!("bad-{}", attempt))
            .await
            .unwrap();
        assert_eq!(paused.status, ExecutionStatus::Paused);
    }
    let done = h
        .engine
        .resume_execution(execution.id, "a@b.com")
        .await
        .unwrap();
    assert_eq!(done.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn input_without_validation_stores_under_default_variable() {
    let h = harness();
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "ask", "type": "input", "data": {}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "ask"},
            {"id": "e2", "source": "ask", "target": "done"}
        ]),
    ));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();
    let done = h
        .engine
        .resume_execution(execution.id, "whatever the user said")
        .await
        .unwrap();

    assert_eq!(done.status, ExecutionStatus::Completed);
    assert_eq!(
        done.context_value("lastInput"),
        Some(&json!("whatever the user said"))
    );
}
