mod support;

use botflow::core::flow_graph::schema::NodeKind;
use botflow::core::flow_graph::state::ExecutionStatus;
use chrono::Utc;
use serde_json::json;
use support::{flow, harness, linear_message_flow};

fn delayed_flow(id: &str, seconds: u64) -> botflow::core::flow_graph::schema::Flow {
    flow(
        id,
        json!([
            {"id": "start", "type": "start"},
            {"id": "wait", "type": "delay", "data": {"seconds": seconds}},
            {"id": "say", "type": "message", "data": {"message": "after the wait"}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "wait"},
            {"id": "e2", "source": "wait", "target": "say"},
            {"id": "e3", "source": "say", "target": "done"}
        ]),
    )
}

#[tokio::test]
async fn delay_parks_the_execution_without_blocking() {
    let h = harness();
    h.flows.insert(delayed_flow("flow-1", 3600));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    // The loop returned instead of sleeping: still RUNNING, parked on the
    // node after the delay, with a wake-up time recorded.
    assert_eq!(execution.status, ExecutionStatus::Running);
    assert_eq!(execution.current_node_id.as_deref(), Some("say"));
    assert!(execution.resume_at.is_some());
    assert!(h.messaging.sent().is_empty());
}

#[tokio::test]
async fn due_continuation_sweep_resumes_elapsed_delays() {
    let h = harness();
    h.flows.insert(delayed_flow("flow-1", 3600));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    // Not due yet.
    let resumed = h.engine.run_due_continuations(Utc::now()).await.unwrap();
    assert!(resumed.is_empty());

    // Pretend an hour passed (e.g. after a process restart).
    let later = Utc::now() + chrono::Duration::seconds(3700);
    let resumed = h.engine.run_due_continuations(later).await.unwrap();
    assert_eq!(resumed, vec![execution.id]);

    let done = h.engine.get_execution(execution.id).await.unwrap();
    assert_eq!(done.status, ExecutionStatus::Completed);
    assert_eq!(h.messaging.sent()[0].1, "after the wait");
}

#[tokio::test]
async fn short_delay_resumes_via_the_in_process_timer() {
    let h = harness();
    h.flows.insert(delayed_flow("flow-1", 1));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Running);

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let done = h.engine.get_execution(execution.id).await.unwrap();
    assert_eq!(done.status, ExecutionStatus::Completed);
    assert_eq!(h.messaging.sent()[0].1, "after the wait");
}

#[tokio::test]
async fn cancelled_execution_is_not_resumed_by_the_sweep() {
    let h = harness();
    h.flows.insert(delayed_flow("flow-1", 3600));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();
    h.engine.cancel_execution(execution.id).await.unwrap();

    let later = Utc::now() + chrono::Duration::seconds(3700);
    let resumed = h.engine.run_due_continuations(later).await.unwrap();
    assert!(resumed.is_empty());

    let cancelled = h.engine.get_execution(execution.id).await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn replay_renders_the_visited_path_against_the_graph() {
    let h = harness();
    h.flows.insert(linear_message_flow("flow-1", "hello"));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    let replay = h.engine.get_execution_replay(execution.id).await.unwrap();
    assert_eq!(replay.execution_id, execution.id);
    assert_eq!(replay.status, ExecutionStatus::Completed);

    let ids: Vec<_> = replay.steps.iter().map(|s| s.node_id.as_str()).collect();
    assert_eq!(ids, vec!["start", "say", "done"]);
    assert_eq!(replay.steps[0].kind, Some(NodeKind::Start));
    assert_eq!(replay.steps[2].kind, Some(NodeKind::End));
    assert_eq!(
        replay.steps.iter().map(|s| s.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}
