mod support;

use botflow::core::config::EngineConfig;
use botflow::core::flow_graph::collaborators::ReqwestHttpClient;
use botflow::core::flow_graph::state::ExecutionStatus;
use serde_json::json;
use std::sync::Arc;
use support::{flow, harness, harness_with_http};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_flow(url: &str) -> botflow::core::flow_graph::schema::Flow {
    flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "call", "type": "apiRequest", "data": {
                "url": url,
                "method": "POST",
                "body": {"contact": "{{contact.name}}"}
            }},
            {"id": "ok", "type": "message", "data": {"message": "status {{apiResponse.status}}"}},
            {"id": "oops", "type": "message", "data": {"message": "failed: {{lastApiError}}"}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "call"},
            {"id": "e2", "source": "call", "target": "ok", "sourceHandle": "success"},
            {"id": "e3", "source": "call", "target": "oops", "sourceHandle": "error"},
            {"id": "e4", "source": "ok", "target": "done"},
            {"id": "e5", "source": "oops", "target": "done"}
        ]),
    )
}

#[tokio::test]
async fn api_request_stores_response_and_follows_success_edge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({"contact": "Ada"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let http = Arc::new(ReqwestHttpClient::new().unwrap());
    let h = harness_with_http(EngineConfig::default(), http, None);
    h.flows.insert(api_flow(&format!("{}/hook", server.uri())));

    let execution = h
        .engine
        .start_execution(
            "flow-1",
            "conv-1",
            "contact-1",
            json!({"contact": {"name": "Ada"}}),
        )
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(
        execution.context_value("apiResponse.body.ok"),
        Some(&json!(true))
    );
    assert_eq!(h.messaging.sent()[0].1, "status 200");
}

#[tokio::test]
async fn non_success_status_follows_the_error_edge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let http = Arc::new(ReqwestHttpClient::new().unwrap());
    let h = harness_with_http(EngineConfig::default(), http, None);
    h.flows.insert(api_flow(&format!("{}/hook", server.uri())));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    // A failed request is a modeled failure, not a fatal one.
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(h.messaging.sent()[0].1, "failed: request returned status 500");
}

#[tokio::test]
async fn transport_failure_without_error_edge_continues_on_default_edge() {
    let h = harness();
    h.http.push_transport_error("connection refused");
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "call", "type": "apiRequest", "data": {
                "url": "https://api.example.com/things"
            }},
            {"id": "after", "type": "message", "data": {"message": "carried on"}},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "call"},
            {"id": "e2", "source": "call", "target": "after"},
            {"id": "e3", "source": "after", "target": "done"}
        ]),
    ));

    let execution = h
        .engine
        .start_execution("flow-1", "conv-1", "contact-1", json!({}))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(
        execution.context_value("lastApiError"),
        Some(&json!("connection refused"))
    );
    assert_eq!(h.messaging.sent()[0].1, "carried on");
}

#[tokio::test]
async fn url_and_headers_are_interpolated_against_context() {
    let h = harness();
    h.http.push_response(200, json!({"found": true}));
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "call", "type": "apiRequest", "data": {
                "url": "https://api.example.com/users/{{userId}}",
                "headers": {"Authorization": "Bearer {{apiKey}}"},
                "responseVariable": "userLookup"
            }},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "call"},
            {"id": "e2", "source": "call", "target": "done"}
        ]),
    ));

    let execution = h
        .engine
        .start_execution(
            "flow-1",
            "conv-1",
            "contact-1",
            json!({"userId": 42, "apiKey": "k-123"}),
        )
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let requests = h.http.requests();
    assert_eq!(requests[0].url, "https://api.example.com/users/42");
    assert_eq!(
        requests[0].headers[0],
        ("Authorization".to_string(), "Bearer k-123".to_string())
    );
    assert_eq!(
        execution.context_value("userLookup.body.found"),
        Some(&json!(true))
    );
}

#[tokio::test]
async fn google_sheets_appends_through_the_http_collaborator() {
    let h = harness();
    h.http.push_response(200, json!({"updates": 1}));
    h.flows.insert(flow(
        "flow-1",
        json!([
            {"id": "start", "type": "start"},
            {"id": "log", "type": "googleSheets", "data": {
                "spreadsheetId": "sheet-9",
                "range": "Leads!A1",
                "values": ["{{contact.name}}", "{{contact.email}}"]
            }},
            {"id": "done", "type": "end"}
        ]),
        json!([
            {"id": "e1", "source": "start", "target": "log"},
            {"id": "e2", "source": "log", "target": "done"}
        ]),
    ));

    let execution = h
        .engine
        .start_execution(
            "flow-1",
            "conv-1",
            "contact-1",
            json!({"contact": {"name": "Ada", "email": "ada@example.com"}}),
        )
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let requests = h.http.requests();
    assert!(requests[0].url.ends_with("/sheet-9/values/Leads!A1:append"));
    assert_eq!(
        requests[0].body,
        Some(json!({"values": [["Ada", "ada@example.com"]]}))
    );
    assert_eq!(
        execution.context_value("sheetsResponse.status"),
        Some(&json!(200))
    );
}
