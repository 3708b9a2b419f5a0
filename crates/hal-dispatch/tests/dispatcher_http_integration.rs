use std::net::TcpListener;
use std::time::Duration;

use hal_dispatch::{
    CancellationToken, DispatchError, DispatchOutcome, Dispatcher, DispatcherConfig, Endpoints,
    UploadFile,
};
use hal_dmr::{codec, ModelNode, Operation, ResourceAddress};
use httpmock::prelude::*;

fn dispatcher_for(server: &MockServer) -> Dispatcher {
    let config = DispatcherConfig {
        endpoints: Endpoints::from_base_url(&server.base_url()),
        request_timeout_ms: 5_000,
        ..DispatcherConfig::default()
    };
    Dispatcher::new(config).expect("dispatcher should be created")
}

fn encoded(node: &ModelNode) -> String {
    codec::to_base64(node).expect("encode")
}

fn success(result: impl Into<ModelNode>) -> String {
    encoded(
        &ModelNode::object()
            .with("outcome", "success")
            .with("result", result),
    )
}

fn read_attribute(name: &str) -> Operation {
    Operation::builder("read-attribute", ResourceAddress::root())
        .param("name", name)
        .build()
        .expect("build")
}

#[tokio::test]
async fn post_sends_encoded_operation_with_management_headers() {
    let server = MockServer::start();
    let operation = read_attribute("product-name");
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/management")
            .header("accept", "application/dmr-encoded")
            .header("content-type", "application/dmr-encoded")
            .header("x-management-client-name", "HAL")
            .body(operation.to_base64().expect("encode operation"));
        then.status(200)
            .header("content-type", "application/dmr-encoded")
            .body(success("WildFly Full"));
    });

    let outcome = dispatcher_for(&server).execute(&operation).await;

    mock.assert();
    assert_eq!(outcome, DispatchOutcome::Success(ModelNode::from("WildFly Full")));
}

#[tokio::test]
async fn resource_description_is_read_with_get() {
    let server = MockServer::start();
    let description = ModelNode::object()
        .with("description", "The logging subsystem")
        .with("attributes", ModelNode::object());
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/management/subsystem/logging/logger/org.jboss")
            .query_param("operation", "resource-description")
            .query_param("operations", "true")
            .query_param("recursive", "false")
            .header("x-management-client-name", "HAL");
        then.status(200).body(encoded(&description));
    });

    let operation = Operation::builder(
        "read-resource-description",
        ResourceAddress::parse("/subsystem=logging/logger=org.jboss").expect("address"),
    )
    .param("operations", true)
    .param("recursive", false)
    .param("access-control", "trim-descriptions")
    .build()
    .expect("build");
    let outcome = dispatcher_for(&server).execute(&operation).await;

    mock.assert();
    assert_eq!(outcome.success(), Some(description));
}

#[tokio::test]
async fn failed_outcome_reaches_the_failed_branch_only() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/management");
        then.status(200).body(encoded(
            &ModelNode::object()
                .with("outcome", "failed")
                .with("failure-description", "WFLYCTL0201: Unknown attribute 'nope'"),
        ));
    });

    let outcome = dispatcher_for(&server)
        .execute(&read_attribute("nope"))
        .await;

    assert!(outcome.is_failed());
    assert_eq!(outcome.failure(), Some("WFLYCTL0201: Unknown attribute 'nope'"));
    assert_eq!(outcome.operation().map(Operation::name), Some("read-attribute"));
}

#[tokio::test]
async fn status_codes_map_to_exceptions() {
    let cases = [
        (401, "Authentication required.".to_string()),
        (403, "Authentication required.".to_string()),
        (503, "Service temporarily unavailable. Is the server still booting?".to_string()),
        (500, "Unexpected status code.".to_string()),
        (418, "Unexpected status code.".to_string()),
    ];
    for (status, expected) in cases {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/management");
            then.status(status).body(success(true));
        });

        let outcome = dispatcher_for(&server)
            .execute(&read_attribute("product-name"))
            .await;

        let error = outcome.error().expect("exception expected");
        assert_eq!(error.to_string(), expected, "status {status}");
        assert_eq!(error.status(), Some(status));
    }
}

#[tokio::test]
async fn not_found_names_the_requested_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/management/subsystem/missing");
        then.status(404);
    });
    let operation = Operation::builder(
        "read-resource-description",
        ResourceAddress::parse("/subsystem=missing").expect("address"),
    )
    .build()
    .expect("build");

    let outcome = dispatcher_for(&server).execute(&operation).await;

    let expected_url = format!(
        "{}/management/subsystem/missing?operation=resource-description",
        server.base_url()
    );
    assert_eq!(
        outcome.error().map(ToString::to_string),
        Some(format!("Management interface at '{expected_url}' not found."))
    );
}

#[tokio::test]
async fn undecodable_body_is_a_failure_not_an_exception() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/management");
        then.status(200).body("<html>proxy error</html>");
    });

    let outcome = dispatcher_for(&server)
        .execute(&read_attribute("product-name"))
        .await;

    assert!(outcome.is_failed());
    assert!(outcome
        .failure()
        .is_some_and(|failure| failure.starts_with("Failed to decode response:")));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_communication_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local addr").port()
    };
    let dispatcher = Dispatcher::new(DispatcherConfig {
        endpoints: Endpoints::from_base_url(&format!("http://127.0.0.1:{port}")),
        ..DispatcherConfig::default()
    })
    .expect("dispatcher");

    let outcome = dispatcher.execute(&read_attribute("product-name")).await;

    let error = outcome.error().expect("exception expected");
    assert!(matches!(error, DispatchError::Communication { .. }));
    assert_eq!(error.to_string(), "Communication error.");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/management");
        then.status(200)
            .delay(Duration::from_millis(800))
            .body(success(true));
    });
    let dispatcher = Dispatcher::new(DispatcherConfig {
        endpoints: Endpoints::from_base_url(&server.base_url()),
        request_timeout_ms: 50,
        ..DispatcherConfig::default()
    })
    .expect("dispatcher");

    let outcome = dispatcher.execute(&read_attribute("product-name")).await;

    assert_eq!(outcome.error(), Some(&DispatchError::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn cancelled_token_aborts_the_call() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/management");
        then.status(200)
            .delay(Duration::from_millis(800))
            .body(success(true));
    });
    let token = CancellationToken::new();
    token.cancel();

    let outcome = dispatcher_for(&server)
        .execute_cancellable(&read_attribute("product-name"), &token)
        .await;

    assert_eq!(outcome.error(), Some(&DispatchError::Cancelled));
}

#[tokio::test]
async fn standalone_restart_required_is_published() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/management");
        then.status(200).body(encoded(
            &ModelNode::object()
                .with("outcome", "success")
                .with(
                    "response-headers",
                    ModelNode::object()
                        .with("operation-requires-restart", true)
                        .with("process-state", "restart-required"),
                ),
        ));
    });
    let dispatcher = dispatcher_for(&server);
    let mut process_state = dispatcher.subscribe_process_state();
    let operation = Operation::builder(
        "write-attribute",
        ResourceAddress::parse("/interface=public").expect("address"),
    )
    .param("name", "inet-address")
    .param("value", "0.0.0.0")
    .build()
    .expect("build");

    let outcome = dispatcher.execute(&operation).await;

    assert_eq!(outcome, DispatchOutcome::Success(ModelNode::Undefined));
    let state = process_state.try_recv().expect("process state event");
    assert!(state.restart_required());
    assert!(state.iter().all(|server| server.is_standalone()));
}

#[tokio::test]
async fn upload_posts_multipart_form_and_reads_json() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/management-upload")
            .header("x-management-client-name", "HAL")
            .body_includes("name=\"file\"; filename=\"hello.war\"")
            .body_includes("name=\"operation\"")
            .body_includes(r#"{"operation":"add","address":[{"deployment":"hello.war"}],"enabled":true}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"outcome":"success","result":"deployed"}"#);
    });
    let operation = Operation::builder(
        "add",
        ResourceAddress::parse("/deployment=hello.war").expect("address"),
    )
    .param("enabled", true)
    .build()
    .expect("build");
    let file = UploadFile {
        field_name: "file".to_string(),
        file_name: "hello.war".to_string(),
        content: b"PK\x03\x04".to_vec(),
    };

    let outcome = dispatcher_for(&server).upload(file, &operation).await;

    mock.assert();
    assert_eq!(outcome.success(), Some(ModelNode::from("deployed")));
}

#[tokio::test]
async fn upload_failure_object_uses_the_failure_key() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/management-upload");
        then.status(200).body(
            r#"{"outcome":"failed","failure-description":{"domain-failure-description":"WFLYDC0074: duplicate"}}"#,
        );
    });
    let operation = Operation::builder(
        "add",
        ResourceAddress::parse("/deployment=hello.war").expect("address"),
    )
    .build()
    .expect("build");
    let file = UploadFile {
        field_name: "file".to_string(),
        file_name: "hello.war".to_string(),
        content: Vec::new(),
    };

    let outcome = dispatcher_for(&server).upload(file, &operation).await;

    assert_eq!(outcome.failure(), Some("WFLYDC0074: duplicate"));
}
