use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hal_dispatch::transport::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use hal_dispatch::{
    DispatchCallbacks, DispatchOutcome, Dispatcher, DispatcherConfig, ProcessState, ServerState,
    State, Transport, TransportError,
};
use hal_dmr::{codec, Composite, ModelNode, Operation, ResourceAddress};
use tokio::sync::{oneshot, Mutex as AsyncMutex};

/// In-memory standalone server keeping attributes per address.
struct FakeManagementServer {
    attributes: AsyncMutex<HashMap<String, ModelNode>>,
    reload_required: AsyncMutex<bool>,
    seen: AsyncMutex<Vec<(HttpMethod, String)>>,
}

impl FakeManagementServer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attributes: AsyncMutex::new(HashMap::new()),
            reload_required: AsyncMutex::new(false),
            seen: AsyncMutex::new(Vec::new()),
        })
    }

    async fn execute(&self, envelope: &ModelNode) -> ModelNode {
        if envelope.get("operation").and_then(ModelNode::as_str) != Some("composite") {
            return self.execute_step(envelope).await;
        }
        let mut result = ModelNode::object();
        let steps = envelope
            .get("steps")
            .and_then(ModelNode::as_list)
            .unwrap_or_default();
        for (index, step) in steps.iter().enumerate() {
            let response = self.execute_step(step).await;
            result.insert(&format!("step-{}", index + 1), response);
        }
        self.success(result).await
    }

    async fn execute_step(&self, envelope: &ModelNode) -> ModelNode {
        let Ok(operation) = Operation::try_from(envelope) else {
            return failed("WFLYCTL0030: No resource definition is registered");
        };
        let key = operation.address().to_string();
        let name = operation
            .parameter("name")
            .map(ModelNode::as_string)
            .unwrap_or_default();
        match operation.name() {
            "write-attribute" => {
                let value = operation.parameter("value").cloned().unwrap_or_default();
                self.attributes
                    .lock()
                    .await
                    .entry(key)
                    .or_insert_with(ModelNode::object)
                    .insert(&name, value);
                *self.reload_required.lock().await = true;
                self.success(ModelNode::Undefined).await
            }
            "read-attribute" => {
                let value = self
                    .attributes
                    .lock()
                    .await
                    .get(&key)
                    .and_then(|resource| resource.get(&name))
                    .cloned();
                match value {
                    Some(value) => self.success(value).await,
                    None => failed(&format!("WFLYCTL0201: Unknown attribute '{name}'")),
                }
            }
            other => failed(&format!("WFLYCTL0031: No operation named '{other}' exists")),
        }
    }

    async fn success(&self, result: ModelNode) -> ModelNode {
        let mut envelope = ModelNode::object()
            .with("outcome", "success")
            .with("result", result);
        if *self.reload_required.lock().await {
            envelope.insert(
                "response-headers",
                ModelNode::object().with("process-state", "reload-required"),
            );
        }
        envelope
    }
}

fn failed(description: &str) -> ModelNode {
    ModelNode::object()
        .with("outcome", "failed")
        .with("failure-description", description)
}

#[async_trait]
impl Transport for FakeManagementServer {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().await.push((request.method, request.url.clone()));
        let RequestBody::Dmr(body) = request.body else {
            return Ok(HttpResponse {
                status: 400,
                content_type: None,
                body: String::new(),
            });
        };
        let envelope = codec::from_base64(&body)
            .map_err(|error| TransportError::Network(format!("garbled request: {error}")))?;
        let response = self.execute(&envelope).await;
        Ok(HttpResponse {
            status: 200,
            content_type: Some("application/dmr-encoded".to_string()),
            body: codec::to_base64(&response)
                .map_err(|error| TransportError::Network(error.to_string()))?,
        })
    }
}

fn interface_public() -> ResourceAddress {
    ResourceAddress::root()
        .append("interface", "public")
        .expect("address")
}

fn write_inet_address(value: &str) -> Operation {
    Operation::builder("write-attribute", interface_public())
        .param("name", "inet-address")
        .param("value", value)
        .build()
        .expect("build")
}

fn read_inet_address() -> Operation {
    Operation::builder("read-attribute", interface_public())
        .param("name", "inet-address")
        .build()
        .expect("build")
}

#[tokio::test]
async fn write_then_read_reports_reload_required() {
    let server = FakeManagementServer::new();
    let dispatcher = Dispatcher::with_transport(DispatcherConfig::default(), server.clone());
    let mut process_state = dispatcher.subscribe_process_state();

    let before = dispatcher.execute(&read_inet_address()).await;
    assert_eq!(before.failure(), Some("WFLYCTL0201: Unknown attribute 'inet-address'"));
    assert!(process_state.try_recv().is_err());

    let written = dispatcher.execute(&write_inet_address("0.0.0.0")).await;
    assert!(written.is_success());
    let state = process_state.try_recv().expect("reload-required event");
    assert_eq!(
        state,
        [ServerState::new("", "", State::ReloadRequired)]
            .into_iter()
            .collect::<ProcessState>()
    );

    let after = dispatcher.execute(&read_inet_address()).await;
    assert_eq!(after, DispatchOutcome::Success(ModelNode::from("0.0.0.0")));
    assert_eq!(server.seen.lock().await.len(), 3);
}

#[tokio::test]
async fn composite_write_and_read_in_one_round_trip() {
    let server = FakeManagementServer::new();
    let dispatcher = Dispatcher::with_transport(DispatcherConfig::default(), server.clone());

    let composite = Composite::new([write_inet_address("127.0.0.1"), read_inet_address()]);
    let result = dispatcher
        .execute_composite(&composite)
        .await
        .success()
        .expect("composite success");

    assert_eq!(result.len(), 2);
    let read = result.step(1).expect("second step");
    assert_eq!(read.get("result").and_then(ModelNode::as_str), Some("127.0.0.1"));
    let seen = server.seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], (HttpMethod::Post, "http://localhost:9990/management".to_string()));
}

#[tokio::test]
async fn concurrent_calls_keep_their_own_callbacks() {
    let server = FakeManagementServer::new();
    let dispatcher = Dispatcher::with_transport(DispatcherConfig::default(), server);
    dispatcher.execute(&write_inet_address("10.0.0.1")).await;

    let (success_tx, success_rx) = oneshot::channel();
    let (failed_tx, failed_rx) = oneshot::channel();
    let unknown = Operation::builder("shutdown-everything", ResourceAddress::root())
        .build()
        .expect("build");
    let read = read_inet_address();

    tokio::join!(
        dispatcher.execute_with(
            &read,
            DispatchCallbacks::new(move |result| {
                let _ = success_tx.send(result.as_string());
            }),
        ),
        dispatcher.execute_with(
            &unknown,
            DispatchCallbacks::new(|_| panic!("unknown operation must not succeed")).on_failed(
                move |operation, failure| {
                    let _ = failed_tx.send(format!("{}: {failure}", operation.name()));
                }
            ),
        ),
    );

    assert_eq!(success_rx.await.expect("success callback"), "10.0.0.1");
    assert_eq!(
        failed_rx.await.expect("failed callback"),
        "shutdown-everything: WFLYCTL0031: No operation named 'shutdown-everything' exists"
    );
}

#[tokio::test]
async fn dispatcher_config_loads_from_file_with_env_overrides() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("hal.toml");
    std::fs::write(
        &path,
        "request_timeout_ms = 1500\n\n[endpoints]\ndmr = \"https://dc.example.com:9993/management\"\nupload = \"https://dc.example.com:9993/management-upload\"\n",
    )
    .expect("write config");

    let mut config = DispatcherConfig::load(&path).expect("load config");
    config
        .apply_env_overrides(|name| (name == "HAL_REQUEST_TIMEOUT_MS").then(|| "0".to_string()))
        .expect("overrides");
    let dispatcher = Dispatcher::with_transport(config, FakeManagementServer::new());

    assert_eq!(dispatcher.config().request_timeout_ms, 0);
    assert_eq!(
        dispatcher.config().endpoints.dmr,
        "https://dc.example.com:9993/management"
    );
}
