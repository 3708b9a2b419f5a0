//! Orchestrates one management call: request, status check, decoding, process state.

use std::sync::Arc;

use hal_dmr::{Composite, CompositeResult, ModelNode, Operation};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::cancellation::{timeout_duration_from_ms, CancellationToken};
use crate::config::DispatcherConfig;
use crate::error::{classify_status, DispatchError};
use crate::payload::{
    envelope_result, DecodedResponse, DmrPayloadProcessor, PayloadProcessor, UploadPayloadProcessor,
};
use crate::process_state::{ProcessState, ProcessStateProcessor};
use crate::request::{dmr_request, upload_request};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError, UploadFile};

/// Terminal state of one dispatched call. Exactly one variant is produced per call.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome<T> {
    /// The decoded `result` of a successful response.
    Success(T),
    /// The server executed the operation and reported `outcome => failed`.
    Failed { operation: Operation, failure: String },
    /// No usable response: network error, non-200 status, timeout, or cancellation.
    Exception {
        operation: Operation,
        error: DispatchError,
    },
}

impl<T> DispatchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { .. })
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, DispatchOutcome::Exception { .. })
    }

    pub fn success(self) -> Option<T> {
        match self {
            DispatchOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            DispatchOutcome::Exception { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The operation of a failed or exceptional call.
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            DispatchOutcome::Success(_) => None,
            DispatchOutcome::Failed { operation, .. }
            | DispatchOutcome::Exception { operation, .. } => Some(operation),
        }
    }

    pub fn map<U, F>(self, f: F) -> DispatchOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            DispatchOutcome::Success(value) => DispatchOutcome::Success(f(value)),
            DispatchOutcome::Failed { operation, failure } => {
                DispatchOutcome::Failed { operation, failure }
            }
            DispatchOutcome::Exception { operation, error } => {
                DispatchOutcome::Exception { operation, error }
            }
        }
    }
}

type SuccessCallback = Box<dyn FnOnce(ModelNode) + Send>;
type FailedCallback = Box<dyn FnOnce(&Operation, &str) + Send>;
type ExceptionCallback = Box<dyn FnOnce(&Operation, &DispatchError) + Send>;

/// Callbacks owned by a single call; exactly one of them runs.
///
/// Without explicit handlers, failures and exceptions are logged.
pub struct DispatchCallbacks {
    on_success: SuccessCallback,
    on_failed: FailedCallback,
    on_exception: ExceptionCallback,
}

impl DispatchCallbacks {
    pub fn new<F>(on_success: F) -> Self
    where
        F: FnOnce(ModelNode) + Send + 'static,
    {
        Self {
            on_success: Box::new(on_success),
            on_failed: Box::new(|operation: &Operation, failure: &str| {
                warn!(operation = %operation, failure, "management operation failed");
            }),
            on_exception: Box::new(|operation: &Operation, error: &DispatchError| {
                error!(operation = %operation, error = %error, "management operation raised an exception");
            }),
        }
    }

    pub fn on_failed<F>(mut self, on_failed: F) -> Self
    where
        F: FnOnce(&Operation, &str) + Send + 'static,
    {
        self.on_failed = Box::new(on_failed);
        self
    }

    pub fn on_exception<F>(mut self, on_exception: F) -> Self
    where
        F: FnOnce(&Operation, &DispatchError) + Send + 'static,
    {
        self.on_exception = Box::new(on_exception);
        self
    }

    fn fire(self, outcome: DispatchOutcome<ModelNode>) {
        match outcome {
            DispatchOutcome::Success(result) => (self.on_success)(result),
            DispatchOutcome::Failed { operation, failure } => (self.on_failed)(&operation, &failure),
            DispatchOutcome::Exception { operation, error } => {
                (self.on_exception)(&operation, &error)
            }
        }
    }
}

/// Executes operations against the management endpoints.
///
/// Cloning is cheap and clones share the transport and the process-state channel.
/// Calls hold no shared mutable state and may run concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    config: Arc<DispatcherConfig>,
    process_state: broadcast::Sender<ProcessState>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: DispatcherConfig, transport: Arc<dyn Transport>) -> Self {
        let (process_state, _) = broadcast::channel(config.process_state_capacity.max(1));
        Self {
            transport,
            config: Arc::new(config),
            process_state,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Receives the process state of every successful response that can carry one.
    pub fn subscribe_process_state(&self) -> broadcast::Receiver<ProcessState> {
        self.process_state.subscribe()
    }

    pub async fn execute(&self, operation: &Operation) -> DispatchOutcome<ModelNode> {
        self.execute_dmr(operation, None).await
    }

    /// Like [`Dispatcher::execute`], but resolves to [`DispatchError::Cancelled`] once `token` fires.
    pub async fn execute_cancellable(
        &self,
        operation: &Operation,
        token: &CancellationToken,
    ) -> DispatchOutcome<ModelNode> {
        self.execute_dmr(operation, Some(token)).await
    }

    pub async fn execute_composite(&self, composite: &Composite) -> DispatchOutcome<CompositeResult> {
        self.execute(&composite.to_operation())
            .await
            .map(CompositeResult::new)
    }

    /// Executes `operation` and hands the outcome to exactly one of `callbacks`.
    pub async fn execute_with(&self, operation: &Operation, callbacks: DispatchCallbacks) {
        callbacks.fire(self.execute(operation).await);
    }

    /// Sends `file` with `operation` to the upload endpoint.
    pub async fn upload(&self, file: UploadFile, operation: &Operation) -> DispatchOutcome<ModelNode> {
        let request = upload_request(&self.config.endpoints, file, operation);
        self.dispatch(operation, request, &UploadPayloadProcessor, None)
            .await
    }

    async fn execute_dmr(
        &self,
        operation: &Operation,
        token: Option<&CancellationToken>,
    ) -> DispatchOutcome<ModelNode> {
        let request = match dmr_request(&self.config.endpoints, operation) {
            Ok(request) => request,
            Err(error) => return exception(operation, error),
        };
        self.dispatch(operation, request, &DmrPayloadProcessor, token)
            .await
    }

    async fn dispatch(
        &self,
        operation: &Operation,
        request: HttpRequest,
        processor: &dyn PayloadProcessor,
        token: Option<&CancellationToken>,
    ) -> DispatchOutcome<ModelNode> {
        let method = request.method;
        let url = request.url.clone();
        debug!(operation = %operation, method = %method, url = %url, "dispatching management operation");

        let response = match self.send(request, token).await {
            Ok(response) => response,
            Err(error) => return exception(operation, error),
        };
        if let Some(error) = classify_status(response.status, &url) {
            return exception(operation, error);
        }

        match DecodedResponse::from_envelope(processor.process(method, &response.body)) {
            DecodedResponse::Success(envelope) => {
                self.publish_process_state(&envelope);
                DispatchOutcome::Success(envelope_result(&envelope))
            }
            DecodedResponse::Failed(failure) => {
                warn!(operation = %operation, failure = %failure, "management operation failed");
                DispatchOutcome::Failed {
                    operation: operation.clone(),
                    failure,
                }
            }
        }
    }

    async fn send(
        &self,
        request: HttpRequest,
        token: Option<&CancellationToken>,
    ) -> Result<HttpResponse, DispatchError> {
        let timeout_ms = self.config.request_timeout_ms;
        let exchange = async {
            let sent = match timeout_duration_from_ms(timeout_ms) {
                Some(duration) => tokio::time::timeout(duration, self.transport.send(request))
                    .await
                    .map_err(|_| DispatchError::Timeout { timeout_ms })?,
                None => self.transport.send(request).await,
            };
            sent.map_err(|error| DispatchError::Communication {
                detail: error.to_string(),
            })
        };

        match token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(DispatchError::Cancelled),
                    result = exchange => result,
                }
            }
            None => exchange.await,
        }
    }

    fn publish_process_state(&self, envelope: &ModelNode) {
        let processor = ProcessStateProcessor;
        if !processor.accepts(envelope) {
            return;
        }
        let state = processor.process(envelope);
        debug!(servers = state.len(), "publishing process state");
        // No subscribers is not an error.
        let _ = self.process_state.send(state);
    }
}

fn exception<T>(operation: &Operation, error: DispatchError) -> DispatchOutcome<T> {
    error!(operation = %operation, error = %error, "management operation raised an exception");
    DispatchOutcome::Exception {
        operation: operation.clone(),
        error,
    }
}
