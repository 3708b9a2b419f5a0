//! Turns raw response bodies into `outcome`/`result` envelopes.
//!
//! Processors never fail: anything that cannot be decoded becomes a failed
//! envelope whose description carries the decoding error.

use hal_dmr::names::{FAILED, FAILURE_DESCRIPTION, OUTCOME, RESULT, SUCCESS};
use hal_dmr::{codec, ModelNode};
use serde_json::Value;

use crate::transport::HttpMethod;

const UNKNOWN_FAILURE: &str = "unknown";

/// Decodes a response body into an envelope with an `outcome`.
pub trait PayloadProcessor: Send + Sync {
    fn process(&self, method: HttpMethod, body: &str) -> ModelNode;
}

/// Processor for `application/dmr-encoded` responses of the DMR endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct DmrPayloadProcessor;

impl PayloadProcessor for DmrPayloadProcessor {
    fn process(&self, method: HttpMethod, body: &str) -> ModelNode {
        match codec::from_base64(body) {
            // GET responses carry the bare result; the status code already conveyed the outcome.
            Ok(result) if method == HttpMethod::Get => success_envelope(result),
            Ok(envelope) => envelope,
            Err(error) => failed_envelope(format!("Failed to decode response: {error}")),
        }
    }
}

/// Processor for the JSON responses of the upload endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPayloadProcessor;

impl PayloadProcessor for UploadPayloadProcessor {
    fn process(&self, _method: HttpMethod, body: &str) -> ModelNode {
        let json = match serde_json::from_str::<Value>(body) {
            Ok(json) => json,
            Err(error) => {
                return failed_envelope(format!("Failed to decode response: {error}"));
            }
        };
        let outcome = json.get(OUTCOME).and_then(Value::as_str).unwrap_or_default();
        if outcome == SUCCESS {
            let result = match json.get(RESULT) {
                Some(Value::String(result)) => ModelNode::String(result.clone()),
                Some(Value::Null) | None => ModelNode::Undefined,
                Some(other) => ModelNode::String(other.to_string()),
            };
            return success_envelope(result);
        }
        failed_envelope(upload_failure_description(json.get(FAILURE_DESCRIPTION)))
    }
}

/// Extracts the failure description of an upload response.
///
/// Objects are searched for the first key containing `failure`; this mirrors
/// how the server nests host and domain failure descriptions but may also match
/// unrelated keys.
pub fn upload_failure_description(description: Option<&Value>) -> String {
    match description {
        Some(Value::String(description)) => description.clone(),
        Some(Value::Object(object)) => object
            .iter()
            .find(|(key, _)| key.contains("failure"))
            .and_then(|(_, value)| value.as_str())
            .unwrap_or(UNKNOWN_FAILURE)
            .to_string(),
        _ => UNKNOWN_FAILURE.to_string(),
    }
}

pub fn success_envelope(result: ModelNode) -> ModelNode {
    ModelNode::object()
        .with(OUTCOME, SUCCESS)
        .with(RESULT, result)
}

pub fn failed_envelope(description: impl Into<String>) -> ModelNode {
    ModelNode::object()
        .with(OUTCOME, FAILED)
        .with(FAILURE_DESCRIPTION, description.into())
}

/// Outcome of a decoded envelope: exactly one of success or failure.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedResponse {
    /// The full envelope, kept for process-state inspection.
    Success(ModelNode),
    Failed(String),
}

impl DecodedResponse {
    pub fn from_envelope(envelope: ModelNode) -> Self {
        if envelope.is_failure() {
            DecodedResponse::Failed(envelope.failure_description())
        } else {
            DecodedResponse::Success(envelope)
        }
    }
}

/// The `result` of a successful envelope, undefined when absent.
pub fn envelope_result(envelope: &ModelNode) -> ModelNode {
    envelope.get(RESULT).cloned().unwrap_or_default()
}
