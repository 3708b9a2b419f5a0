use std::fmt;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::debug;

use crate::config::DispatcherConfig;

pub const APPLICATION_DMR_ENCODED: &str = "application/dmr-encoded";
pub const HEADER_MANAGEMENT_CLIENT_NAME: &str = "X-Management-Client-Name";
pub const HEADER_MANAGEMENT_CLIENT_VALUE: &str = "HAL";
pub const UPLOAD_OPERATION_FIELD: &str = "operation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Enumerates supported `HttpMethod` values.
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file to send to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Name of the multipart field holding the file.
    pub field_name: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `RequestBody` values.
pub enum RequestBody {
    Empty,
    /// Base64 of the binary operation envelope.
    Dmr(String),
    /// Multipart form with the file and the operation's JSON form.
    Upload { file: UploadFile, operation: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `HttpRequest` used across HAL components.
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `HttpResponse` used across HAL components.
pub struct HttpResponse {
    /// `0` when the exchange produced no status, e.g. a rejected cross-origin call.
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enumerates supported `TransportError` values.
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Performs exactly one HTTP exchange per call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a cookie-keeping `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &DispatcherConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;
        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .header(HEADER_MANAGEMENT_CLIENT_NAME, HEADER_MANAGEMENT_CLIENT_VALUE);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        builder = match request.body {
            RequestBody::Empty => builder
                .header(ACCEPT, APPLICATION_DMR_ENCODED)
                .header(CONTENT_TYPE, APPLICATION_DMR_ENCODED),
            RequestBody::Dmr(encoded) => builder
                .header(ACCEPT, APPLICATION_DMR_ENCODED)
                .header(CONTENT_TYPE, APPLICATION_DMR_ENCODED)
                .body(encoded),
            RequestBody::Upload { file, operation } => {
                let form = Form::new()
                    .part(
                        file.field_name,
                        Part::bytes(file.content).file_name(file.file_name),
                    )
                    .text(UPLOAD_OPERATION_FIELD, operation);
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::Network(error.to_string()))?;
        let status = response.status().as_u16();
        debug!(status, url = %request.url, "management endpoint responded");
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::Network(error.to_string()))?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}
