//! HTTP dispatcher for the WildFly management API.
//!
//! Sends [`hal_dmr::Operation`]s to the management endpoint as
//! `application/dmr-encoded` requests, classifies every response into exactly
//! one [`DispatchOutcome`], and publishes pending reload/restart signals as
//! [`ProcessState`] events.

mod cancellation;
pub mod config;
mod dispatcher;
mod error;
mod logging;
pub mod payload;
mod process_state;
pub mod request;
pub mod transport;

pub use cancellation::CancellationToken;
pub use config::{ConfigError, DispatcherConfig, Endpoints};
pub use dispatcher::{DispatchCallbacks, DispatchOutcome, Dispatcher};
pub use error::{classify_status, DispatchError};
pub use logging::init_tracing;
pub use process_state::{ProcessState, ProcessStateProcessor, ServerState, State};
pub use transport::{HttpTransport, Transport, TransportError, UploadFile};
