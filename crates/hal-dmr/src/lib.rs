//! Detyped management model (DMR) for WildFly management clients.
//!
//! Provides the [`ModelNode`] value tree, its binary/base64 and JSON encodings,
//! resource addresses, and immutable [`Operation`] and [`Composite`] descriptions.

mod address;
pub mod codec;
mod composite;
mod error;
pub mod json;
pub mod names;
mod node;
mod operation;

pub use address::ResourceAddress;
pub use composite::{Composite, CompositeResult};
pub use error::DmrError;
pub use node::{ModelNode, ModelType};
pub use operation::{Operation, OperationBuilder};

impl Operation {
    /// Base64 of the binary envelope, the request body of a DMR `POST`.
    pub fn to_base64(&self) -> Result<String, DmrError> {
        codec::to_base64(&self.to_model_node())
    }

    /// Compact JSON of the envelope, the `operation` part of an upload.
    pub fn to_json_string(&self) -> String {
        json::to_json_string(&self.to_model_node())
    }
}
