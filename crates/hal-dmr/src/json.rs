//! JSON form of the management model, as accepted by the upload endpoint.
//!
//! Types without a JSON counterpart are wrapped in single-key objects:
//! `{"BYTES_VALUE": "<base64>"}`, `{"EXPRESSION_VALUE": "..."}` and
//! `{"TYPE_MODEL_VALUE": "STRING"}`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Number, Value};

use crate::node::{format_big_decimal, ModelNode, ModelType};
use crate::DmrError;

const BYTES_VALUE: &str = "BYTES_VALUE";
const EXPRESSION_VALUE: &str = "EXPRESSION_VALUE";
const TYPE_MODEL_VALUE: &str = "TYPE_MODEL_VALUE";

pub fn to_json(node: &ModelNode) -> Value {
    match node {
        ModelNode::Undefined => Value::Null,
        ModelNode::Boolean(value) => Value::Bool(*value),
        ModelNode::Int(value) => Value::from(*value),
        ModelNode::Long(value) => Value::from(*value),
        ModelNode::Double(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        ModelNode::BigInteger(value) => i64::try_from(*value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        ModelNode::BigDecimal { unscaled, scale } => {
            let rendered = format_big_decimal(*unscaled, *scale);
            rendered
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(rendered))
        }
        ModelNode::String(value) => Value::String(value.clone()),
        ModelNode::Bytes(bytes) => wrapped(BYTES_VALUE, STANDARD.encode(bytes)),
        ModelNode::Expression(value) => wrapped(EXPRESSION_VALUE, value.clone()),
        ModelNode::Type(model_type) => wrapped(TYPE_MODEL_VALUE, model_type.as_str().to_string()),
        ModelNode::List(items) => Value::Array(items.iter().map(to_json).collect()),
        ModelNode::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
        ModelNode::Property(name, value) => {
            let mut object = Map::new();
            object.insert(name.clone(), to_json(value));
            Value::Object(object)
        }
    }
}

/// Compact JSON text of a node.
pub fn to_json_string(node: &ModelNode) -> String {
    to_json(node).to_string()
}

pub fn from_json(value: &Value) -> Result<ModelNode, DmrError> {
    let node = match value {
        Value::Null => ModelNode::Undefined,
        Value::Bool(value) => ModelNode::Boolean(*value),
        Value::Number(number) => number_node(number)?,
        Value::String(value) => ModelNode::String(value.clone()),
        Value::Array(items) => {
            ModelNode::List(items.iter().map(from_json).collect::<Result<_, _>>()?)
        }
        Value::Object(object) => {
            if let Some(node) = unwrap_special(object)? {
                return Ok(node);
            }
            ModelNode::Object(
                object
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), from_json(value)?)))
                    .collect::<Result<_, DmrError>>()?,
            )
        }
    };
    Ok(node)
}

pub fn from_json_str(raw: &str) -> Result<ModelNode, DmrError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|error| DmrError::Json(error.to_string()))?;
    from_json(&value)
}

fn wrapped(key: &str, value: String) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), Value::String(value));
    Value::Object(object)
}

fn number_node(number: &Number) -> Result<ModelNode, DmrError> {
    if let Some(value) = number.as_i64() {
        return Ok(match i32::try_from(value) {
            Ok(value) => ModelNode::Int(value),
            Err(_) => ModelNode::Long(value),
        });
    }
    if let Some(value) = number.as_u64() {
        return Ok(ModelNode::BigInteger(i128::from(value)));
    }
    number
        .as_f64()
        .map(ModelNode::Double)
        .ok_or_else(|| DmrError::Json(format!("unrepresentable number {number}")))
}

fn unwrap_special(object: &Map<String, Value>) -> Result<Option<ModelNode>, DmrError> {
    if object.len() != 1 {
        return Ok(None);
    }
    let Some((key, Value::String(inner))) = object.iter().next() else {
        return Ok(None);
    };
    let node = match key.as_str() {
        BYTES_VALUE => ModelNode::Bytes(
            STANDARD
                .decode(inner.as_bytes())
                .map_err(|error| DmrError::Base64(error.to_string()))?,
        ),
        EXPRESSION_VALUE => ModelNode::Expression(inner.clone()),
        TYPE_MODEL_VALUE => ModelNode::Type(
            ModelType::from_name(inner)
                .ok_or_else(|| DmrError::Json(format!("unknown model type '{inner}'")))?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(node))
}
