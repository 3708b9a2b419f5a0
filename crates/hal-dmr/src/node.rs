use std::fmt;

use crate::names::{FAILURE_DESCRIPTION, OUTCOME, SUCCESS};

/// Wire-level type of a [`ModelNode`], identified by a single type character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelType {
    BigDecimal,
    BigInteger,
    Boolean,
    Bytes,
    Double,
    Expression,
    Int,
    List,
    Long,
    Object,
    Property,
    String,
    Type,
    Undefined,
}

impl ModelType {
    pub fn type_char(self) -> u8 {
        match self {
            ModelType::BigDecimal => b'd',
            ModelType::BigInteger => b'i',
            ModelType::Boolean => b'Z',
            ModelType::Bytes => b'b',
            ModelType::Double => b'D',
            ModelType::Expression => b'e',
            ModelType::Int => b'I',
            ModelType::List => b'l',
            ModelType::Long => b'J',
            ModelType::Object => b'o',
            ModelType::Property => b'p',
            ModelType::String => b's',
            ModelType::Type => b't',
            ModelType::Undefined => b'u',
        }
    }

    /// Resolves a type character. `S` is the long-string form of `s`.
    pub fn from_type_char(value: u8) -> Option<Self> {
        let model_type = match value {
            b'd' => ModelType::BigDecimal,
            b'i' => ModelType::BigInteger,
            b'Z' => ModelType::Boolean,
            b'b' => ModelType::Bytes,
            b'D' => ModelType::Double,
            b'e' => ModelType::Expression,
            b'I' => ModelType::Int,
            b'l' => ModelType::List,
            b'J' => ModelType::Long,
            b'o' => ModelType::Object,
            b'p' => ModelType::Property,
            b's' | b'S' => ModelType::String,
            b't' => ModelType::Type,
            b'u' => ModelType::Undefined,
            _ => return None,
        };
        Some(model_type)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::BigDecimal => "BIG_DECIMAL",
            ModelType::BigInteger => "BIG_INTEGER",
            ModelType::Boolean => "BOOLEAN",
            ModelType::Bytes => "BYTES",
            ModelType::Double => "DOUBLE",
            ModelType::Expression => "EXPRESSION",
            ModelType::Int => "INT",
            ModelType::List => "LIST",
            ModelType::Long => "LONG",
            ModelType::Object => "OBJECT",
            ModelType::Property => "PROPERTY",
            ModelType::String => "STRING",
            ModelType::Type => "TYPE",
            ModelType::Undefined => "UNDEFINED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        const ALL: [ModelType; 14] = [
            ModelType::BigDecimal,
            ModelType::BigInteger,
            ModelType::Boolean,
            ModelType::Bytes,
            ModelType::Double,
            ModelType::Expression,
            ModelType::Int,
            ModelType::List,
            ModelType::Long,
            ModelType::Object,
            ModelType::Property,
            ModelType::String,
            ModelType::Type,
            ModelType::Undefined,
        ];
        ALL.into_iter()
            .find(|model_type| model_type.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the detyped management model: primitives, lists, and ordered objects.
///
/// Objects keep insertion order; the server and the text form both depend on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModelNode {
    #[default]
    Undefined,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    BigInteger(i128),
    BigDecimal {
        unscaled: i128,
        scale: i32,
    },
    String(String),
    Bytes(Vec<u8>),
    Expression(String),
    List(Vec<ModelNode>),
    Object(Vec<(String, ModelNode)>),
    Property(String, Box<ModelNode>),
    Type(ModelType),
}

impl ModelNode {
    pub fn object() -> Self {
        ModelNode::Object(Vec::new())
    }

    pub fn list() -> Self {
        ModelNode::List(Vec::new())
    }

    pub fn property(name: impl Into<String>, value: impl Into<ModelNode>) -> Self {
        ModelNode::Property(name.into(), Box::new(value.into()))
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            ModelNode::Undefined => ModelType::Undefined,
            ModelNode::Boolean(_) => ModelType::Boolean,
            ModelNode::Int(_) => ModelType::Int,
            ModelNode::Long(_) => ModelType::Long,
            ModelNode::Double(_) => ModelType::Double,
            ModelNode::BigInteger(_) => ModelType::BigInteger,
            ModelNode::BigDecimal { .. } => ModelType::BigDecimal,
            ModelNode::String(_) => ModelType::String,
            ModelNode::Bytes(_) => ModelType::Bytes,
            ModelNode::Expression(_) => ModelType::Expression,
            ModelNode::List(_) => ModelType::List,
            ModelNode::Object(_) => ModelType::Object,
            ModelNode::Property(_, _) => ModelType::Property,
            ModelNode::Type(_) => ModelType::Type,
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, ModelNode::Undefined)
    }

    /// Returns the object child named `key`. Non-object nodes have no children.
    pub fn get(&self, key: &str) -> Option<&ModelNode> {
        match self {
            ModelNode::Object(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            ModelNode::Property(name, value) if name == key => Some(value),
            _ => None,
        }
    }

    /// Follows a chain of object keys.
    pub fn get_path(&self, path: &[&str]) -> Option<&ModelNode> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn get_index(&self, index: usize) -> Option<&ModelNode> {
        match self {
            ModelNode::List(items) => items.get(index),
            _ => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn has_defined(&self, key: &str) -> bool {
        self.get(key).is_some_and(ModelNode::is_defined)
    }

    /// Returns a mutable child, creating it as undefined when missing.
    ///
    /// A node that is not an object is turned into an empty object first.
    pub fn get_mut(&mut self, key: &str) -> &mut ModelNode {
        match self {
            ModelNode::Object(entries) => {
                let position = match entries.iter().position(|(name, _)| name == key) {
                    Some(position) => position,
                    None => {
                        entries.push((key.to_string(), ModelNode::Undefined));
                        entries.len() - 1
                    }
                };
                &mut entries[position].1
            }
            other => {
                *other = ModelNode::object();
                other.get_mut(key)
            }
        }
    }

    pub fn set(&mut self, value: impl Into<ModelNode>) -> &mut Self {
        *self = value.into();
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ModelNode>) -> &mut Self {
        self.get_mut(key).set(value);
        self
    }

    /// Consuming variant of [`ModelNode::insert`] for building trees inline.
    pub fn with(mut self, key: &str, value: impl Into<ModelNode>) -> Self {
        self.insert(key, value);
        self
    }

    /// Appends to a list, converting an undefined or scalar node into a list first.
    pub fn push(&mut self, value: impl Into<ModelNode>) -> &mut Self {
        if !matches!(self, ModelNode::List(_)) {
            *self = ModelNode::list();
        }
        if let ModelNode::List(items) = self {
            items.push(value.into());
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<ModelNode> {
        match self {
            ModelNode::Object(entries) => {
                let position = entries.iter().position(|(name, _)| name == key)?;
                Some(entries.remove(position).1)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ModelNode::String(value) | ModelNode::Expression(value) => Some(value),
            _ => None,
        }
    }

    /// Renders the node as a plain string: scalars without quoting, containers in text form.
    pub fn as_string(&self) -> String {
        match self {
            ModelNode::Undefined => "undefined".to_string(),
            ModelNode::Boolean(value) => value.to_string(),
            ModelNode::Int(value) => value.to_string(),
            ModelNode::Long(value) => value.to_string(),
            ModelNode::Double(value) => format_double(*value),
            ModelNode::BigInteger(value) => value.to_string(),
            ModelNode::BigDecimal { unscaled, scale } => format_big_decimal(*unscaled, *scale),
            ModelNode::String(value) | ModelNode::Expression(value) => value.clone(),
            ModelNode::Type(model_type) => model_type.as_str().to_string(),
            _ => self.to_compact_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelNode::Boolean(value) => Some(*value),
            ModelNode::Int(value) => Some(*value != 0),
            ModelNode::Long(value) => Some(*value != 0),
            ModelNode::String(value) if value.eq_ignore_ascii_case("true") => Some(true),
            ModelNode::String(value) if value.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ModelNode::Int(value) => Some(i64::from(*value)),
            ModelNode::Long(value) => Some(*value),
            ModelNode::BigInteger(value) => i64::try_from(*value).ok(),
            ModelNode::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ModelNode]> {
        match self {
            ModelNode::List(items) => Some(items),
            _ => None,
        }
    }

    /// Views the node as `(name, value)` pairs.
    ///
    /// Objects yield their entries, a property yields itself, and a list yields
    /// the properties and single-entry objects it contains.
    pub fn as_property_list(&self) -> Vec<(&str, &ModelNode)> {
        match self {
            ModelNode::Object(entries) => entries
                .iter()
                .map(|(name, value)| (name.as_str(), value))
                .collect(),
            ModelNode::Property(name, value) => vec![(name.as_str(), value.as_ref())],
            ModelNode::List(items) => items.iter().flat_map(ModelNode::as_property_list).collect(),
            _ => Vec::new(),
        }
    }

    /// True when the node carries an `outcome` other than `success`.
    pub fn is_failure(&self) -> bool {
        self.get(OUTCOME)
            .is_some_and(|outcome| outcome.as_string() != SUCCESS)
    }

    pub fn failure_description(&self) -> String {
        match self.get(FAILURE_DESCRIPTION) {
            Some(ModelNode::String(description)) => description.clone(),
            Some(description) if description.is_defined() => description.to_string(),
            _ => "No failure-description provided".to_string(),
        }
    }

    /// Single-line text form.
    pub fn to_compact_string(&self) -> String {
        let mut out = String::new();
        self.format(&mut out, 0, false);
        out
    }

    fn format(&self, out: &mut String, indent: usize, multi_line: bool) {
        match self {
            ModelNode::Undefined => out.push_str("undefined"),
            ModelNode::Boolean(value) => out.push_str(if *value { "true" } else { "false" }),
            ModelNode::Int(value) => out.push_str(&value.to_string()),
            ModelNode::Long(value) => {
                out.push_str(&value.to_string());
                out.push('L');
            }
            ModelNode::Double(value) => out.push_str(&format_double(*value)),
            ModelNode::BigInteger(value) => {
                out.push_str("big integer ");
                out.push_str(&value.to_string());
            }
            ModelNode::BigDecimal { unscaled, scale } => {
                out.push_str("big decimal ");
                out.push_str(&format_big_decimal(*unscaled, *scale));
            }
            ModelNode::String(value) => push_quoted(out, value),
            ModelNode::Expression(value) => {
                out.push_str("expression ");
                push_quoted(out, value);
            }
            ModelNode::Bytes(bytes) => {
                out.push_str("bytes {");
                let rendered = bytes
                    .iter()
                    .map(|byte| format!("0x{byte:02x}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                if !rendered.is_empty() {
                    out.push(' ');
                    out.push_str(&rendered);
                    out.push(' ');
                }
                out.push('}');
            }
            ModelNode::Type(model_type) => out.push_str(model_type.as_str()),
            ModelNode::Property(name, value) => {
                out.push('(');
                push_quoted(out, name);
                out.push_str(" => ");
                value.format(out, indent, multi_line);
                out.push(')');
            }
            ModelNode::List(items) => {
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    open_line(out, indent + 1, multi_line);
                    item.format(out, indent + 1, multi_line);
                    if index + 1 < items.len() {
                        out.push(',');
                    }
                }
                close_line(out, indent, multi_line);
                out.push(']');
            }
            ModelNode::Object(entries) => {
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push('{');
                for (index, (name, value)) in entries.iter().enumerate() {
                    open_line(out, indent + 1, multi_line);
                    push_quoted(out, name);
                    out.push_str(" => ");
                    value.format(out, indent + 1, multi_line);
                    if index + 1 < entries.len() {
                        out.push(',');
                    }
                }
                close_line(out, indent, multi_line);
                out.push('}');
            }
        }
    }
}

fn open_line(out: &mut String, indent: usize, multi_line: bool) {
    if multi_line {
        out.push('\n');
        out.push_str(&"    ".repeat(indent));
    } else if !out.ends_with('{') && !out.ends_with('[') {
        out.push(' ');
    }
}

fn close_line(out: &mut String, indent: usize, multi_line: bool) {
    if multi_line {
        out.push('\n');
        out.push_str(&"    ".repeat(indent));
    }
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Renders like `java.math.BigDecimal#toString`: plain notation unless the
/// scale is negative or the adjusted exponent is below -6.
pub(crate) fn format_big_decimal(unscaled: i128, scale: i32) -> String {
    let digits = unscaled.unsigned_abs().to_string();
    let sign = if unscaled < 0 { "-" } else { "" };
    let adjusted = (digits.len() as i64 - 1) - i64::from(scale);
    if scale >= 0 && adjusted >= -6 {
        // adjusted >= -6 bounds the scale to digits.len() + 5
        let scale = scale as usize;
        return if scale == 0 {
            format!("{sign}{digits}")
        } else if digits.len() > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale);
            format!("{sign}{whole}.{fraction}")
        } else {
            format!("{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
        };
    }
    let (first, rest) = digits.split_at(1);
    let mut out = format!("{sign}{first}");
    if !rest.is_empty() {
        out.push('.');
        out.push_str(rest);
    }
    if adjusted != 0 {
        out.push('E');
        if adjusted > 0 {
            out.push('+');
        }
        out.push_str(&adjusted.to_string());
    }
    out
}

impl fmt::Display for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.format(&mut out, 0, true);
        f.write_str(&out)
    }
}

impl From<bool> for ModelNode {
    fn from(value: bool) -> Self {
        ModelNode::Boolean(value)
    }
}

impl From<i32> for ModelNode {
    fn from(value: i32) -> Self {
        ModelNode::Int(value)
    }
}

impl From<i64> for ModelNode {
    fn from(value: i64) -> Self {
        ModelNode::Long(value)
    }
}

impl From<f64> for ModelNode {
    fn from(value: f64) -> Self {
        ModelNode::Double(value)
    }
}

impl From<&str> for ModelNode {
    fn from(value: &str) -> Self {
        ModelNode::String(value.to_string())
    }
}

impl From<String> for ModelNode {
    fn from(value: String) -> Self {
        ModelNode::String(value)
    }
}

impl From<&String> for ModelNode {
    fn from(value: &String) -> Self {
        ModelNode::String(value.clone())
    }
}

impl From<Vec<ModelNode>> for ModelNode {
    fn from(value: Vec<ModelNode>) -> Self {
        ModelNode::List(value)
    }
}

impl From<Vec<u8>> for ModelNode {
    fn from(value: Vec<u8>) -> Self {
        ModelNode::Bytes(value)
    }
}

impl From<ModelType> for ModelNode {
    fn from(value: ModelType) -> Self {
        ModelNode::Type(value)
    }
}

impl From<&ModelNode> for ModelNode {
    fn from(value: &ModelNode) -> Self {
        value.clone()
    }
}
