use std::fmt;

use crate::names::{ADDRESS, OP, OPERATION_HEADERS, ROLES, WHOAMI};
use crate::{DmrError, ModelNode, ResourceAddress};

/// An immutable management operation: name, target address, parameters, and headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: String,
    address: ResourceAddress,
    parameters: ModelNode,
    headers: ModelNode,
    roles: Vec<String>,
}

impl Operation {
    pub fn builder(name: impl Into<String>, address: ResourceAddress) -> OperationBuilder {
        OperationBuilder {
            name: name.into(),
            address,
            parameters: ModelNode::object(),
            headers: ModelNode::object(),
            roles: Vec::new(),
        }
    }

    /// Header-less operation whose name is known to be valid.
    pub(crate) fn with_parameters(name: &str, address: ResourceAddress, parameters: ModelNode) -> Self {
        Self {
            name: name.to_string(),
            address,
            parameters,
            headers: ModelNode::object(),
            roles: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &ResourceAddress {
        &self.address
    }

    pub fn parameters(&self) -> &ModelNode {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ModelNode> {
        self.parameters.get(name)
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.as_property_list().is_empty()
    }

    /// Operation headers, including the `roles` header derived from run-as roles.
    pub fn headers(&self) -> &ModelNode {
        &self.headers
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// The wire envelope: `operation`, `address`, parameters, then `operation-headers`.
    pub fn to_model_node(&self) -> ModelNode {
        let mut node = ModelNode::object()
            .with(OP, self.name.as_str())
            .with(ADDRESS, self.address.to_model_node());
        for (name, value) in self.parameters.as_property_list() {
            node.insert(name, value);
        }
        if !self.headers.as_property_list().is_empty() {
            node.insert(OPERATION_HEADERS, &self.headers);
        }
        node
    }
}

impl TryFrom<&ModelNode> for Operation {
    type Error = DmrError;

    fn try_from(node: &ModelNode) -> Result<Self, Self::Error> {
        let name = node
            .get(OP)
            .filter(|name| name.is_defined())
            .map(ModelNode::as_string)
            .ok_or(DmrError::MissingOperationName)?;
        let address = ResourceAddress::from_model_node(node.get(ADDRESS).unwrap_or(&ModelNode::Undefined))?;
        let mut parameters = match node {
            ModelNode::Object(_) => node.clone(),
            _ => ModelNode::object(),
        };
        parameters.remove(OP);
        parameters.remove(ADDRESS);
        parameters.remove(OPERATION_HEADERS);

        let headers = node
            .get(OPERATION_HEADERS)
            .filter(|headers| headers.is_defined())
            .cloned()
            .unwrap_or_else(ModelNode::object);
        let roles = match headers.get(ROLES) {
            Some(ModelNode::List(items)) => items.iter().map(ModelNode::as_string).collect(),
            Some(ModelNode::String(role)) => vec![role.clone()],
            _ => Vec::new(),
        };
        let mut builder = Operation::builder(name, address).payload(parameters);
        builder.headers = headers;
        builder.headers.remove(ROLES);
        builder.roles = roles;
        builder.build()
    }
}

impl fmt::Display for Operation {
    /// Management CLI syntax: `/a=b:name(p=v,...){h=v,...}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.address.is_empty() {
            write!(f, "{}", self.address)?;
        }
        write!(f, ":{}", self.name)?;
        write_pairs(f, &self.parameters, '(', ')')?;
        write_pairs(f, &self.headers, '{', '}')
    }
}

fn write_pairs(f: &mut fmt::Formatter<'_>, node: &ModelNode, open: char, close: char) -> fmt::Result {
    let pairs = node.as_property_list();
    if pairs.is_empty() {
        return Ok(());
    }
    let rendered = pairs
        .iter()
        .map(|(name, value)| format!("{name}={}", value.as_string()))
        .collect::<Vec<_>>()
        .join(",");
    write!(f, "{open}{rendered}{close}")
}

/// Accumulates the parts of an [`Operation`].
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    name: String,
    address: ResourceAddress,
    parameters: ModelNode,
    headers: ModelNode,
    roles: Vec<String>,
}

impl OperationBuilder {
    pub fn param(mut self, name: &str, value: impl Into<ModelNode>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn param_list<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ModelNode>,
    {
        let list = self.parameters.get_mut(name);
        for value in values {
            list.push(value);
        }
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<ModelNode>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces all parameters; anything but an object is treated as no parameters.
    pub fn payload(mut self, payload: ModelNode) -> Self {
        self.parameters = match payload {
            ModelNode::Object(_) => payload,
            _ => ModelNode::object(),
        };
        self
    }

    pub fn run_as<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Parameters named `operation`, `address` or `operation-headers` are
    /// dropped; the builder's name, address and headers always win.
    pub fn build(self) -> Result<Operation, DmrError> {
        if self.name.trim().is_empty() {
            return Err(DmrError::MissingOperationName);
        }
        let mut parameters = self.parameters;
        for reserved in [OP, ADDRESS, OPERATION_HEADERS] {
            parameters.remove(reserved);
        }
        let mut headers = self.headers;
        if !self.roles.is_empty() && self.name != WHOAMI {
            let roles = match self.roles.as_slice() {
                [single] => ModelNode::from(single),
                many => ModelNode::List(many.iter().map(ModelNode::from).collect()),
            };
            headers.insert(ROLES, roles);
        }
        Ok(Operation {
            name: self.name,
            address: self.address,
            parameters,
            headers,
            roles: self.roles,
        })
    }
}
