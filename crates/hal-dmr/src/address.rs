use std::fmt;

use crate::{DmrError, ModelNode};

/// Fully qualified address of a management resource: ordered `key=value` segments.
///
/// The root address has no segments. Keys may repeat at different depths,
/// e.g. `/subsystem=foo/database=bar/database=baz`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    segments: Vec<(String, String)>,
}

impl ResourceAddress {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new address with one more segment; empty keys or values are rejected.
    pub fn append(&self, key: impl Into<String>, value: impl Into<String>) -> Result<Self, DmrError> {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() {
            return Err(DmrError::EmptySegmentKey);
        }
        if value.trim().is_empty() {
            return Err(DmrError::EmptySegmentValue { key });
        }
        let mut segments = self.segments.clone();
        segments.push((key, value));
        Ok(Self { segments })
    }

    /// Concatenates another address onto this one.
    pub fn join(&self, other: &ResourceAddress) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Parses `/key=value/key=value`. An empty string or `/` is the root address.
    pub fn parse(raw: &str) -> Result<Self, DmrError> {
        let trimmed = raw.trim();
        let safe = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if safe.is_empty() {
            return Ok(Self::root());
        }
        let mut address = Self::root();
        for part in safe.split('/') {
            let mut kv = part.split('=');
            let (Some(key), Some(value), None) = (kv.next(), kv.next(), kv.next()) else {
                return Err(DmrError::MalformedAddress(format!(
                    "malformed part '{part}' in address: {raw}"
                )));
            };
            address = address
                .append(key, value)
                .map_err(|_| DmrError::MalformedAddress(raw.to_string()))?;
        }
        Ok(address)
    }

    pub fn from_model_node(node: &ModelNode) -> Result<Self, DmrError> {
        if !node.is_defined() {
            return Ok(Self::root());
        }
        if !matches!(node, ModelNode::List(_) | ModelNode::Object(_) | ModelNode::Property(_, _)) {
            return Err(DmrError::MalformedAddress(node.to_compact_string()));
        }
        node.as_property_list()
            .into_iter()
            .try_fold(Self::root(), |address, (key, value)| {
                address.append(key, value.as_string())
            })
    }

    /// Wire form: a list of single-entry objects.
    pub fn to_model_node(&self) -> ModelNode {
        ModelNode::List(
            self.segments
                .iter()
                .map(|(key, value)| ModelNode::object().with(key, value.as_str()))
                .collect(),
        )
    }

    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first_value(&self) -> Option<&str> {
        self.segments.first().map(|(_, value)| value.as_str())
    }

    pub fn last_name(&self) -> Option<&str> {
        self.segments.last().map(|(key, _)| key.as_str())
    }

    pub fn last_value(&self) -> Option<&str> {
        self.segments.last().map(|(_, value)| value.as_str())
    }

    /// The parent address; the root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &ResourceAddress) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Replaces the value of every segment named `key`.
    pub fn replace_value(&self, key: &str, new_value: &str) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|(name, value)| {
                    if name == key {
                        (name.clone(), new_value.to_string())
                    } else {
                        (name.clone(), value.clone())
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for (key, value) in &self.segments {
            write!(f, "/{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceAddress;
    use crate::{DmrError, ModelNode};

    #[test]
    fn append_is_persistent_and_validates_segments() {
        let root = ResourceAddress::root();
        let subsystem = root.append("subsystem", "datasources").expect("append");
        assert!(root.is_empty());
        assert_eq!(subsystem.len(), 1);
        assert_eq!(root.append("", "x"), Err(DmrError::EmptySegmentKey));
        assert_eq!(
            root.append("subsystem", " "),
            Err(DmrError::EmptySegmentValue {
                key: "subsystem".to_string()
            })
        );
    }

    #[test]
    fn repeated_keys_at_different_depths_are_allowed() {
        let address = ResourceAddress::parse("/subsystem=foo/database=bar/database=baz")
            .expect("parse");
        assert_eq!(address.len(), 3);
        assert_eq!(address.last_value(), Some("baz"));
        assert_eq!(address.to_string(), "/subsystem=foo/database=bar/database=baz");
    }

    #[test]
    fn parse_handles_root_and_rejects_malformed_parts() {
        assert!(ResourceAddress::parse("").expect("root").is_empty());
        assert!(ResourceAddress::parse("/").expect("root").is_empty());
        assert_eq!(
            ResourceAddress::parse("subsystem=logging")
                .expect("single")
                .first_value(),
            Some("logging")
        );
        assert!(matches!(
            ResourceAddress::parse("/subsystem"),
            Err(DmrError::MalformedAddress(_))
        ));
        assert!(matches!(
            ResourceAddress::parse("/a=b=c"),
            Err(DmrError::MalformedAddress(_))
        ));
    }

    #[test]
    fn model_node_form_round_trips() {
        let address = ResourceAddress::parse("/host=primary/server=server-one").expect("parse");
        let node = address.to_model_node();
        assert_eq!(
            node,
            ModelNode::List(vec![
                ModelNode::object().with("host", "primary"),
                ModelNode::object().with("server", "server-one"),
            ])
        );
        assert_eq!(ResourceAddress::from_model_node(&node).expect("from node"), address);
        assert_eq!(
            ResourceAddress::from_model_node(&ModelNode::Undefined).expect("root"),
            ResourceAddress::root()
        );
    }

    #[test]
    fn navigation_helpers() {
        let address = ResourceAddress::parse("/profile=full/subsystem=ee").expect("parse");
        let parent = address.parent();
        assert_eq!(parent.to_string(), "/profile=full");
        assert!(address.starts_with(&parent));
        assert!(!parent.starts_with(&address));
        assert_eq!(ResourceAddress::root().parent(), ResourceAddress::root());
        assert_eq!(
            address.replace_value("profile", "ha").to_string(),
            "/profile=ha/subsystem=ee"
        );
        assert_eq!(address.last_name(), Some("subsystem"));
    }
}
