use crate::names::{COMPOSITE, STEPS};
use crate::{ModelNode, Operation, ResourceAddress};

/// A batch of operations executed atomically by the server as one `composite` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composite {
    steps: Vec<Operation>,
}

impl Composite {
    pub fn new(steps: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn step(mut self, operation: Operation) -> Self {
        self.steps.push(operation);
        self
    }

    pub fn add(&mut self, operation: Operation) {
        self.steps.push(operation);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.steps.iter()
    }

    /// The `composite` operation at the root address carrying every step envelope.
    pub fn to_operation(&self) -> Operation {
        let steps = ModelNode::List(self.steps.iter().map(Operation::to_model_node).collect());
        Operation::with_parameters(
            COMPOSITE,
            ResourceAddress::root(),
            ModelNode::object().with(STEPS, steps),
        )
    }
}

impl<'a> IntoIterator for &'a Composite {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Per-step results of a composite call, keyed `step-1`, `step-2`, ... on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeResult {
    result: ModelNode,
}

impl CompositeResult {
    pub fn new(result: ModelNode) -> Self {
        Self { result }
    }

    /// Zero-based access to the response of step `index`.
    pub fn step(&self, index: usize) -> Option<&ModelNode> {
        self.result.get(&format!("step-{}", index + 1))
    }

    pub fn len(&self) -> usize {
        self.result
            .as_property_list()
            .iter()
            .filter(|(name, _)| name.starts_with("step-"))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelNode> {
        (0..self.len()).filter_map(move |index| self.step(index))
    }

    pub fn into_inner(self) -> ModelNode {
        self.result
    }
}
