//! Logic nodes.
//!
//! A [`LogicNode`] pairs a [`NodeBehavior`] with the input and output
//! [`PropertyTree`]s built from the behavior's shapes. The trees are owned by
//! the node, so the graph can hand them to the behavior on recompute without
//! the behavior ever holding references into the graph.

use crate::error::{CoreError, NodeError};
use crate::kind::{NodeBehavior, NodeKind};
use crate::property::PropertyTree;

/// A computation unit with one input tree and one output tree.
#[derive(Debug)]
pub struct LogicNode {
    name: String,
    behavior: Box<dyn NodeBehavior>,
    inputs: PropertyTree,
    outputs: PropertyTree,
}

impl LogicNode {
    /// Creates a node whose trees hold default values.
    pub fn new(name: impl Into<String>, behavior: Box<dyn NodeBehavior>) -> Result<Self, CoreError> {
        let inputs = PropertyTree::new(&behavior.input_shape())?;
        let outputs = PropertyTree::new(&behavior.output_shape())?;
        Ok(LogicNode {
            name: name.into(),
            behavior,
            inputs,
            outputs,
        })
    }

    /// Creates a node and restores previously saved leaf values.
    ///
    /// The saved trees must have exactly the shapes the behavior declares.
    pub fn restore(
        name: impl Into<String>,
        behavior: Box<dyn NodeBehavior>,
        saved_inputs: &PropertyTree,
        saved_outputs: &PropertyTree,
    ) -> Result<Self, CoreError> {
        let mut node = LogicNode::new(name, behavior)?;
        if node.inputs.shape() != saved_inputs.shape() || node.outputs.shape() != saved_outputs.shape() {
            return Err(CoreError::ShapeMismatch {
                node_name: node.name,
            });
        }
        node.inputs.copy_values_from(saved_inputs)?;
        node.outputs.copy_values_from(saved_outputs)?;
        Ok(node)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> NodeKind {
        self.behavior.kind()
    }

    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    pub fn inputs(&self) -> &PropertyTree {
        &self.inputs
    }

    pub fn outputs(&self) -> &PropertyTree {
        &self.outputs
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut PropertyTree {
        &mut self.inputs
    }

    /// Runs the behavior. Outputs are only replaced on success.
    pub(crate) fn recompute(&mut self) -> Result<(), NodeError> {
        let mut scratch = self.outputs.clone();
        self.behavior.recompute(&self.inputs, &mut scratch)?;
        self.outputs = scratch;
        Ok(())
    }
}
