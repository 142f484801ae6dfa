//! Interface nodes: a named, typed entry point into a graph.

use relogic_core::{NodeBehavior, NodeError, NodeKind, PropertyTree, Shape};

/// Mirrors every input leaf to the output leaf at the same path.
///
/// The shape is chosen by the caller and persisted as JSON.
#[derive(Debug, Clone)]
pub struct Interface {
    shape: Shape,
}

impl Interface {
    pub fn new(shape: Shape) -> Self {
        Interface { shape }
    }

    pub fn from_state(state: &[u8]) -> Result<Self, NodeError> {
        serde_json::from_slice(state)
            .map(Interface::new)
            .map_err(|e| NodeError::new(format!("invalid interface shape: {e}")))
    }
}

impl NodeBehavior for Interface {
    fn kind(&self) -> NodeKind {
        NodeKind::Interface
    }

    fn input_shape(&self) -> Shape {
        self.shape.clone()
    }

    fn output_shape(&self) -> Shape {
        self.shape.clone()
    }

    fn recompute(&mut self, inputs: &PropertyTree, outputs: &mut PropertyTree) -> Result<(), NodeError> {
        outputs.copy_values_from(inputs)?;
        Ok(())
    }

    fn save_state(&self) -> Result<Vec<u8>, NodeError> {
        serde_json::to_vec(&self.shape).map_err(|e| NodeError::new(format!("cannot encode interface shape: {e}")))
    }
}
