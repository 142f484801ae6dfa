//! The node-kind contract.
//!
//! Every logic node delegates its computation to a [`NodeBehavior`]. The graph
//! and the scheduler only ever use the methods of this trait; script bodies,
//! timers, animations and host-engine bindings all live behind it.
//!
//! [`KindRegistry`] maps each [`NodeKind`] to a factory that rebuilds a
//! behavior from the opaque state bytes it saved, which is how nodes are
//! restored when a graph is loaded.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, NodeError};
use crate::feature::FeatureLevel;
use crate::property::PropertyTree;
use crate::types::Shape;

/// The kind tag of a logic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Script,
    Interface,
    Timer,
    Animation,
    NodeBinding,
    AppearanceBinding,
    CameraBinding,
    RenderPassBinding,
    AnchorPoint,
}

impl NodeKind {
    pub const ALL: [NodeKind; 9] = [
        NodeKind::Script,
        NodeKind::Interface,
        NodeKind::Timer,
        NodeKind::Animation,
        NodeKind::NodeBinding,
        NodeKind::AppearanceBinding,
        NodeKind::CameraBinding,
        NodeKind::RenderPassBinding,
        NodeKind::AnchorPoint,
    ];

    /// Stable one-byte tag used by the binary format.
    pub fn tag(self) -> u8 {
        match self {
            NodeKind::Script => 0,
            NodeKind::Interface => 1,
            NodeKind::Timer => 2,
            NodeKind::Animation => 3,
            NodeKind::NodeBinding => 4,
            NodeKind::AppearanceBinding => 5,
            NodeKind::CameraBinding => 6,
            NodeKind::RenderPassBinding => 7,
            NodeKind::AnchorPoint => 8,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// The lowest feature level at which this kind exists.
    pub fn min_feature_level(self) -> FeatureLevel {
        match self {
            NodeKind::RenderPassBinding | NodeKind::AnchorPoint => FeatureLevel::Level02,
            _ => FeatureLevel::Level01,
        }
    }

    /// Returns `true` for kinds that drive objects of the host engine.
    pub fn is_binding(self) -> bool {
        matches!(
            self,
            NodeKind::NodeBinding
                | NodeKind::AppearanceBinding
                | NodeKind::CameraBinding
                | NodeKind::RenderPassBinding
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a logic node computes.
///
/// Shapes must not change over the behavior's lifetime: the graph builds the
/// node's property trees from them once, at construction.
pub trait NodeBehavior: fmt::Debug {
    fn kind(&self) -> NodeKind;

    fn input_shape(&self) -> Shape;

    fn output_shape(&self) -> Shape;

    /// Computes outputs from inputs.
    ///
    /// `outputs` is a scratch copy; it is only committed to the node if this
    /// returns `Ok`, so a failing behavior never leaves partial outputs behind.
    fn recompute(&mut self, inputs: &PropertyTree, outputs: &mut PropertyTree) -> Result<(), NodeError>;

    /// Behaviors driven by something outside the graph (a wall clock, say)
    /// return `true` to run on every update.
    fn always_dirty(&self) -> bool {
        false
    }

    /// Opaque state needed to rebuild this behavior through its kind factory.
    ///
    /// An error aborts the save that asked for it.
    fn save_state(&self) -> Result<Vec<u8>, NodeError> {
        Ok(Vec::new())
    }
}

/// Rebuilds a behavior from the bytes its [`NodeBehavior::save_state`] produced.
pub type KindFactory = Box<dyn Fn(&[u8]) -> Result<Box<dyn NodeBehavior>, NodeError>>;

/// Factories for every node kind an engine can restore.
#[derive(Default)]
pub struct KindRegistry {
    factories: HashMap<NodeKind, KindFactory>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the factory for `kind`.
    pub fn register<F>(&mut self, kind: NodeKind, factory: F)
    where
        F: Fn(&[u8]) -> Result<Box<dyn NodeBehavior>, NodeError> + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Rebuilds a behavior of `kind` from saved state.
    pub fn instantiate(&self, kind: NodeKind, state: &[u8]) -> Result<Box<dyn NodeBehavior>, CoreError> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or(CoreError::UnknownNodeKind { kind })?;
        let behavior = factory(state).map_err(|err| CoreError::InvalidKindState {
            kind,
            message: err.message,
        })?;
        if behavior.kind() != kind {
            return Err(CoreError::InvalidKindState {
                kind,
                message: format!("factory produced a {} node", behavior.kind()),
            });
        }
        Ok(behavior)
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_by_key(|k| k.tag());
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyType;

    #[derive(Debug)]
    struct Constant(i32);

    impl NodeBehavior for Constant {
        fn kind(&self) -> NodeKind {
            NodeKind::Script
        }

        fn input_shape(&self) -> Shape {
            Shape::empty()
        }

        fn output_shape(&self) -> Shape {
            Shape::structure([("value", Shape::Leaf(PropertyType::Int32))])
        }

        fn recompute(&mut self, _inputs: &PropertyTree, outputs: &mut PropertyTree) -> Result<(), NodeError> {
            outputs.child_mut("value")?.set(self.0)?;
            Ok(())
        }

        fn save_state(&self) -> Result<Vec<u8>, NodeError> {
            Ok(self.0.to_le_bytes().to_vec())
        }
    }

    fn constant_factory(state: &[u8]) -> Result<Box<dyn NodeBehavior>, NodeError> {
        let bytes: [u8; 4] = state
            .try_into()
            .map_err(|_| NodeError::new("expected four bytes"))?;
        Ok(Box::new(Constant(i32::from_le_bytes(bytes))))
    }

    #[test]
    fn tags_roundtrip() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(NodeKind::from_tag(200), None);
    }

    #[test]
    fn level_two_kinds() {
        assert_eq!(NodeKind::AnchorPoint.min_feature_level(), FeatureLevel::Level02);
        assert_eq!(NodeKind::RenderPassBinding.min_feature_level(), FeatureLevel::Level02);
        assert_eq!(NodeKind::Timer.min_feature_level(), FeatureLevel::Level01);
        assert!(NodeKind::CameraBinding.is_binding());
        assert!(!NodeKind::AnchorPoint.is_binding());
    }

    #[test]
    fn registry_rebuilds_saved_state() {
        let mut registry = KindRegistry::new();
        registry.register(NodeKind::Script, constant_factory);

        let original = Constant(42);
        let mut rebuilt = registry
            .instantiate(NodeKind::Script, &original.save_state().unwrap())
            .unwrap();

        let mut outputs = PropertyTree::new(&rebuilt.output_shape()).unwrap();
        rebuilt.recompute(&PropertyTree::empty(), &mut outputs).unwrap();
        assert_eq!(outputs.child("value").unwrap().get::<i32>().unwrap(), 42);
    }

    #[test]
    fn registry_reports_missing_and_bad_state() {
        let mut registry = KindRegistry::new();
        assert_eq!(
            registry.instantiate(NodeKind::Timer, &[]).unwrap_err(),
            CoreError::UnknownNodeKind {
                kind: NodeKind::Timer
            }
        );

        registry.register(NodeKind::Script, constant_factory);
        assert!(matches!(
            registry.instantiate(NodeKind::Script, &[1, 2]),
            Err(CoreError::InvalidKindState { .. })
        ));
    }

    #[test]
    fn factory_must_produce_its_own_kind() {
        let mut registry = KindRegistry::new();
        registry.register(NodeKind::Timer, constant_factory);
        assert!(matches!(
            registry.instantiate(NodeKind::Timer, &7i32.to_le_bytes()),
            Err(CoreError::InvalidKindState { .. })
        ));
    }
}
