//! Data model of the relogic execution graph.
//!
//! - [`property`]: typed, fixed-shape property trees
//! - [`kind`]: the node-kind contract and the factory registry
//! - [`node`]: logic nodes owning an input and an output tree
//! - [`graph`]: the graph store with link validation and propagation

pub mod error;
pub mod feature;
pub mod graph;
pub mod id;
pub mod kind;
pub mod link;
pub mod node;
pub mod property;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, NodeError};
pub use feature::FeatureLevel;
pub use graph::{LogicGraph, MAX_ID_GAPS};
pub use id::{LinkId, NodeId};
pub use kind::{KindFactory, KindRegistry, NodeBehavior, NodeKind};
pub use link::{Link, LinkInfo, PropertyRef};
pub use node::LogicNode;
pub use property::{Property, PropertyPath, PropertyTree};
pub use types::{PropertyType, PropertyValue, Shape, Value};
