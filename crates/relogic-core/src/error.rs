//! Core error types for relogic-core.
//!
//! Uses `thiserror` for structured, matchable variants. Every validation
//! error is raised before any mutation, so the graph is left unchanged when
//! one of these is returned.

use thiserror::Error;

use crate::feature::FeatureLevel;
use crate::id::NodeId;
use crate::kind::NodeKind;
use crate::property::PropertyPath;
use crate::types::PropertyType;

/// Core errors produced by the relogic-core crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A node id does not refer to a live node.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// A struct field name or array index does not exist.
    #[error("no such child: '{child}'")]
    NoSuchChild { child: String },

    /// Two struct fields share a name.
    #[error("duplicate child name: '{name}'")]
    DuplicateChild { name: String },

    /// A value of the wrong type was read or written, or two linked leaves
    /// disagree in type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: PropertyType,
        found: PropertyType,
    },

    /// Saved property trees do not fit the shapes a node kind declares.
    #[error("saved properties of node '{node_name}' do not match its kind's shape")]
    ShapeMismatch { node_name: String },

    /// A direct write hit a leaf whose value is supplied by a link.
    #[error("property '{name}' is a linked input and cannot be set directly")]
    ReadOnlyLinkedInput { name: String },

    /// A link target was requested on a composite property.
    #[error("property at {path} is a {found}, only leaf properties can be linked")]
    NotALeaf {
        path: PropertyPath,
        found: PropertyType,
    },

    /// The target leaf already has an incoming link.
    #[error("input {path} of node {node} is already linked")]
    AlreadyLinked { node: NodeId, path: PropertyPath },

    /// The link would close a cycle in the node dependency graph.
    #[error("linking node {source_node} to node {target_node} would create a cycle")]
    CyclicLink {
        source_node: NodeId,
        target_node: NodeId,
    },

    /// The node kind needs a higher feature level than the engine runs with.
    #[error("node kind {kind} requires feature level {required}, engine runs with {configured}")]
    UnsupportedFeatureLevel {
        kind: NodeKind,
        required: FeatureLevel,
        configured: FeatureLevel,
    },

    /// No factory is registered for a node kind.
    #[error("no factory registered for node kind {kind}")]
    UnknownNodeKind { kind: NodeKind },

    /// Rebuilding at the given ids would need too many placeholder nodes.
    #[error("node ids leave {gaps} unused slots, at most {max} are supported")]
    TooManyIdGaps { gaps: usize, max: usize },

    /// A kind factory rejected the saved state it was given.
    #[error("cannot restore {kind} node: {message}")]
    InvalidKindState { kind: NodeKind, message: String },
}

/// Failure reported by a node kind's `recompute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NodeError {
    pub message: String,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        NodeError {
            message: message.into(),
        }
    }
}

impl From<CoreError> for NodeError {
    fn from(err: CoreError) -> Self {
        NodeError::new(err.to_string())
    }
}
