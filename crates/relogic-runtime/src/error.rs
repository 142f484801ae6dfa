//! Runtime error types for relogic-runtime.
//!
//! Graph mutations report [`relogic_core::CoreError`] and persistence reports
//! [`relogic_storage::StorageError`]; this module adds the errors owned by
//! the runtime itself: failed update passes and bad configuration.

use std::fmt;

use thiserror::Error;

use relogic_core::{NodeError, NodeId};

/// Why a node did not produce fresh outputs in an update pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The node's own recompute failed.
    Failed(NodeError),
    /// An upstream node failed, so this node did not run.
    Skipped { root: NodeId },
}

/// One entry of a failed update's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node: NodeId,
    pub name: String,
    pub cause: FailureCause,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            FailureCause::Failed(err) => write!(f, "node {} '{}' failed: {err}", self.node, self.name),
            FailureCause::Skipped { root } => write!(
                f,
                "node {} '{}' skipped: upstream node {root} failed",
                self.node, self.name
            ),
        }
    }
}

/// An update pass in which at least one node failed or was skipped.
///
/// Entries are in execution order. Every node not listed here ran normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("update failed for {} node(s)", .failures.len())]
pub struct UpdateError {
    pub failures: Vec<NodeFailure>,
}

impl UpdateError {
    /// Nodes whose own recompute failed.
    pub fn failed(&self) -> impl Iterator<Item = &NodeFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.cause, FailureCause::Failed(_)))
    }

    /// Nodes that did not run because something upstream failed.
    pub fn skipped(&self) -> impl Iterator<Item = &NodeFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.cause, FailureCause::Skipped { .. }))
    }
}

/// Errors from reading an engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text is not valid JSON for an [`EngineConfig`](crate::EngineConfig).
    #[error("invalid engine configuration: {0}")]
    Json(#[from] serde_json::Error),
}
