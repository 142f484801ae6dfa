//! Links between output and input leaves.
//!
//! A [`Link`] is the weight of a petgraph edge running from the node that owns
//! the source leaf to the node that owns the target leaf. Leaves are addressed
//! by [`PropertyPath`], never by reference, so links survive moves of the
//! nodes they connect and serialize as plain indices.

use serde::{Deserialize, Serialize};

use crate::id::{LinkId, NodeId};
use crate::property::PropertyPath;

/// Address of a leaf property: a node plus a path into one of its trees.
///
/// Whether the path points into the input or the output tree depends on where
/// the reference is used: link sources are outputs, link targets are inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyRef {
    pub node: NodeId,
    pub path: PropertyPath,
}

impl PropertyRef {
    pub fn new(node: NodeId, path: PropertyPath) -> Self {
        PropertyRef { node, path }
    }
}

/// Edge weight stored in the graph for each link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Leaf in the source node's output tree.
    pub source_path: PropertyPath,
    /// Leaf in the target node's input tree.
    pub target_path: PropertyPath,
}

/// A resolved view of one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub id: LinkId,
    pub source: PropertyRef,
    pub target: PropertyRef,
}
