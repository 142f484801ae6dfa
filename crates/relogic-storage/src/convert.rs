//! Decompose/recompose conversions between a LogicGraph and its saved form.
//!
//! [`decompose`] flattens a [`LogicGraph`] into a [`SavedGraph`]: nodes in
//! ascending id order, links in link-id order with endpoints given as
//! positions in the node list. [`recompose`] rebuilds a graph from one,
//! restoring every node at its original id and re-validating every link.

use std::collections::{BTreeMap, HashMap};

use relogic_core::{
    CoreError, FeatureLevel, KindRegistry, LogicGraph, LogicNode, NodeId, NodeKind, PropertyPath, PropertyRef,
    PropertyTree,
};

use crate::error::StorageError;

/// A node as it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedNode {
    /// Runtime id, restored on load so gaps left by destroyed nodes survive.
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    /// Opaque state from [`NodeBehavior::save_state`](relogic_core::NodeBehavior::save_state).
    pub state: Vec<u8>,
    pub inputs: PropertyTree,
    pub outputs: PropertyTree,
}

/// A link as it is stored. Endpoints are positions in [`SavedGraph::nodes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLink {
    pub source: u32,
    pub source_path: PropertyPath,
    pub target: u32,
    pub target_path: PropertyPath,
}

/// All nodes and links of a graph, flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedGraph {
    pub nodes: Vec<SavedNode>,
    pub links: Vec<SavedLink>,
}

/// Flattens a graph into its saved form.
///
/// Fails if a node's behavior cannot produce its saved state.
pub fn decompose(graph: &LogicGraph) -> Result<SavedGraph, StorageError> {
    let mut positions = HashMap::new();
    let mut nodes = Vec::with_capacity(graph.node_count());
    for id in graph.node_ids() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let state = node.behavior().save_state().map_err(|err| {
            StorageError::unsavable(format!("node {id} '{}': {err}", node.name()))
        })?;
        positions.insert(id, nodes.len() as u32);
        nodes.push(SavedNode {
            id,
            kind: node.kind(),
            name: node.name().to_string(),
            state,
            inputs: node.inputs().clone(),
            outputs: node.outputs().clone(),
        });
    }

    let links = graph
        .links()
        .into_iter()
        .filter_map(|link| {
            Some(SavedLink {
                source: *positions.get(&link.source.node)?,
                source_path: link.source.path,
                target: *positions.get(&link.target.node)?,
                target_path: link.target.path,
            })
        })
        .collect();

    Ok(SavedGraph { nodes, links })
}

/// Rebuilds a graph at `level`, instantiating each node through `registry`.
///
/// Nodes are restored in saved order at their saved ids, then links are
/// re-created in saved order. Any dangling or invalid reference fails the
/// whole rebuild; nothing outside the returned graph is touched.
pub fn recompose(
    saved: SavedGraph,
    level: FeatureLevel,
    registry: &KindRegistry,
) -> Result<LogicGraph, StorageError> {
    let ids: Vec<NodeId> = saved.nodes.iter().map(|n| n.id).collect();

    let mut nodes = BTreeMap::new();
    for (position, node) in saved.nodes.into_iter().enumerate() {
        if nodes.contains_key(&node.id) {
            return Err(StorageError::corrupt(format!(
                "node #{position} reuses node id {}",
                node.id
            )));
        }
        let behavior = registry
            .instantiate(node.kind, &node.state)
            .map_err(|err| match err {
                CoreError::UnknownNodeKind { kind } => StorageError::UnregisteredNodeKind { kind },
                other => StorageError::corrupt(format!("node #{position} '{}': {other}", node.name)),
            })?;
        let restored = LogicNode::restore(node.name, behavior, &node.inputs, &node.outputs)
            .map_err(|err| StorageError::corrupt(format!("node #{position}: {err}")))?;
        nodes.insert(node.id, restored);
    }

    let mut graph = LogicGraph::with_nodes_at(level, nodes)
        .map_err(|err| StorageError::corrupt(format!("saved nodes do not fit the engine: {err}")))?;

    for (index, link) in saved.links.into_iter().enumerate() {
        let endpoint = |position: u32| {
            ids.get(position as usize).copied().ok_or_else(|| {
                StorageError::corrupt(format!(
                    "link #{index} references node position {position}, but only {} nodes were saved",
                    ids.len()
                ))
            })
        };
        let source = PropertyRef::new(endpoint(link.source)?, link.source_path);
        let target = PropertyRef::new(endpoint(link.target)?, link.target_path);
        graph.create_link(&source, &target).map_err(|err| {
            StorageError::corrupt(format!(
                "link #{index} from node {} property {} to node {} property {}: {err}",
                source.node, source.path, target.node, target.path
            ))
        })?;
    }

    Ok(graph)
}
