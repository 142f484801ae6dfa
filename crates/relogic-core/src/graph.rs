//! LogicGraph: the store of logic nodes and the links between them.
//!
//! [`LogicGraph`] is the single entry point for building and querying the
//! dataflow graph. Nodes live in a petgraph `StableGraph`, so a node keeps its
//! index while other nodes come and go. Each link is one edge from the node
//! owning the source leaf to the node owning the target leaf.
//!
//! # Invariants
//!
//! - The node dependency graph is acyclic. [`create_link`](LogicGraph::create_link)
//!   checks reachability before adding the edge and leaves the graph untouched
//!   when it would close a cycle.
//! - An input leaf has at most one incoming link, and a leaf is flagged as
//!   linked exactly when it has one.
//! - Every topology change (node or link added or removed) bumps
//!   [`topology_version`](LogicGraph::topology_version), which is what
//!   execution-order caches key on.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};

use crate::error::{CoreError, NodeError};
use crate::feature::FeatureLevel;
use crate::id::{LinkId, NodeId};
use crate::kind::{NodeBehavior, NodeKind};
use crate::link::{Link, LinkInfo, PropertyRef};
use crate::node::LogicNode;
use crate::property::{PropertyPath, PropertyTree};
use crate::types::{PropertyValue, Shape, Value};

/// Most unused id slots below the highest live id a graph may be rebuilt
/// with. Each slot costs a placeholder node while the graph is rebuilt.
pub const MAX_ID_GAPS: usize = 1 << 16;

/// The graph store: all logic nodes plus the full link table.
#[derive(Debug)]
pub struct LogicGraph {
    graph: StableGraph<LogicNode, Link, Directed, u32>,
    feature_level: FeatureLevel,
    topology_version: u64,
}

impl LogicGraph {
    /// Creates an empty graph accepting node kinds up to `feature_level`.
    pub fn new(feature_level: FeatureLevel) -> Self {
        LogicGraph {
            graph: StableGraph::new(),
            feature_level,
            topology_version: 0,
        }
    }

    /// Builds a graph whose nodes sit at the given ids.
    ///
    /// Ids need not be contiguous: gaps left by destroyed nodes are recreated
    /// with placeholder nodes that are removed again afterwards, so every id
    /// maps to the same node it did when the graph was taken apart. At most
    /// [`MAX_ID_GAPS`] gaps are accepted.
    pub fn with_nodes_at(
        feature_level: FeatureLevel,
        nodes: BTreeMap<NodeId, LogicNode>,
    ) -> Result<Self, CoreError> {
        let mut graph = LogicGraph::new(feature_level);
        for node in nodes.values() {
            graph.check_feature_level(node.kind())?;
        }

        let Some(max_id) = nodes.keys().next_back().copied() else {
            return Ok(graph);
        };
        let unused = max_id.0 as usize + 1 - nodes.len();
        if unused > MAX_ID_GAPS {
            return Err(CoreError::TooManyIdGaps {
                gaps: unused,
                max: MAX_ID_GAPS,
            });
        }

        let mut nodes = nodes;
        let mut gaps = Vec::new();
        for i in 0..=max_id.0 {
            let node = match nodes.remove(&NodeId(i)) {
                Some(node) => node,
                None => {
                    gaps.push(NodeId(i));
                    LogicNode::new("", Box::new(Placeholder))?
                }
            };
            graph.graph.add_node(node);
        }

        // Remove placeholders in reverse order to keep the free list tidy.
        for &gap in gaps.iter().rev() {
            graph.graph.remove_node(gap.into());
        }

        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    /// Counter bumped on every node or link addition and removal.
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    pub fn node(&self, id: NodeId) -> Option<&LogicNode> {
        self.graph.node_weight(id.into())
    }

    /// Ids of all live nodes in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.graph.node_indices().map(NodeId::from).collect();
        ids.sort();
        ids
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Unused id slots below the highest live id.
    pub fn id_gaps(&self) -> usize {
        self.node_ids()
            .last()
            .map_or(0, |max| max.0 as usize + 1 - self.node_count())
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// First node (by id) with the given name. Names need not be unique.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_ids()
            .into_iter()
            .find(|&id| self.node(id).is_some_and(|n| n.name() == name))
    }

    // -----------------------------------------------------------------------
    // Node methods
    // -----------------------------------------------------------------------

    /// Adds a node built from `behavior`.
    ///
    /// Fails if the behavior's kind needs a higher feature level than this
    /// graph was created with, or if its shapes are malformed.
    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        behavior: Box<dyn NodeBehavior>,
    ) -> Result<NodeId, CoreError> {
        self.check_feature_level(behavior.kind())?;
        let node = LogicNode::new(name, behavior)?;
        let idx = self.graph.add_node(node);
        self.topology_version += 1;
        Ok(NodeId::from(idx))
    }

    /// Removes a node together with every link touching it.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<LogicNode, CoreError> {
        let idx: NodeIndex<u32> = id.into();
        if self.graph.node_weight(idx).is_none() {
            return Err(CoreError::NodeNotFound { id });
        }

        // Unlink the targets this node feeds before its edges disappear.
        let outgoing: Vec<(NodeIndex<u32>, PropertyPath)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().target_path.clone()))
            .collect();
        for (target, path) in outgoing {
            if let Some(node) = self.graph.node_weight_mut(target) {
                if let Ok(leaf) = node.inputs_mut().resolve_mut(&path) {
                    leaf.set_linked(false);
                }
            }
        }

        let mut node = self
            .graph
            .remove_node(idx)
            .ok_or(CoreError::NodeNotFound { id })?;
        let paths: Vec<PropertyPath> = node.inputs().leaves().into_iter().map(|(p, _)| p).collect();
        for path in paths {
            if let Ok(leaf) = node.inputs_mut().resolve_mut(&path) {
                leaf.set_linked(false);
            }
        }
        self.topology_version += 1;
        Ok(node)
    }

    /// Writes an input leaf directly.
    ///
    /// Fails with `ReadOnlyLinkedInput` if the leaf is fed by a link.
    pub fn set_input<T: PropertyValue>(
        &mut self,
        id: NodeId,
        path: &PropertyPath,
        value: T,
    ) -> Result<(), CoreError> {
        self.set_input_value(id, path, value.into_value())
    }

    /// Untyped variant of [`set_input`](Self::set_input).
    pub fn set_input_value(&mut self, id: NodeId, path: &PropertyPath, value: Value) -> Result<(), CoreError> {
        let node = self
            .graph
            .node_weight_mut(id.into())
            .ok_or(CoreError::NodeNotFound { id })?;
        node.inputs_mut().resolve_mut(path)?.set_value(value)
    }

    /// Runs the node's behavior, committing outputs only on success.
    pub fn recompute_node(&mut self, id: NodeId) -> Result<(), NodeError> {
        self.graph
            .node_weight_mut(id.into())
            .ok_or(CoreError::NodeNotFound { id })?
            .recompute()
    }

    /// Copies every output leaf of `id` that feeds a link into its target.
    ///
    /// Returns the target nodes whose inputs actually changed, ascending and
    /// without duplicates.
    pub fn propagate_outputs(&mut self, id: NodeId) -> Vec<NodeId> {
        let idx: NodeIndex<u32> = id.into();
        let Some(source) = self.graph.node_weight(idx) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight().clone()))
            .collect();
        edges.sort_by_key(|(edge, _, _)| edge.index());

        let mut pending = Vec::with_capacity(edges.len());
        for (_, target, link) in edges {
            if let Some(value) = source
                .outputs()
                .resolve(&link.source_path)
                .ok()
                .and_then(|leaf| leaf.value())
            {
                pending.push((target, link.target_path, value.clone()));
            }
        }

        let mut changed = BTreeSet::new();
        for (target, path, value) in pending {
            let Some(node) = self.graph.node_weight_mut(target) else {
                continue;
            };
            if let Ok(leaf) = node.inputs_mut().resolve_mut(&path) {
                if leaf.write_propagated(&value) {
                    changed.insert(NodeId::from(target));
                }
            }
        }
        changed.into_iter().collect()
    }

    // -----------------------------------------------------------------------
    // Link methods
    // -----------------------------------------------------------------------

    /// Links an output leaf of one node to an input leaf of another.
    ///
    /// The target takes the source's current value right away, so neither
    /// node has to run again just to bring the link in sync.
    ///
    /// Rejected, with the graph unchanged, if the target already has a link,
    /// the leaf types differ, or the new edge would close a cycle.
    pub fn create_link(&mut self, source: &PropertyRef, target: &PropertyRef) -> Result<LinkId, CoreError> {
        let source_idx: NodeIndex<u32> = source.node.into();
        let target_idx: NodeIndex<u32> = target.node.into();

        let source_node = self
            .graph
            .node_weight(source_idx)
            .ok_or(CoreError::NodeNotFound { id: source.node })?;
        let target_node = self
            .graph
            .node_weight(target_idx)
            .ok_or(CoreError::NodeNotFound { id: target.node })?;

        let source_leaf = source_node.outputs().resolve(&source.path)?;
        let current = source_leaf.value().cloned();
        if !source_leaf.is_leaf() {
            return Err(CoreError::NotALeaf {
                path: source.path.clone(),
                found: source_leaf.property_type(),
            });
        }
        let target_leaf = target_node.inputs().resolve(&target.path)?;
        if !target_leaf.is_leaf() {
            return Err(CoreError::NotALeaf {
                path: target.path.clone(),
                found: target_leaf.property_type(),
            });
        }
        if target_leaf.is_linked() {
            return Err(CoreError::AlreadyLinked {
                node: target.node,
                path: target.path.clone(),
            });
        }
        if source_leaf.property_type() != target_leaf.property_type() {
            return Err(CoreError::TypeMismatch {
                expected: target_leaf.property_type(),
                found: source_leaf.property_type(),
            });
        }
        if source.node == target.node || has_path_connecting(&self.graph, target_idx, source_idx, None) {
            return Err(CoreError::CyclicLink {
                source_node: source.node,
                target_node: target.node,
            });
        }

        let edge = self.graph.add_edge(
            source_idx,
            target_idx,
            Link {
                source_path: source.path.clone(),
                target_path: target.path.clone(),
            },
        );
        if let Some(node) = self.graph.node_weight_mut(target_idx) {
            let leaf = node.inputs_mut().resolve_mut(&target.path)?;
            leaf.set_linked(true);
            if let Some(value) = &current {
                leaf.write_propagated(value);
            }
        }
        self.topology_version += 1;
        Ok(LinkId::from(edge))
    }

    /// Removes the link feeding `target`, if there is one.
    ///
    /// Returns whether a link was removed. The target keeps its last
    /// propagated value and becomes directly writable again.
    pub fn remove_link(&mut self, target: &PropertyRef) -> Result<bool, CoreError> {
        let target_idx: NodeIndex<u32> = target.node.into();
        if self.graph.node_weight(target_idx).is_none() {
            return Err(CoreError::NodeNotFound { id: target.node });
        }
        let Some(edge) = self.incoming_edge(target_idx, &target.path) else {
            return Ok(false);
        };

        self.graph.remove_edge(edge);
        if let Some(node) = self.graph.node_weight_mut(target_idx) {
            if let Ok(leaf) = node.inputs_mut().resolve_mut(&target.path) {
                leaf.set_linked(false);
            }
        }
        self.topology_version += 1;
        Ok(true)
    }

    /// The source feeding `target`, if it is linked.
    pub fn link_source(&self, target: &PropertyRef) -> Option<PropertyRef> {
        let edge = self.incoming_edge(target.node.into(), &target.path)?;
        let (source, _) = self.graph.edge_endpoints(edge)?;
        let link = self.graph.edge_weight(edge)?;
        Some(PropertyRef::new(NodeId::from(source), link.source_path.clone()))
    }

    /// Returns `true` if the node has any incoming or outgoing link.
    pub fn is_linked(&self, id: NodeId) -> bool {
        let idx: NodeIndex<u32> = id.into();
        self.graph.edges_directed(idx, Direction::Incoming).next().is_some()
            || self.graph.edges_directed(idx, Direction::Outgoing).next().is_some()
    }

    /// All links, ordered by link id.
    pub fn links(&self) -> Vec<LinkInfo> {
        let mut links: Vec<LinkInfo> = self
            .graph
            .edge_references()
            .map(|e| LinkInfo {
                id: LinkId::from(e.id()),
                source: PropertyRef::new(NodeId::from(e.source()), e.weight().source_path.clone()),
                target: PropertyRef::new(NodeId::from(e.target()), e.weight().target_path.clone()),
            })
            .collect();
        links.sort_by_key(|l| l.id.0);
        links
    }

    /// Nodes whose outputs feed `id`, ascending and deduplicated.
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Nodes fed by `id`'s outputs, ascending and deduplicated.
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn check_feature_level(&self, kind: NodeKind) -> Result<(), CoreError> {
        let required = kind.min_feature_level();
        if required > self.feature_level {
            return Err(CoreError::UnsupportedFeatureLevel {
                kind,
                required,
                configured: self.feature_level,
            });
        }
        Ok(())
    }

    fn incoming_edge(&self, target: NodeIndex<u32>, path: &PropertyPath) -> Option<EdgeIndex<u32>> {
        self.graph
            .edges_directed(target, Direction::Incoming)
            .find(|e| &e.weight().target_path == path)
            .map(|e| e.id())
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let set: BTreeSet<NodeId> = self
            .graph
            .neighbors_directed(id.into(), direction)
            .map(NodeId::from)
            .collect();
        set.into_iter().collect()
    }
}

/// Stand-in for ids that are unoccupied while a graph is rebuilt.
#[derive(Debug)]
struct Placeholder;

impl NodeBehavior for Placeholder {
    fn kind(&self) -> NodeKind {
        NodeKind::Interface
    }

    fn input_shape(&self) -> Shape {
        Shape::empty()
    }

    fn output_shape(&self) -> Shape {
        Shape::empty()
    }

    fn recompute(&mut self, _inputs: &PropertyTree, _outputs: &mut PropertyTree) -> Result<(), NodeError> {
        Ok(())
    }
}
