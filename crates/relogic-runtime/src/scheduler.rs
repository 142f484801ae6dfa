//! Update scheduler.
//!
//! The scheduler decides which nodes run in an update pass and in which
//! order. Dependencies always run before their dependents.
//!
//! # Algorithm
//!
//! 1. The execution order is a topological sort of the node dependency graph
//!    (Kahn's algorithm, ready nodes taken by ascending id). It is cached and
//!    only rebuilt when the graph's topology version moves.
//! 2. Dirty nodes are queued by their rank in that order. Only queued nodes
//!    are visited, so a pass costs time in the number of dirty nodes, not in
//!    the size of the graph.
//! 3. A node that runs successfully pushes its outputs over its links; every
//!    target whose input changed is queued for this same pass.
//! 4. A node that fails keeps its old outputs, propagates nothing, and stays
//!    dirty. Everything downstream of it is skipped for this pass.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, VecDeque};

use relogic_core::{LogicGraph, NodeId};

use crate::error::{FailureCause, NodeFailure, UpdateError};

/// Outcome of a fully successful update pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Nodes that recomputed, in execution order.
    pub executed: Vec<NodeId>,
}

#[derive(Debug)]
struct ExecutionOrder {
    topology_version: u64,
    order: Vec<NodeId>,
    rank: HashMap<NodeId, usize>,
}

impl ExecutionOrder {
    fn compute(graph: &LogicGraph) -> Self {
        let ids = graph.node_ids();
        let mut in_degree: HashMap<NodeId, usize> =
            ids.iter().map(|&id| (id, graph.dependencies(id).len())).collect();

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(ids.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for dependent in graph.dependents(id) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        let rank = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        ExecutionOrder {
            topology_version: graph.topology_version(),
            order,
            rank,
        }
    }
}

/// Execution-order cache plus dirty tracking for one graph.
#[derive(Debug, Default)]
pub struct Scheduler {
    cache: Option<ExecutionOrder>,
    dirty: BTreeSet<NodeId>,
    /// Nodes whose behavior asks to run on every update.
    free_running: BTreeSet<NodeId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `id` for the next update.
    pub fn mark_dirty(&mut self, id: NodeId) {
        self.dirty.insert(id);
    }

    /// Schedules every node of `graph`.
    pub fn mark_all_dirty(&mut self, graph: &LogicGraph) {
        self.dirty.extend(graph.node_ids());
    }

    /// Drops all state kept for a destroyed node.
    pub fn forget(&mut self, id: NodeId) {
        self.dirty.remove(&id);
        self.free_running.remove(&id);
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.dirty.contains(&id) || self.free_running.contains(&id)
    }

    /// The cached execution order, rebuilt first if the topology changed.
    pub fn execution_order(&mut self, graph: &LogicGraph) -> &[NodeId] {
        self.refresh(graph);
        self.cache.as_ref().map(|c| c.order.as_slice()).unwrap_or_default()
    }

    fn refresh(&mut self, graph: &LogicGraph) {
        let stale = self
            .cache
            .as_ref()
            .is_none_or(|c| c.topology_version != graph.topology_version());
        if stale {
            tracing::debug!(version = graph.topology_version(), "rebuilding execution order");
            self.cache = Some(ExecutionOrder::compute(graph));
        }
    }

    /// Runs one update pass over `graph`.
    ///
    /// Returns `Ok` only if no node failed or was skipped. Either way every
    /// node that could run has run, and no node holds partial outputs.
    pub fn update(&mut self, graph: &mut LogicGraph) -> Result<UpdateReport, UpdateError> {
        self.refresh(graph);
        let Some(cache) = self.cache.as_ref() else {
            return Ok(UpdateReport::default());
        };

        let mut queue: BTreeSet<usize> = self
            .dirty
            .iter()
            .chain(&self.free_running)
            .filter_map(|id| cache.rank.get(id).copied())
            .collect();

        let mut executed = Vec::new();
        let mut failures = Vec::new();
        let mut skipped: HashMap<NodeId, NodeId> = HashMap::new();

        while let Some(rank) = queue.pop_first() {
            let id = cache.order[rank];
            let name = graph.node(id).map(|n| n.name().to_string()).unwrap_or_default();

            if let Some(&root) = skipped.get(&id) {
                tracing::trace!(node = %id, name = %name, root = %root, "skipping node");
                failures.push(NodeFailure {
                    node: id,
                    name,
                    cause: FailureCause::Skipped { root },
                });
                continue;
            }

            tracing::trace!(node = %id, name = %name, "recomputing node");
            match graph.recompute_node(id) {
                Ok(()) => {
                    executed.push(id);
                    self.dirty.remove(&id);
                    if graph.node(id).is_some_and(|n| n.behavior().always_dirty()) {
                        self.free_running.insert(id);
                    } else {
                        self.free_running.remove(&id);
                    }
                    for target in graph.propagate_outputs(id) {
                        self.dirty.insert(target);
                        if let Some(&r) = cache.rank.get(&target) {
                            queue.insert(r);
                        }
                    }
                }
                Err(err) => {
                    tracing::trace!(node = %id, name = %name, error = %err, "node failed");
                    failures.push(NodeFailure {
                        node: id,
                        name,
                        cause: FailureCause::Failed(err),
                    });
                    for downstream in downstream_of(graph, id) {
                        if skipped.contains_key(&downstream) {
                            continue;
                        }
                        skipped.insert(downstream, id);
                        if let Some(&r) = cache.rank.get(&downstream) {
                            queue.insert(r);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            executed = executed.len(),
            failed = failures.len() - skipped.len(),
            skipped = skipped.len(),
            "update pass finished"
        );

        if failures.is_empty() {
            Ok(UpdateReport { executed })
        } else {
            Err(UpdateError { failures })
        }
    }
}

/// Every node reachable from `id` over links, excluding `id` itself.
fn downstream_of(graph: &LogicGraph, id: NodeId) -> Vec<NodeId> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<NodeId> = graph.dependents(id).into();
    while let Some(next) = queue.pop_front() {
        if seen.insert(next) {
            queue.extend(graph.dependents(next));
        }
    }
    seen.into_iter().collect()
}
