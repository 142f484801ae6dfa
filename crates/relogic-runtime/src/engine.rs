//! LogicEngine: the single entry point for building, running and persisting
//! a logic graph.
//!
//! The engine owns the graph, the scheduler that tracks which nodes need to
//! run, and the registry of kind factories used when loading. Every mutation
//! goes through the engine so that dirty state stays in step with the graph.

use std::io::{Read, Write};

use relogic_core::{
    CoreError, FeatureLevel, KindRegistry, LinkId, LogicGraph, LogicNode, NodeBehavior, NodeError, NodeId,
    NodeKind, PropertyPath, PropertyRef, PropertyValue, Value,
};
use relogic_storage::{decode, encode, LoadOptions, StorageError, Version};

use crate::config::EngineConfig;
use crate::error::UpdateError;
use crate::kinds::register_builtin;
use crate::scheduler::{Scheduler, UpdateReport};

/// Version of this engine, written into every saved container.
pub fn engine_version() -> Version {
    Version::new(
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
        option_env!("CARGO_PKG_VERSION_PRE").unwrap_or(""),
    )
}

pub struct LogicEngine {
    config: EngineConfig,
    graph: LogicGraph,
    scheduler: Scheduler,
    registry: KindRegistry,
}

impl Default for LogicEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl LogicEngine {
    /// Creates an empty engine. Built-in kinds are registered for loading.
    pub fn new(config: EngineConfig) -> Self {
        let mut registry = KindRegistry::new();
        register_builtin(&mut registry);
        tracing::debug!(feature_level = %config.feature_level, "creating logic engine");
        LogicEngine {
            graph: LogicGraph::new(config.feature_level),
            scheduler: Scheduler::new(),
            registry,
            config,
        }
    }

    pub fn with_feature_level(feature_level: FeatureLevel) -> Self {
        Self::new(EngineConfig::with_feature_level(feature_level))
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.config.feature_level
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &LogicGraph {
        &self.graph
    }

    pub fn node(&self, id: NodeId) -> Option<&LogicNode> {
        self.graph.node(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.graph.find_by_name(name)
    }

    pub fn is_linked(&self, id: NodeId) -> bool {
        self.graph.is_linked(id)
    }

    /// Whether `id` will run in the next update.
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.scheduler.is_dirty(id)
    }

    /// Registers the factory that restores nodes of `kind` on load.
    ///
    /// Replaces any earlier factory, built-in ones included.
    pub fn register_kind<F>(&mut self, kind: NodeKind, factory: F)
    where
        F: Fn(&[u8]) -> Result<Box<dyn NodeBehavior>, NodeError> + 'static,
    {
        self.registry.register(kind, factory);
    }

    // -----------------------------------------------------------------------
    // Graph mutations
    // -----------------------------------------------------------------------

    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        behavior: Box<dyn NodeBehavior>,
    ) -> Result<NodeId, CoreError> {
        let name = name.into();
        let kind = behavior.kind();
        let id = self.graph.create_node(name.clone(), behavior)?;
        self.scheduler.mark_dirty(id);
        tracing::debug!(node = %id, name = %name, kind = %kind, "created node");
        Ok(id)
    }

    pub fn destroy_node(&mut self, id: NodeId) -> Result<LogicNode, CoreError> {
        let node = self.graph.destroy_node(id)?;
        self.scheduler.forget(id);
        tracing::debug!(node = %id, name = node.name(), "destroyed node");
        Ok(node)
    }

    /// Links an output leaf to an input leaf.
    ///
    /// The target takes the source's current value right away and runs in
    /// the next update. The source does not run again.
    pub fn create_link(&mut self, source: &PropertyRef, target: &PropertyRef) -> Result<LinkId, CoreError> {
        let link = self.graph.create_link(source, target)?;
        self.scheduler.mark_dirty(target.node);
        tracing::debug!(
            source = %source.node,
            source_path = %source.path,
            target = %target.node,
            target_path = %target.path,
            "created link"
        );
        Ok(link)
    }

    /// Unlinks an input leaf. The input keeps the last value it received.
    pub fn remove_link(&mut self, target: &PropertyRef) -> Result<bool, CoreError> {
        let removed = self.graph.remove_link(target)?;
        if removed {
            tracing::debug!(target = %target.node, target_path = %target.path, "removed link");
        }
        Ok(removed)
    }

    pub fn set_input<T: PropertyValue>(&mut self, id: NodeId, path: &PropertyPath, value: T) -> Result<(), CoreError> {
        self.graph.set_input(id, path, value)?;
        self.scheduler.mark_dirty(id);
        Ok(())
    }

    pub fn set_input_value(&mut self, id: NodeId, path: &PropertyPath, value: Value) -> Result<(), CoreError> {
        self.graph.set_input_value(id, path, value)?;
        self.scheduler.mark_dirty(id);
        Ok(())
    }

    /// Schedules `id` to run in the next update even if nothing changed.
    pub fn mark_dirty(&mut self, id: NodeId) -> Result<(), CoreError> {
        if self.graph.node(id).is_none() {
            return Err(CoreError::NodeNotFound { id });
        }
        self.scheduler.mark_dirty(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Runs every dirty node, dependencies first.
    ///
    /// A failing node does not stop the pass: nodes that do not depend on it
    /// still run. The error lists every failed and skipped node.
    pub fn update(&mut self) -> Result<UpdateReport, UpdateError> {
        let result = self.scheduler.update(&mut self.graph);
        if let Err(err) = &result {
            tracing::warn!(
                failed = err.failed().count(),
                skipped = err.skipped().count(),
                "update finished with failures"
            );
        }
        result
    }

    /// The order in which nodes run, dependencies first.
    pub fn execution_order(&mut self) -> Vec<NodeId> {
        self.scheduler.execution_order(&self.graph).to_vec()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save_to_vec(&self) -> Result<Vec<u8>, StorageError> {
        encode(&self.graph, &self.config.host_version, &engine_version())
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), StorageError> {
        let bytes = self.save_to_vec()?;
        writer.write_all(&bytes)?;
        tracing::info!(
            nodes = self.graph.node_count(),
            links = self.graph.link_count(),
            bytes = bytes.len(),
            "saved logic graph"
        );
        Ok(())
    }

    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<(), StorageError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.load_from_slice(&bytes)
    }

    /// Replaces the current graph with the one stored in `bytes`.
    ///
    /// On error the current graph, its dirty state and its cached order are
    /// left exactly as they were. On success every loaded node is dirty.
    pub fn load_from_slice(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let options = LoadOptions {
            feature_level: self.config.feature_level,
            host_version: &self.config.host_version,
            registry: &self.registry,
        };
        let decoded = match decode(bytes, &options) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(error = %err, bytes = bytes.len(), "rejected logic graph");
                return Err(err);
            }
        };

        let mut scheduler = Scheduler::new();
        scheduler.mark_all_dirty(&decoded.graph);
        self.graph = decoded.graph;
        self.scheduler = scheduler;
        tracing::info!(
            nodes = self.graph.node_count(),
            links = self.graph.link_count(),
            engine_version = %decoded.header.engine_version,
            "loaded logic graph"
        );
        Ok(())
    }

    /// Reads the feature level a saved graph was written for, without
    /// loading it.
    pub fn peek_feature_level(bytes: &[u8]) -> Result<FeatureLevel, StorageError> {
        relogic_storage::peek_feature_level(bytes)
    }
}
