//! Runtime for relogic graphs.
//!
//! [`LogicEngine`] ties together the graph store from `relogic-core`, the
//! persistence layer from `relogic-storage` and the update [`Scheduler`]:
//!
//! - [`engine`]: the engine facade, mutations, update, save and load
//! - [`scheduler`]: cached execution order, dirty tracking, failure isolation
//! - [`kinds`]: built-in node kinds and their restoring factories
//! - [`config`]: engine configuration from JSON or the environment
//! - [`error`]: update and configuration errors

pub mod config;
pub mod engine;
pub mod error;
pub mod kinds;
pub mod scheduler;

pub use config::{EngineConfig, FEATURE_LEVEL_ENV, HOST_VERSION};
pub use engine::{engine_version, LogicEngine};
pub use error::{ConfigError, FailureCause, NodeFailure, UpdateError};
pub use scheduler::{Scheduler, UpdateReport};

// Types callers need to drive an engine without depending on the lower crates.
pub use relogic_core::{
    CoreError, FeatureLevel, NodeBehavior, NodeError, NodeId, NodeKind, PropertyPath, PropertyRef, PropertyTree,
    PropertyType, Shape, Value,
};
pub use relogic_storage::{FileAge, StorageError, Version};
