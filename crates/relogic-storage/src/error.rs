//! Storage error types for relogic-storage.
//!
//! [`StorageError`] has one variant per load-pipeline stage, so a caller can
//! tell exactly which check rejected a file and with which values.

use std::fmt;

use thiserror::Error;

use relogic_core::{FeatureLevel, NodeKind};

use crate::header::Version;

/// Whether a rejected file was written for a lower or a higher feature level
/// than the engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAge {
    Older,
    Newer,
}

impl fmt::Display for FileAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAge::Older => f.write_str("older"),
            FileAge::Newer => f.write_str("newer"),
        }
    }
}

/// Errors produced while saving, loading or peeking a container.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The leading identifier bytes are not the product prefix.
    #[error("not relogic content: expected file bytes 0-1 to be 'rl', but found '{found}'")]
    NotThisProduct { found: String },

    /// The buffer is truncated, malformed, or internally inconsistent.
    #[error("corrupt data: {reason}")]
    CorruptData { reason: String },

    /// The file was written against a different host-engine major version.
    #[error(
        "incompatible host version: expected major version {expected_major} but found {found_major} (file version {found})"
    )]
    IncompatibleHostVersion {
        expected_major: u32,
        found_major: u32,
        found: Version,
    },

    /// The identifier's feature-level tag differs from the engine's level.
    #[error(
        "feature level mismatch: loaded file with feature level {file:02} but the engine runs with feature level {engine} (file is {age})"
    )]
    FeatureLevelMismatch {
        file: u8,
        engine: FeatureLevel,
        age: FileAge,
    },

    /// The stored feature level is not one this build knows.
    #[error("unknown feature level {raw:02}")]
    UnknownFeatureLevel { raw: u8 },

    /// A saved node's kind has no factory to rebuild it.
    #[error("no factory registered for node kind {kind}")]
    UnregisteredNodeKind { kind: NodeKind },

    /// The graph cannot be represented in the container format.
    #[error("cannot save graph: {reason}")]
    Unsavable { reason: String },

    /// Writing to the sink or reading from the source failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn unsavable(reason: impl Into<String>) -> Self {
        StorageError::Unsavable {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        StorageError::CorruptData {
            reason: reason.into(),
        }
    }

    /// Corrupt data found at a known byte offset.
    pub(crate) fn corrupt_at(offset: usize, reason: impl fmt::Display) -> Self {
        StorageError::corrupt(format!("byte {offset}: {reason}"))
    }
}
