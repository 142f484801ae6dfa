//! Versioned binary persistence for relogic graphs.
//!
//! A saved graph is a single flat container: a descriptor identifying the
//! product, the host-engine and engine versions and the feature level,
//! followed by the node table and the link table. Loading runs an ordered
//! pipeline of independent checks before anything is rebuilt.
//!
//! # Modules
//!
//! - [`error`]: StorageError, one variant per failing load stage
//! - [`header`]: the container descriptor and version triples
//! - [`bytes`]: little-endian reader and writer
//! - [`format`]: node and link table encoding
//! - [`verify`]: structural verification of a whole buffer
//! - [`validate`]: the compatibility checks, one function per stage
//! - [`convert`]: LogicGraph decompose/recompose functions
//! - [`codec`]: encode, decode and peek entry points

pub mod bytes;
pub mod codec;
pub mod convert;
pub mod error;
pub mod format;
pub mod header;
pub mod validate;
pub mod verify;

// Re-export key types for ergonomic use.
pub use codec::{decode, encode, peek_feature_level, Decoded, LoadOptions};
pub use convert::{decompose, recompose, SavedGraph, SavedLink, SavedNode};
pub use error::{FileAge, StorageError};
pub use header::{Header, Version, PRODUCT_PREFIX};
