//! Whole-container save, load and peek.
//!
//! [`encode`] writes the descriptor followed by the node and link tables.
//! [`decode`] runs the stages of [`crate::validate`] in order, decodes the
//! tables and rebuilds the graph; it never touches an existing graph, so a
//! caller that only swaps in the result on `Ok` keeps its graph on failure.

use relogic_core::{FeatureLevel, KindRegistry, LogicGraph, MAX_ID_GAPS};

use crate::bytes::{ByteReader, ByteWriter};
use crate::convert::{decompose, recompose};
use crate::error::StorageError;
use crate::format::{read_graph, write_graph};
use crate::header::{Header, Version};
use crate::validate::{check_feature_level, check_host_version, check_identifier, check_payload_level};
use crate::verify::verify;

/// What a load is checked against.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    pub feature_level: FeatureLevel,
    pub host_version: &'a Version,
    pub registry: &'a KindRegistry,
}

/// A successfully decoded container.
#[derive(Debug)]
pub struct Decoded {
    pub header: Header,
    pub graph: LogicGraph,
}

/// Serializes `graph` at its own feature level.
///
/// Fails for graphs that [`decode`] would refuse to rebuild: too many unused
/// ids, lengths beyond the format's 32-bit fields, or node state that cannot
/// be saved.
pub fn encode(graph: &LogicGraph, host_version: &Version, engine_version: &Version) -> Result<Vec<u8>, StorageError> {
    let gaps = graph.id_gaps();
    if gaps > MAX_ID_GAPS {
        return Err(StorageError::unsavable(format!(
            "node ids leave {gaps} unused slots, at most {MAX_ID_GAPS} can be loaded"
        )));
    }
    let saved = decompose(graph)?;

    let header = Header::new(graph.feature_level(), host_version.clone(), engine_version.clone());
    let mut w = ByteWriter::new();
    header.write(&mut w)?;
    write_graph(&mut w, &saved)?;
    Ok(w.into_inner())
}

/// Validates and decodes a container.
pub fn decode(bytes: &[u8], options: &LoadOptions<'_>) -> Result<Decoded, StorageError> {
    check_identifier(bytes)?;
    verify(bytes)?;

    let mut r = ByteReader::new(bytes);
    let header = Header::read(&mut r)?;
    check_host_version(&header, options.host_version)?;
    let level = check_feature_level(&header, options.feature_level)?;
    check_payload_level(&header, level)?;

    let saved = read_graph(&mut r)?;
    r.finish()?;
    let graph = recompose(saved, level, options.registry)?;
    Ok(Decoded { header, graph })
}

/// Reads the feature level a container was written for.
///
/// Only the identifier and the descriptor are read; the tables are neither
/// verified nor decoded.
pub fn peek_feature_level(bytes: &[u8]) -> Result<FeatureLevel, StorageError> {
    check_identifier(bytes)?;
    let header = Header::read(&mut ByteReader::new(bytes))?;
    FeatureLevel::from_raw(u32::from(header.feature_level)).ok_or(StorageError::UnknownFeatureLevel {
        raw: header.feature_level,
    })
}
