//! Structural verification of a whole container.
//!
//! Walks every field of the buffer without building anything, checking that
//! lengths stay in bounds, tags are known, text is UTF-8, nesting is limited
//! and nothing trails the link table. Only buffers that pass are decoded.

use relogic_core::{FeatureLevel, PropertyType};

use crate::bytes::ByteReader;
use crate::error::StorageError;
use crate::format::{read_kind, read_path, read_type, read_value, MAX_DEPTH};
use crate::header::Header;

/// Verifies `buf` from the first byte to the last.
pub fn verify(buf: &[u8]) -> Result<(), StorageError> {
    let mut r = ByteReader::new(buf);
    let header = Header::read(&mut r)?;
    if FeatureLevel::parse_tag(header.level_tag).is_none() {
        return Err(StorageError::corrupt_at(
            2,
            format!(
                "feature-level tag '{}' is not two digits",
                String::from_utf8_lossy(&header.level_tag)
            ),
        ));
    }

    let node_count = r.u32()?;
    for _ in 0..node_count {
        r.u32()?;
        read_kind(&mut r)?;
        r.str()?;
        r.bytes()?;
        verify_tree(&mut r)?;
        verify_tree(&mut r)?;
    }

    let link_count = r.u32()?;
    for _ in 0..link_count {
        r.u32()?;
        read_path(&mut r)?;
        r.u32()?;
        read_path(&mut r)?;
    }

    r.finish()
}

fn verify_tree(r: &mut ByteReader<'_>) -> Result<(), StorageError> {
    let offset = r.offset();
    r.str()?;
    let ty = read_type(r)?;
    if ty.is_leaf() || ty == PropertyType::Array {
        return Err(StorageError::corrupt_at(offset, format!("property tree root is a {ty}, not a struct")));
    }
    verify_children(r, 1)
}

fn verify_property(r: &mut ByteReader<'_>, depth: usize) -> Result<(), StorageError> {
    if depth > MAX_DEPTH {
        return Err(StorageError::corrupt_at(
            r.offset(),
            format!("property nesting exceeds the limit of {MAX_DEPTH}"),
        ));
    }
    r.str()?;
    let ty = read_type(r)?;
    if ty.is_leaf() {
        read_value(r, ty)?;
        return Ok(());
    }
    verify_children(r, depth + 1)
}

fn verify_children(r: &mut ByteReader<'_>, depth: usize) -> Result<(), StorageError> {
    let count = r.u32()?;
    for _ in 0..count {
        verify_property(r, depth)?;
    }
    Ok(())
}
