//! Encoding of the node and link tables.
//!
//! ```text
//! node table: u32 count, then per node
//!     u32 node id, u8 kind tag, name, state blob, input tree, output tree
//! property:   name, u8 type tag, then the leaf value
//!             or u32 child count followed by the children
//! link table: u32 count, then per link
//!     u32 source position, source path, u32 target position, target path
//! path:       u32 segment count, then one u32 per segment
//! ```
//!
//! Link endpoints are positions in the node table, not node ids.

use relogic_core::{NodeId, NodeKind, Property, PropertyPath, PropertyTree, PropertyType, Shape, Value};

use crate::bytes::{ByteReader, ByteWriter};
use crate::convert::{SavedGraph, SavedLink, SavedNode};
use crate::error::StorageError;

/// Deepest property nesting (and longest path) the format accepts.
pub const MAX_DEPTH: usize = 32;

// ---- writing ----

pub fn write_graph(w: &mut ByteWriter, saved: &SavedGraph) -> Result<(), StorageError> {
    w.count(saved.nodes.len())?;
    for node in &saved.nodes {
        w.u32(node.id.0);
        w.u8(node.kind.tag());
        w.str(&node.name)?;
        w.bytes(&node.state)?;
        write_property(w, node.inputs.root())?;
        write_property(w, node.outputs.root())?;
    }

    w.count(saved.links.len())?;
    for link in &saved.links {
        w.u32(link.source);
        write_path(w, &link.source_path)?;
        w.u32(link.target);
        write_path(w, &link.target_path)?;
    }
    Ok(())
}

fn write_property(w: &mut ByteWriter, prop: &Property) -> Result<(), StorageError> {
    w.str(prop.name())?;
    w.u8(prop.property_type().tag());
    match prop.value() {
        Some(value) => write_value(w, value)?,
        None => {
            w.count(prop.child_count())?;
            for child in prop.children() {
                write_property(w, child)?;
            }
        }
    }
    Ok(())
}

fn write_value(w: &mut ByteWriter, value: &Value) -> Result<(), StorageError> {
    match value {
        Value::Int32(v) => w.i32(*v),
        Value::Int64(v) => w.i64(*v),
        Value::Float(v) => w.f32(*v),
        Value::Bool(v) => w.u8(u8::from(*v)),
        Value::String(v) => w.str(v)?,
        Value::Vec2f(v) => v.iter().for_each(|c| w.f32(*c)),
        Value::Vec3f(v) => v.iter().for_each(|c| w.f32(*c)),
        Value::Vec4f(v) => v.iter().for_each(|c| w.f32(*c)),
        Value::Vec2i(v) => v.iter().for_each(|c| w.i32(*c)),
        Value::Vec3i(v) => v.iter().for_each(|c| w.i32(*c)),
        Value::Vec4i(v) => v.iter().for_each(|c| w.i32(*c)),
    }
    Ok(())
}

fn write_path(w: &mut ByteWriter, path: &PropertyPath) -> Result<(), StorageError> {
    w.count(path.indices().len())?;
    for &index in path.indices() {
        w.u32(index);
    }
    Ok(())
}

// ---- reading ----

pub fn read_graph(r: &mut ByteReader<'_>) -> Result<SavedGraph, StorageError> {
    let node_count = r.u32()?;
    let mut nodes = Vec::new();
    for _ in 0..node_count {
        let id = NodeId(r.u32()?);
        let kind = read_kind(r)?;
        let name = r.str()?.to_string();
        let state = r.bytes()?.to_vec();
        let inputs = read_tree(r)?;
        let outputs = read_tree(r)?;
        nodes.push(SavedNode {
            id,
            kind,
            name,
            state,
            inputs,
            outputs,
        });
    }

    let link_count = r.u32()?;
    let mut links = Vec::new();
    for _ in 0..link_count {
        links.push(SavedLink {
            source: r.u32()?,
            source_path: read_path(r)?,
            target: r.u32()?,
            target_path: read_path(r)?,
        });
    }

    Ok(SavedGraph { nodes, links })
}

pub(crate) fn read_kind(r: &mut ByteReader<'_>) -> Result<NodeKind, StorageError> {
    let offset = r.offset();
    let tag = r.u8()?;
    NodeKind::from_tag(tag).ok_or_else(|| StorageError::corrupt_at(offset, format!("unknown node kind tag {tag}")))
}

pub(crate) fn read_type(r: &mut ByteReader<'_>) -> Result<PropertyType, StorageError> {
    let offset = r.offset();
    let tag = r.u8()?;
    PropertyType::from_tag(tag)
        .ok_or_else(|| StorageError::corrupt_at(offset, format!("unknown property type tag {tag}")))
}

pub(crate) fn read_path(r: &mut ByteReader<'_>) -> Result<PropertyPath, StorageError> {
    let offset = r.offset();
    let len = r.u32()? as usize;
    if len > MAX_DEPTH {
        return Err(StorageError::corrupt_at(
            offset,
            format!("property path of {len} segments exceeds the limit of {MAX_DEPTH}"),
        ));
    }
    let mut path = PropertyPath::root();
    for _ in 0..len {
        path.push(r.u32()?);
    }
    Ok(path)
}

pub(crate) fn read_value(r: &mut ByteReader<'_>, ty: PropertyType) -> Result<Value, StorageError> {
    let offset = r.offset();
    let value = match ty {
        PropertyType::Int32 => Value::Int32(r.i32()?),
        PropertyType::Int64 => Value::Int64(r.i64()?),
        PropertyType::Float => Value::Float(r.f32()?),
        PropertyType::Bool => match r.u8()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(StorageError::corrupt_at(offset, format!("invalid boolean byte {other}"))),
        },
        PropertyType::String => Value::String(r.str()?.to_string()),
        PropertyType::Vec2f => Value::Vec2f([r.f32()?, r.f32()?]),
        PropertyType::Vec3f => Value::Vec3f([r.f32()?, r.f32()?, r.f32()?]),
        PropertyType::Vec4f => Value::Vec4f([r.f32()?, r.f32()?, r.f32()?, r.f32()?]),
        PropertyType::Vec2i => Value::Vec2i([r.i32()?, r.i32()?]),
        PropertyType::Vec3i => Value::Vec3i([r.i32()?, r.i32()?, r.i32()?]),
        PropertyType::Vec4i => Value::Vec4i([r.i32()?, r.i32()?, r.i32()?, r.i32()?]),
        PropertyType::Struct | PropertyType::Array => {
            return Err(StorageError::corrupt_at(offset, format!("{ty} is not a leaf type")))
        }
    };
    Ok(value)
}

/// Reads one property tree and rebuilds it from the shape it describes.
fn read_tree(r: &mut ByteReader<'_>) -> Result<PropertyTree, StorageError> {
    let offset = r.offset();
    let (_, shape, values) = read_property(r, 0)?;
    if !matches!(shape, Shape::Struct(_)) {
        return Err(StorageError::corrupt_at(offset, "property tree root is not a struct"));
    }

    let mut tree = PropertyTree::new(&shape).map_err(|e| StorageError::corrupt_at(offset, e))?;
    let paths: Vec<PropertyPath> = tree.leaves().into_iter().map(|(path, _)| path).collect();
    for (path, value) in paths.iter().zip(values) {
        tree.resolve_mut(path)
            .and_then(|leaf| leaf.set_value(value))
            .map_err(|e| StorageError::corrupt_at(offset, e))?;
    }
    Ok(tree)
}

/// Returns the property's name, its shape, and its leaf values in
/// depth-first order.
fn read_property(r: &mut ByteReader<'_>, depth: usize) -> Result<(String, Shape, Vec<Value>), StorageError> {
    let offset = r.offset();
    if depth > MAX_DEPTH {
        return Err(StorageError::corrupt_at(
            offset,
            format!("property nesting exceeds the limit of {MAX_DEPTH}"),
        ));
    }
    let name = r.str()?.to_string();
    let ty = read_type(r)?;
    if ty.is_leaf() {
        let value = read_value(r, ty)?;
        return Ok((name, Shape::Leaf(ty), vec![value]));
    }

    let count = r.u32()?;
    let mut values = Vec::new();
    let mut fields = Vec::new();
    for _ in 0..count {
        let (child_name, child_shape, child_values) = read_property(r, depth + 1)?;
        fields.push((child_name, child_shape));
        values.extend(child_values);
    }

    let shape = match ty {
        PropertyType::Struct => Shape::Struct(fields),
        _ => match fields.first() {
            None => Shape::Leaf(PropertyType::Array),
            Some((_, element)) => {
                if fields.iter().any(|(_, s)| s != element) {
                    return Err(StorageError::corrupt_at(offset, format!("elements of array '{name}' differ in shape")));
                }
                Shape::array(element.clone(), count)
            }
        },
    };
    Ok((name, shape, values))
}
