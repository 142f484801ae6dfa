//! Typed property trees.
//!
//! A [`PropertyTree`] is built once from a [`Shape`] and never changes shape
//! afterwards; only leaf values mutate. Struct children are kept in an
//! [`IndexMap`] so declaration order is preserved and children can be
//! addressed either by name or by position. A [`PropertyPath`] addresses a
//! property by positions only, which is what links and the binary format use.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::types::{PropertyType, PropertyValue, Shape, Value};

/// Position-based address of a property inside a tree.
///
/// Each segment is the child position at that depth: the field position for
/// structs, the element index for arrays. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyPath(SmallVec<[u32; 4]>);

impl PropertyPath {
    /// The root path.
    pub fn root() -> Self {
        PropertyPath(SmallVec::new())
    }

    pub fn from_indices(indices: impl IntoIterator<Item = u32>) -> Self {
        PropertyPath(indices.into_iter().collect())
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn push(&mut self, index: u32) {
        self.0.push(index);
    }

    /// Returns a copy of this path extended by one segment.
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.clone();
        path.push(index);
        path
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PropertyKind {
    Leaf { value: Value, linked: bool },
    Struct(IndexMap<String, Property>),
    Array(Vec<Property>),
}

/// A named, typed node of a property tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    kind: PropertyKind,
}

impl Property {
    fn from_shape(name: String, shape: &Shape) -> Result<Self, CoreError> {
        let kind = match shape {
            Shape::Leaf(ty) => match Value::default_for(*ty) {
                Some(value) => PropertyKind::Leaf {
                    value,
                    linked: false,
                },
                None if *ty == PropertyType::Array => PropertyKind::Array(Vec::new()),
                None => PropertyKind::Struct(IndexMap::new()),
            },
            Shape::Struct(fields) => {
                let mut children = IndexMap::with_capacity(fields.len());
                for (field, field_shape) in fields {
                    if children.contains_key(field) {
                        return Err(CoreError::DuplicateChild {
                            name: field.clone(),
                        });
                    }
                    let child = Property::from_shape(field.clone(), field_shape)?;
                    children.insert(field.clone(), child);
                }
                PropertyKind::Struct(children)
            }
            Shape::Array { element, len } => {
                let elements = (0..*len)
                    .map(|_| Property::from_shape(String::new(), element))
                    .collect::<Result<Vec<_>, _>>()?;
                PropertyKind::Array(elements)
            }
        };
        Ok(Property { name, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        match &self.kind {
            PropertyKind::Leaf { value, .. } => value.property_type(),
            PropertyKind::Struct(_) => PropertyType::Struct,
            PropertyKind::Array(_) => PropertyType::Array,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PropertyKind::Leaf { .. })
    }

    /// Returns `true` if this leaf's value is supplied by an incoming link.
    pub fn is_linked(&self) -> bool {
        matches!(self.kind, PropertyKind::Leaf { linked: true, .. })
    }

    pub fn child_count(&self) -> usize {
        match &self.kind {
            PropertyKind::Leaf { .. } => 0,
            PropertyKind::Struct(children) => children.len(),
            PropertyKind::Array(elements) => elements.len(),
        }
    }

    /// Looks up a struct field by name.
    pub fn child(&self, name: &str) -> Result<&Property, CoreError> {
        match &self.kind {
            PropertyKind::Struct(children) => children.get(name),
            _ => None,
        }
        .ok_or_else(|| CoreError::NoSuchChild {
            child: name.to_string(),
        })
    }

    pub fn child_mut(&mut self, name: &str) -> Result<&mut Property, CoreError> {
        match &mut self.kind {
            PropertyKind::Struct(children) => children.get_mut(name),
            _ => None,
        }
        .ok_or_else(|| CoreError::NoSuchChild {
            child: name.to_string(),
        })
    }

    /// Looks up a child by position (struct field position or array index).
    pub fn child_at(&self, index: usize) -> Result<&Property, CoreError> {
        match &self.kind {
            PropertyKind::Struct(children) => children.get_index(index).map(|(_, c)| c),
            PropertyKind::Array(elements) => elements.get(index),
            PropertyKind::Leaf { .. } => None,
        }
        .ok_or_else(|| CoreError::NoSuchChild {
            child: index.to_string(),
        })
    }

    pub fn child_at_mut(&mut self, index: usize) -> Result<&mut Property, CoreError> {
        match &mut self.kind {
            PropertyKind::Struct(children) => children.get_index_mut(index).map(|(_, c)| c),
            PropertyKind::Array(elements) => elements.get_mut(index),
            PropertyKind::Leaf { .. } => None,
        }
        .ok_or_else(|| CoreError::NoSuchChild {
            child: index.to_string(),
        })
    }

    /// Iterates over children in order.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Property> + '_> {
        match &self.kind {
            PropertyKind::Leaf { .. } => Box::new(std::iter::empty()),
            PropertyKind::Struct(children) => Box::new(children.values()),
            PropertyKind::Array(elements) => Box::new(elements.iter()),
        }
    }

    /// The leaf value, or `None` for composites.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            PropertyKind::Leaf { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Reads the leaf value as `T`.
    pub fn get<T: PropertyValue>(&self) -> Result<T, CoreError> {
        let mismatch = CoreError::TypeMismatch {
            expected: T::TYPE,
            found: self.property_type(),
        };
        self.value().and_then(T::from_value).ok_or(mismatch)
    }

    /// Writes the leaf value. Fails without mutating if `T` does not match the
    /// declared type or the leaf is a linked input.
    pub fn set<T: PropertyValue>(&mut self, value: T) -> Result<(), CoreError> {
        self.set_value(value.into_value())
    }

    /// Untyped variant of [`set`](Self::set).
    pub fn set_value(&mut self, new_value: Value) -> Result<(), CoreError> {
        let found = self.property_type();
        match &mut self.kind {
            PropertyKind::Leaf { linked: true, .. } => Err(CoreError::ReadOnlyLinkedInput {
                name: self.name.clone(),
            }),
            PropertyKind::Leaf { value, .. } if value.property_type() == new_value.property_type() => {
                *value = new_value;
                Ok(())
            }
            _ => Err(CoreError::TypeMismatch {
                expected: new_value.property_type(),
                found,
            }),
        }
    }

    /// Writes a value arriving over a link, bypassing the linked-input guard.
    ///
    /// Returns `true` if the stored value changed. The caller guarantees the
    /// types match; a mismatching value is ignored.
    pub(crate) fn write_propagated(&mut self, new_value: &Value) -> bool {
        match &mut self.kind {
            PropertyKind::Leaf { value, .. }
                if value.property_type() == new_value.property_type() && value != new_value =>
            {
                *value = new_value.clone();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_linked(&mut self, is_linked: bool) {
        if let PropertyKind::Leaf { linked, .. } = &mut self.kind {
            *linked = is_linked;
        }
    }

    /// Reconstructs the shape this property was built from.
    pub fn shape(&self) -> Shape {
        match &self.kind {
            PropertyKind::Leaf { value, .. } => Shape::Leaf(value.property_type()),
            PropertyKind::Struct(children) => Shape::Struct(
                children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.shape()))
                    .collect(),
            ),
            PropertyKind::Array(elements) => match elements.first() {
                Some(first) => Shape::array(first.shape(), elements.len() as u32),
                None => Shape::Leaf(PropertyType::Array),
            },
        }
    }
}

/// The input or output side of a logic node.
///
/// The root is always an unnamed struct.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTree {
    root: Property,
}

impl PropertyTree {
    /// Builds a tree with default leaf values.
    ///
    /// A non-struct shape is wrapped into a single-field struct named `value`.
    pub fn new(shape: &Shape) -> Result<Self, CoreError> {
        let root = match shape {
            Shape::Struct(_) => Property::from_shape(String::new(), shape)?,
            other => Property::from_shape(
                String::new(),
                &Shape::Struct(vec![("value".to_string(), other.clone())]),
            )?,
        };
        Ok(PropertyTree { root })
    }

    /// A tree with no properties.
    pub fn empty() -> Self {
        PropertyTree {
            root: Property {
                name: String::new(),
                kind: PropertyKind::Struct(IndexMap::new()),
            },
        }
    }

    pub fn root(&self) -> &Property {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Property {
        &mut self.root
    }

    /// Top-level field by name.
    pub fn child(&self, name: &str) -> Result<&Property, CoreError> {
        self.root.child(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Result<&mut Property, CoreError> {
        self.root.child_mut(name)
    }

    pub fn resolve(&self, path: &PropertyPath) -> Result<&Property, CoreError> {
        path.indices()
            .iter()
            .try_fold(&self.root, |prop, &index| prop.child_at(index as usize))
    }

    pub fn resolve_mut(&mut self, path: &PropertyPath) -> Result<&mut Property, CoreError> {
        path.indices()
            .iter()
            .try_fold(&mut self.root, |prop, &index| prop.child_at_mut(index as usize))
    }

    /// Translates a name-based address into a [`PropertyPath`].
    ///
    /// Struct fields are addressed by name, array elements by their decimal
    /// index, e.g. `["points", "2", "x"]`.
    pub fn path(&self, segments: &[&str]) -> Result<PropertyPath, CoreError> {
        let mut path = PropertyPath::root();
        let mut current = &self.root;
        for segment in segments {
            let no_such = || CoreError::NoSuchChild {
                child: segment.to_string(),
            };
            let index = match &current.kind {
                PropertyKind::Struct(children) => children.get_index_of(*segment).ok_or_else(no_such)?,
                PropertyKind::Array(_) => segment.parse::<usize>().map_err(|_| no_such())?,
                PropertyKind::Leaf { .. } => return Err(no_such()),
            };
            current = current.child_at(index)?;
            path.push(index as u32);
        }
        Ok(path)
    }

    /// All leaves with their paths, in depth-first declaration order.
    pub fn leaves(&self) -> Vec<(PropertyPath, &Property)> {
        fn collect<'a>(prop: &'a Property, path: PropertyPath, out: &mut Vec<(PropertyPath, &'a Property)>) {
            if prop.is_leaf() {
                out.push((path, prop));
                return;
            }
            for (index, child) in prop.children().enumerate() {
                collect(child, path.child(index as u32), out);
            }
        }
        let mut out = Vec::new();
        collect(&self.root, PropertyPath::root(), &mut out);
        out
    }

    pub fn shape(&self) -> Shape {
        self.root.shape()
    }

    /// Copies every leaf value from `other`, which must have the same shape.
    ///
    /// Linked flags are left untouched. Used when restoring persisted values
    /// and when a kind mirrors its inputs to its outputs.
    pub fn copy_values_from(&mut self, other: &PropertyTree) -> Result<(), CoreError> {
        for (path, source) in other.leaves() {
            let target = self.resolve_mut(&path)?;
            match (source.value(), target.property_type()) {
                (Some(value), ty) if ty == value.property_type() => {
                    target.write_propagated(value);
                }
                (_, ty) => {
                    return Err(CoreError::TypeMismatch {
                        expected: ty,
                        found: source.property_type(),
                    })
                }
            }
        }
        Ok(())
    }
}
