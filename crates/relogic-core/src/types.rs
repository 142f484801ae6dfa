//! Property types, leaf values and tree shapes.
//!
//! [`PropertyType`] names every kind of property. Leaf kinds hold a [`Value`];
//! the composite kinds (`Struct`, `Array`) only hold children. A [`Shape`]
//! describes a whole tree and is fixed once a node has been constructed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Int32,
    Int64,
    Float,
    Bool,
    String,
    Vec2f,
    Vec3f,
    Vec4f,
    Vec2i,
    Vec3i,
    Vec4i,
    Struct,
    Array,
}

impl PropertyType {
    /// Every type, in tag order.
    pub const ALL: [PropertyType; 13] = [
        PropertyType::Int32,
        PropertyType::Int64,
        PropertyType::Float,
        PropertyType::Bool,
        PropertyType::String,
        PropertyType::Vec2f,
        PropertyType::Vec3f,
        PropertyType::Vec4f,
        PropertyType::Vec2i,
        PropertyType::Vec3i,
        PropertyType::Vec4i,
        PropertyType::Struct,
        PropertyType::Array,
    ];

    /// Returns `true` for value-holding types.
    pub fn is_leaf(self) -> bool {
        !matches!(self, PropertyType::Struct | PropertyType::Array)
    }

    /// Stable one-byte tag used by the binary format.
    pub fn tag(self) -> u8 {
        match self {
            PropertyType::Int32 => 0,
            PropertyType::Int64 => 1,
            PropertyType::Float => 2,
            PropertyType::Bool => 3,
            PropertyType::String => 4,
            PropertyType::Vec2f => 5,
            PropertyType::Vec3f => 6,
            PropertyType::Vec4f => 7,
            PropertyType::Vec2i => 8,
            PropertyType::Vec3i => 9,
            PropertyType::Vec4i => 10,
            PropertyType::Struct => 11,
            PropertyType::Array => 12,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Human-readable name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            PropertyType::Int32 => "Int32",
            PropertyType::Int64 => "Int64",
            PropertyType::Float => "Float",
            PropertyType::Bool => "Bool",
            PropertyType::String => "String",
            PropertyType::Vec2f => "Vec2f",
            PropertyType::Vec3f => "Vec3f",
            PropertyType::Vec4f => "Vec4f",
            PropertyType::Vec2i => "Vec2i",
            PropertyType::Vec3i => "Vec3i",
            PropertyType::Vec4i => "Vec4i",
            PropertyType::Struct => "Struct",
            PropertyType::Array => "Array",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A leaf value. Every leaf always holds one of these, never nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float(f32),
    Bool(bool),
    String(String),
    Vec2f([f32; 2]),
    Vec3f([f32; 3]),
    Vec4f([f32; 4]),
    Vec2i([i32; 2]),
    Vec3i([i32; 3]),
    Vec4i([i32; 4]),
}

impl Value {
    /// The default value for a leaf type, or `None` for composite types.
    pub fn default_for(ty: PropertyType) -> Option<Value> {
        let value = match ty {
            PropertyType::Int32 => Value::Int32(0),
            PropertyType::Int64 => Value::Int64(0),
            PropertyType::Float => Value::Float(0.0),
            PropertyType::Bool => Value::Bool(false),
            PropertyType::String => Value::String(String::new()),
            PropertyType::Vec2f => Value::Vec2f([0.0; 2]),
            PropertyType::Vec3f => Value::Vec3f([0.0; 3]),
            PropertyType::Vec4f => Value::Vec4f([0.0; 4]),
            PropertyType::Vec2i => Value::Vec2i([0; 2]),
            PropertyType::Vec3i => Value::Vec3i([0; 3]),
            PropertyType::Vec4i => Value::Vec4i([0; 4]),
            PropertyType::Struct | PropertyType::Array => return None,
        };
        Some(value)
    }

    /// The type of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::Int32(_) => PropertyType::Int32,
            Value::Int64(_) => PropertyType::Int64,
            Value::Float(_) => PropertyType::Float,
            Value::Bool(_) => PropertyType::Bool,
            Value::String(_) => PropertyType::String,
            Value::Vec2f(_) => PropertyType::Vec2f,
            Value::Vec3f(_) => PropertyType::Vec3f,
            Value::Vec4f(_) => PropertyType::Vec4f,
            Value::Vec2i(_) => PropertyType::Vec2i,
            Value::Vec3i(_) => PropertyType::Vec3i,
            Value::Vec4i(_) => PropertyType::Vec4i,
        }
    }
}

/// Rust types that can be read from and written to a leaf.
///
/// Implemented for the scalar types, `String`, and the fixed-size arrays
/// standing in for the vector types.
pub trait PropertyValue: Sized {
    /// The leaf type this Rust type maps to.
    const TYPE: PropertyType;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

macro_rules! impl_property_value {
    ($rust:ty, $variant:ident) => {
        impl PropertyValue for $rust {
            const TYPE: PropertyType = PropertyType::$variant;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_property_value!(i32, Int32);
impl_property_value!(i64, Int64);
impl_property_value!(f32, Float);
impl_property_value!(bool, Bool);
impl_property_value!(String, String);
impl_property_value!([f32; 2], Vec2f);
impl_property_value!([f32; 3], Vec3f);
impl_property_value!([f32; 4], Vec4f);
impl_property_value!([i32; 2], Vec2i);
impl_property_value!([i32; 3], Vec3i);
impl_property_value!([i32; 4], Vec4i);

/// Shape of a property tree: leaf types, ordered struct fields and
/// fixed-length homogeneous arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// A value-holding leaf. Composite types given here produce an empty
    /// struct or array.
    Leaf(PropertyType),
    /// Named children in declaration order.
    Struct(Vec<(String, Shape)>),
    /// `len` children, all of shape `element`.
    Array { element: Box<Shape>, len: u32 },
}

impl Shape {
    /// Builds a struct shape from `(name, shape)` pairs.
    pub fn structure<N, I>(fields: I) -> Shape
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Shape)>,
    {
        Shape::Struct(fields.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }

    /// Builds an array shape.
    pub fn array(element: Shape, len: u32) -> Shape {
        Shape::Array {
            element: Box::new(element),
            len,
        }
    }

    /// An empty struct, the shape of a node side with no properties.
    pub fn empty() -> Shape {
        Shape::Struct(Vec::new())
    }

    /// The property type at the root of this shape.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Shape::Leaf(ty) => *ty,
            Shape::Struct(_) => PropertyType::Struct,
            Shape::Array { .. } => PropertyType::Array,
        }
    }
}
