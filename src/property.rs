//! Property model - the closed set of NDF property kinds
//!
//! Every property is either a leaf holding exactly one value or a container:
//! - `List`: ordered elements
//! - `Map`: ordered key/value entries
//! - `Pair`: exactly two children (first, second)
//!
//! Children of containers are themselves properties and carry the index
//! [`CHILD_INDEX`] instead of a field position.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `property_index` of a node that is a container child rather than an object field.
pub const CHILD_INDEX: i32 = -1;

/// Type tag shared by object and import references.
pub const REFERENCE_TYPE_TAG: u32 = 0x09;

/// All property kinds a descriptor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Bool,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    Float32,
    Float64,
    String,
    WideString,
    F32Vec2,
    F32Vec3,
    F32Vec4,
    S32Vec2,
    S32Vec3,
    S32Vec4,
    Color,
    ObjectReference,
    ImportReference,
    Guid,
    PathReference,
    LocalisationHash,
    Hash,
    List,
    Map,
    Pair,
}

impl PropertyKind {
    /// Get the string representation of the property kind
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "bool",
            PropertyKind::Int8 => "int8",
            PropertyKind::Int16 => "int16",
            PropertyKind::Int32 => "int32",
            PropertyKind::UInt8 => "uint8",
            PropertyKind::UInt16 => "uint16",
            PropertyKind::UInt32 => "uint32",
            PropertyKind::Float32 => "float32",
            PropertyKind::Float64 => "float64",
            PropertyKind::String => "string",
            PropertyKind::WideString => "widestring",
            PropertyKind::F32Vec2 => "f32_vec2",
            PropertyKind::F32Vec3 => "f32_vec3",
            PropertyKind::F32Vec4 => "f32_vec4",
            PropertyKind::S32Vec2 => "s32_vec2",
            PropertyKind::S32Vec3 => "s32_vec3",
            PropertyKind::S32Vec4 => "s32_vec4",
            PropertyKind::Color => "color",
            PropertyKind::ObjectReference => "object_reference",
            PropertyKind::ImportReference => "import_reference",
            PropertyKind::Guid => "guid",
            PropertyKind::PathReference => "path_reference",
            PropertyKind::LocalisationHash => "localisation_hash",
            PropertyKind::Hash => "hash",
            PropertyKind::List => "list",
            PropertyKind::Map => "map",
            PropertyKind::Pair => "pair",
        }
    }

    /// Get all property kinds
    pub fn all() -> &'static [PropertyKind] {
        &[
            PropertyKind::Bool,
            PropertyKind::Int8,
            PropertyKind::Int16,
            PropertyKind::Int32,
            PropertyKind::UInt8,
            PropertyKind::UInt16,
            PropertyKind::UInt32,
            PropertyKind::Float32,
            PropertyKind::Float64,
            PropertyKind::String,
            PropertyKind::WideString,
            PropertyKind::F32Vec2,
            PropertyKind::F32Vec3,
            PropertyKind::F32Vec4,
            PropertyKind::S32Vec2,
            PropertyKind::S32Vec3,
            PropertyKind::S32Vec4,
            PropertyKind::Color,
            PropertyKind::ObjectReference,
            PropertyKind::ImportReference,
            PropertyKind::Guid,
            PropertyKind::PathReference,
            PropertyKind::LocalisationHash,
            PropertyKind::Hash,
            PropertyKind::List,
            PropertyKind::Map,
            PropertyKind::Pair,
        ]
    }

    /// The NDF type tag stored in the `type` column.
    pub fn type_tag(&self) -> u32 {
        match self {
            PropertyKind::Bool => 0x00,
            PropertyKind::UInt8 => 0x01,
            PropertyKind::Int32 => 0x02,
            PropertyKind::UInt32 => 0x03,
            PropertyKind::Int8 => 0x04,
            PropertyKind::Float32 => 0x05,
            PropertyKind::Float64 => 0x06,
            PropertyKind::String => 0x07,
            PropertyKind::WideString => 0x08,
            PropertyKind::ObjectReference | PropertyKind::ImportReference => REFERENCE_TYPE_TAG,
            PropertyKind::F32Vec3 => 0x0B,
            PropertyKind::F32Vec4 => 0x0C,
            PropertyKind::Color => 0x0D,
            PropertyKind::S32Vec3 => 0x0E,
            PropertyKind::List => 0x11,
            PropertyKind::Map => 0x12,
            PropertyKind::Int16 => 0x18,
            PropertyKind::UInt16 => 0x19,
            PropertyKind::Guid => 0x1A,
            PropertyKind::PathReference => 0x1C,
            PropertyKind::LocalisationHash => 0x1D,
            PropertyKind::S32Vec2 => 0x1F,
            PropertyKind::S32Vec4 => 0x20,
            PropertyKind::F32Vec2 => 0x21,
            PropertyKind::Pair => 0x22,
            PropertyKind::Hash => 0x25,
        }
    }

    /// Recover the kind from a stored type tag and import flag.
    pub fn from_type_tag(tag: u32, is_import_reference: bool) -> Result<Self> {
        if tag == REFERENCE_TYPE_TAG {
            return Ok(if is_import_reference {
                PropertyKind::ImportReference
            } else {
                PropertyKind::ObjectReference
            });
        }
        PropertyKind::all()
            .iter()
            .copied()
            .find(|kind| kind.type_tag() == tag)
            .ok_or(Error::UnknownTypeTag(tag))
    }

    pub fn is_import_reference(&self) -> bool {
        matches!(self, PropertyKind::ImportReference)
    }

    /// Containers own child properties instead of a value row.
    pub fn is_container(&self) -> bool {
        matches!(self, PropertyKind::List | PropertyKind::Map | PropertyKind::Pair)
    }

    /// Parse textual input into a value of this kind.
    ///
    /// Integer kinds are checked against their storage width, vectors and
    /// colors take comma separated components.
    pub fn parse_value(&self, text: &str) -> Result<PropertyValue> {
        let invalid = || Error::InvalidValue {
            kind: *self,
            input: text.to_string(),
        };
        let trimmed = text.trim();

        let value = match self {
            PropertyKind::Bool => match trimmed.to_lowercase().as_str() {
                "true" | "1" => PropertyValue::Bool(true),
                "false" | "0" => PropertyValue::Bool(false),
                _ => return Err(invalid()),
            },
            PropertyKind::Int8 => PropertyValue::Int8(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::Int16 => PropertyValue::Int16(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::Int32 => PropertyValue::Int32(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::UInt8 => PropertyValue::UInt8(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::UInt16 => PropertyValue::UInt16(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::UInt32 => PropertyValue::UInt32(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::Float32 => PropertyValue::Float32(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::Float64 => PropertyValue::Float64(trimmed.parse().map_err(|_| invalid())?),
            PropertyKind::String => PropertyValue::String(text.to_string()),
            PropertyKind::WideString => PropertyValue::WideString(text.to_string()),
            PropertyKind::F32Vec2 => PropertyValue::F32Vec2(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::F32Vec3 => PropertyValue::F32Vec3(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::F32Vec4 => PropertyValue::F32Vec4(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::S32Vec2 => PropertyValue::S32Vec2(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::S32Vec3 => PropertyValue::S32Vec3(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::S32Vec4 => PropertyValue::S32Vec4(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::Color => PropertyValue::Color(parse_components(trimmed).ok_or_else(invalid)?),
            PropertyKind::ObjectReference => PropertyValue::ObjectReference(Reference::unresolved(trimmed)),
            PropertyKind::ImportReference => PropertyValue::ImportReference(Reference::unresolved(trimmed)),
            PropertyKind::Guid => PropertyValue::Guid(trimmed.to_string()),
            PropertyKind::PathReference => PropertyValue::PathReference(trimmed.to_string()),
            PropertyKind::LocalisationHash => PropertyValue::LocalisationHash(trimmed.to_string()),
            PropertyKind::Hash => PropertyValue::Hash(trimmed.to_string()),
            PropertyKind::List | PropertyKind::Map | PropertyKind::Pair => {
                return Err(Error::ContainerValue(*self));
            }
        };
        Ok(value)
    }
}

fn parse_components<T: FromStr, const N: usize>(text: &str) -> Option<[T; N]> {
    let parts: Vec<T> = text
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    parts.try_into().ok()
}

impl FromStr for PropertyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        PropertyKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A symbolic link to another object.
///
/// `name` is the object name (object references) or the export path (import
/// references) used to express the link. `target` is the resolved object id,
/// absent until the target exists in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub target: Option<i64>,
}

impl Reference {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
        }
    }

    pub fn resolved(name: impl Into<String>, target: i64) -> Self {
        Self {
            name: name.into(),
            target: Some(target),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

/// The payload of a property node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
    String(String),
    WideString(String),
    F32Vec2([f32; 2]),
    F32Vec3([f32; 3]),
    F32Vec4([f32; 4]),
    S32Vec2([i32; 2]),
    S32Vec3([i32; 3]),
    S32Vec4([i32; 4]),
    /// RGBA channels
    Color([u8; 4]),
    ObjectReference(Reference),
    ImportReference(Reference),
    Guid(String),
    PathReference(String),
    LocalisationHash(String),
    Hash(String),
    List(Vec<Property>),
    Map(Vec<(Property, Property)>),
    Pair(Box<(Property, Property)>),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Int8(_) => PropertyKind::Int8,
            PropertyValue::Int16(_) => PropertyKind::Int16,
            PropertyValue::Int32(_) => PropertyKind::Int32,
            PropertyValue::UInt8(_) => PropertyKind::UInt8,
            PropertyValue::UInt16(_) => PropertyKind::UInt16,
            PropertyValue::UInt32(_) => PropertyKind::UInt32,
            PropertyValue::Float32(_) => PropertyKind::Float32,
            PropertyValue::Float64(_) => PropertyKind::Float64,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::WideString(_) => PropertyKind::WideString,
            PropertyValue::F32Vec2(_) => PropertyKind::F32Vec2,
            PropertyValue::F32Vec3(_) => PropertyKind::F32Vec3,
            PropertyValue::F32Vec4(_) => PropertyKind::F32Vec4,
            PropertyValue::S32Vec2(_) => PropertyKind::S32Vec2,
            PropertyValue::S32Vec3(_) => PropertyKind::S32Vec3,
            PropertyValue::S32Vec4(_) => PropertyKind::S32Vec4,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::ObjectReference(_) => PropertyKind::ObjectReference,
            PropertyValue::ImportReference(_) => PropertyKind::ImportReference,
            PropertyValue::Guid(_) => PropertyKind::Guid,
            PropertyValue::PathReference(_) => PropertyKind::PathReference,
            PropertyValue::LocalisationHash(_) => PropertyKind::LocalisationHash,
            PropertyValue::Hash(_) => PropertyKind::Hash,
            PropertyValue::List(_) => PropertyKind::List,
            PropertyValue::Map(_) => PropertyKind::Map,
            PropertyValue::Pair(_) => PropertyKind::Pair,
        }
    }

    /// Children in storage order (map entries flattened key, value).
    pub fn children(&self) -> Vec<&Property> {
        match self {
            PropertyValue::List(items) => items.iter().collect(),
            PropertyValue::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            PropertyValue::Pair(pair) => vec![&pair.0, &pair.1],
            _ => Vec::new(),
        }
    }

    pub fn pair(first: Property, second: Property) -> Self {
        PropertyValue::Pair(Box::new((first, second)))
    }
}

/// A node in an object's property tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    /// Position among the object's direct fields, [`CHILD_INDEX`] for container children
    pub index: i32,
    pub value: PropertyValue,
}

impl Property {
    /// Create a direct field of an object
    pub fn new(name: impl Into<String>, index: i32, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            index,
            value,
        }
    }

    /// Create an unnamed container child
    pub fn element(value: PropertyValue) -> Self {
        Self::new(String::new(), CHILD_INDEX, value)
    }

    pub fn kind(&self) -> PropertyKind {
        self.value.kind()
    }

    pub fn is_field(&self) -> bool {
        self.index != CHILD_INDEX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_kind_roundtrip() {
        for kind in PropertyKind::all() {
            let parsed: PropertyKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_type_tags_are_unique_except_references() {
        for kind in PropertyKind::all() {
            let recovered = PropertyKind::from_type_tag(kind.type_tag(), kind.is_import_reference()).unwrap();
            assert_eq!(*kind, recovered);
        }
    }

    #[test]
    fn test_unknown_type_tag() {
        assert!(matches!(
            PropertyKind::from_type_tag(0x7F, false),
            Err(Error::UnknownTypeTag(0x7F))
        ));
    }

    #[test]
    fn test_parse_integer_widths() {
        assert_eq!(PropertyKind::UInt8.parse_value("255").unwrap(), PropertyValue::UInt8(255));
        assert!(PropertyKind::UInt8.parse_value("256").is_err());
        assert!(PropertyKind::Int8.parse_value("-129").is_err());
        assert_eq!(PropertyKind::Int16.parse_value("-32768").unwrap(), PropertyValue::Int16(-32768));
        assert!(PropertyKind::UInt16.parse_value("-1").is_err());
        assert_eq!(
            PropertyKind::UInt32.parse_value("4294967295").unwrap(),
            PropertyValue::UInt32(u32::MAX)
        );
        assert!(PropertyKind::Int32.parse_value("2147483648").is_err());
    }

    #[test]
    fn test_parse_vectors_and_color() {
        assert_eq!(
            PropertyKind::F32Vec3.parse_value("1.5, -2, 0.25").unwrap(),
            PropertyValue::F32Vec3([1.5, -2.0, 0.25])
        );
        assert!(PropertyKind::S32Vec2.parse_value("1,2,3").is_err());
        assert_eq!(
            PropertyKind::Color.parse_value("255,128,0,64").unwrap(),
            PropertyValue::Color([255, 128, 0, 64])
        );
        assert!(PropertyKind::Color.parse_value("256,0,0,0").is_err());
    }

    #[test]
    fn test_parse_rejects_containers() {
        assert!(matches!(
            PropertyKind::Map.parse_value("x"),
            Err(Error::ContainerValue(PropertyKind::Map))
        ));
    }

    #[test]
    fn test_map_children_interleave() {
        let map = PropertyValue::Map(vec![
            (Property::element(PropertyValue::String("a".into())), Property::element(PropertyValue::Int32(1))),
            (Property::element(PropertyValue::String("b".into())), Property::element(PropertyValue::Int32(2))),
        ]);
        let kinds: Vec<_> = map.children().iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![PropertyKind::String, PropertyKind::Int32, PropertyKind::String, PropertyKind::Int32]
        );
    }
}
