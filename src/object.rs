//! Objects and files - the roots of the stored descriptor model

use crate::property::{Property, PropertyValue};
use serde::{Deserialize, Serialize};

/// One ingested source unit (an ndfbin inside an archive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdfFile {
    pub id: i64,
    /// Path inside the virtual file system of the game
    pub vfs_path: String,
    /// Archive (dat) the file was unpacked from
    pub archive_path: String,
    /// Location on disk
    pub fs_path: String,
    pub version: String,
    /// Import references resolve against the current file
    pub is_current: bool,
}

/// A named, classed entity of a file holding an ordered set of properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdfObject {
    pub name: String,
    pub class_name: String,
    /// Cross-file address used by import references
    pub export_path: String,
    pub is_top_object: bool,
    pub properties: Vec<Property>,
}

impl NdfObject {
    /// Create an object without properties
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        export_path: impl Into<String>,
        is_top_object: bool,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            export_path: export_path.into(),
            is_top_object,
            properties: Vec::new(),
        }
    }

    /// Append a direct field, assigning it the next field index
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.push_property(name, value);
        self
    }

    pub fn push_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        let index = self.properties.len() as i32;
        self.properties.push(Property::new(name, index, value));
    }

    /// Look up a direct field by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_property_assigns_field_indices() {
        let object = NdfObject::new("Unit", "TEntityDescriptor", "$/GFX/Unit", true)
            .with_property("Speed", PropertyValue::Float32(3.5))
            .with_property("Armor", PropertyValue::UInt8(2));

        assert_eq!(object.properties[0].index, 0);
        assert_eq!(object.properties[1].index, 1);
        assert_eq!(object.property("Armor").unwrap().value, PropertyValue::UInt8(2));
        assert!(object.property("Missing").is_none());
    }
}
