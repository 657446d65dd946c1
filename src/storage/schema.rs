//! Database schema definitions
//!
//! The table and column names below are shared with existing stores and
//! must not change.

use crate::property::PropertyKind;

/// SQL to create the file table
pub const CREATE_FILE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ndf_file (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vfs_path TEXT,
    dat_path TEXT,
    fs_path TEXT,
    game_version TEXT,
    is_current BOOLEAN
)
"#;

/// SQL to create the object table
pub const CREATE_OBJECT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ndf_object (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ndf_id INTEGER NOT NULL,
    object_name TEXT,
    class_name TEXT,
    export_path TEXT,
    is_top_object BOOLEAN,
    FOREIGN KEY (ndf_id) REFERENCES ndf_file(id) ON UPDATE CASCADE ON DELETE CASCADE
)
"#;

/// SQL to create the property table
///
/// `parent`/`position` encode container children as an adjacency list,
/// `value` points into the value table selected by `type`.
pub const CREATE_PROPERTY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ndf_property (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    object_id INTEGER NOT NULL REFERENCES ndf_object(id) ON UPDATE CASCADE ON DELETE CASCADE,
    property_name TEXT,
    property_index INTEGER,
    parent INTEGER REFERENCES ndf_property(id) ON UPDATE CASCADE ON DELETE CASCADE,
    position INTEGER,
    type INTEGER,
    is_import_reference BOOLEAN,
    value INTEGER
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_object_file ON ndf_object(ndf_id)",
    "CREATE INDEX IF NOT EXISTS idx_object_name ON ndf_object(object_name)",
    "CREATE INDEX IF NOT EXISTS idx_object_export_path ON ndf_object(export_path)",
    "CREATE INDEX IF NOT EXISTS idx_property_object ON ndf_property(object_id)",
    "CREATE INDEX IF NOT EXISTS idx_property_parent ON ndf_property(parent, position)",
];

/// One table per flat value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTable {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
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
}

const XY_REAL: &[(&str, &str)] = &[("value_x", "REAL"), ("value_y", "REAL")];
const XYZ_REAL: &[(&str, &str)] = &[("value_x", "REAL"), ("value_y", "REAL"), ("value_z", "REAL")];
const XYZW_REAL: &[(&str, &str)] = &[
    ("value_x", "REAL"),
    ("value_y", "REAL"),
    ("value_z", "REAL"),
    ("value_w", "REAL"),
];
const XY_INT: &[(&str, &str)] = &[("value_x", "INTEGER"), ("value_y", "INTEGER")];
const XYZ_INT: &[(&str, &str)] = &[("value_x", "INTEGER"), ("value_y", "INTEGER"), ("value_z", "INTEGER")];
const XYZW_INT: &[(&str, &str)] = &[
    ("value_x", "INTEGER"),
    ("value_y", "INTEGER"),
    ("value_z", "INTEGER"),
    ("value_w", "INTEGER"),
];
const RGBA: &[(&str, &str)] = &[
    ("value_r", "INTEGER"),
    ("value_g", "INTEGER"),
    ("value_b", "INTEGER"),
    ("value_a", "INTEGER"),
];
const REFERENCE: &[(&str, &str)] = &[
    (
        "referenced_object",
        "INTEGER REFERENCES ndf_object(id) ON UPDATE CASCADE ON DELETE SET NULL",
    ),
    ("optional_value", "TEXT"),
];

impl ValueTable {
    /// Get all value tables
    pub fn all() -> &'static [ValueTable] {
        &[
            ValueTable::Bool,
            ValueTable::Int8,
            ValueTable::UInt8,
            ValueTable::Int16,
            ValueTable::UInt16,
            ValueTable::Int32,
            ValueTable::UInt32,
            ValueTable::Float32,
            ValueTable::Float64,
            ValueTable::String,
            ValueTable::WideString,
            ValueTable::F32Vec2,
            ValueTable::F32Vec3,
            ValueTable::F32Vec4,
            ValueTable::S32Vec2,
            ValueTable::S32Vec3,
            ValueTable::S32Vec4,
            ValueTable::Color,
            ValueTable::ObjectReference,
            ValueTable::ImportReference,
            ValueTable::Guid,
            ValueTable::PathReference,
            ValueTable::LocalisationHash,
            ValueTable::Hash,
        ]
    }

    /// The table backing a leaf kind, `None` for containers
    pub fn for_kind(kind: PropertyKind) -> Option<ValueTable> {
        let table = match kind {
            PropertyKind::Bool => ValueTable::Bool,
            PropertyKind::Int8 => ValueTable::Int8,
            PropertyKind::UInt8 => ValueTable::UInt8,
            PropertyKind::Int16 => ValueTable::Int16,
            PropertyKind::UInt16 => ValueTable::UInt16,
            PropertyKind::Int32 => ValueTable::Int32,
            PropertyKind::UInt32 => ValueTable::UInt32,
            PropertyKind::Float32 => ValueTable::Float32,
            PropertyKind::Float64 => ValueTable::Float64,
            PropertyKind::String => ValueTable::String,
            PropertyKind::WideString => ValueTable::WideString,
            PropertyKind::F32Vec2 => ValueTable::F32Vec2,
            PropertyKind::F32Vec3 => ValueTable::F32Vec3,
            PropertyKind::F32Vec4 => ValueTable::F32Vec4,
            PropertyKind::S32Vec2 => ValueTable::S32Vec2,
            PropertyKind::S32Vec3 => ValueTable::S32Vec3,
            PropertyKind::S32Vec4 => ValueTable::S32Vec4,
            PropertyKind::Color => ValueTable::Color,
            PropertyKind::ObjectReference => ValueTable::ObjectReference,
            PropertyKind::ImportReference => ValueTable::ImportReference,
            PropertyKind::Guid => ValueTable::Guid,
            PropertyKind::PathReference => ValueTable::PathReference,
            PropertyKind::LocalisationHash => ValueTable::LocalisationHash,
            PropertyKind::Hash => ValueTable::Hash,
            PropertyKind::List | PropertyKind::Map | PropertyKind::Pair => return None,
        };
        Some(table)
    }

    /// The property kind stored in this table
    pub fn kind(&self) -> PropertyKind {
        match self {
            ValueTable::Bool => PropertyKind::Bool,
            ValueTable::Int8 => PropertyKind::Int8,
            ValueTable::UInt8 => PropertyKind::UInt8,
            ValueTable::Int16 => PropertyKind::Int16,
            ValueTable::UInt16 => PropertyKind::UInt16,
            ValueTable::Int32 => PropertyKind::Int32,
            ValueTable::UInt32 => PropertyKind::UInt32,
            ValueTable::Float32 => PropertyKind::Float32,
            ValueTable::Float64 => PropertyKind::Float64,
            ValueTable::String => PropertyKind::String,
            ValueTable::WideString => PropertyKind::WideString,
            ValueTable::F32Vec2 => PropertyKind::F32Vec2,
            ValueTable::F32Vec3 => PropertyKind::F32Vec3,
            ValueTable::F32Vec4 => PropertyKind::F32Vec4,
            ValueTable::S32Vec2 => PropertyKind::S32Vec2,
            ValueTable::S32Vec3 => PropertyKind::S32Vec3,
            ValueTable::S32Vec4 => PropertyKind::S32Vec4,
            ValueTable::Color => PropertyKind::Color,
            ValueTable::ObjectReference => PropertyKind::ObjectReference,
            ValueTable::ImportReference => PropertyKind::ImportReference,
            ValueTable::Guid => PropertyKind::Guid,
            ValueTable::PathReference => PropertyKind::PathReference,
            ValueTable::LocalisationHash => PropertyKind::LocalisationHash,
            ValueTable::Hash => PropertyKind::Hash,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueTable::Bool => "ndf_bool",
            ValueTable::Int8 => "ndf_int8",
            ValueTable::UInt8 => "ndf_uint8",
            ValueTable::Int16 => "ndf_int16",
            ValueTable::UInt16 => "ndf_uint16",
            ValueTable::Int32 => "ndf_int32",
            ValueTable::UInt32 => "ndf_uint32",
            ValueTable::Float32 => "ndf_float32",
            ValueTable::Float64 => "ndf_float64",
            ValueTable::String => "ndf_string",
            ValueTable::WideString => "ndf_widestring",
            ValueTable::F32Vec2 => "ndf_F32_vec2",
            ValueTable::F32Vec3 => "ndf_F32_vec3",
            ValueTable::F32Vec4 => "ndf_F32_vec4",
            ValueTable::S32Vec2 => "ndf_S32_vec2",
            ValueTable::S32Vec3 => "ndf_S32_vec3",
            ValueTable::S32Vec4 => "ndf_S32_vec4",
            ValueTable::Color => "ndf_color",
            ValueTable::ObjectReference => "ndf_object_reference",
            ValueTable::ImportReference => "ndf_import_reference",
            ValueTable::Guid => "ndf_GUID",
            ValueTable::PathReference => "ndf_path_reference",
            ValueTable::LocalisationHash => "ndf_localisation_hash",
            ValueTable::Hash => "ndf_hash",
        }
    }

    /// Payload columns (name, declaration) after the `id` key
    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ValueTable::Bool => &[("value", "BOOLEAN")],
            ValueTable::Int8
            | ValueTable::UInt8
            | ValueTable::Int16
            | ValueTable::UInt16
            | ValueTable::Int32
            | ValueTable::UInt32 => &[("value", "INTEGER")],
            ValueTable::Float32 | ValueTable::Float64 => &[("value", "REAL")],
            ValueTable::String
            | ValueTable::WideString
            | ValueTable::Guid
            | ValueTable::PathReference
            | ValueTable::LocalisationHash
            | ValueTable::Hash => &[("value", "TEXT")],
            ValueTable::F32Vec2 => XY_REAL,
            ValueTable::F32Vec3 => XYZ_REAL,
            ValueTable::F32Vec4 => XYZW_REAL,
            ValueTable::S32Vec2 => XY_INT,
            ValueTable::S32Vec3 => XYZ_INT,
            ValueTable::S32Vec4 => XYZW_INT,
            ValueTable::Color => RGBA,
            ValueTable::ObjectReference | ValueTable::ImportReference => REFERENCE,
        }
    }

    /// SQL to create this value table
    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns()
            .iter()
            .map(|(name, decl)| format!("    {} {}", name, decl))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n{}\n)",
            self.name(),
            columns
        )
    }

    /// SQL for a trigger dropping the value row together with its property.
    ///
    /// Value rows are addressed polymorphically through `ndf_property.value`,
    /// so no foreign key can cascade into them.
    pub fn drop_trigger_sql(&self) -> String {
        let kind = self.kind();
        let import_filter = match self {
            ValueTable::ObjectReference => " AND OLD.is_import_reference = 0",
            ValueTable::ImportReference => " AND OLD.is_import_reference = 1",
            _ => "",
        };
        format!(
            "CREATE TRIGGER IF NOT EXISTS drop_{table}_value AFTER DELETE ON ndf_property \
             WHEN OLD.value IS NOT NULL AND OLD.type = {tag}{filter} \
             BEGIN DELETE FROM {table} WHERE id = OLD.value; END",
            table = self.name(),
            tag = kind.type_tag(),
            filter = import_filter,
        )
    }
}

impl std::fmt::Display for ValueTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// All schema creation statements
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts: Vec<String> = vec![
        CREATE_FILE_TABLE.to_string(),
        CREATE_OBJECT_TABLE.to_string(),
        CREATE_PROPERTY_TABLE.to_string(),
    ];
    stmts.extend(ValueTable::all().iter().map(ValueTable::create_table_sql));
    stmts.extend(ValueTable::all().iter().map(ValueTable::drop_trigger_sql));
    stmts.extend(CREATE_INDEXES.iter().map(|s| s.to_string()));
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_leaf_kind_has_a_table() {
        for kind in PropertyKind::all() {
            match ValueTable::for_kind(*kind) {
                Some(table) => assert_eq!(table.kind(), *kind),
                None => assert!(kind.is_container()),
            }
        }
    }

    #[test]
    fn test_reference_table_sets_null_on_delete() {
        let sql = ValueTable::ObjectReference.create_table_sql();
        assert!(sql.contains("referenced_object INTEGER REFERENCES ndf_object(id)"));
        assert!(sql.contains("ON DELETE SET NULL"));
    }

    #[test]
    fn test_reference_triggers_are_disambiguated() {
        assert!(ValueTable::ImportReference.drop_trigger_sql().contains("is_import_reference = 1"));
        assert!(ValueTable::ObjectReference.drop_trigger_sql().contains("is_import_reference = 0"));
        assert!(!ValueTable::Bool.drop_trigger_sql().contains("is_import_reference"));
    }
}
