//! The reusable statement set
//!
//! Every statement the store issues is listed here so it can be prepared
//! once when the store opens and served from the connection's statement
//! cache afterwards.

use super::schema::ValueTable;

pub const INSERT_FILE: &str = "INSERT INTO ndf_file (vfs_path, dat_path, fs_path, game_version, is_current) VALUES (?1, ?2, ?3, ?4, ?5)";
pub const GET_FILE: &str = "SELECT id, vfs_path, dat_path, fs_path, game_version, is_current FROM ndf_file WHERE id = ?1";
pub const LIST_FILES: &str = "SELECT id, vfs_path, dat_path, fs_path, game_version, is_current FROM ndf_file ORDER BY id";
pub const SET_FILE_CURRENT: &str = "UPDATE ndf_file SET is_current = ?1 WHERE id = ?2";
pub const DELETE_FILE: &str = "DELETE FROM ndf_file WHERE id = ?1";

pub const INSERT_OBJECT: &str = "INSERT INTO ndf_object (ndf_id, object_name, class_name, export_path, is_top_object) VALUES (?1, ?2, ?3, ?4, ?5)";
pub const GET_OBJECT: &str = "SELECT ndf_id, object_name, class_name, export_path, is_top_object FROM ndf_object WHERE id = ?1";
pub const LIST_OBJECTS: &str = "SELECT id, ndf_id, object_name, class_name, export_path, is_top_object FROM ndf_object WHERE ndf_id = ?1 ORDER BY id";
pub const OBJECT_BY_NAME: &str = "SELECT id FROM ndf_object WHERE object_name = ?1 ORDER BY id LIMIT 1";
pub const OBJECT_BY_EXPORT_PATH: &str = "SELECT id FROM ndf_object WHERE export_path = ?1 ORDER BY id LIMIT 1";
pub const OBJECT_FILE_ID: &str = "SELECT ndf_id FROM ndf_object WHERE id = ?1";
pub const OBJECT_NAME: &str = "SELECT object_name FROM ndf_object WHERE id = ?1";
pub const OBJECT_EXPORT_PATH: &str = "SELECT export_path FROM ndf_object WHERE id = ?1";
pub const OBJECT_NAMES: &str = "SELECT object_name FROM ndf_object WHERE ndf_id = ?1 ORDER BY id";
pub const OBJECT_CLASS_NAMES: &str = "SELECT DISTINCT class_name FROM ndf_object WHERE ndf_id = ?1 ORDER BY class_name";
pub const SET_OBJECT_NAME: &str = "UPDATE ndf_object SET object_name = ?1 WHERE id = ?2";
pub const SET_OBJECT_EXPORT_PATH: &str = "UPDATE ndf_object SET export_path = ?1 WHERE id = ?2";

pub const INSERT_PROPERTY: &str = "INSERT INTO ndf_property (object_id, property_name, property_index, parent, position, type, is_import_reference, value) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
pub const GET_PROPERTY: &str = "SELECT id, object_id, property_name, property_index, parent, position, type, is_import_reference, value FROM ndf_property WHERE id = ?1";
pub const OBJECT_PROPERTY_ROWS: &str = "SELECT id, object_id, property_name, property_index, parent, position, type, is_import_reference, value FROM ndf_property WHERE object_id = ?1 ORDER BY id";
pub const OBJECT_PROPERTY_IDS: &str = "SELECT id FROM ndf_property WHERE object_id = ?1 AND property_index <> -1 ORDER BY property_index, id";
pub const PROPERTY_NAMES: &str = "SELECT property_name FROM ndf_property WHERE object_id = ?1 AND property_index <> -1 ORDER BY property_index, id";

pub const OBJECTS_REFERENCING: &str = r#"
SELECT DISTINCT prop.object_id FROM ndf_object_reference AS val
INNER JOIN ndf_property AS prop
    ON prop.value = val.id AND prop.type = 9 AND prop.is_import_reference = 0
WHERE val.referenced_object = ?1
ORDER BY prop.object_id
"#;

pub const OBJECTS_IMPORTING: &str = r#"
SELECT DISTINCT prop.object_id FROM ndf_import_reference AS val
INNER JOIN ndf_property AS prop
    ON prop.value = val.id AND prop.type = 9 AND prop.is_import_reference = 1
WHERE val.referenced_object = ?1
ORDER BY prop.object_id
"#;

/// Point unresolved object references at the first object of the file with a matching name
pub const RESOLVE_OBJECT_REFERENCES: &str = r#"
UPDATE ndf_object_reference
SET referenced_object = (
    SELECT obj.id FROM ndf_object AS obj
    WHERE obj.object_name = ndf_object_reference.optional_value AND obj.ndf_id = ?1
    ORDER BY obj.id LIMIT 1
)
WHERE referenced_object IS NULL
  AND EXISTS (
    SELECT 1 FROM ndf_object AS obj
    WHERE obj.object_name = ndf_object_reference.optional_value AND obj.ndf_id = ?1
  )
"#;

/// Point unresolved import references at the first object of a current file with a matching export path
pub const RESOLVE_IMPORT_REFERENCES: &str = r#"
UPDATE ndf_import_reference
SET referenced_object = (
    SELECT obj.id FROM ndf_object AS obj
    INNER JOIN ndf_file AS file ON file.id = obj.ndf_id
    WHERE obj.export_path = ndf_import_reference.optional_value AND file.is_current = 1
    ORDER BY obj.id LIMIT 1
)
WHERE referenced_object IS NULL
  AND EXISTS (
    SELECT 1 FROM ndf_object AS obj
    INNER JOIN ndf_file AS file ON file.id = obj.ndf_id
    WHERE obj.export_path = ndf_import_reference.optional_value AND file.is_current = 1
  )
"#;

pub const COUNT_FILES: &str = "SELECT COUNT(*) FROM ndf_file";
pub const COUNT_OBJECTS: &str = "SELECT COUNT(*) FROM ndf_object";
pub const COUNT_PROPERTIES: &str = "SELECT COUNT(*) FROM ndf_property";
pub const COUNT_UNRESOLVED_OBJECT_REFERENCES: &str = "SELECT COUNT(*) FROM ndf_object_reference WHERE referenced_object IS NULL";
pub const COUNT_UNRESOLVED_IMPORT_REFERENCES: &str = "SELECT COUNT(*) FROM ndf_import_reference WHERE referenced_object IS NULL";

const FIXED: &[&str] = &[
    INSERT_FILE,
    GET_FILE,
    LIST_FILES,
    SET_FILE_CURRENT,
    DELETE_FILE,
    INSERT_OBJECT,
    GET_OBJECT,
    LIST_OBJECTS,
    OBJECT_BY_NAME,
    OBJECT_BY_EXPORT_PATH,
    OBJECT_FILE_ID,
    OBJECT_NAME,
    OBJECT_EXPORT_PATH,
    OBJECT_NAMES,
    OBJECT_CLASS_NAMES,
    SET_OBJECT_NAME,
    SET_OBJECT_EXPORT_PATH,
    INSERT_PROPERTY,
    GET_PROPERTY,
    OBJECT_PROPERTY_ROWS,
    OBJECT_PROPERTY_IDS,
    PROPERTY_NAMES,
    OBJECTS_REFERENCING,
    OBJECTS_IMPORTING,
    RESOLVE_OBJECT_REFERENCES,
    RESOLVE_IMPORT_REFERENCES,
    COUNT_FILES,
    COUNT_OBJECTS,
    COUNT_PROPERTIES,
    COUNT_UNRESOLVED_OBJECT_REFERENCES,
    COUNT_UNRESOLVED_IMPORT_REFERENCES,
];

/// Insert/select/update statements of one value table
#[derive(Debug, Clone)]
pub struct ValueStatements {
    pub insert: String,
    pub select: String,
    pub update: String,
}

impl ValueStatements {
    fn for_table(table: ValueTable) -> Self {
        let columns: Vec<&str> = table.columns().iter().map(|(name, _)| *name).collect();
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table.name(),
                columns.join(", "),
                placeholders
            ),
            select: format!("SELECT {} FROM {} WHERE id = ?1", columns.join(", "), table.name()),
            update: format!(
                "UPDATE {} SET {} WHERE id = ?{}",
                table.name(),
                assignments,
                columns.len() + 1
            ),
        }
    }
}

/// Every statement used by the store
#[derive(Debug, Clone)]
pub struct StatementSet {
    values: Vec<ValueStatements>,
}

impl StatementSet {
    pub fn new() -> Self {
        Self {
            values: ValueTable::all().iter().map(|t| ValueStatements::for_table(*t)).collect(),
        }
    }

    /// Statements of one value table
    pub fn value(&self, table: ValueTable) -> &ValueStatements {
        &self.values[table as usize]
    }

    /// Number of distinct statements, used to size the statement cache
    pub fn statement_count(&self) -> usize {
        FIXED.len() + self.values.len() * 3
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        FIXED.iter().copied().chain(
            self.values
                .iter()
                .flat_map(|v| [v.insert.as_str(), v.select.as_str(), v.update.as_str()]),
        )
    }
}

impl Default for StatementSet {
    fn default() -> Self {
        Self::new()
    }
}
