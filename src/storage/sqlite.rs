//! SQLite storage implementation

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use super::schema;
use super::statements::{self, StatementSet};
use crate::linker::{ReferenceResolver, ResolutionStats};
use crate::object::{NdfFile, NdfObject};
use crate::property::Property;
use crate::{Error, Result};

/// Room in the statement cache beyond the prepared set, for ad-hoc statements
const CACHE_HEADROOM: usize = 16;

/// SQLite-backed storage for NDF descriptors
pub struct SqliteStore {
    pub(super) conn: Connection,
    pub(super) statements: StatementSet,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        tracing::debug!("Opened NDF store at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (one per worker when ingesting in parallel)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn,
            statements: StatementSet::new(),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create the schema and prepare every statement the store uses
    fn initialize(&self) -> Result<()> {
        self.conn
            .pragma_update(None, "foreign_keys", true)
            .map_err(|e| Error::Init(format!("could not enable foreign keys: {}", e)))?;

        for stmt in schema::all_schema_statements() {
            self.conn
                .execute_batch(&stmt)
                .map_err(|e| Error::Init(format!("schema statement failed: {}: {}", e, stmt.trim())))?;
        }

        self.conn
            .set_prepared_statement_cache_capacity(self.statements.statement_count() + CACHE_HEADROOM);
        for sql in self.statements.all() {
            self.conn
                .prepare_cached(sql)
                .map_err(|e| Error::Init(format!("could not prepare statement: {}: {}", e, sql.trim())))?;
        }

        tracing::debug!("Prepared {} statements", self.statements.statement_count());
        Ok(())
    }

    // ========== File Operations ==========

    /// Register a source file
    pub fn insert_file(
        &self,
        vfs_path: &str,
        archive_path: &str,
        fs_path: &str,
        version: &str,
        is_current: bool,
    ) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(statements::INSERT_FILE)?;
        let id = stmt.insert(params![vfs_path, archive_path, fs_path, version, is_current])?;
        tracing::debug!(file_id = id, "Inserted file {}", vfs_path);
        Ok(id)
    }

    pub fn get_file(&self, file_id: i64) -> Result<Option<NdfFile>> {
        let mut stmt = self.conn.prepare_cached(statements::GET_FILE)?;
        stmt.query_row([file_id], row_to_file).optional().map_err(Into::into)
    }

    pub fn list_files(&self) -> Result<Vec<NdfFile>> {
        let mut stmt = self.conn.prepare_cached(statements::LIST_FILES)?;
        let files = stmt
            .query_map([], row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Mark a file as (not) part of the live set import references resolve against
    pub fn set_current_file(&self, file_id: i64, is_current: bool) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(statements::SET_FILE_CURRENT)?;
        Ok(stmt.execute(params![is_current, file_id])? > 0)
    }

    /// Delete a file with all its objects, properties and value rows.
    ///
    /// References into the deleted objects keep their text and lose their target.
    pub fn delete_file(&self, file_id: i64) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(statements::DELETE_FILE)?;
        let deleted = stmt.execute([file_id])? > 0;
        if deleted {
            tracing::debug!(file_id, "Deleted file");
        }
        Ok(deleted)
    }

    // ========== Object Operations ==========

    /// Insert an object and encode all of its direct properties
    pub fn insert_object(&self, file_id: i64, object: &NdfObject) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(statements::INSERT_OBJECT)?;
        let object_id = stmt.insert(params![
            file_id,
            object.name,
            object.class_name,
            object.export_path,
            object.is_top_object,
        ])?;

        for property in &object.properties {
            if let Err(e) = self.insert_property(property, object_id, None, None) {
                tracing::error!(
                    object_id,
                    "Could not insert property '{}' of {}: {}",
                    property.name,
                    object.name,
                    e
                );
                return Err(e);
            }
        }

        tracing::debug!(
            file_id,
            object_id,
            "Inserted {} '{}' with {} properties",
            object.class_name,
            object.name,
            object.properties.len()
        );
        Ok(object_id)
    }

    /// Read an object with its direct properties in field order
    pub fn get_object(&self, object_id: i64) -> Result<Option<NdfObject>> {
        let mut stmt = self.conn.prepare_cached(statements::GET_OBJECT)?;
        let object = stmt
            .query_row([object_id], |row| {
                Ok(NdfObject::new(
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })
            .optional()?;
        let Some(mut object) = object else {
            return Ok(None);
        };

        let arena = self.load_property_arena(object_id)?;
        for row in arena.fields() {
            match self.decode_property(&arena, row) {
                Ok(property) => object.properties.push(property),
                Err(e) => {
                    tracing::error!(
                        object_id,
                        property_id = row.id,
                        "Could not decode property '{}' of {}: {}",
                        row.name,
                        object.name,
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(Some(object))
    }

    /// Decode any stored property (field or nested child) with its subtree
    pub fn get_property(&self, property_id: i64) -> Result<Option<Property>> {
        let Some(row) = self.get_property_row(property_id)? else {
            return Ok(None);
        };
        let arena = self.load_property_arena(row.object_id)?;
        self.decode_property(&arena, &row).map(Some)
    }

    /// Rename an object. Unresolved references holding the old name are left as they are.
    pub fn change_object_name(&self, object_id: i64, name: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(statements::SET_OBJECT_NAME)?;
        Ok(stmt.execute(params![name, object_id])? > 0)
    }

    pub fn change_export_path(&self, object_id: i64, export_path: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(statements::SET_OBJECT_EXPORT_PATH)?;
        Ok(stmt.execute(params![export_path, object_id])? > 0)
    }

    // ========== Lookup Operations ==========

    /// First object (lowest id) with the given name
    pub fn find_object_by_name(&self, name: &str) -> Result<Option<i64>> {
        self.query_id(statements::OBJECT_BY_NAME, name)
    }

    /// First object (lowest id) with the given export path
    pub fn find_object_by_export_path(&self, export_path: &str) -> Result<Option<i64>> {
        self.query_id(statements::OBJECT_BY_EXPORT_PATH, export_path)
    }

    fn query_id(&self, sql: &str, key: &str) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        stmt.query_row([key], |row| row.get(0)).optional().map_err(Into::into)
    }

    pub fn object_names(&self, file_id: i64) -> Result<Vec<String>> {
        self.query_strings(statements::OBJECT_NAMES, file_id)
    }

    /// Distinct class names used in a file, sorted
    pub fn object_class_names(&self, file_id: i64) -> Result<Vec<String>> {
        self.query_strings(statements::OBJECT_CLASS_NAMES, file_id)
    }

    /// Names of the direct properties of an object in field order
    pub fn property_names(&self, object_id: i64) -> Result<Vec<String>> {
        self.query_strings(statements::PROPERTY_NAMES, object_id)
    }

    fn query_strings(&self, sql: &str, id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let values = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(values)
    }

    fn query_ids(&self, sql: &str, id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let values = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(values)
    }

    /// Object rows of a file without their properties
    pub fn objects_in_file(&self, file_id: i64) -> Result<Vec<ObjectRecord>> {
        let mut stmt = self.conn.prepare_cached(statements::LIST_OBJECTS)?;
        let records = stmt
            .query_map([file_id], |row| {
                Ok(ObjectRecord {
                    id: row.get(0)?,
                    file_id: row.get(1)?,
                    name: row.get(2)?,
                    class_name: row.get(3)?,
                    export_path: row.get(4)?,
                    is_top_object: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn object_file_id(&self, object_id: i64) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare_cached(statements::OBJECT_FILE_ID)?;
        stmt.query_row([object_id], |row| row.get(0)).optional().map_err(Into::into)
    }

    pub fn object_name(&self, object_id: i64) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare_cached(statements::OBJECT_NAME)?;
        stmt.query_row([object_id], |row| row.get(0)).optional().map_err(Into::into)
    }

    pub fn object_export_path(&self, object_id: i64) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare_cached(statements::OBJECT_EXPORT_PATH)?;
        stmt.query_row([object_id], |row| row.get(0)).optional().map_err(Into::into)
    }

    /// Ids of the direct properties of an object in field order
    pub fn property_ids(&self, object_id: i64) -> Result<Vec<i64>> {
        self.query_ids(statements::OBJECT_PROPERTY_IDS, object_id)
    }

    /// Objects holding a resolved object reference to `object_id`
    pub fn objects_referencing(&self, object_id: i64) -> Result<Vec<i64>> {
        self.query_ids(statements::OBJECTS_REFERENCING, object_id)
    }

    /// Objects holding a resolved import reference to `object_id`
    pub fn objects_importing(&self, object_id: i64) -> Result<Vec<i64>> {
        self.query_ids(statements::OBJECTS_IMPORTING, object_id)
    }

    // ========== Resolution Operations ==========

    /// Resolve object references against `file_id` and import references against the current file
    pub fn fix_references(&self, file_id: i64) -> Result<ResolutionStats> {
        ReferenceResolver::new(self).run(file_id)
    }

    pub(crate) fn resolve_object_references(&self, file_id: i64) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(statements::RESOLVE_OBJECT_REFERENCES)?;
        Ok(stmt.execute([file_id])?)
    }

    pub(crate) fn resolve_import_references(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(statements::RESOLVE_IMPORT_REFERENCES)?;
        Ok(stmt.execute([])?)
    }

    /// (object, import) references without a target
    pub fn count_unresolved_references(&self) -> Result<(usize, usize)> {
        Ok((
            self.count(statements::COUNT_UNRESOLVED_OBJECT_REFERENCES)?,
            self.count(statements::COUNT_UNRESOLVED_IMPORT_REFERENCES)?,
        ))
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let (unresolved_object_references, unresolved_import_references) = self.count_unresolved_references()?;
        Ok(DbStats {
            files: self.count(statements::COUNT_FILES)?,
            objects: self.count(statements::COUNT_OBJECTS)?,
            properties: self.count(statements::COUNT_PROPERTIES)?,
            unresolved_object_references,
            unresolved_import_references,
        })
    }
}

fn row_to_file(row: &Row) -> rusqlite::Result<NdfFile> {
    Ok(NdfFile {
        id: row.get(0)?,
        vfs_path: row.get(1)?,
        archive_path: row.get(2)?,
        fs_path: row.get(3)?,
        version: row.get(4)?,
        is_current: row.get(5)?,
    })
}

/// An object row without its properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub id: i64,
    pub file_id: i64,
    pub name: String,
    pub class_name: String,
    pub export_path: String,
    pub is_top_object: bool,
}

/// Database statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct DbStats {
    pub files: usize,
    pub objects: usize,
    pub properties: usize,
    pub unresolved_object_references: usize,
    pub unresolved_import_references: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(f, "  Objects: {}", self.objects)?;
        writeln!(f, "  Properties: {}", self.properties)?;
        writeln!(f, "  Unresolved object references: {}", self.unresolved_object_references)?;
        writeln!(f, "  Unresolved import references: {}", self.unresolved_import_references)
    }
}
