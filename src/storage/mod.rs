//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - ndf_file(vfs_path, dat_path, fs_path, game_version, is_current)
//! - ndf_object(ndf_id, object_name, class_name, export_path, is_top_object)
//! - ndf_property(object_id, property_name, property_index, parent, position, type, is_import_reference, value)
//! - one value table per leaf kind (ndf_bool, ndf_F32_vec3, ndf_object_reference, ...)

pub mod codec;
pub mod schema;
pub mod sqlite;
pub mod statements;
pub mod values;

pub use codec::{PropertyArena, PropertyRow};
pub use schema::ValueTable;
pub use sqlite::{DbStats, ObjectRecord, SqliteStore};
pub use statements::StatementSet;
