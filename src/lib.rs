//! # ndf-db - Relational persistence for NDF descriptors
//!
//! Stores richly-typed, recursively-nested NDF object trees in a normalized
//! SQLite schema and reconstructs them again.
//!
//! ndf-db provides:
//! - A closed property model (~25 leaf kinds plus list, map and pair containers)
//! - One value table per leaf kind, addressed by opaque row ids
//! - A property tree codec mapping nested containers to a parent/position adjacency list
//! - An object repository for files and objects
//! - A deferred, caller-driven resolution pass for object and import references

pub mod property;
pub mod object;
pub mod storage;
pub mod linker;
pub mod fixture;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use property::{Property, PropertyKind, PropertyValue, Reference};
pub use object::{NdfFile, NdfObject};
pub use storage::SqliteStore;
pub use linker::{ReferenceResolver, ResolutionStats};

/// Result type alias for ndf-db operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ndf-db operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store initialization failed: {0}")]
    Init(String),

    #[error("No row with id {id} in {table}")]
    MissingRow { table: &'static str, id: i64 },

    #[error("Position mismatch for property {property_id}: expected {expected}, found {found:?}")]
    PositionMismatch {
        property_id: i64,
        expected: i64,
        found: Option<i64>,
    },

    #[error("Map property {property_id} has an odd number of children ({children})")]
    UnpairedMapEntry { property_id: i64, children: usize },

    #[error("Pair property {property_id} has {children} children, expected 2")]
    IncompletePair { property_id: i64, children: usize },

    #[error("Unknown property kind: {0}")]
    UnknownKind(String),

    #[error("Unknown property type tag: {0:#04x}")]
    UnknownTypeTag(u32),

    #[error("Property {property_id} holds a {stored} value, cannot assign {given}")]
    KindMismatch {
        property_id: i64,
        stored: PropertyKind,
        given: PropertyKind,
    },

    #[error("{0} properties have no single value row")]
    ContainerValue(PropertyKind),

    #[error("Invalid {kind} value: {input}")]
    InvalidValue { kind: PropertyKind, input: String },
}
