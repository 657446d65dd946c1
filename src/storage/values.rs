//! Value store - point insert/read/update on the per-kind value tables
//!
//! Rows are never shared or deduplicated: every leaf property owns exactly
//! one value row. No validation happens here beyond what the column types and
//! the Rust payload types enforce; reading an integer outside the width of its
//! kind fails the read.

use rusqlite::{OptionalExtension, Row, ToSql};

use super::schema::ValueTable;
use super::sqlite::SqliteStore;
use crate::property::{PropertyValue, Reference};
use crate::{Error, Result};

fn one(value: &dyn ToSql) -> Vec<&dyn ToSql> {
    vec![value]
}

fn many<T: ToSql>(values: &[T]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}

/// SQLite stores a NaN REAL as NULL, which no float column can be read back from
fn has_nan(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Float32(v) => v.is_nan(),
        PropertyValue::Float64(v) => v.is_nan(),
        PropertyValue::F32Vec2(v) => v.iter().any(|c| c.is_nan()),
        PropertyValue::F32Vec3(v) => v.iter().any(|c| c.is_nan()),
        PropertyValue::F32Vec4(v) => v.iter().any(|c| c.is_nan()),
        _ => false,
    }
}

/// Bind the payload columns of a leaf value in table column order
fn bind(value: &PropertyValue) -> Result<Vec<&dyn ToSql>> {
    if has_nan(value) {
        return Err(Error::InvalidValue {
            kind: value.kind(),
            input: format!("{:?}", value),
        });
    }

    let params = match value {
        PropertyValue::Bool(v) => one(v),
        PropertyValue::Int8(v) => one(v),
        PropertyValue::Int16(v) => one(v),
        PropertyValue::Int32(v) => one(v),
        PropertyValue::UInt8(v) => one(v),
        PropertyValue::UInt16(v) => one(v),
        PropertyValue::UInt32(v) => one(v),
        PropertyValue::Float32(v) => one(v),
        PropertyValue::Float64(v) => one(v),
        PropertyValue::String(v)
        | PropertyValue::WideString(v)
        | PropertyValue::Guid(v)
        | PropertyValue::PathReference(v)
        | PropertyValue::LocalisationHash(v)
        | PropertyValue::Hash(v) => one(v),
        PropertyValue::F32Vec2(v) => many(v),
        PropertyValue::F32Vec3(v) => many(v),
        PropertyValue::F32Vec4(v) => many(v),
        PropertyValue::S32Vec2(v) => many(v),
        PropertyValue::S32Vec3(v) => many(v),
        PropertyValue::S32Vec4(v) => many(v),
        PropertyValue::Color(v) => many(v),
        PropertyValue::ObjectReference(r) | PropertyValue::ImportReference(r) => {
            vec![&r.target as &dyn ToSql, &r.name]
        }
        PropertyValue::List(_) | PropertyValue::Map(_) | PropertyValue::Pair(_) => {
            return Err(Error::ContainerValue(value.kind()));
        }
    };
    Ok(params)
}

/// Convert a value row into the payload of its table's kind
fn row_to_value(table: ValueTable, row: &Row) -> rusqlite::Result<PropertyValue> {
    let value = match table {
        ValueTable::Bool => PropertyValue::Bool(row.get(0)?),
        ValueTable::Int8 => PropertyValue::Int8(row.get(0)?),
        ValueTable::UInt8 => PropertyValue::UInt8(row.get(0)?),
        ValueTable::Int16 => PropertyValue::Int16(row.get(0)?),
        ValueTable::UInt16 => PropertyValue::UInt16(row.get(0)?),
        ValueTable::Int32 => PropertyValue::Int32(row.get(0)?),
        ValueTable::UInt32 => PropertyValue::UInt32(row.get(0)?),
        ValueTable::Float32 => PropertyValue::Float32(row.get(0)?),
        ValueTable::Float64 => PropertyValue::Float64(row.get(0)?),
        ValueTable::String => PropertyValue::String(row.get(0)?),
        ValueTable::WideString => PropertyValue::WideString(row.get(0)?),
        ValueTable::F32Vec2 => PropertyValue::F32Vec2([row.get(0)?, row.get(1)?]),
        ValueTable::F32Vec3 => PropertyValue::F32Vec3([row.get(0)?, row.get(1)?, row.get(2)?]),
        ValueTable::F32Vec4 => {
            PropertyValue::F32Vec4([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?])
        }
        ValueTable::S32Vec2 => PropertyValue::S32Vec2([row.get(0)?, row.get(1)?]),
        ValueTable::S32Vec3 => PropertyValue::S32Vec3([row.get(0)?, row.get(1)?, row.get(2)?]),
        ValueTable::S32Vec4 => {
            PropertyValue::S32Vec4([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?])
        }
        ValueTable::Color => PropertyValue::Color([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?]),
        ValueTable::ObjectReference => PropertyValue::ObjectReference(Reference {
            target: row.get(0)?,
            name: row.get(1)?,
        }),
        ValueTable::ImportReference => PropertyValue::ImportReference(Reference {
            target: row.get(0)?,
            name: row.get(1)?,
        }),
        ValueTable::Guid => PropertyValue::Guid(row.get(0)?),
        ValueTable::PathReference => PropertyValue::PathReference(row.get(0)?),
        ValueTable::LocalisationHash => PropertyValue::LocalisationHash(row.get(0)?),
        ValueTable::Hash => PropertyValue::Hash(row.get(0)?),
    };
    Ok(value)
}

fn table_of(value: &PropertyValue) -> Result<ValueTable> {
    ValueTable::for_kind(value.kind()).ok_or(Error::ContainerValue(value.kind()))
}

impl SqliteStore {
    // ========== Value Operations ==========

    /// Insert a leaf value into its table, returning the new value id.
    ///
    /// References are stored exactly as given (target and text); target
    /// lookup is the codec's job.
    ///
    /// NaN floats (scalar or any vector component) are rejected. A negative
    /// zero is read back as `0.0`: SQLite writes integral REAL values as
    /// integers, which drops the sign bit.
    pub fn insert_value(&self, value: &PropertyValue) -> Result<i64> {
        let table = table_of(value)?;
        let params = bind(value)?;
        let mut stmt = self.conn.prepare_cached(&self.statements.value(table).insert)?;
        let id = stmt.insert(&params[..])?;
        Ok(id)
    }

    /// Read a value row of the given table
    pub fn read_value(&self, table: ValueTable, value_id: i64) -> Result<Option<PropertyValue>> {
        let mut stmt = self.conn.prepare_cached(&self.statements.value(table).select)?;
        stmt.query_row([value_id], |row| row_to_value(table, row))
            .optional()
            .map_err(Into::into)
    }

    /// Overwrite a value row in place. Returns false if no row has that id.
    pub fn update_value(&self, value_id: i64, value: &PropertyValue) -> Result<bool> {
        let table = table_of(value)?;
        let mut params = bind(value)?;
        params.push(&value_id);
        let mut stmt = self.conn.prepare_cached(&self.statements.value(table).update)?;
        let changed = stmt.execute(&params[..])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKind;

    fn sample_values() -> Vec<PropertyValue> {
        vec![
            PropertyValue::Bool(true),
            PropertyValue::Int8(-128),
            PropertyValue::Int16(-1234),
            PropertyValue::Int32(i32::MIN),
            PropertyValue::UInt8(255),
            PropertyValue::UInt16(65535),
            PropertyValue::UInt32(u32::MAX),
            PropertyValue::Float32(0.1),
            PropertyValue::Float64(-1.0e-300),
            PropertyValue::String("TUniteDescriptor".to_string()),
            PropertyValue::WideString("Léopard 2A6 – Über".to_string()),
            PropertyValue::F32Vec2([0.1, -0.2]),
            PropertyValue::F32Vec3([1.0e-7, 3.5, f32::MAX]),
            PropertyValue::F32Vec4([0.3, 0.6, 0.9, 1.2]),
            PropertyValue::S32Vec2([-1, 1]),
            PropertyValue::S32Vec3([i32::MIN, 0, i32::MAX]),
            PropertyValue::S32Vec4([1, 2, 3, 4]),
            PropertyValue::Color([255, 0, 128, 64]),
            PropertyValue::ObjectReference(Reference::unresolved("Descriptor_Unit_M1A1")),
            PropertyValue::ImportReference(Reference::unresolved("$/GFX/Unit/Descriptor_Unit_M1A1")),
            PropertyValue::Guid("GUID:{3b5b5e9f-4b2a-4b54-9a3e-5f0d1c2b3a4f}".to_string()),
            PropertyValue::PathReference("GameData:/Gameplay/Unit/Units.ndf".to_string()),
            PropertyValue::LocalisationHash("A1B2C3D4E5F60718".to_string()),
            PropertyValue::Hash("0011223344556677".to_string()),
        ]
    }

    #[test]
    fn test_value_roundtrip_every_leaf_kind() {
        let store = SqliteStore::open_in_memory().unwrap();

        for value in sample_values() {
            let table = ValueTable::for_kind(value.kind()).unwrap();
            let id = store.insert_value(&value).unwrap();
            let read = store.read_value(table, id).unwrap().unwrap();
            assert_eq!(read, value, "roundtrip of {}", value.kind());
        }
    }

    #[test]
    fn test_float_bits_survive() {
        let store = SqliteStore::open_in_memory().unwrap();
        let value = PropertyValue::F32Vec3([0.1, 1.0 / 3.0, -2.5e-12]);
        let id = store.insert_value(&value).unwrap();

        match store.read_value(ValueTable::F32Vec3, id).unwrap().unwrap() {
            PropertyValue::F32Vec3(read) => {
                let expected = [0.1f32, 1.0 / 3.0, -2.5e-12];
                for (a, b) in read.iter().zip(expected.iter()) {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_nan_is_rejected_on_write() {
        let store = SqliteStore::open_in_memory().unwrap();

        let scalar = store.insert_value(&PropertyValue::Float32(f32::NAN));
        assert!(matches!(scalar, Err(Error::InvalidValue { kind: PropertyKind::Float32, .. })));

        let wide = store.insert_value(&PropertyValue::Float64(f64::NAN));
        assert!(matches!(wide, Err(Error::InvalidValue { kind: PropertyKind::Float64, .. })));

        let vector = store.insert_value(&PropertyValue::F32Vec3([1.0, f32::NAN, 2.0]));
        assert!(matches!(vector, Err(Error::InvalidValue { kind: PropertyKind::F32Vec3, .. })));

        let id = store.insert_value(&PropertyValue::F32Vec2([1.0, 2.0])).unwrap();
        assert!(store.update_value(id, &PropertyValue::F32Vec2([f32::NAN, 0.5])).is_err());
        assert_eq!(
            store.read_value(ValueTable::F32Vec2, id).unwrap(),
            Some(PropertyValue::F32Vec2([1.0, 2.0]))
        );
    }

    #[test]
    fn test_nan_property_fails_encode_not_decode() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = store.insert_file("a.ndf", "a.dat", "a", "1", true).unwrap();
        let object = store
            .insert_object(file, &crate::object::NdfObject::new("Unit", "TEntityDescriptor", "$/GFX/Unit", true))
            .unwrap();

        let property = crate::property::Property::new("Speed", 0, PropertyValue::Float32(f32::NAN));
        assert!(store.insert_property(&property, object, None, None).is_err());
        assert_eq!(store.get_object(object).unwrap().unwrap().properties.len(), 0);
    }

    #[test]
    fn test_negative_zero_reads_back_positive() {
        let store = SqliteStore::open_in_memory().unwrap();

        let id = store.insert_value(&PropertyValue::Float32(-0.0)).unwrap();
        match store.read_value(ValueTable::Float32, id).unwrap().unwrap() {
            PropertyValue::Float32(read) => assert_eq!(read.to_bits(), 0.0f32.to_bits()),
            other => panic!("unexpected value {:?}", other),
        }

        let id = store.insert_value(&PropertyValue::F32Vec2([-0.0, -1.5])).unwrap();
        match store.read_value(ValueTable::F32Vec2, id).unwrap().unwrap() {
            PropertyValue::F32Vec2([x, y]) => {
                assert_eq!(x.to_bits(), 0.0f32.to_bits());
                assert_eq!(y.to_bits(), (-1.5f32).to_bits());
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_values_are_not_shared() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert_value(&PropertyValue::Int32(7)).unwrap();
        let b = store.insert_value(&PropertyValue::Int32(7)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_update_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_value(&PropertyValue::Color([1, 2, 3, 4])).unwrap();

        assert!(store.update_value(id, &PropertyValue::Color([9, 8, 7, 6])).unwrap());
        assert_eq!(
            store.read_value(ValueTable::Color, id).unwrap(),
            Some(PropertyValue::Color([9, 8, 7, 6]))
        );
        assert!(!store.update_value(id + 100, &PropertyValue::Color([0, 0, 0, 0])).unwrap());
    }

    #[test]
    fn test_missing_value_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.read_value(ValueTable::Hash, 42).unwrap().is_none());
    }

    #[test]
    fn test_containers_have_no_value_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.insert_value(&PropertyValue::List(Vec::new()));
        assert!(matches!(result, Err(Error::ContainerValue(_))));
    }

    #[test]
    fn test_out_of_width_integer_fails_read() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_value(&PropertyValue::UInt8(1)).unwrap();
        store
            .conn
            .execute("UPDATE ndf_uint8 SET value = 300 WHERE id = ?1", [id])
            .unwrap();
        assert!(store.read_value(ValueTable::UInt8, id).is_err());
    }
}
