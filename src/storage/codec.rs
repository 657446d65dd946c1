//! Property tree codec
//!
//! Encoding walks a property tree depth-first: leaves insert their value row
//! first and then the property row pointing at it, containers insert their own
//! row first (no value) and then every child with `parent` set to that row and
//! `position` set to the child's slot.
//!
//! Decoding loads all property rows of the owning object once into a
//! [`PropertyArena`] and rebuilds the requested subtree from it, reading only
//! value rows on the way down.

use std::collections::HashMap;

use rusqlite::{OptionalExtension, Row, params};

use super::schema::ValueTable;
use super::sqlite::SqliteStore;
use super::statements;
use crate::property::{CHILD_INDEX, Property, PropertyKind, PropertyValue, Reference};
use crate::{Error, Result};

/// One row of the property table
#[derive(Debug, Clone)]
pub struct PropertyRow {
    pub id: i64,
    pub object_id: i64,
    pub name: String,
    pub index: i32,
    pub parent: Option<i64>,
    pub position: Option<i64>,
    pub type_tag: u32,
    pub is_import_reference: bool,
    pub value: Option<i64>,
}

impl PropertyRow {
    pub fn kind(&self) -> Result<PropertyKind> {
        PropertyKind::from_type_tag(self.type_tag, self.is_import_reference)
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            object_id: row.get(1)?,
            name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            index: row.get::<_, Option<i32>>(3)?.unwrap_or(CHILD_INDEX),
            parent: row.get(4)?,
            position: row.get(5)?,
            type_tag: row.get(6)?,
            is_import_reference: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
            value: row.get(8)?,
        })
    }
}

/// All property rows of one object, with children grouped by parent in position order
#[derive(Debug, Default)]
pub struct PropertyArena {
    rows: Vec<PropertyRow>,
    by_id: HashMap<i64, usize>,
    children: HashMap<i64, Vec<usize>>,
}

impl PropertyArena {
    pub fn new(rows: Vec<PropertyRow>) -> Self {
        let by_id = rows.iter().enumerate().map(|(i, row)| (row.id, i)).collect();

        let mut children: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            if let Some(parent) = row.parent {
                children.entry(parent).or_default().push(i);
            }
        }
        for slots in children.values_mut() {
            slots.sort_by_key(|&i| (rows[i].position, rows[i].id));
        }

        Self { rows, by_id, children }
    }

    pub fn get(&self, property_id: i64) -> Option<&PropertyRow> {
        self.by_id.get(&property_id).map(|&i| &self.rows[i])
    }

    /// Children of a property ordered by position
    pub fn children(&self, property_id: i64) -> impl Iterator<Item = &PropertyRow> {
        self.children
            .get(&property_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.rows[i])
    }

    /// Direct fields of the object, ordered by field index
    pub fn fields(&self) -> Vec<&PropertyRow> {
        let mut fields: Vec<&PropertyRow> = self.rows.iter().filter(|row| row.index != CHILD_INDEX).collect();
        fields.sort_by_key(|row| (row.index, row.id));
        fields
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SqliteStore {
    // ========== Encoding ==========

    /// Encode a property (and its whole subtree) for an object.
    ///
    /// `parent`/`position` are absent for direct fields. Container children are
    /// always stored with [`CHILD_INDEX`]. A failing child aborts the encode;
    /// rows written so far stay unless the caller rolls back its transaction.
    pub fn insert_property(
        &self,
        property: &Property,
        object_id: i64,
        parent: Option<i64>,
        position: Option<i64>,
    ) -> Result<i64> {
        let kind = property.kind();
        let index = if parent.is_some() { CHILD_INDEX } else { property.index };

        if kind.is_container() {
            let property_id = self.insert_property_row(object_id, &property.name, index, parent, position, kind, None)?;

            for (slot, child) in property.value.children().into_iter().enumerate() {
                let slot = slot as i64;
                if let Err(e) = self.insert_property(child, object_id, Some(property_id), Some(slot)) {
                    tracing::error!(
                        object_id,
                        property_id,
                        position = slot,
                        "Could not insert child of {} property '{}': {}",
                        kind,
                        property.name,
                        e
                    );
                    return Err(e);
                }
            }
            return Ok(property_id);
        }

        let value = self.with_reference_target(&property.value)?;
        let value_id = self.insert_value(&value)?;
        self.insert_property_row(object_id, &property.name, index, parent, position, kind, Some(value_id))
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_property_row(
        &self,
        object_id: i64,
        name: &str,
        index: i32,
        parent: Option<i64>,
        position: Option<i64>,
        kind: PropertyKind,
        value_id: Option<i64>,
    ) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(statements::INSERT_PROPERTY)?;
        let id = stmt.insert(params![
            object_id,
            name,
            index,
            parent,
            position,
            kind.type_tag(),
            kind.is_import_reference(),
            value_id,
        ])?;
        Ok(id)
    }

    /// Look up the target of a reference by its text.
    ///
    /// Object references match object names, import references export paths;
    /// an absent target leaves the reference for the resolution pass.
    pub(crate) fn with_reference_target(&self, value: &PropertyValue) -> Result<PropertyValue> {
        let resolved = match value {
            PropertyValue::ObjectReference(r) => PropertyValue::ObjectReference(Reference {
                name: r.name.clone(),
                target: self.find_object_by_name(&r.name)?,
            }),
            PropertyValue::ImportReference(r) => PropertyValue::ImportReference(Reference {
                name: r.name.clone(),
                target: self.find_object_by_export_path(&r.name)?,
            }),
            other => other.clone(),
        };
        Ok(resolved)
    }

    // ========== Decoding ==========

    /// Read a single property row
    pub fn get_property_row(&self, property_id: i64) -> Result<Option<PropertyRow>> {
        let mut stmt = self.conn.prepare_cached(statements::GET_PROPERTY)?;
        stmt.query_row([property_id], PropertyRow::from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Load every property row of an object in one pass
    pub fn load_property_arena(&self, object_id: i64) -> Result<PropertyArena> {
        let mut stmt = self.conn.prepare_cached(statements::OBJECT_PROPERTY_ROWS)?;
        let rows = stmt
            .query_map([object_id], PropertyRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(PropertyArena::new(rows))
    }

    /// Rebuild the subtree rooted at `row` from the arena
    pub fn decode_property(&self, arena: &PropertyArena, row: &PropertyRow) -> Result<Property> {
        let kind = row.kind()?;

        let value = match kind {
            PropertyKind::List => PropertyValue::List(self.decode_children(arena, row)?),
            PropertyKind::Map => {
                let children = self.decode_children(arena, row)?;
                if children.len() % 2 != 0 {
                    tracing::error!(property_id = row.id, "Map '{}' has no value for its last key", row.name);
                    return Err(Error::UnpairedMapEntry {
                        property_id: row.id,
                        children: children.len(),
                    });
                }
                let mut entries = Vec::with_capacity(children.len() / 2);
                let mut iter = children.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    entries.push((key, value));
                }
                PropertyValue::Map(entries)
            }
            PropertyKind::Pair => {
                let children = self.decode_children(arena, row)?;
                let count = children.len();
                let mut iter = children.into_iter();
                let (Some(first), Some(second)) = (iter.next(), iter.next()) else {
                    tracing::error!(property_id = row.id, "Pair '{}' is missing its second item", row.name);
                    return Err(Error::IncompletePair {
                        property_id: row.id,
                        children: count,
                    });
                };
                if count > 2 {
                    tracing::warn!(
                        property_id = row.id,
                        "Pair '{}' has {} children, ignoring all but the first two",
                        row.name,
                        count
                    );
                }
                PropertyValue::pair(first, second)
            }
            _ => self.decode_leaf(kind, row)?,
        };

        Ok(Property {
            name: row.name.clone(),
            index: row.index,
            value,
        })
    }

    fn decode_children(&self, arena: &PropertyArena, row: &PropertyRow) -> Result<Vec<Property>> {
        let mut decoded = Vec::new();
        for (expected, child) in arena.children(row.id).enumerate() {
            let expected = expected as i64;
            if child.position != Some(expected) {
                tracing::error!(
                    object_id = row.object_id,
                    property_id = child.id,
                    "Position mismatch under '{}': required {} but is {:?}",
                    row.name,
                    expected,
                    child.position
                );
                return Err(Error::PositionMismatch {
                    property_id: child.id,
                    expected,
                    found: child.position,
                });
            }
            match self.decode_property(arena, child) {
                Ok(property) => decoded.push(property),
                Err(e) => {
                    tracing::error!(
                        object_id = row.object_id,
                        property_id = child.id,
                        position = expected,
                        "Could not decode child of '{}': {}",
                        row.name,
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(decoded)
    }

    fn decode_leaf(&self, kind: PropertyKind, row: &PropertyRow) -> Result<PropertyValue> {
        let table = ValueTable::for_kind(kind).ok_or(Error::ContainerValue(kind))?;
        let value_id = row.value.ok_or(Error::MissingRow {
            table: table.name(),
            id: row.id,
        })?;
        let value = self
            .read_value(table, value_id)?
            .ok_or(Error::MissingRow {
                table: table.name(),
                id: value_id,
            })?;

        // A resolved reference shows the target's current identity
        let value = match value {
            PropertyValue::ObjectReference(Reference { target: Some(target), .. }) => {
                let name = self.object_name(target)?.ok_or(Error::MissingRow {
                    table: "ndf_object",
                    id: target,
                })?;
                PropertyValue::ObjectReference(Reference::resolved(name, target))
            }
            PropertyValue::ImportReference(Reference { target: Some(target), .. }) => {
                let path = self.object_export_path(target)?.ok_or(Error::MissingRow {
                    table: "ndf_object",
                    id: target,
                })?;
                PropertyValue::ImportReference(Reference::resolved(path, target))
            }
            other => other,
        };
        Ok(value)
    }

    // ========== Value mutation ==========

    /// Replace the value of a stored leaf property and refresh its in-memory mirror.
    ///
    /// The new value must be of the stored kind; references look their target
    /// up again by the new text.
    pub fn change_value(&self, property_id: i64, property: &mut Property, value: PropertyValue) -> Result<()> {
        let row = self.get_property_row(property_id)?.ok_or(Error::MissingRow {
            table: "ndf_property",
            id: property_id,
        })?;
        let stored = row.kind()?;
        if stored.is_container() {
            return Err(Error::ContainerValue(stored));
        }
        if value.kind() != stored {
            return Err(Error::KindMismatch {
                property_id,
                stored,
                given: value.kind(),
            });
        }

        let value = self.with_reference_target(&value)?;
        let value_id = row.value.ok_or(Error::MissingRow {
            table: "ndf_property",
            id: property_id,
        })?;
        if !self.update_value(value_id, &value)? {
            return Err(Error::MissingRow {
                table: ValueTable::for_kind(stored).map(|t| t.name()).unwrap_or("ndf_property"),
                id: value_id,
            });
        }

        tracing::debug!(property_id, "Changed {} value of '{}'", stored, row.name);
        property.value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::NdfObject;

    fn store_with_object() -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = store.insert_file("gfx/units.ndf", "NDF_Win.dat", "/tmp/units.ndfbin", "1.0", true).unwrap();
        let object = store
            .insert_object(file, &NdfObject::new("Unit", "TEntityDescriptor", "$/GFX/Unit", true))
            .unwrap();
        (store, object)
    }

    fn int(value: i32) -> Property {
        Property::element(PropertyValue::Int32(value))
    }

    fn text(value: &str) -> Property {
        Property::element(PropertyValue::String(value.to_string()))
    }

    #[test]
    fn test_leaf_roundtrip() {
        let (store, object) = store_with_object();
        let property = Property::new("Speed", 0, PropertyValue::Float32(12.75));

        let id = store.insert_property(&property, object, None, None).unwrap();
        assert_eq!(store.get_property(id).unwrap().unwrap(), property);
    }

    #[test]
    fn test_nested_list_of_map_of_pair() {
        let (store, object) = store_with_object();
        let pair = |a: i32, b: &str| Property::element(PropertyValue::pair(int(a), text(b)));
        let map = |base: i32| {
            Property::element(PropertyValue::Map(vec![
                (text("first"), pair(base, "a")),
                (text("second"), pair(base + 1, "b")),
            ]))
        };
        let property = Property::new("Weapons", 0, PropertyValue::List(vec![map(10), map(20), map(30)]));

        let id = store.insert_property(&property, object, None, None).unwrap();
        assert_eq!(store.get_property(id).unwrap().unwrap(), property);
    }

    #[test]
    fn test_children_decode_in_position_order() {
        let (store, object) = store_with_object();
        let list = Property::new("Items", 0, PropertyValue::List(Vec::new()));
        let list_id = store.insert_property(&list, object, None, None).unwrap();

        // Insert out of order
        store.insert_property(&int(2), object, Some(list_id), Some(2)).unwrap();
        store.insert_property(&int(0), object, Some(list_id), Some(0)).unwrap();
        store.insert_property(&int(1), object, Some(list_id), Some(1)).unwrap();

        let decoded = store.get_property(list_id).unwrap().unwrap();
        assert_eq!(decoded.value, PropertyValue::List(vec![int(0), int(1), int(2)]));
    }

    #[test]
    fn test_odd_map_is_rejected() {
        let (store, object) = store_with_object();
        let map = Property::new("Table", 0, PropertyValue::Map(Vec::new()));
        let map_id = store.insert_property(&map, object, None, None).unwrap();

        store.insert_property(&text("key"), object, Some(map_id), Some(0)).unwrap();
        store.insert_property(&int(1), object, Some(map_id), Some(1)).unwrap();
        store.insert_property(&text("dangling"), object, Some(map_id), Some(2)).unwrap();

        let result = store.get_property(map_id);
        assert!(matches!(result, Err(Error::UnpairedMapEntry { children: 3, .. })));
    }

    #[test]
    fn test_incomplete_pair_is_rejected() {
        let (store, object) = store_with_object();
        let pair = Property::new("Range", 0, PropertyValue::List(Vec::new()));
        let pair_id = store.insert_property(&pair, object, None, None).unwrap();
        store
            .conn
            .execute("UPDATE ndf_property SET type = ?1 WHERE id = ?2", params![PropertyKind::Pair.type_tag(), pair_id])
            .unwrap();
        store.insert_property(&int(1), object, Some(pair_id), Some(0)).unwrap();

        assert!(matches!(
            store.get_property(pair_id),
            Err(Error::IncompletePair { children: 1, .. })
        ));
    }

    #[test]
    fn test_position_gap_is_shape_mismatch() {
        let (store, object) = store_with_object();
        let list = Property::new("Items", 0, PropertyValue::List(Vec::new()));
        let list_id = store.insert_property(&list, object, None, None).unwrap();
        store.insert_property(&int(0), object, Some(list_id), Some(0)).unwrap();
        store.insert_property(&int(5), object, Some(list_id), Some(5)).unwrap();

        assert!(matches!(
            store.get_property(list_id),
            Err(Error::PositionMismatch { expected: 1, found: Some(5), .. })
        ));
    }

    #[test]
    fn test_missing_value_row_fails_decode() {
        let (store, object) = store_with_object();
        let id = store
            .insert_property(&Property::new("Flag", 0, PropertyValue::Bool(true)), object, None, None)
            .unwrap();
        store.conn.execute("DELETE FROM ndf_bool", []).unwrap();

        assert!(matches!(
            store.get_property(id),
            Err(Error::MissingRow { table: "ndf_bool", .. })
        ));
    }

    #[test]
    fn test_children_are_stored_with_child_index() {
        let (store, object) = store_with_object();
        let mut child = int(3);
        child.index = 7;
        let list = Property::new("Items", 0, PropertyValue::List(vec![child]));
        let list_id = store.insert_property(&list, object, None, None).unwrap();

        let arena = store.load_property_arena(object).unwrap();
        let children: Vec<_> = arena.children(list_id).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].index, CHILD_INDEX);
        assert_eq!(children[0].parent, Some(list_id));
        assert!(children[0].value.is_some());
        assert!(arena.get(list_id).unwrap().value.is_none());
    }

    #[test]
    fn test_change_value() {
        let (store, object) = store_with_object();
        let mut property = Property::new("Armor", 0, PropertyValue::UInt16(10));
        let id = store.insert_property(&property, object, None, None).unwrap();

        store.change_value(id, &mut property, PropertyValue::UInt16(400)).unwrap();
        assert_eq!(property.value, PropertyValue::UInt16(400));
        assert_eq!(store.get_property(id).unwrap().unwrap(), property);
    }

    #[test]
    fn test_change_value_kind_mismatch() {
        let (store, object) = store_with_object();
        let mut property = Property::new("Armor", 0, PropertyValue::UInt16(10));
        let id = store.insert_property(&property, object, None, None).unwrap();

        let result = store.change_value(id, &mut property, PropertyValue::UInt8(4));
        assert!(matches!(result, Err(Error::KindMismatch { .. })));
        assert_eq!(property.value, PropertyValue::UInt16(10));
    }

    #[test]
    fn test_change_value_on_container() {
        let (store, object) = store_with_object();
        let mut property = Property::new("Items", 0, PropertyValue::List(vec![int(1)]));
        let id = store.insert_property(&property, object, None, None).unwrap();

        let result = store.change_value(id, &mut property, PropertyValue::List(Vec::new()));
        assert!(matches!(result, Err(Error::ContainerValue(PropertyKind::List))));
    }

    #[test]
    fn test_change_object_reference_looks_up_new_target() {
        let (store, object) = store_with_object();
        let mut property = Property::new("Ref", 0, PropertyValue::ObjectReference(Reference::unresolved("Ghost")));
        let id = store.insert_property(&property, object, None, None).unwrap();
        assert_eq!(store.count_unresolved_references().unwrap(), (1, 0));

        store
            .change_value(id, &mut property, PropertyValue::ObjectReference(Reference::unresolved("Unit")))
            .unwrap();
        let expected = PropertyValue::ObjectReference(Reference::resolved("Unit", object));
        assert_eq!(property.value, expected);
        assert_eq!(store.get_property(id).unwrap().unwrap().value, expected);
        assert_eq!(store.count_unresolved_references().unwrap(), (0, 0));

        store
            .change_value(id, &mut property, PropertyValue::ObjectReference(Reference::resolved("Missing", object)))
            .unwrap();
        let expected = PropertyValue::ObjectReference(Reference::unresolved("Missing"));
        assert_eq!(property.value, expected);
        assert_eq!(store.get_property(id).unwrap().unwrap().value, expected);
        assert_eq!(store.count_unresolved_references().unwrap(), (1, 0));
    }

    #[test]
    fn test_change_import_reference_looks_up_new_target() {
        let (store, object) = store_with_object();
        let mut property = Property::new(
            "Import",
            0,
            PropertyValue::ImportReference(Reference::unresolved("$/GFX/Ghost")),
        );
        let id = store.insert_property(&property, object, None, None).unwrap();
        assert_eq!(store.count_unresolved_references().unwrap(), (0, 1));

        store
            .change_value(id, &mut property, PropertyValue::ImportReference(Reference::unresolved("$/GFX/Unit")))
            .unwrap();
        let expected = PropertyValue::ImportReference(Reference::resolved("$/GFX/Unit", object));
        assert_eq!(store.get_property(id).unwrap().unwrap().value, expected);
        assert_eq!(store.count_unresolved_references().unwrap(), (0, 0));

        store
            .change_value(id, &mut property, PropertyValue::ImportReference(Reference::unresolved("$/GFX/Missing")))
            .unwrap();
        let expected = PropertyValue::ImportReference(Reference::unresolved("$/GFX/Missing"));
        assert_eq!(property.value, expected);
        assert_eq!(store.get_property(id).unwrap().unwrap().value, expected);
        assert_eq!(store.count_unresolved_references().unwrap(), (0, 1));
    }

    #[test]
    fn test_reference_kinds_stay_distinct() {
        let (store, object) = store_with_object();
        let mut import = Property::new("Ref", 0, PropertyValue::ImportReference(Reference::unresolved("$/GFX/Other")));
        let id = store.insert_property(&import, object, None, None).unwrap();

        let result = store.change_value(
            id,
            &mut import,
            PropertyValue::ObjectReference(Reference::unresolved("Other")),
        );
        assert!(matches!(
            result,
            Err(Error::KindMismatch {
                stored: PropertyKind::ImportReference,
                given: PropertyKind::ObjectReference,
                ..
            })
        ));
        assert_eq!(store.get_property(id).unwrap().unwrap().kind(), PropertyKind::ImportReference);
    }
}
