use crate::Result;
use crate::storage::SqliteStore;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResolutionStats {
    pub file_id: i64,
    /// Object references given a target by this pass
    pub object_references: usize,
    /// Import references given a target by this pass
    pub import_references: usize,
    /// Object references still without a target, store-wide
    pub unresolved_object: usize,
    pub unresolved_import: usize,
}

impl ResolutionStats {
    pub fn resolved(&self) -> usize {
        self.object_references + self.import_references
    }
}

impl fmt::Display for ResolutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reference Resolution (file {}):", self.file_id)?;
        writeln!(f, "  ✅ Object references resolved: {}", self.object_references)?;
        writeln!(f, "  ✅ Import references resolved: {}", self.import_references)?;
        writeln!(f, "  🤔 Unresolved object references: {}", self.unresolved_object)?;
        writeln!(f, "  🌍 Unresolved import references: {}", self.unresolved_import)
    }
}

/// Deferred resolution pass for references stored without a target.
///
/// Object references match object names among the objects of one file;
/// import references match export paths among the objects of the file(s)
/// marked current. Several matching objects resolve to the one with the
/// lowest id. Rows that already have a target are never touched, so running
/// the pass again is a no-op.
pub struct ReferenceResolver<'a> {
    store: &'a SqliteStore,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    pub fn run(&self, file_id: i64) -> Result<ResolutionStats> {
        let object_references = self.store.resolve_object_references(file_id)?;
        let import_references = self.store.resolve_import_references()?;
        let (unresolved_object, unresolved_import) = self.store.count_unresolved_references()?;

        tracing::debug!(
            file_id,
            object_references,
            import_references,
            unresolved_object,
            unresolved_import,
            "Resolved references"
        );

        Ok(ResolutionStats {
            file_id,
            object_references,
            import_references,
            unresolved_object,
            unresolved_import,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::NdfObject;
    use crate::property::{PropertyValue, Reference};

    fn referencing(name: &str, value: PropertyValue) -> NdfObject {
        NdfObject::new(name, "TEntityDescriptor", format!("$/GFX/{}", name), true).with_property("Ref", value)
    }

    fn target(name: &str) -> NdfObject {
        NdfObject::new(name, "TWeaponDescriptor", format!("$/GFX/{}", name), true)
            .with_property("Damage", PropertyValue::Float32(1.5))
    }

    fn first_value(store: &SqliteStore, object_id: i64) -> PropertyValue {
        store.get_object(object_id).unwrap().unwrap().properties[0].value.clone()
    }

    #[test]
    fn test_forward_reference() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = store.insert_file("a.ndf", "a.dat", "a", "1", true).unwrap();

        let a = store
            .insert_object(file, &referencing("A", PropertyValue::ObjectReference(Reference::unresolved("B"))))
            .unwrap();
        assert_eq!(
            first_value(&store, a),
            PropertyValue::ObjectReference(Reference::unresolved("B"))
        );

        let b = store.insert_object(file, &target("B")).unwrap();
        let stats = store.fix_references(file).unwrap();
        assert_eq!(stats.object_references, 1);
        assert_eq!(stats.unresolved_object, 0);
        assert_eq!(
            first_value(&store, a),
            PropertyValue::ObjectReference(Reference::resolved("B", b))
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = store.insert_file("a.ndf", "a.dat", "a", "1", true).unwrap();
        let a = store
            .insert_object(file, &referencing("A", PropertyValue::ObjectReference(Reference::unresolved("B"))))
            .unwrap();
        let missing = store
            .insert_object(file, &referencing("C", PropertyValue::ObjectReference(Reference::unresolved("Nope"))))
            .unwrap();
        store.insert_object(file, &target("B")).unwrap();

        let first = store.fix_references(file).unwrap();
        let state = (first_value(&store, a), first_value(&store, missing));

        let second = store.fix_references(file).unwrap();
        assert_eq!(second.resolved(), 0);
        assert_eq!(second.unresolved_object, first.unresolved_object);
        assert_eq!((first_value(&store, a), first_value(&store, missing)), state);
    }

    #[test]
    fn test_object_reference_targets_scoped_to_file() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert_file("a.ndf", "a.dat", "a", "1", true).unwrap();
        let second = store.insert_file("b.ndf", "a.dat", "b", "1", true).unwrap();

        let a = store
            .insert_object(first, &referencing("A", PropertyValue::ObjectReference(Reference::unresolved("B"))))
            .unwrap();
        let b = store.insert_object(second, &target("B")).unwrap();

        assert_eq!(store.fix_references(first).unwrap().object_references, 0);
        assert_eq!(
            first_value(&store, a),
            PropertyValue::ObjectReference(Reference::unresolved("B"))
        );

        assert_eq!(store.fix_references(second).unwrap().object_references, 1);
        assert_eq!(
            first_value(&store, a),
            PropertyValue::ObjectReference(Reference::resolved("B", b))
        );
    }

    #[test]
    fn test_first_match_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        let file = store.insert_file("a.ndf", "a.dat", "a", "1", true).unwrap();
        let a = store
            .insert_object(file, &referencing("A", PropertyValue::ObjectReference(Reference::unresolved("Twin"))))
            .unwrap();
        let twin = store.insert_object(file, &target("Twin")).unwrap();
        store.insert_object(file, &target("Twin")).unwrap();

        store.fix_references(file).unwrap();
        assert_eq!(
            first_value(&store, a),
            PropertyValue::ObjectReference(Reference::resolved("Twin", twin))
        );
    }

    #[test]
    fn test_import_references_resolve_against_current_file() {
        let store = SqliteStore::open_in_memory().unwrap();
        let importer = store.insert_file("importer.ndf", "a.dat", "a", "1", false).unwrap();
        let a = store
            .insert_object(
                importer,
                &referencing("A", PropertyValue::ImportReference(Reference::unresolved("$/GFX/B"))),
            )
            .unwrap();

        let stale = store.insert_file("stale.ndf", "a.dat", "b", "1", false).unwrap();
        store.insert_object(stale, &target("B")).unwrap();
        assert_eq!(store.fix_references(importer).unwrap().import_references, 0);

        let live = store.insert_file("live.ndf", "a.dat", "c", "1", true).unwrap();
        let b = store.insert_object(live, &target("B")).unwrap();
        let stats = store.fix_references(importer).unwrap();
        assert_eq!(stats.import_references, 1);
        assert_eq!(stats.unresolved_import, 0);
        assert_eq!(
            first_value(&store, a),
            PropertyValue::ImportReference(Reference::resolved("$/GFX/B", b))
        );
        assert_eq!(store.objects_importing(b).unwrap(), vec![a]);
    }

    #[test]
    fn test_stats_display() {
        let stats = ResolutionStats {
            file_id: 3,
            object_references: 2,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("file 3"));
        assert!(text.contains("Object references resolved: 2"));
    }
}
