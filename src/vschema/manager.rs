use crate::error::VgateError;
use crate::key::Destination;
use crate::value::Value;
use crate::vindex::{Vindex, VindexRegistry};
use crate::vschema::ddl::VSchemaMutation;
use crate::vschema::{PublishedVSchema, VSchemaSnapshot, validate_keyspace};
use crate::watch::{ConfigStore, VSchemaWatch};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the current vschema and serializes every change to it.
///
/// Readers take an `Arc` of the current snapshot and never block writers
/// for longer than a pointer swap. Writers are serialized by `apply_lock`,
/// so each mutation is validated against the latest published state.
#[derive(Debug)]
pub struct VSchemaManager {
    registry: Arc<VindexRegistry>,
    store: Arc<dyn ConfigStore>,
    apply_lock: Mutex<()>,
    current: RwLock<PublishedVSchema>,
}

impl VSchemaManager {
    pub fn new(registry: Arc<VindexRegistry>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            registry,
            store,
            apply_lock: Mutex::new(()),
            current: RwLock::new(PublishedVSchema {
                seq: 0,
                vschema: Arc::new(VSchemaSnapshot::default()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<VindexRegistry> {
        &self.registry
    }

    pub fn current(&self) -> PublishedVSchema {
        self.current.read().clone()
    }

    pub fn snapshot(&self) -> Arc<VSchemaSnapshot> {
        Arc::clone(&self.current.read().vschema)
    }

    pub fn subscribe(&self) -> VSchemaWatch {
        self.store.subscribe()
    }

    /// Applies one mutation. An identical redeclaration succeeds without
    /// publishing a new snapshot.
    pub fn apply(&self, mutation: &VSchemaMutation) -> Result<PublishedVSchema, VgateError> {
        mutation.validate()?;
        let _guard = self.apply_lock.lock();
        let base = self.current();
        let next = base.vschema.apply(mutation)?;
        if next == *base.vschema {
            debug!(
                keyspace = %mutation.keyspace,
                operation = mutation.ddl.operation_name(),
                "vschema mutation left schema unchanged"
            );
            return Ok(base);
        }
        if let Some(ks) = next.keyspace(&mutation.keyspace) {
            validate_keyspace(&mutation.keyspace, ks, &self.registry)?;
        }
        let published = self.publish_locked(base.seq, next)?;
        info!(
            seq = published.seq,
            keyspace = %mutation.keyspace,
            operation = mutation.ddl.operation_name(),
            "vschema updated"
        );
        Ok(published)
    }

    /// Swaps in a whole snapshot, e.g. one loaded from disk.
    pub fn replace(&self, snapshot: VSchemaSnapshot) -> Result<PublishedVSchema, VgateError> {
        snapshot.validate(&self.registry)?;
        let _guard = self.apply_lock.lock();
        let base_seq = self.current.read().seq;
        let published = self.publish_locked(base_seq, snapshot)?;
        info!(
            seq = published.seq,
            keyspaces = published.vschema.keyspaces.len(),
            "vschema replaced"
        );
        Ok(published)
    }

    /// The store sees the snapshot before readers of `current` do; a failed
    /// publish leaves the current snapshot in place.
    fn publish_locked(
        &self,
        base_seq: u64,
        next: VSchemaSnapshot,
    ) -> Result<PublishedVSchema, VgateError> {
        let published = PublishedVSchema {
            seq: base_seq + 1,
            vschema: Arc::new(next),
        };
        self.store.publish(&published)?;
        *self.current.write() = published.clone();
        Ok(published)
    }

    /// Instantiates a vindex declared in the current snapshot.
    pub fn vindex(&self, keyspace: &str, name: &str) -> Result<Arc<dyn Vindex>, VgateError> {
        let snapshot = self.snapshot();
        let def = snapshot
            .vindex_def(keyspace, name)
            .ok_or_else(|| VgateError::VindexNotFound {
                vindex: name.to_string(),
                keyspace: keyspace.to_string(),
            })?;
        self.registry.create(&def.vindex_type, name, &def.params)
    }

    /// Maps ids through the table's primary (first) column vindex.
    pub fn map_table_ids(
        &self,
        keyspace: &str,
        table: &str,
        ids: &[Value],
    ) -> Result<Vec<Destination>, VgateError> {
        let snapshot = self.snapshot();
        let primary = snapshot
            .table(keyspace, table)
            .and_then(|t| t.primary_vindex())
            .ok_or_else(|| VgateError::TableNotDefined {
                keyspace: keyspace.to_string(),
                table: table.to_string(),
            })?;
        self.vindex(keyspace, &primary.name)?.map(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::VSchemaManager;
    use crate::error::VgateError;
    use crate::key::Destination;
    use crate::value::Value;
    use crate::vindex::VindexRegistry;
    use crate::vschema::ddl::{VSchemaDdl, VSchemaMutation, VindexSpec};
    use crate::vschema::{Keyspace, VSchemaSnapshot, VindexDef};
    use crate::watch::MemoryConfigStore;
    use std::sync::Arc;

    fn manager() -> (VSchemaManager, Arc<MemoryConfigStore>) {
        let store = Arc::new(MemoryConfigStore::new(8));
        (
            VSchemaManager::new(VindexRegistry::builtin(), store.clone()),
            store,
        )
    }

    fn bind_user() -> VSchemaMutation {
        VSchemaMutation::new(
            "user",
            VSchemaDdl::AddColumnVindex {
                table: "user".into(),
                vindex: "user_index".into(),
                columns: vec!["id".into()],
                spec: Some(VindexSpec::new("numeric")),
            },
        )
    }

    #[test]
    fn apply_publishes_next_sequence() {
        let (manager, store) = manager();
        let mut watch = manager.subscribe();
        let published = manager.apply(&bind_user()).expect("apply");
        assert_eq!(published.seq, 1);
        assert_eq!(manager.current().seq, 1);
        assert!(manager.snapshot().table("user", "user").is_some());
        assert_eq!(watch.try_recv().map(|v| v.seq), Some(1));
        assert_eq!(store.latest().map(|v| v.seq), Some(1));
    }

    #[test]
    fn unchanged_schema_is_not_republished() {
        let (manager, _store) = manager();
        let create = VSchemaMutation::new(
            "user",
            VSchemaDdl::CreateVindex {
                vindex: "v".into(),
                spec: VindexSpec::new("numeric"),
            },
        );
        manager.apply(&create).expect("first");
        let mut watch = manager.subscribe();
        assert_eq!(watch.try_recv().map(|v| v.seq), Some(1));
        let again = manager.apply(&create).expect("idempotent");
        assert_eq!(again.seq, 1);
        assert!(watch.try_recv().is_none());
    }

    #[test]
    fn rejected_mutation_leaves_snapshot() {
        let (manager, _store) = manager();
        manager.apply(&bind_user()).expect("apply");
        let before = manager.snapshot();
        let err = manager
            .apply(&VSchemaMutation::new(
                "user",
                VSchemaDdl::CreateVindex {
                    vindex: "bad".into(),
                    spec: VindexSpec::new("slot_mask").with_param("shard_slot_mask", "xyz"),
                },
            ))
            .expect_err("bad params");
        assert!(matches!(err, VgateError::InvalidConfig { .. }));
        assert!(Arc::ptr_eq(&before, &manager.snapshot()));

        let err = manager
            .apply(&VSchemaMutation::new(
                "user",
                VSchemaDdl::CreateVindex {
                    vindex: "mystery".into(),
                    spec: VindexSpec::new("mystery"),
                },
            ))
            .expect_err("unknown type");
        assert!(matches!(err, VgateError::UnknownVindexType(_)));
        assert_eq!(manager.current().seq, 1);
    }

    #[test]
    fn map_table_ids_uses_primary_vindex() {
        let (manager, _store) = manager();
        manager.apply(&bind_user()).expect("apply");
        let out = manager
            .map_table_ids("user", "user", &[Value::Uint64(5)])
            .expect("map");
        assert_eq!(out, vec![Destination::KeyspaceId(vec![0, 0, 0, 0, 0, 0, 0, 5])]);
        assert!(matches!(
            manager.map_table_ids("user", "missing", &[Value::Uint64(5)]),
            Err(VgateError::TableNotDefined { .. })
        ));
        assert!(matches!(
            manager.vindex("user", "nope"),
            Err(VgateError::VindexNotFound { .. })
        ));
    }

    #[test]
    fn replace_validates_whole_snapshot() {
        let (manager, _store) = manager();
        let mut ks = Keyspace::sharded();
        ks.vindexes.insert(
            "v".into(),
            VindexDef {
                vindex_type: "nope".into(),
                ..VindexDef::default()
            },
        );
        let bad = VSchemaSnapshot::default().with_keyspace("user", ks);
        assert!(manager.replace(bad).is_err());
        assert_eq!(manager.current().seq, 0);

        let good = VSchemaSnapshot::default().with_keyspace("main", Keyspace::unsharded());
        assert_eq!(manager.replace(good).expect("replace").seq, 1);
        assert!(manager.snapshot().keyspace("main").is_some());
    }
}
