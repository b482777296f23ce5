pub mod config;
pub mod error;
pub mod key;
pub mod permission;
pub mod router;
pub mod session;
pub mod value;
pub mod vindex;
pub mod vschema;
pub mod watch;

pub use crate::config::VgateConfig;
pub use crate::error::{VgateError, VgateErrorCode};
pub use crate::key::Destination;
pub use crate::permission::{CallerContext, VschemaAcl};
pub use crate::router::Router;
pub use crate::router::plan::Primitive;
pub use crate::router::statement::{TableListStatement, TableName};
pub use crate::session::SessionTarget;
pub use crate::value::Value;
pub use crate::vindex::{Reversible, Vindex, VindexRegistry};
pub use crate::vschema::ddl::{VSchemaDdl, VSchemaMutation, VindexSpec};
pub use crate::vschema::manager::VSchemaManager;
pub use crate::vschema::planner::{AlterVschema, VSchemaDdlPlanner};
pub use crate::vschema::show::VindexRow;
pub use crate::vschema::{PublishedVSchema, VSchemaSnapshot};
pub use crate::watch::{ConfigStore, MemoryConfigStore, VSchemaWatch};

use crate::vschema::persist::{load_vschema, save_vschema};
use std::sync::Arc;
use tracing::info;

/// A gateway's schema-and-routing core: the vschema manager, the DDL
/// planner guarding it and the router reading from it.
#[derive(Debug)]
pub struct VgateInstance {
    config: VgateConfig,
    manager: Arc<VSchemaManager>,
    planner: VSchemaDdlPlanner,
    router: Router,
}

impl VgateInstance {
    pub fn open(config: VgateConfig) -> Result<Self, VgateError> {
        Self::open_with_registry(config, VindexRegistry::builtin())
    }

    /// Opens with a caller-supplied registry, e.g. one carrying extra
    /// vindex types.
    pub fn open_with_registry(
        config: VgateConfig,
        registry: Arc<VindexRegistry>,
    ) -> Result<Self, VgateError> {
        config.validate()?;
        let store: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new(config.watch_buffer));
        let manager = Arc::new(VSchemaManager::new(registry, store));

        if let Some(path) = &config.vschema_path
            && path.exists()
        {
            let snapshot = load_vschema(path)?;
            let published = manager.replace(snapshot)?;
            info!(
                path = %path.display(),
                seq = published.seq,
                keyspaces = published.vschema.keyspaces.len(),
                "loaded vschema"
            );
        }

        let acl = VschemaAcl::new(&config.authorized_ddl_users);
        let planner = VSchemaDdlPlanner::new(Arc::clone(&manager), acl);
        Ok(Self {
            config,
            manager,
            planner,
            router: Router::new(),
        })
    }

    pub fn config(&self) -> &VgateConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<VSchemaManager> {
        &self.manager
    }

    pub fn execute_vschema_ddl(
        &self,
        caller: &CallerContext,
        session: &SessionTarget,
        stmt: &AlterVschema,
    ) -> Result<PublishedVSchema, VgateError> {
        self.planner.execute(caller, session, stmt)
    }

    /// Routes a table-list statement against the current snapshot.
    pub fn plan(
        &self,
        session: &SessionTarget,
        stmt: &TableListStatement,
    ) -> Result<Primitive, VgateError> {
        let snapshot = self.manager.snapshot();
        self.router.plan_for_session(&snapshot, stmt, session)
    }

    /// `show vschema vindexes [on [keyspace.]table]`.
    pub fn show_vindexes(
        &self,
        session: &SessionTarget,
        table: Option<&TableName>,
    ) -> Result<Vec<VindexRow>, VgateError> {
        let keyspace = table
            .and_then(|t| t.qualifier.as_deref())
            .or(session.keyspace.as_deref())
            .filter(|k| !k.is_empty())
            .ok_or(VgateError::NoKeyspace)?;
        self.manager
            .snapshot()
            .show_vindexes(keyspace, table.map(|t| t.name.as_str()))
    }

    pub fn snapshot(&self) -> Arc<VSchemaSnapshot> {
        self.manager.snapshot()
    }

    pub fn current(&self) -> PublishedVSchema {
        self.manager.current()
    }

    pub fn subscribe(&self) -> VSchemaWatch {
        self.manager.subscribe()
    }

    pub fn reload_acl(&self, spec: &str) {
        self.planner.acl().reload(spec);
    }

    pub fn map_table_ids(
        &self,
        keyspace: &str,
        table: &str,
        ids: &[Value],
    ) -> Result<Vec<Destination>, VgateError> {
        self.manager.map_table_ids(keyspace, table, ids)
    }

    /// Writes the current snapshot to the configured vschema path.
    pub fn save_vschema(&self) -> Result<(), VgateError> {
        let path = self
            .config
            .vschema_path
            .as_ref()
            .ok_or_else(|| VgateError::InvalidConfig {
                message: "vschema_path is not set".into(),
            })?;
        let current = self.manager.current();
        save_vschema(&current.vschema, path)?;
        info!(path = %path.display(), seq = current.seq, "saved vschema");
        Ok(())
    }
}
