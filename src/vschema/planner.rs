use crate::error::VgateError;
use crate::permission::{CallerContext, VschemaAcl};
use crate::session::SessionTarget;
use crate::vschema::PublishedVSchema;
use crate::vschema::ddl::{VSchemaDdl, VSchemaMutation};
use crate::vschema::manager::VSchemaManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// `alter vschema` statement. Without an explicit keyspace the session's
/// target keyspace is used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlterVschema {
    #[serde(default)]
    pub keyspace: Option<String>,
    pub ddl: VSchemaDdl,
}

impl AlterVschema {
    pub fn new(ddl: VSchemaDdl) -> Self {
        Self {
            keyspace: None,
            ddl,
        }
    }

    pub fn in_keyspace(keyspace: impl Into<String>, ddl: VSchemaDdl) -> Self {
        Self {
            keyspace: Some(keyspace.into()),
            ddl,
        }
    }
}

/// Turns `alter vschema` statements into mutations on the manager.
#[derive(Debug, Clone)]
pub struct VSchemaDdlPlanner {
    manager: Arc<VSchemaManager>,
    acl: VschemaAcl,
}

impl VSchemaDdlPlanner {
    pub fn new(manager: Arc<VSchemaManager>, acl: VschemaAcl) -> Self {
        Self { manager, acl }
    }

    pub fn acl(&self) -> &VschemaAcl {
        &self.acl
    }

    /// Authorization is checked before anything else, so an unauthorized
    /// caller learns nothing about the schema.
    pub fn plan(
        &self,
        caller: &CallerContext,
        session: &SessionTarget,
        stmt: &AlterVschema,
    ) -> Result<VSchemaMutation, VgateError> {
        if !self.acl.authorized(caller) {
            debug!(caller = %caller.caller_id, "vschema ddl denied");
            return Err(VgateError::NotAuthorized);
        }
        let keyspace = stmt
            .keyspace
            .as_deref()
            .or(session.keyspace.as_deref())
            .filter(|k| !k.is_empty())
            .ok_or(VgateError::NoKeyspace)?;
        let mutation = VSchemaMutation::new(keyspace, stmt.ddl.clone());
        mutation.validate()?;
        Ok(mutation)
    }

    pub fn execute(
        &self,
        caller: &CallerContext,
        session: &SessionTarget,
        stmt: &AlterVschema,
    ) -> Result<PublishedVSchema, VgateError> {
        let mutation = self.plan(caller, session, stmt)?;
        self.manager.apply(&mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::{AlterVschema, VSchemaDdlPlanner};
    use crate::error::VgateError;
    use crate::permission::{CallerContext, VschemaAcl};
    use crate::session::SessionTarget;
    use crate::vindex::VindexRegistry;
    use crate::vschema::ddl::{VSchemaDdl, VindexSpec};
    use crate::vschema::manager::VSchemaManager;
    use crate::watch::MemoryConfigStore;
    use std::sync::Arc;

    fn planner(acl: &str) -> (VSchemaDdlPlanner, Arc<VSchemaManager>) {
        let manager = Arc::new(VSchemaManager::new(
            VindexRegistry::builtin(),
            Arc::new(MemoryConfigStore::new(4)),
        ));
        (
            VSchemaDdlPlanner::new(Arc::clone(&manager), VschemaAcl::new(acl)),
            manager,
        )
    }

    fn create_vindex() -> VSchemaDdl {
        VSchemaDdl::CreateVindex {
            vindex: "test_vindex".into(),
            spec: VindexSpec::new("numeric"),
        }
    }

    #[test]
    fn denied_caller_changes_nothing() {
        let (planner, manager) = planner("blueUser");
        let err = planner
            .execute(
                &CallerContext::new("redUser"),
                &SessionTarget::keyspace("ks"),
                &AlterVschema::new(create_vindex()),
            )
            .expect_err("denied");
        assert!(matches!(err, VgateError::NotAuthorized));
        assert_eq!(manager.current().seq, 0);
    }

    #[test]
    fn auth_is_checked_before_keyspace() {
        let (planner, _) = planner("");
        let err = planner
            .execute(
                &CallerContext::new("redUser"),
                &SessionTarget::default(),
                &AlterVschema::new(create_vindex()),
            )
            .expect_err("denied");
        assert!(matches!(err, VgateError::NotAuthorized));
    }

    #[test]
    fn keyspace_comes_from_statement_or_session() {
        let (planner, manager) = planner("%");
        let caller = CallerContext::new("redUser");
        let err = planner
            .execute(
                &caller,
                &SessionTarget::default(),
                &AlterVschema::new(create_vindex()),
            )
            .expect_err("no keyspace");
        assert_eq!(err.to_string(), "no keyspace in database name specified");

        planner
            .execute(
                &caller,
                &SessionTarget::keyspace("from_session"),
                &AlterVschema::new(create_vindex()),
            )
            .expect("session keyspace");
        planner
            .execute(
                &caller,
                &SessionTarget::keyspace("from_session"),
                &AlterVschema::in_keyspace("explicit", create_vindex()),
            )
            .expect("explicit keyspace");
        let snap = manager.snapshot();
        assert!(snap.vindex_def("from_session", "test_vindex").is_some());
        assert!(snap.vindex_def("explicit", "test_vindex").is_some());
    }

    #[test]
    fn acl_reload_applies_to_next_statement() {
        let (planner, _) = planner("");
        let caller = CallerContext::new("redUser");
        let stmt = AlterVschema::in_keyspace("ks", create_vindex());
        let session = SessionTarget::default();
        assert!(planner.execute(&caller, &session, &stmt).is_err());
        planner.acl().reload("redUser");
        planner.execute(&caller, &session, &stmt).expect("allowed");
    }

    #[test]
    fn auto_increment_accepts_qualified_sequence() {
        let (planner, manager) = planner("%");
        let caller = CallerContext::new("redUser");
        let session = SessionTarget::keyspace("user");
        planner
            .execute(
                &caller,
                &session,
                &AlterVschema::new(VSchemaDdl::AddColumnVindex {
                    table: "user".into(),
                    vindex: "user_index".into(),
                    columns: vec!["id".into()],
                    spec: Some(VindexSpec::new("numeric")),
                }),
            )
            .expect("bind");
        planner
            .execute(
                &caller,
                &session,
                &AlterVschema::new(VSchemaDdl::AddAutoIncrement {
                    table: "user".into(),
                    column: "id".into(),
                    sequence: "main.user_seq".into(),
                }),
            )
            .expect("auto inc");
        let auto = manager
            .snapshot()
            .table("user", "user")
            .and_then(|t| t.auto_increment.clone())
            .expect("auto inc set");
        assert_eq!(auto.sequence, "main.user_seq");
    }
}
