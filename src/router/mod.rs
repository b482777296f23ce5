//! Splits table-list statements into per-keyspace sends.

pub mod plan;
pub mod statement;

use crate::error::VgateError;
use crate::session::SessionTarget;
use crate::vschema::VSchemaSnapshot;
use plan::{KeyspaceRef, Primitive, Send};
use statement::{TableListStatement, TableName};
use tracing::debug;

/// Keyspace a table reference resolved to, plus the table name to use there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub keyspace: String,
    pub sharded: bool,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    /// Plans a statement against `snapshot`. `default_keyspace` is the
    /// session's keyspace and counts as an explicit qualifier.
    pub fn plan(
        &self,
        snapshot: &VSchemaSnapshot,
        stmt: &TableListStatement,
        default_keyspace: Option<&str>,
    ) -> Result<Primitive, VgateError> {
        let session = SessionTarget {
            keyspace: default_keyspace.map(str::to_string),
            ..SessionTarget::default()
        };
        self.plan_for_session(snapshot, stmt, &session)
    }

    /// Like [`Router::plan`], but the send to the session's own keyspace is
    /// narrowed to its shard, key range or keyspace id, and every send
    /// carries the session's tablet type.
    pub fn plan_for_session(
        &self,
        snapshot: &VSchemaSnapshot,
        stmt: &TableListStatement,
        session: &SessionTarget,
    ) -> Result<Primitive, VgateError> {
        let default_keyspace = session.keyspace.as_deref();
        if stmt.tables.is_empty() {
            return Err(VgateError::InvalidArgument(
                "statement references no tables".into(),
            ));
        }

        // Keyspaces in first-seen order.
        let mut groups: Vec<(KeyspaceRef, Vec<TableName>)> = Vec::new();
        for table in &stmt.tables {
            let resolved = resolve_table(snapshot, table, default_keyspace)?;
            debug!(
                table = %table,
                keyspace = %resolved.keyspace,
                "resolved table reference"
            );
            let rewritten = TableName::new(resolved.name);
            match groups.iter_mut().find(|(ks, _)| ks.name == resolved.keyspace) {
                Some((_, tables)) => tables.push(rewritten),
                None => groups.push((
                    KeyspaceRef {
                        name: resolved.keyspace,
                        sharded: resolved.sharded,
                    },
                    vec![rewritten],
                )),
            }
        }

        let mut sends: Vec<Primitive> = groups
            .into_iter()
            .map(|(keyspace, tables)| {
                let destination = session.destination_for(&keyspace.name);
                debug!(keyspace = %keyspace.name, %destination, "send destination");
                Primitive::Send(Send {
                    keyspace,
                    destination,
                    tablet_type: session.tablet_type,
                    query: stmt.render_with(&tables),
                    is_dml: false,
                    single_shard_only: false,
                })
            })
            .collect();
        debug!(sends = sends.len(), "planned table-list statement");

        if sends.len() == 1 {
            return Ok(sends.remove(0));
        }
        Ok(Primitive::Concatenate { sources: sends })
    }
}

/// Resolution order: explicit qualifier, routing rule, session keyspace,
/// then a search across every keyspace that must find exactly one owner.
pub fn resolve_table(
    snapshot: &VSchemaSnapshot,
    table: &TableName,
    default_keyspace: Option<&str>,
) -> Result<ResolvedTable, VgateError> {
    if let Some(qualifier) = &table.qualifier {
        let rule_key = format!("{qualifier}.{}", table.name);
        if let Some(targets) = snapshot.routing_rules.lookup(&rule_key) {
            return resolve_rule_target(snapshot, &rule_key, targets);
        }
        return resolve_in_keyspace(snapshot, qualifier, &table.name);
    }

    if let Some(targets) = snapshot.routing_rules.lookup(&table.name) {
        return resolve_rule_target(snapshot, &table.name, targets);
    }

    if let Some(keyspace) = default_keyspace.filter(|k| !k.is_empty()) {
        return resolve_in_keyspace(snapshot, keyspace, &table.name);
    }

    match snapshot.keyspaces_with_table(&table.name).as_slice() {
        [keyspace] => resolve_in_keyspace(snapshot, keyspace, &table.name),
        [] => Err(VgateError::TableNotFound(table.name.clone())),
        _ => Err(VgateError::AmbiguousTable(table.name.clone())),
    }
}

fn resolve_rule_target(
    snapshot: &VSchemaSnapshot,
    from: &str,
    targets: &[String],
) -> Result<ResolvedTable, VgateError> {
    let Some(first) = targets.first() else {
        return Err(VgateError::TableDisabled(from.to_string()));
    };
    let target = TableName::parse(first);
    let Some(keyspace) = &target.qualifier else {
        return Err(VgateError::Validation(format!(
            "routing rule for {from} must target keyspace.table, got {first}"
        )));
    };
    resolve_in_keyspace(snapshot, keyspace, &target.name)
}

/// Unsharded keyspaces may hold tables the vschema does not track; those
/// pass through as-is.
fn resolve_in_keyspace(
    snapshot: &VSchemaSnapshot,
    keyspace: &str,
    table: &str,
) -> Result<ResolvedTable, VgateError> {
    let ks = snapshot
        .keyspace(keyspace)
        .ok_or_else(|| VgateError::KeyspaceNotFound(keyspace.to_string()))?;
    if !ks.sharded || ks.tables.contains_key(table) {
        return Ok(ResolvedTable {
            keyspace: keyspace.to_string(),
            sharded: ks.sharded,
            name: table.to_string(),
        });
    }
    Err(VgateError::TableNotFound(format!("{keyspace}.{table}")))
}

#[cfg(test)]
mod tests {
    use super::{Router, resolve_table};
    use crate::error::VgateError;
    use crate::key::Destination;
    use crate::router::plan::Primitive;
    use crate::router::statement::{TableListStatement, TableName};
    use crate::session::{SessionTarget, TabletType};
    use crate::vschema::ddl::{VSchemaDdl, VSchemaMutation, VindexSpec};
    use crate::vschema::{RoutingRule, RoutingRules, VSchemaSnapshot};

    fn snapshot() -> VSchemaSnapshot {
        let mut snap = VSchemaSnapshot::default();
        for table in ["user", "user_extra"] {
            snap = snap
                .apply(&VSchemaMutation::new(
                    "user",
                    VSchemaDdl::AddColumnVindex {
                        table: table.into(),
                        vindex: "user_index".into(),
                        columns: vec!["id".into()],
                        spec: Some(VindexSpec::new("numeric")),
                    },
                ))
                .expect("bind");
        }
        for table in ["unsharded_a", "dual_tbl"] {
            snap = snap
                .apply(&VSchemaMutation::new(
                    "main",
                    VSchemaDdl::AddTable {
                        table: table.into(),
                    },
                ))
                .expect("table");
        }
        snap.apply(&VSchemaMutation::new(
            "other",
            VSchemaDdl::AddTable {
                table: "dual_tbl".into(),
            },
        ))
        .expect("dup table")
    }

    fn flush(tables: &[&str]) -> TableListStatement {
        TableListStatement::flush_tables(true, tables.iter().map(|t| TableName::parse(t)).collect())
            .with_trailing("with read lock")
    }

    #[test]
    fn groups_by_keyspace_in_first_seen_order() {
        let plan = Router::new()
            .plan(&snapshot(), &flush(&["user", "unsharded_a", "user_extra"]), None)
            .expect("plan");
        let Primitive::Concatenate { sources } = &plan else {
            panic!("expected concatenate, got {plan:?}");
        };
        assert_eq!(sources.len(), 2);
        let sends = plan.sends();
        assert_eq!(sends[0].keyspace.name, "user");
        assert!(sends[0].keyspace.sharded);
        assert_eq!(
            sends[0].query,
            "flush local tables `user`, user_extra with read lock"
        );
        assert_eq!(sends[1].keyspace.name, "main");
        assert_eq!(sends[1].query, "flush local tables unsharded_a with read lock");
        for send in sends {
            assert_eq!(send.destination, Destination::AllShards);
            assert!(!send.is_dml);
            assert!(!send.single_shard_only);
        }
    }

    #[test]
    fn single_group_is_a_bare_send() {
        let plan = Router::new()
            .plan(&snapshot(), &flush(&["user.user", "user_extra"]), None)
            .expect("plan");
        let Primitive::Send(send) = plan else {
            panic!("expected send");
        };
        assert_eq!(send.query, "flush local tables `user`, user_extra with read lock");
    }

    #[test]
    fn unknown_table_in_unsharded_keyspace_passes_through() {
        let snap = snapshot();
        let resolved =
            resolve_table(&snap, &TableName::qualified("main", "untracked"), None).expect("pass");
        assert_eq!(resolved.keyspace, "main");
        let resolved = resolve_table(&snap, &TableName::new("untracked"), Some("main"))
            .expect("session keyspace");
        assert_eq!(resolved.name, "untracked");
    }

    #[test]
    fn unresolvable_tables_are_errors() {
        let snap = snapshot();
        let router = Router::new();
        let err = router
            .plan(&snap, &flush(&["user", "nowhere"]), None)
            .expect_err("absent");
        assert_eq!(err.to_string(), "table nowhere not found");

        let err = router
            .plan(&snap, &flush(&["dual_tbl"]), None)
            .expect_err("ambiguous");
        assert!(matches!(err, VgateError::AmbiguousTable(ref t) if t == "dual_tbl"));

        let err = router
            .plan(&snap, &flush(&["user.missing"]), None)
            .expect_err("sharded");
        assert!(matches!(err, VgateError::TableNotFound(ref t) if t == "user.missing"));

        let err = router
            .plan(&snap, &flush(&["ghost.t"]), None)
            .expect_err("keyspace");
        assert_eq!(err.to_string(), "keyspace ghost not found in vschema");

        assert!(router
            .plan(&snap, &TableListStatement::flush_tables(false, vec![]), None)
            .is_err());
    }

    #[test]
    fn routing_rules_redirect_and_disable() {
        let snap = snapshot().with_routing_rules(RoutingRules {
            rules: vec![
                RoutingRule {
                    from_table: "accounts".into(),
                    to_tables: vec!["user.user_extra".into(), "main.unsharded_a".into()],
                },
                RoutingRule {
                    from_table: "main.legacy".into(),
                    to_tables: vec![],
                },
            ],
        });
        let plan = Router::new()
            .plan(&snap, &flush(&["accounts"]), None)
            .expect("redirect");
        assert_eq!(plan.keyspaces(), vec!["user"]);
        assert_eq!(plan.sends()[0].query, "flush local tables user_extra with read lock");

        let err = Router::new()
            .plan(&snap, &flush(&["main.legacy"]), None)
            .expect_err("disabled");
        assert_eq!(err.to_string(), "table main.legacy has been disabled");
    }

    #[test]
    fn session_narrowing_targets_its_own_keyspace_only() {
        let session = SessionTarget::parse("user/-80@replica").expect("target");
        let plan = Router::new()
            .plan_for_session(&snapshot(), &flush(&["user", "main.unsharded_a"]), &session)
            .expect("plan");
        let sends = plan.sends();
        assert_eq!(sends[0].keyspace.name, "user");
        assert_eq!(sends[0].destination, Destination::Shard("-80".into()));
        assert_eq!(sends[1].keyspace.name, "main");
        assert_eq!(sends[1].destination, Destination::AllShards);
        assert!(sends.iter().all(|s| s.tablet_type == TabletType::Replica));
    }
}
