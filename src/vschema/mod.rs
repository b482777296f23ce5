//! Logical schema binding tables to keyspaces and vindexes.
//!
//! A [`VSchemaSnapshot`] is an immutable value. Mutations produce a new
//! snapshot that shares untouched keyspaces with its predecessor through the
//! persistent maps of `im`.

pub mod ddl;
pub mod manager;
pub mod persist;
pub mod planner;
pub mod show;

use crate::error::VgateError;
use crate::vindex::VindexRegistry;
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VindexDef {
    #[serde(rename = "type")]
    pub vindex_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Binding of an ordered column list to a named vindex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnVindex {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    #[default]
    Standard,
    Sequence,
}

impl TableType {
    fn is_standard(&self) -> bool {
        matches!(self, TableType::Standard)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutoIncrement {
    pub column: String,
    pub sequence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Table {
    #[serde(rename = "type", default, skip_serializing_if = "TableType::is_standard")]
    pub table_type: TableType,
    /// Ordered by creation; the first binding computes routing keys for new rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_vindexes: Vec<ColumnVindex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<AutoIncrement>,
}

impl Table {
    pub fn sequence() -> Self {
        Self {
            table_type: TableType::Sequence,
            ..Self::default()
        }
    }

    pub fn primary_vindex(&self) -> Option<&ColumnVindex> {
        self.column_vindexes.first()
    }

    pub fn column_vindex(&self, vindex: &str) -> Option<&ColumnVindex> {
        self.column_vindexes.iter().find(|cv| cv.name == vindex)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Keyspace {
    #[serde(default)]
    pub sharded: bool,
    #[serde(default)]
    pub vindexes: OrdMap<String, VindexDef>,
    #[serde(default)]
    pub tables: OrdMap<String, Table>,
}

impl Keyspace {
    pub fn sharded() -> Self {
        Self {
            sharded: true,
            ..Self::default()
        }
    }

    pub fn unsharded() -> Self {
        Self::default()
    }
}

/// Redirects a table name (bare or `keyspace.table`) to an ordered list of
/// `keyspace.table` targets. An empty target list disables the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingRule {
    pub from_table: String,
    pub to_tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RoutingRules {
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl RoutingRules {
    pub fn lookup(&self, from_table: &str) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|r| r.from_table == from_table)
            .map(|r| r.to_tables.as_slice())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VSchemaSnapshot {
    #[serde(default)]
    pub keyspaces: OrdMap<String, Keyspace>,
    #[serde(default, skip_serializing_if = "RoutingRules::is_empty")]
    pub routing_rules: RoutingRules,
}

impl RoutingRules {
    fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl VSchemaSnapshot {
    pub fn keyspace(&self, name: &str) -> Option<&Keyspace> {
        self.keyspaces.get(name)
    }

    pub fn table(&self, keyspace: &str, table: &str) -> Option<&Table> {
        self.keyspaces.get(keyspace)?.tables.get(table)
    }

    pub fn vindex_def(&self, keyspace: &str, vindex: &str) -> Option<&VindexDef> {
        self.keyspaces.get(keyspace)?.vindexes.get(vindex)
    }

    /// Names of every keyspace defining `table`, in keyspace order.
    pub fn keyspaces_with_table(&self, table: &str) -> Vec<&str> {
        self.keyspaces
            .iter()
            .filter(|(_, ks)| ks.tables.contains_key(table))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn with_keyspace(&self, name: &str, keyspace: Keyspace) -> Self {
        let mut next = self.clone();
        next.keyspaces.insert(name.to_string(), keyspace);
        next
    }

    pub fn with_routing_rules(&self, routing_rules: RoutingRules) -> Self {
        Self {
            keyspaces: self.keyspaces.clone(),
            routing_rules,
        }
    }

    pub fn validate(&self, registry: &VindexRegistry) -> Result<(), VgateError> {
        for (name, keyspace) in &self.keyspaces {
            validate_keyspace(name, keyspace, registry)?;
        }
        Ok(())
    }
}

/// Every vindex must be constructible and every binding must reference a
/// vindex defined in the same keyspace.
pub(crate) fn validate_keyspace(
    name: &str,
    keyspace: &Keyspace,
    registry: &VindexRegistry,
) -> Result<(), VgateError> {
    for (vindex_name, def) in &keyspace.vindexes {
        registry.create(&def.vindex_type, vindex_name, &def.params)?;
    }
    for (table_name, table) in &keyspace.tables {
        for cv in &table.column_vindexes {
            if !keyspace.vindexes.contains_key(&cv.name) {
                return Err(VgateError::VindexNotFound {
                    vindex: cv.name.clone(),
                    keyspace: name.to_string(),
                });
            }
            if cv.columns.is_empty() {
                return Err(VgateError::Validation(format!(
                    "column vindex {} on table {name}.{table_name} has no columns",
                    cv.name
                )));
            }
        }
    }
    Ok(())
}

/// A snapshot as published by the manager, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVSchema {
    pub seq: u64,
    pub vschema: Arc<VSchemaSnapshot>,
}
