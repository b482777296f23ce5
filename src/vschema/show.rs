use crate::error::VgateError;
use crate::vschema::VSchemaSnapshot;
use serde::{Deserialize, Serialize};

/// One row of `show vschema vindexes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VindexRow {
    pub columns: String,
    pub name: String,
    pub vindex_type: String,
    pub params: String,
    pub owner: String,
}

impl VSchemaSnapshot {
    /// Vindexes bound to `table`, in binding order. Without a table, every
    /// vindex declared in the keyspace, with an empty column list.
    pub fn show_vindexes(
        &self,
        keyspace: &str,
        table: Option<&str>,
    ) -> Result<Vec<VindexRow>, VgateError> {
        let ks = self
            .keyspace(keyspace)
            .ok_or_else(|| VgateError::KeyspaceNotFound(keyspace.to_string()))?;

        let Some(table) = table else {
            return Ok(ks
                .vindexes
                .iter()
                .map(|(name, def)| VindexRow {
                    columns: String::new(),
                    name: name.clone(),
                    vindex_type: def.vindex_type.clone(),
                    params: format_params(def.params.iter()),
                    owner: def.owner.clone().unwrap_or_default(),
                })
                .collect());
        };

        let t = ks
            .tables
            .get(table)
            .ok_or_else(|| VgateError::ShowTableNotFound {
                keyspace: keyspace.to_string(),
                table: table.to_string(),
            })?;
        t.column_vindexes
            .iter()
            .map(|cv| {
                let def = ks
                    .vindexes
                    .get(&cv.name)
                    .ok_or_else(|| VgateError::VindexNotFound {
                        vindex: cv.name.clone(),
                        keyspace: keyspace.to_string(),
                    })?;
                Ok(VindexRow {
                    columns: cv.columns.join(", "),
                    name: cv.name.clone(),
                    vindex_type: def.vindex_type.clone(),
                    params: format_params(def.params.iter()),
                    owner: def.owner.clone().unwrap_or_default(),
                })
            })
            .collect()
    }
}

// Params are already key-sorted.
fn format_params<'a>(params: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    params
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}
