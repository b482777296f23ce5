use crate::error::{ResourceType, VgateError};
use crate::vschema::{AutoIncrement, ColumnVindex, Keyspace, Table, VSchemaSnapshot, VindexDef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_IDENTIFIER_LEN: usize = 128;

/// Reserved `with` parameter naming the table that owns a vindex.
pub const OWNER_PARAM: &str = "owner";

/// Type and parameters from the `using <type> with k=v, ...` clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VindexSpec {
    pub vindex_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl VindexSpec {
    pub fn new(vindex_type: impl Into<String>) -> Self {
        Self {
            vindex_type: vindex_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Splits `owner` out of the parameter list.
    pub fn to_def(&self) -> VindexDef {
        let mut params = self.params.clone();
        let owner = params.remove(OWNER_PARAM);
        VindexDef {
            vindex_type: self.vindex_type.clone(),
            params,
            owner,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VSchemaDdl {
    CreateVindex {
        vindex: String,
        spec: VindexSpec,
    },
    DropVindex {
        vindex: String,
    },
    AddTable {
        table: String,
    },
    DropTable {
        table: String,
    },
    AddSequence {
        table: String,
    },
    /// Binds `columns` of `table` to `vindex`. With a `spec` the vindex is
    /// created on first use; without one it must already exist.
    AddColumnVindex {
        table: String,
        vindex: String,
        columns: Vec<String>,
        #[serde(default)]
        spec: Option<VindexSpec>,
    },
    DropColumnVindex {
        table: String,
        vindex: String,
    },
    AddAutoIncrement {
        table: String,
        column: String,
        sequence: String,
    },
}

impl VSchemaDdl {
    pub fn operation_name(&self) -> &'static str {
        match self {
            VSchemaDdl::CreateVindex { .. } => "create vindex",
            VSchemaDdl::DropVindex { .. } => "drop vindex",
            VSchemaDdl::AddTable { .. } => "add vschema table",
            VSchemaDdl::DropTable { .. } => "drop vschema table",
            VSchemaDdl::AddSequence { .. } => "add sequence table",
            VSchemaDdl::AddColumnVindex { .. } => "add vindex",
            VSchemaDdl::DropColumnVindex { .. } => "drop vindex",
            VSchemaDdl::AddAutoIncrement { .. } => "add auto_increment",
        }
    }

    pub fn validate(&self) -> Result<(), VgateError> {
        match self {
            VSchemaDdl::CreateVindex { vindex, spec } => {
                validate_identifier(vindex, "vindex name")?;
                validate_identifier(&spec.vindex_type, "vindex type")
            }
            VSchemaDdl::DropVindex { vindex } => validate_identifier(vindex, "vindex name"),
            VSchemaDdl::AddTable { table }
            | VSchemaDdl::DropTable { table }
            | VSchemaDdl::AddSequence { table } => validate_identifier(table, "table name"),
            VSchemaDdl::AddColumnVindex {
                table,
                vindex,
                columns,
                spec,
            } => {
                validate_identifier(table, "table name")?;
                validate_identifier(vindex, "vindex name")?;
                if columns.is_empty() {
                    return Err(VgateError::Validation(
                        "column vindex must name at least one column".into(),
                    ));
                }
                for column in columns {
                    validate_identifier(column, "column name")?;
                }
                if let Some(spec) = spec {
                    validate_identifier(&spec.vindex_type, "vindex type")?;
                }
                Ok(())
            }
            VSchemaDdl::DropColumnVindex { table, vindex } => {
                validate_identifier(table, "table name")?;
                validate_identifier(vindex, "vindex name")
            }
            VSchemaDdl::AddAutoIncrement {
                table,
                column,
                sequence,
            } => {
                validate_identifier(table, "table name")?;
                validate_identifier(column, "column name")?;
                validate_table_reference(sequence, "sequence name")
            }
        }
    }
}

/// A DDL statement bound to the keyspace it alters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VSchemaMutation {
    pub keyspace: String,
    pub ddl: VSchemaDdl,
}

impl VSchemaMutation {
    pub fn new(keyspace: impl Into<String>, ddl: VSchemaDdl) -> Self {
        Self {
            keyspace: keyspace.into(),
            ddl,
        }
    }

    pub fn validate(&self) -> Result<(), VgateError> {
        validate_identifier(&self.keyspace, "keyspace name")?;
        self.ddl.validate()
    }

    pub fn encode_payload(&self) -> Result<Vec<u8>, VgateError> {
        rmp_serde::to_vec_named(self).map_err(|e| VgateError::Encode(e.to_string()))
    }

    pub fn decode_payload(bytes: &[u8]) -> Result<Self, VgateError> {
        rmp_serde::from_slice(bytes).map_err(|e| VgateError::Decode(e.to_string()))
    }
}

impl VSchemaSnapshot {
    /// Applies one mutation, returning the successor snapshot. `self` is
    /// never modified; on error nothing is produced.
    ///
    /// An unknown keyspace starts out empty and unsharded. It only becomes
    /// part of the result if the mutation succeeds.
    pub fn apply(&self, mutation: &VSchemaMutation) -> Result<VSchemaSnapshot, VgateError> {
        let name = mutation.keyspace.as_str();
        let existing = self.keyspaces.get(name);
        let is_new = existing.is_none();
        let mut ks = existing.cloned().unwrap_or_default();

        match &mutation.ddl {
            VSchemaDdl::CreateVindex { vindex, spec } => {
                require_vindex_capable(name, &mut ks, is_new, &mutation.ddl)?;
                declare_vindex(&mut ks, vindex, spec)?;
            }
            VSchemaDdl::DropVindex { vindex } => {
                if !ks.vindexes.contains_key(vindex) {
                    return Err(VgateError::VindexNotFound {
                        vindex: vindex.clone(),
                        keyspace: name.to_string(),
                    });
                }
                if let Some((table, _)) = ks
                    .tables
                    .iter()
                    .find(|(_, t)| t.column_vindex(vindex).is_some())
                {
                    return Err(VgateError::VindexInUse {
                        vindex: vindex.clone(),
                        table: table.clone(),
                    });
                }
                ks.vindexes.remove(vindex);
            }
            VSchemaDdl::AddTable { table } => {
                require_unsharded(name, &ks, &mutation.ddl)?;
                if ks.tables.contains_key(table) {
                    return Err(VgateError::AlreadyExists {
                        resource_type: ResourceType::Table,
                        name: table.clone(),
                        keyspace: name.to_string(),
                    });
                }
                ks.tables.insert(table.clone(), Table::default());
            }
            VSchemaDdl::AddSequence { table } => {
                require_unsharded(name, &ks, &mutation.ddl)?;
                if ks.tables.contains_key(table) {
                    return Err(VgateError::AlreadyExists {
                        resource_type: ResourceType::Sequence,
                        name: table.clone(),
                        keyspace: name.to_string(),
                    });
                }
                ks.tables.insert(table.clone(), Table::sequence());
            }
            VSchemaDdl::DropTable { table } => {
                if ks.tables.remove(table).is_none() {
                    return Err(table_not_defined(name, table));
                }
            }
            VSchemaDdl::AddColumnVindex {
                table,
                vindex,
                columns,
                spec,
            } => {
                require_vindex_capable(name, &mut ks, is_new, &mutation.ddl)?;
                match spec {
                    Some(spec) => declare_vindex(&mut ks, vindex, spec)?,
                    None if !ks.vindexes.contains_key(vindex) => {
                        return Err(VgateError::VindexNotFound {
                            vindex: vindex.clone(),
                            keyspace: name.to_string(),
                        });
                    }
                    None => {}
                }
                let mut entry = ks.tables.get(table).cloned().unwrap_or_default();
                if entry.column_vindex(vindex).is_some() {
                    return Err(VgateError::VindexAlreadyBound {
                        vindex: vindex.clone(),
                        table: table.clone(),
                    });
                }
                entry.column_vindexes.push(ColumnVindex {
                    name: vindex.clone(),
                    columns: columns.clone(),
                });
                ks.tables.insert(table.clone(), entry);
            }
            VSchemaDdl::DropColumnVindex { table, vindex } => {
                let Some(entry) = ks.tables.get_mut(table) else {
                    return Err(table_not_defined(name, table));
                };
                let Some(pos) = entry.column_vindexes.iter().position(|cv| &cv.name == vindex)
                else {
                    return Err(VgateError::ColumnVindexNotFound {
                        vindex: vindex.clone(),
                        keyspace: name.to_string(),
                        table: table.clone(),
                    });
                };
                entry.column_vindexes.remove(pos);
                if entry.column_vindexes.is_empty() {
                    ks.tables.remove(table);
                }
            }
            VSchemaDdl::AddAutoIncrement {
                table,
                column,
                sequence,
            } => {
                let Some(entry) = ks.tables.get_mut(table) else {
                    return Err(table_not_defined(name, table));
                };
                if let Some(existing) = &entry.auto_increment {
                    return Err(VgateError::AutoIncrementExists {
                        column: existing.column.clone(),
                        table: table.clone(),
                        keyspace: name.to_string(),
                    });
                }
                entry.auto_increment = Some(AutoIncrement {
                    column: column.clone(),
                    sequence: sequence.clone(),
                });
            }
        }

        Ok(self.with_keyspace(name, ks))
    }
}

/// A brand-new keyspace becomes sharded on its first vindex; an existing
/// unsharded one cannot take vindexes.
fn require_vindex_capable(
    name: &str,
    ks: &mut Keyspace,
    is_new: bool,
    ddl: &VSchemaDdl,
) -> Result<(), VgateError> {
    if ks.sharded {
        return Ok(());
    }
    if is_new {
        ks.sharded = true;
        return Ok(());
    }
    Err(VgateError::UnsupportedOnUnsharded {
        operation: ddl.operation_name(),
        keyspace: name.to_string(),
    })
}

fn require_unsharded(name: &str, ks: &Keyspace, ddl: &VSchemaDdl) -> Result<(), VgateError> {
    if ks.sharded {
        return Err(VgateError::UnsupportedOnSharded {
            operation: ddl.operation_name(),
            keyspace: name.to_string(),
        });
    }
    Ok(())
}

/// Inserts the vindex, or checks that an existing one was declared with the
/// same type, owner and parameters. A matching redeclaration is a no-op.
fn declare_vindex(ks: &mut Keyspace, vindex: &str, spec: &VindexSpec) -> Result<(), VgateError> {
    let def = spec.to_def();
    let Some(existing) = ks.vindexes.get(vindex) else {
        ks.vindexes.insert(vindex.to_string(), def);
        return Ok(());
    };
    if existing.vindex_type != def.vindex_type {
        return Err(VgateError::VindexTypeMismatch {
            vindex: vindex.to_string(),
            existing: existing.vindex_type.clone(),
            requested: def.vindex_type,
        });
    }
    if existing.owner != def.owner {
        return Err(VgateError::VindexOwnerMismatch {
            vindex: vindex.to_string(),
            existing: existing.owner.clone().unwrap_or_default(),
            requested: def.owner.unwrap_or_default(),
        });
    }
    if existing.params != def.params {
        return Err(VgateError::VindexParamsMismatch {
            vindex: vindex.to_string(),
        });
    }
    Ok(())
}

fn table_not_defined(keyspace: &str, table: &str) -> VgateError {
    VgateError::TableNotDefined {
        keyspace: keyspace.to_string(),
        table: table.to_string(),
    }
}

/// `table` or `keyspace.table`; the sequence of an auto-increment column
/// usually lives in another (unsharded) keyspace.
fn validate_table_reference(value: &str, name: &str) -> Result<(), VgateError> {
    match value.split_once('.') {
        Some((keyspace, table)) => {
            validate_identifier(keyspace, &format!("{name} keyspace"))?;
            validate_identifier(table, name)
        }
        None => validate_identifier(value, name),
    }
}

pub(crate) fn validate_identifier(value: &str, name: &str) -> Result<(), VgateError> {
    if value.is_empty() {
        return Err(VgateError::Validation(format!("{name} must not be empty")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(VgateError::Validation(format!(
            "{name} must be <= {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$')
    {
        return Err(VgateError::Validation(format!(
            "{name} must contain only [A-Za-z0-9_$-]"
        )));
    }
    Ok(())
}
