use serde::{Deserialize, Serialize};
use std::fmt;

/// A possibly keyspace-qualified table reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TableName {
    pub qualifier: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Splits `ks.table` at the first dot.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((qualifier, name)) => Self::qualified(qualifier, name),
            None => Self::new(raw),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", escape_identifier(q), escape_identifier(&self.name)),
            None => write!(f, "{}", escape_identifier(&self.name)),
        }
    }
}

/// A statement whose only routing-relevant content is a list of tables,
/// e.g. `flush local tables a, b with read lock`. The text around the list
/// is carried verbatim into every rewritten fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableListStatement {
    pub leading: String,
    pub tables: Vec<TableName>,
    #[serde(default)]
    pub trailing: Option<String>,
}

impl TableListStatement {
    pub fn new(leading: impl Into<String>, tables: Vec<TableName>) -> Self {
        Self {
            leading: leading.into(),
            tables,
            trailing: None,
        }
    }

    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// `flush [local] tables ... [with read lock | for export]`.
    pub fn flush_tables(local: bool, tables: Vec<TableName>) -> Self {
        let leading = if local {
            "flush local tables"
        } else {
            "flush tables"
        };
        Self::new(leading, tables)
    }

    /// Renders the statement with `tables` substituted for the original list.
    pub fn render_with(&self, tables: &[TableName]) -> String {
        let mut out = self.leading.trim_end().to_string();
        for (i, table) in tables.iter().enumerate() {
            out.push_str(if i == 0 { " " } else { ", " });
            out.push_str(&table.to_string());
        }
        if let Some(trailing) = &self.trailing {
            let trailing = trailing.trim();
            if !trailing.is_empty() {
                out.push(' ');
                out.push_str(trailing);
            }
        }
        out
    }
}

impl fmt::Display for TableListStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(&self.tables))
    }
}

// Words that must be backquoted when used as identifiers.
const RESERVED: &[&str] = &[
    "accessible", "add", "all", "alter", "analyze", "and", "as", "asc", "between", "by",
    "call", "case", "change", "check", "column", "condition", "constraint", "create", "cross",
    "current_user", "database", "databases", "default", "delete", "desc", "describe",
    "distinct", "drop", "else", "exists", "explain", "false", "flush", "for", "force",
    "foreign", "from", "function", "grant", "group", "having", "if", "ignore", "in", "index",
    "inner", "insert", "interval", "into", "is", "join", "key", "keys", "kill", "left", "like",
    "limit", "load", "local", "lock", "match", "not", "null", "on", "option", "or", "order",
    "outer", "partition", "primary", "read", "references", "rename", "replace", "right",
    "schema", "select", "set", "show", "status", "table", "tables", "then", "to", "true",
    "union", "unique", "unlock", "update", "usage", "use", "user", "using", "values", "when",
    "where", "with", "write",
];

fn needs_escape(ident: &str) -> bool {
    if ident.is_empty() {
        return true;
    }
    let lower = ident.to_ascii_lowercase();
    if RESERVED.binary_search(&lower.as_str()).is_ok() {
        return true;
    }
    // All-digit names would read as numbers.
    if ident.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    !ident
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Backquotes reserved words and identifiers outside `[A-Za-z0-9_$]`.
pub fn escape_identifier(ident: &str) -> String {
    if needs_escape(ident) {
        format!("`{}`", ident.replace('`', "``"))
    } else {
        ident.to_string()
    }
}
