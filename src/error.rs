use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Table,
    Sequence,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Table => write!(f, "table"),
            ResourceType::Sequence => write!(f, "sequence"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VgateErrorCode {
    Io,
    Encode,
    Decode,
    Validation,
    InvalidConfig,
    InvalidArgument,
    Conversion,
    KeyspaceIdLength,
    UnknownVindexType,
    VindexTypeMismatch,
    VindexOwnerMismatch,
    VindexParamsMismatch,
    VindexNotFound,
    VindexAlreadyBound,
    VindexInUse,
    ColumnVindexNotFound,
    TableNotDefined,
    AlreadyExists,
    AutoIncrementExists,
    UnsupportedOnSharded,
    UnsupportedOnUnsharded,
    NoKeyspace,
    KeyspaceNotFound,
    TableNotFound,
    AmbiguousTable,
    TableDisabled,
    ShowTableNotFound,
    NotAuthorized,
}

impl VgateErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            VgateErrorCode::Io => "io",
            VgateErrorCode::Encode => "encode",
            VgateErrorCode::Decode => "decode",
            VgateErrorCode::Validation => "validation",
            VgateErrorCode::InvalidConfig => "invalid_config",
            VgateErrorCode::InvalidArgument => "invalid_argument",
            VgateErrorCode::Conversion => "conversion",
            VgateErrorCode::KeyspaceIdLength => "keyspace_id_length",
            VgateErrorCode::UnknownVindexType => "unknown_vindex_type",
            VgateErrorCode::VindexTypeMismatch => "vindex_type_mismatch",
            VgateErrorCode::VindexOwnerMismatch => "vindex_owner_mismatch",
            VgateErrorCode::VindexParamsMismatch => "vindex_params_mismatch",
            VgateErrorCode::VindexNotFound => "vindex_not_found",
            VgateErrorCode::VindexAlreadyBound => "vindex_already_bound",
            VgateErrorCode::VindexInUse => "vindex_in_use",
            VgateErrorCode::ColumnVindexNotFound => "column_vindex_not_found",
            VgateErrorCode::TableNotDefined => "table_not_defined",
            VgateErrorCode::AlreadyExists => "already_exists",
            VgateErrorCode::AutoIncrementExists => "auto_increment_exists",
            VgateErrorCode::UnsupportedOnSharded => "unsupported_on_sharded",
            VgateErrorCode::UnsupportedOnUnsharded => "unsupported_on_unsharded",
            VgateErrorCode::NoKeyspace => "no_keyspace",
            VgateErrorCode::KeyspaceNotFound => "keyspace_not_found",
            VgateErrorCode::TableNotFound => "table_not_found",
            VgateErrorCode::AmbiguousTable => "ambiguous_table",
            VgateErrorCode::TableDisabled => "table_disabled",
            VgateErrorCode::ShowTableNotFound => "show_table_not_found",
            VgateErrorCode::NotAuthorized => "not_authorized",
        }
    }

    /// Schema-consistency rejections: the mutation is refused and the
    /// published snapshot is untouched.
    pub fn is_schema_error(self) -> bool {
        matches!(
            self,
            VgateErrorCode::UnknownVindexType
                | VgateErrorCode::VindexTypeMismatch
                | VgateErrorCode::VindexOwnerMismatch
                | VgateErrorCode::VindexParamsMismatch
                | VgateErrorCode::VindexNotFound
                | VgateErrorCode::VindexAlreadyBound
                | VgateErrorCode::VindexInUse
                | VgateErrorCode::ColumnVindexNotFound
                | VgateErrorCode::TableNotDefined
                | VgateErrorCode::AlreadyExists
                | VgateErrorCode::AutoIncrementExists
                | VgateErrorCode::UnsupportedOnSharded
                | VgateErrorCode::UnsupportedOnUnsharded
        )
    }
}

#[derive(Debug, Error)]
pub enum VgateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Conversion(String),
    #[error("{vindex}.ReverseMap: length of keyspace id is not 8: {len}")]
    KeyspaceIdLength { vindex: &'static str, len: usize },
    #[error("vindex type {0} not found")]
    UnknownVindexType(String),
    #[error("vindex {vindex} defined with type {existing} not {requested}")]
    VindexTypeMismatch {
        vindex: String,
        existing: String,
        requested: String,
    },
    #[error("vindex {vindex} defined with owner {existing} not {requested}")]
    VindexOwnerMismatch {
        vindex: String,
        existing: String,
        requested: String,
    },
    #[error("vindex {vindex} defined with different parameters")]
    VindexParamsMismatch { vindex: String },
    #[error("vindex {vindex} does not exist in keyspace {keyspace}")]
    VindexNotFound { vindex: String, keyspace: String },
    #[error("vindex {vindex} already defined on table {table}")]
    VindexAlreadyBound { vindex: String, table: String },
    #[error("can not drop vindex {vindex} because it is still defined on table {table}")]
    VindexInUse { vindex: String, table: String },
    #[error("vindex {vindex} not defined in table {keyspace}.{table}")]
    ColumnVindexNotFound {
        vindex: String,
        keyspace: String,
        table: String,
    },
    #[error("table {keyspace}.{table} not defined in vschema")]
    TableNotDefined { keyspace: String, table: String },
    #[error("vschema already contains {resource_type} {name} in keyspace {keyspace}")]
    AlreadyExists {
        resource_type: ResourceType,
        name: String,
        keyspace: String,
    },
    #[error("vschema already contains auto inc {column} on table {table} in keyspace {keyspace}")]
    AutoIncrementExists {
        column: String,
        table: String,
        keyspace: String,
    },
    #[error("{operation}: unsupported on sharded keyspace {keyspace}")]
    UnsupportedOnSharded {
        operation: &'static str,
        keyspace: String,
    },
    #[error("{operation}: unsupported on unsharded keyspace {keyspace}")]
    UnsupportedOnUnsharded {
        operation: &'static str,
        keyspace: String,
    },
    #[error("no keyspace in database name specified")]
    NoKeyspace,
    #[error("keyspace {0} not found in vschema")]
    KeyspaceNotFound(String),
    #[error("table {0} not found")]
    TableNotFound(String),
    #[error("ambiguous table reference: {0}")]
    AmbiguousTable(String),
    #[error("table {0} has been disabled")]
    TableDisabled(String),
    #[error("table `{table}` does not exist in keyspace `{keyspace}`")]
    ShowTableNotFound { keyspace: String, table: String },
    #[error("not authorized to perform vschema operations")]
    NotAuthorized,
}

impl VgateError {
    pub fn code(&self) -> VgateErrorCode {
        match self {
            VgateError::Io(_) => VgateErrorCode::Io,
            VgateError::Encode(_) => VgateErrorCode::Encode,
            VgateError::Decode(_) => VgateErrorCode::Decode,
            VgateError::Validation(_) => VgateErrorCode::Validation,
            VgateError::InvalidConfig { .. } => VgateErrorCode::InvalidConfig,
            VgateError::InvalidArgument(_) => VgateErrorCode::InvalidArgument,
            VgateError::Conversion(_) => VgateErrorCode::Conversion,
            VgateError::KeyspaceIdLength { .. } => VgateErrorCode::KeyspaceIdLength,
            VgateError::UnknownVindexType(_) => VgateErrorCode::UnknownVindexType,
            VgateError::VindexTypeMismatch { .. } => VgateErrorCode::VindexTypeMismatch,
            VgateError::VindexOwnerMismatch { .. } => VgateErrorCode::VindexOwnerMismatch,
            VgateError::VindexParamsMismatch { .. } => VgateErrorCode::VindexParamsMismatch,
            VgateError::VindexNotFound { .. } => VgateErrorCode::VindexNotFound,
            VgateError::VindexAlreadyBound { .. } => VgateErrorCode::VindexAlreadyBound,
            VgateError::VindexInUse { .. } => VgateErrorCode::VindexInUse,
            VgateError::ColumnVindexNotFound { .. } => VgateErrorCode::ColumnVindexNotFound,
            VgateError::TableNotDefined { .. } => VgateErrorCode::TableNotDefined,
            VgateError::AlreadyExists { .. } => VgateErrorCode::AlreadyExists,
            VgateError::AutoIncrementExists { .. } => VgateErrorCode::AutoIncrementExists,
            VgateError::UnsupportedOnSharded { .. } => VgateErrorCode::UnsupportedOnSharded,
            VgateError::UnsupportedOnUnsharded { .. } => VgateErrorCode::UnsupportedOnUnsharded,
            VgateError::NoKeyspace => VgateErrorCode::NoKeyspace,
            VgateError::KeyspaceNotFound(_) => VgateErrorCode::KeyspaceNotFound,
            VgateError::TableNotFound(_) => VgateErrorCode::TableNotFound,
            VgateError::AmbiguousTable(_) => VgateErrorCode::AmbiguousTable,
            VgateError::TableDisabled(_) => VgateErrorCode::TableDisabled,
            VgateError::ShowTableNotFound { .. } => VgateErrorCode::ShowTableNotFound,
            VgateError::NotAuthorized => VgateErrorCode::NotAuthorized,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}
