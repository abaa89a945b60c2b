use thiserror::Error;

/// Misconfiguration detected before (or instead of) any browser work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration key: {0}")]
    MissingKey(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("unknown range type {kind:?} for field {field}")]
    UnknownRangeType { field: String, kind: String },
    #[error("unknown table selection mode {0:?}")]
    UnknownSelectionMode(String),
    #[error("field {0} is not part of the form schema")]
    UnknownField(String),
    #[error("bad slice {value:?} for field {field}: {message}")]
    BadSlice {
        field: String,
        value: String,
        message: String,
    },
    #[error("bad partition {k} of {n}: k must be in 1..=n")]
    BadPartition { k: u64, n: u64 },
    #[error("{names} table name(s) given for {tables} selected table(s)")]
    TableNameCount { names: usize, tables: usize },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table {position} requested but the page has {found} table(s)")]
    MissingTable { position: usize, found: usize },
}
