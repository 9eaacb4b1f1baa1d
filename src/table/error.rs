// src/table/error.rs

use thiserror::Error;

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("unknown header `{header}` (available: {available:?})")]
    UnknownHeader {
        header: String,
        available: Vec<String>,
    },

    #[error("header sets differ: {left:?} vs {right:?}")]
    HeaderMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("duplicate header `{0}`")]
    DuplicateHeader(String),

    #[error("row {row}: expected {expected} values, found {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}
