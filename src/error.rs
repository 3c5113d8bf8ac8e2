use std::path::PathBuf;

use crate::fingerprint::Fingerprint;

/// Errors from resolving a template into a schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("duplicate field '{field_name}' in schema '{schema}'")]
    DuplicateField { schema: String, field_name: String },

    #[error("redefined schema '{0}'")]
    DuplicateSchema(String),

    #[error("invalid parameter on field '{field}': {message}")]
    InvalidParameter { field: String, message: String },

    #[error("recursive schema nesting: {}", .chain.join(" -> "))]
    RecursiveSchema { chain: Vec<String> },
}

/// Errors from the schema text parser.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("duplicate field '{field_name}' in type '{type_name}'")]
    DuplicateField {
        type_name: String,
        field_name: String,
    },

    #[error("undefined type '{type_name}' referenced by '{referenced_by}'")]
    UndefinedType {
        type_name: String,
        referenced_by: String,
    },

    #[error("redefined type '{name}'")]
    DuplicateType { name: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors from the binary encoder.
///
/// Every variant except `Fields` describes one failing field, addressed by
/// its dotted path from the root value (`items[2].name`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("missing value for field '{field}'")]
    MissingField { field: String },

    #[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("value {value} out of range for {type_name} field '{field}'")]
    OutOfRange {
        field: String,
        type_name: &'static str,
        value: String,
    },

    #[error("character {ch:?} in field '{field}' does not fit in one byte")]
    UnencodableChar { field: String, ch: char },

    #[error("field '{field}' needs {actual} {unit}, a 16-bit prefix allows 65535")]
    LengthOverflow {
        field: String,
        unit: &'static str,
        actual: usize,
    },

    #[error("field '{field}' refers to schema #{index}, which is not in this set")]
    UnknownSchema { field: String, index: usize },

    #[error("{} fields failed to encode: {}", .0.len(), join_errors(.0))]
    Fields(Vec<EncodeError>),
}

fn join_errors(errors: &[EncodeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl EncodeError {
    /// Flatten into the list of single-field failures.
    pub fn failures(&self) -> Vec<&EncodeError> {
        match self {
            EncodeError::Fields(list) => list.iter().collect(),
            other => vec![other],
        }
    }
}

/// Errors from the binary decoder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated data: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid string in field '{field}'")]
    InvalidString { field: String },

    #[error("schema id mismatch: schema is {expected}, buffer was written with {found}")]
    FingerprintMismatch {
        expected: Fingerprint,
        found: Fingerprint,
    },
}

/// Errors from the file-backed store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("'{}' is marked do-not-edit", .0.display())]
    Locked(PathBuf),

    #[error("no data loaded")]
    NoData,

    #[error("path '{0}' does not exist in the stored value")]
    PathNotFound(String),

    #[error("value at '{0}' is not an array")]
    NotAnArray(String),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Top-level error type that wraps all sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum DbszError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[cfg(feature = "serde")]
    #[error(transparent)]
    Serde(#[from] crate::serde::SerdeError),
}

/// Result type alias for dbsz operations.
pub type Result<T> = std::result::Result<T, DbszError>;
