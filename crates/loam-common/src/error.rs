//! Error types for LoamDB.

use crate::page::Rid;
use thiserror::Error;

/// Result type alias using LoamError.
pub type Result<T> = std::result::Result<T, LoamError>;

/// Errors that can occur in LoamDB operations.
#[derive(Debug, Error)]
pub enum LoamError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Buffer pool errors
    #[error("buffer pool exhausted: all pages pinned")]
    PoolExhausted,

    // Slotted page errors
    #[error("page full, unable to insert tuple")]
    PageFull,

    #[error("tuple too large: {size} bytes (max {max})")]
    TupleTooLarge { size: usize, max: usize },

    #[error("tuple not found: {rid}")]
    TupleNotFound { rid: Rid },

    // B-tree errors
    #[error("key not found: {0}")]
    KeyNotFound(i64),

    #[error("duplicate key: {0}")]
    DuplicateKey(i64),

    #[error("internal node full: splitting internal nodes is not supported")]
    SplitUnsupported,

    #[error("b-tree corrupted: {0}")]
    Corrupted(String),

    // SQL errors
    #[error("parse error: {0}")]
    Parse(String),

    #[error("execution error: {0}")]
    Execution(String),

    // Configuration errors
    #[error("invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}
