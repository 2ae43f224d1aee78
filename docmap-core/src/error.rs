//! Error types and result types for adaptor operations.
//!
//! Every fallible operation in the workspace returns [`DocmapResult<T>`]. Backends map
//! their driver failures onto [`DocmapError`] and the adaptor propagates them unmodified.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

/// Represents all possible errors that can occur when mapping records to a document store.
#[derive(Error, Debug)]
pub enum DocmapError {
    /// A field value could not be converted between its Rust type and BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The store handle was used before it was initialized, or the backend failed to start.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Store configuration could not be read or is incomplete.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The store rejected an acknowledged write (duplicate key, unique index violation, ...).
    #[error("Write error: {0}")]
    Write(String),
    /// A document or update command has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The default identifier match key was requested for a record without an identifier.
    /// The argument is the record type name.
    #[error("Record {0} has no identifier to match on")]
    MissingIdentifier(&'static str),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for adaptor operations.
pub type DocmapResult<T> = Result<T, DocmapError>;

impl From<BsonError> for DocmapError {
    fn from(err: BsonError) -> Self {
        DocmapError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocmapError {
    fn from(err: SerdeJsonError) -> Self {
        DocmapError::Configuration(err.to_string())
    }
}

impl From<IoError> for DocmapError {
    fn from(err: IoError) -> Self {
        DocmapError::Configuration(err.to_string())
    }
}
