//! Document store error types.

use thiserror::Error;

/// Kind of a single failed write inside a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    /// The document collided with `_id` or a unique index.
    DuplicateKey,
    /// The document was not a JSON object.
    InvalidDocument,
}

/// A single failed write inside a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteError {
    /// Position of the document in the submitted batch.
    pub index: usize,
    /// Failure class.
    pub kind: WriteErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl WriteError {
    pub(crate) fn duplicate(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            kind: WriteErrorKind::DuplicateKey,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            kind: WriteErrorKind::InvalidDocument,
            message: message.into(),
        }
    }
}

/// Document store errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Document (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A single write collided with `_id` or a unique index.
    #[error("duplicate key in {collection} ({index}): {key}")]
    DuplicateKey {
        collection: String,
        index: String,
        key: String,
    },

    /// A bulk insert committed some documents and rejected others.
    #[error("bulk write error: {inserted} inserted, {} rejected", errors.len())]
    BulkWrite {
        inserted: u64,
        errors: Vec<WriteError>,
    },

    /// A hint named an index that does not exist.
    #[error("index {index} not found on collection {collection}")]
    IndexNotFound { collection: String, index: String },

    /// An index with the same name but a different definition exists.
    #[error("index {index} on collection {collection} already exists with a different definition")]
    IndexConflict { collection: String, index: String },

    /// A document or update was not shaped as expected.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A pipeline stage could not be evaluated.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),
}

impl Error {
    /// Whether this error only reports duplicate-key collisions.
    ///
    /// A bulk write error qualifies only when every rejected document was a
    /// duplicate.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Error::DuplicateKey { .. } => true,
            Error::BulkWrite { errors, .. } => {
                !errors.is_empty()
                    && errors
                        .iter()
                        .all(|e| e.kind == WriteErrorKind::DuplicateKey)
            }
            _ => false,
        }
    }
}

/// Result alias for document store operations.
pub type Result<T> = std::result::Result<T, Error>;
