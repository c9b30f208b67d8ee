//! Benchmark error types.

use thiserror::Error;

/// Classification of a failure, independent of the backend that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A write collided with a primary key or unique constraint.
    DuplicateKey,
    /// The backend is unreachable or the connection dropped.
    ConnectionFailure,
    /// Entity counts were non-zero after a reset.
    CleanupFailure,
    /// Anything else.
    Unclassified,
}

/// Benchmark errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening or using a backend connection failed.
    #[error("connection to {backend} failed: {message}")]
    Connection {
        backend: &'static str,
        message: String,
    },

    /// An operation was issued before `connect` or after `disconnect`.
    #[error("{backend} backend is not connected")]
    NotConnected { backend: &'static str },

    /// Rows or documents survived a reset.
    #[error("{backend} still holds data after reset: {remaining}")]
    Cleanup {
        backend: &'static str,
        remaining: String,
    },

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Document store error.
    #[error("document store error: {0}")]
    Document(#[from] storerace_docstore::Error),

    /// A generated dataset broke referential integrity.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// A timing was missing, negative or not finite.
    #[error("invalid result: {0}")]
    InvalidResult(String),

    /// The same backend and variant were reported twice.
    #[error("duplicate result for {0}")]
    DuplicateResult(String),

    /// The runner was asked to move between incompatible states.
    #[error("invalid run state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } | Error::NotConnected { .. } => ErrorKind::ConnectionFailure,
            Error::Cleanup { .. } => ErrorKind::CleanupFailure,
            Error::Sqlite(e) => sqlite_kind(e),
            #[cfg(feature = "postgres")]
            Error::Postgres(e) => postgres_kind(e),
            Error::Document(e) => document_kind(e),
            _ => ErrorKind::Unclassified,
        }
    }

    /// Duplicate-key failures are logged and skipped; everything else aborts
    /// the run.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::DuplicateKey
    }
}

fn sqlite_kind(error: &rusqlite::Error) -> ErrorKind {
    use rusqlite::ffi;

    match error {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            rusqlite::ErrorCode::ConstraintViolation
                if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                ErrorKind::DuplicateKey
            }
            rusqlite::ErrorCode::CannotOpen
            | rusqlite::ErrorCode::NotADatabase
            | rusqlite::ErrorCode::DatabaseBusy
            | rusqlite::ErrorCode::DatabaseLocked => ErrorKind::ConnectionFailure,
            _ => ErrorKind::Unclassified,
        },
        _ => ErrorKind::Unclassified,
    }
}

#[cfg(feature = "postgres")]
fn postgres_kind(error: &sqlx::Error) -> ErrorKind {
    match error {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            ErrorKind::DuplicateKey
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ErrorKind::ConnectionFailure,
        _ => ErrorKind::Unclassified,
    }
}

fn document_kind(error: &storerace_docstore::Error) -> ErrorKind {
    match error {
        e if e.is_duplicate_key() => ErrorKind::DuplicateKey,
        storerace_docstore::Error::Storage(sled::Error::Io(_)) => ErrorKind::ConnectionFailure,
        _ => ErrorKind::Unclassified,
    }
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;
