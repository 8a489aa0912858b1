use std::sync::Arc;

use thiserror::Error;

/// Failure attached to a single load.
///
/// The same error may settle many pending loads at once (a failed batch), so it has to be
/// `Clone`. Store errors that are not `Clone` themselves are shared through an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(Arc<sqlx::Error>),

    #[error("backing store unavailable")]
    Unavailable,

    /// The batch function broke the one-result-per-key contract.
    #[error("batch function returned {actual} results for {expected} keys")]
    BatchSize { expected: usize, actual: usize },

    /// A non-nullable relation points at a row that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl From<sqlx::Error> for LoadError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Unavailable,
            err => Self::Database(Arc::new(err)),
        }
    }
}

/// Errors raised while setting up a store, before any request is served.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("table `{table}` is missing columns: {}", .missing.join(", "))]
    MissingColumns {
        table: String,
        missing: Vec<&'static str>,
    },
}
