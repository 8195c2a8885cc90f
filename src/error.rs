/// Rejected note input. Raised before any backend call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Note title cannot be empty")]
    EmptyTitle,

    #[error("Note text cannot be empty")]
    EmptyText,
}

/// Failure reported by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to acquire database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Failed to build connection pool: {0}")]
    Build(#[from] deadpool_postgres::BuildError),

    #[error("Database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// Backend failures may succeed on retry, rejected input never will.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
