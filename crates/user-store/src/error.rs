use thiserror::Error;

/// Errors that can occur when interacting with the user store.
#[derive(Debug, Error)]
pub enum UserStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The username is already held by another user (unique constraint).
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store could not serve the request (used by the in-memory store
    /// to simulate outages).
    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for user store operations.
pub type Result<T> = std::result::Result<T, UserStoreError>;
