use async_trait::async_trait;
use common::SubjectId;

use crate::{NewUser, Result, User};

/// Core trait for user record storage.
///
/// All implementations must be thread-safe (Send + Sync). The trait
/// deliberately exposes lookup and write as separate calls: callers that
/// need "value is unused, then write it" perform a check-then-set and
/// accept the race window between the two calls.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Loads a user by ID.
    ///
    /// Returns None if no such user exists.
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<User>>;

    /// Loads the user currently holding `username`, if any.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Overwrites the username of an existing user and bumps `updated_at`.
    ///
    /// Returns false if no user with `id` exists.
    async fn update_username(&self, id: SubjectId, username: &str) -> Result<bool>;

    /// Inserts a new user and returns it with its assigned ID.
    async fn insert(&self, user: NewUser) -> Result<User>;
}
