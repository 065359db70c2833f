use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::SubjectId;
use tokio::sync::RwLock;

use crate::{NewUser, Result, User, UserRepository, UserStoreError};

#[derive(Debug, Default)]
struct InMemoryUserState {
    users: BTreeMap<SubjectId, User>,
    next_id: i64,
    updates: usize,
    fail_on_update: bool,
    fail_after_updates: Option<usize>,
}

/// In-memory user repository for testing and local runs.
///
/// This implementation keeps all users in memory and provides
/// the same interface as the PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<InMemoryUserState>>,
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with the given users.
    pub async fn with_users(users: impl IntoIterator<Item = NewUser>) -> Result<Self> {
        let repo = Self::new();
        for user in users {
            repo.insert(user).await?;
        }
        Ok(repo)
    }

    /// Makes every subsequent `update_username` call fail.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Lets `count` more updates succeed, then fails the rest.
    ///
    /// Passing `None` clears the limit.
    pub async fn set_fail_after_updates(&self, count: Option<usize>) {
        let mut state = self.state.write().await;
        let done = state.updates;
        state.fail_after_updates = count.map(|c| done + c);
    }

    /// Returns the number of successful username updates.
    pub async fn update_count(&self) -> usize {
        self.state.read().await.updates
    }

    /// Returns the current username of a user, if present.
    pub async fn username_of(&self, id: SubjectId) -> Option<String> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .map(|u| u.username.clone())
    }

    /// Returns every stored user ordered by ID.
    pub async fn all(&self) -> Vec<User> {
        self.state.read().await.users.values().cloned().collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_username(&self, id: SubjectId, username: &str) -> Result<bool> {
        let mut state = self.state.write().await;

        let limit_reached = state
            .fail_after_updates
            .is_some_and(|limit| state.updates >= limit);
        if state.fail_on_update || limit_reached {
            return Err(UserStoreError::Unavailable(
                "simulated write failure".to_string(),
            ));
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        user.username = username.to_string();
        user.updated_at = Utc::now();
        state.updates += 1;

        Ok(true)
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        state.next_id += 1;

        let id = SubjectId::new(state.next_id)
            .ok_or_else(|| UserStoreError::Unavailable("user id overflow".to_string()))?;
        let now = Utc::now();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(id, user.clone());

        Ok(user)
    }
}
