//! Step that changes the authoritative local user record.

use async_trait::async_trait;
use user_store::UserRepository;

use crate::error::{Result, SagaError};
use crate::intent::SagaIntent;
use crate::step::{SagaContext, SagaStep};
use crate::username_update::{FIELD_USERNAME, STEP_UPDATE_LOCAL};

const ENTITY: &str = "User";

/// Applies the username change to the local user store.
///
/// The uniqueness check and the write are two separate calls, so two
/// concurrent sagas can both pass the check for the same value. A store
/// with a unique constraint reports the loser as a conflict.
#[derive(Debug, Clone)]
pub struct LocalRecordStep<R> {
    repository: R,
}

impl<R: UserRepository> LocalRecordStep<R> {
    /// Creates a local step over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    fn check_field(intent: &SagaIntent) -> Result<()> {
        if intent.field_name() != FIELD_USERNAME {
            return Err(SagaError::InvalidIntent(format!(
                "local user store cannot update field '{}'",
                intent.field_name()
            )));
        }
        Ok(())
    }

    fn not_found(intent: &SagaIntent) -> SagaError {
        SagaError::NotFound {
            entity: ENTITY.to_string(),
            id: intent.subject_id(),
        }
    }
}

#[async_trait]
impl<R: UserRepository> SagaStep for LocalRecordStep<R> {
    fn name(&self) -> &str {
        STEP_UPDATE_LOCAL
    }

    async fn apply(&self, intent: &SagaIntent, _context: &SagaContext<'_>) -> Result<String> {
        Self::check_field(intent)?;
        let subject_id = intent.subject_id();

        let user = self
            .repository
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| Self::not_found(intent))?;

        if let Some(owner) = self.repository.find_by_username(intent.new_value()).await?
            && owner.id != subject_id
        {
            return Err(SagaError::Conflict {
                field: FIELD_USERNAME.to_string(),
                value: intent.new_value().to_string(),
            });
        }

        if !self
            .repository
            .update_username(subject_id, intent.new_value())
            .await?
        {
            return Err(Self::not_found(intent));
        }

        tracing::info!(
            %subject_id,
            old = %user.username,
            new = intent.new_value(),
            "updated username in local store"
        );
        Ok(user.username)
    }

    async fn compensate(&self, intent: &SagaIntent, previous_value: &str) -> Result<()> {
        let subject_id = intent.subject_id();

        let user = self
            .repository
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| Self::not_found(intent))?;

        if user.username == previous_value {
            tracing::debug!(%subject_id, "local username already at previous value");
            return Ok(());
        }

        if !self
            .repository
            .update_username(subject_id, previous_value)
            .await?
        {
            return Err(Self::not_found(intent));
        }

        tracing::info!(%subject_id, restored = previous_value, "reverted username in local store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::SubjectId;
    use user_store::{InMemoryUserRepository, NewUser};

    use super::*;

    async fn repo() -> InMemoryUserRepository {
        InMemoryUserRepository::with_users([
            NewUser::new("old.username", "old@example.com"),
            NewUser::new("taken.username", "taken@example.com"),
        ])
        .await
        .unwrap()
    }

    fn id(raw: i64) -> SubjectId {
        SubjectId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn apply_returns_previous_value_and_writes_new_one() {
        let repo = repo().await;
        let step = LocalRecordStep::new(repo.clone());
        let intent = SagaIntent::new(1, "username", "new.username").unwrap();

        let previous = step.apply(&intent, &SagaContext::empty()).await.unwrap();

        assert_eq!(previous, "old.username");
        assert_eq!(repo.username_of(id(1)).await.as_deref(), Some("new.username"));
    }

    #[tokio::test]
    async fn apply_missing_subject_is_not_found() {
        let step = LocalRecordStep::new(repo().await);
        let intent = SagaIntent::new(99, "username", "new.username").unwrap();

        let err = step.apply(&intent, &SagaContext::empty()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn apply_value_owned_by_other_subject_is_conflict() {
        let repo = repo().await;
        let step = LocalRecordStep::new(repo.clone());
        let intent = SagaIntent::new(1, "username", "taken.username").unwrap();

        let err = step.apply(&intent, &SagaContext::empty()).await.unwrap_err();

        assert_eq!(err.to_string(), "Username 'taken.username' is already taken");
        assert_eq!(repo.username_of(id(1)).await.as_deref(), Some("old.username"));
        assert_eq!(repo.update_count().await, 0);
    }

    #[tokio::test]
    async fn apply_same_value_for_same_subject_is_allowed() {
        let step = LocalRecordStep::new(repo().await);
        let intent = SagaIntent::new(1, "username", "old.username").unwrap();

        let previous = step.apply(&intent, &SagaContext::empty()).await.unwrap();
        assert_eq!(previous, "old.username");
    }

    #[tokio::test]
    async fn apply_rejects_unknown_field() {
        let step = LocalRecordStep::new(repo().await);
        let intent = SagaIntent::new(1, "email", "x@example.com").unwrap();

        let err = step.apply(&intent, &SagaContext::empty()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_intent");
    }

    #[tokio::test]
    async fn compensate_restores_previous_value_and_is_idempotent() {
        let repo = repo().await;
        let step = LocalRecordStep::new(repo.clone());
        let intent = SagaIntent::new(1, "username", "new.username").unwrap();
        step.apply(&intent, &SagaContext::empty()).await.unwrap();

        step.compensate(&intent, "old.username").await.unwrap();
        assert_eq!(repo.username_of(id(1)).await.as_deref(), Some("old.username"));

        step.compensate(&intent, "old.username").await.unwrap();
        assert_eq!(repo.username_of(id(1)).await.as_deref(), Some("old.username"));
        // The second call is a no-op: one apply write plus one revert write.
        assert_eq!(repo.update_count().await, 2);
    }

    #[tokio::test]
    async fn compensate_surfaces_store_failures() {
        let repo = repo().await;
        let step = LocalRecordStep::new(repo.clone());
        let intent = SagaIntent::new(1, "username", "new.username").unwrap();
        step.apply(&intent, &SagaContext::empty()).await.unwrap();

        repo.set_fail_on_update(true).await;
        let err = step.compensate(&intent, "old.username").await.unwrap_err();
        assert_eq!(err.kind(), "store");
    }
}
