use async_trait::async_trait;
use common::SubjectId;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{NewUser, Result, User, UserRepository, UserStoreError};

const USERNAME_UNIQUE_CONSTRAINT: &str = "users_username_key";

/// PostgreSQL-backed user repository.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new PostgreSQL user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("user store migrations applied");
        Ok(())
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let raw_id: i64 = row.try_get("id")?;
        let id = SubjectId::new(raw_id).ok_or_else(|| {
            UserStoreError::Database(sqlx::Error::Decode(
                format!("invalid user id {raw_id}").into(),
            ))
        })?;

        Ok(User {
            id,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_unique_violation(err: sqlx::Error, username: &str) -> UserStoreError {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.constraint() == Some(USERNAME_UNIQUE_CONSTRAINT)
        {
            return UserStoreError::UsernameTaken(username.to_string());
        }
        UserStoreError::Database(err)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, role, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn update_username(&self, id: SubjectId, username: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, username))?;

        let updated = result.rows_affected() > 0;
        if !updated {
            tracing::debug!("no user row matched");
        }
        Ok(updated)
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, role, created_at, updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, &user.username))?;

        Self::row_to_user(row)
    }
}
