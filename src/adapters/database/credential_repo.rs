use crate::adapters::database::DbPool;
use crate::core::credentials::{CredentialRepository, Credentials};
use crate::error::{AppError, Result};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct PgCredentialRepository {
    pool: DbPool,
}

impl PgCredentialRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CredentialRepository for PgCredentialRepository {
    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<Credentials>> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, password_hash FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|(user_id, password_hash)| Credentials { user_id, password_hash }))
    }

    #[tracing::instrument(level = "debug", skip(self, password_hash), err)]
    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }
}
