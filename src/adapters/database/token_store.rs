use crate::adapters::database::DbPool;
use crate::adapters::database::records::AuthTokenRecord;
use crate::core::auth_token::{AuthToken, NewAuthToken, TokenFilter};
use crate::core::token_store::{TokenStore, TokenTransaction};
use crate::error::{AppError, Result};
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

const TOKEN_COLUMNS: &str = "id, user_id, kind, secret_digest, expires_at, user_agent, ip_address, created_at";

/// Token store backed by the `auth_tokens` table.
///
/// Lookups take a row lock (`FOR UPDATE`), so a second transaction presenting the same digest
/// blocks until the first finishes and then re-reads the row, finding it gone if it was consumed.
#[derive(Clone, Debug)]
pub struct PgTokenStore {
    pool: DbPool,
}

impl PgTokenStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TokenStore for PgTokenStore {
    async fn begin(&self) -> Result<Box<dyn TokenTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTokenTransaction { tx }))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgTokenTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl TokenTransaction for PgTokenTransaction {
    #[tracing::instrument(level = "debug", skip_all, fields(kind = %token.kind), err)]
    async fn create(&mut self, token: NewAuthToken) -> Result<AuthToken> {
        // ON CONFLICT keeps the transaction alive so the caller can retry with a new secret.
        let record = sqlx::query_as::<_, AuthTokenRecord>(&format!(
            r"
            INSERT INTO auth_tokens (id, user_id, kind, secret_digest, expires_at, user_agent, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (secret_digest) DO NOTHING
            RETURNING {TOKEN_COLUMNS}
            "
        ))
        .bind(Uuid::now_v7())
        .bind(token.user_id)
        .bind(token.kind)
        .bind(&token.secret_digest)
        .bind(token.expires_at)
        .bind(token.context.user_agent)
        .bind(token.context.ip_address.map(|ip| ip.to_string()))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::Database)?;

        record.map(Into::into).ok_or_else(|| AppError::Conflict("token digest already exists".into()))
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn find_active_by_digest(&mut self, digest: &str) -> Result<Option<AuthToken>> {
        let record = sqlx::query_as::<_, AuthTokenRecord>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE secret_digest = $1 FOR UPDATE"
        ))
        .bind(digest)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::Database)?;

        Ok(record.map(Into::into))
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn delete_by_id(&mut self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(kind = ?filter.kind), err)]
    async fn delete_by_filter(&mut self, filter: &TokenFilter) -> Result<u64> {
        if filter.is_unscoped() {
            tracing::warn!("Refusing to delete tokens with an unscoped filter");
            return Ok(0);
        }

        let result = sqlx::query(
            r"
            DELETE FROM auth_tokens
            WHERE ($1::text IS NULL OR secret_digest = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::auth_token_kind IS NULL OR kind = $3)
            ",
        )
        .bind(filter.digest.as_deref())
        .bind(filter.user_id)
        .bind(filter.kind)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn delete_expired(&mut self, now: OffsetDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
