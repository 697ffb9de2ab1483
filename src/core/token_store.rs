use crate::core::auth_token::{AuthToken, NewAuthToken, TokenFilter};
use crate::error::Result;
use std::fmt::Debug;
use time::OffsetDateTime;
use uuid::Uuid;

/// Durable home of issued refresh and reset tokens.
///
/// Every read and write happens through a [`TokenTransaction`]. Implementations must guarantee that
/// once one transaction has observed a row via [`TokenTransaction::find_active_by_digest`], no other
/// transaction can observe that same row until the first commits or rolls back.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync + Debug {
    async fn begin(&self) -> Result<Box<dyn TokenTransaction>>;

    /// Connectivity check used by readiness.
    async fn ping(&self) -> Result<()>;
}

/// A unit of work against the token store. Dropping it without committing rolls back.
#[async_trait::async_trait]
pub trait TokenTransaction: Send {
    /// Inserts a token. Returns `AppError::Conflict` on a digest collision and leaves the
    /// transaction usable.
    async fn create(&mut self, token: NewAuthToken) -> Result<AuthToken>;

    /// Returns the row for `digest` whatever its kind or expiry.
    async fn find_active_by_digest(&mut self, digest: &str) -> Result<Option<AuthToken>>;

    async fn delete_by_id(&mut self, id: Uuid) -> Result<()>;

    async fn delete_by_filter(&mut self, filter: &TokenFilter) -> Result<u64>;

    async fn delete_expired(&mut self, now: OffsetDateTime) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
