use crate::config::AuthConfig;
use crate::core::access_token::{AccessTokenError, AccessTokenSigner};
use crate::core::auth_token::{AuthToken, NewAuthToken, RequestContext, TokenFilter, TokenKind};
use crate::core::secret::OpaqueToken;
use crate::core::session::TokenPair;
use crate::core::token_store::{TokenStore, TokenTransaction};
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// A digest collision gets one retry with a fresh secret before it is treated as fatal.
const CREATE_ATTEMPTS: u32 = 2;

#[derive(Clone, Debug)]
struct Metrics {
    sessions_created_total: Counter<u64>,
    rotations_total: Counter<u64>,
    revocations_total: Counter<u64>,
    reset_tokens_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("taskboard-sessions");
        Self {
            sessions_created_total: meter
                .u64_counter("auth_sessions_created_total")
                .with_description("Total number of sessions created")
                .build(),
            rotations_total: meter
                .u64_counter("auth_refresh_rotations_total")
                .with_description("Refresh token rotation attempts by outcome")
                .build(),
            revocations_total: meter
                .u64_counter("auth_revocations_total")
                .with_description("Refresh token revocation requests by scope")
                .build(),
            reset_tokens_total: meter
                .u64_counter("auth_reset_tokens_total")
                .with_description("Password reset token events by outcome")
                .build(),
        }
    }
}

/// Issues, rotates and revokes refresh tokens, and manages single-use password reset tokens.
///
/// Every outcome that means "this token does not authenticate anyone" is returned as `None`.
/// Unknown, expired, already consumed and wrong-kind tokens are indistinguishable to callers;
/// the reason is only logged at debug level.
#[derive(Clone, Debug)]
pub struct SessionService {
    store: Arc<dyn TokenStore>,
    signer: AccessTokenSigner,
    refresh_ttl: time::Duration,
    reset_ttl: time::Duration,
    store_timeout: Duration,
    metrics: Metrics,
}

impl SessionService {
    #[must_use]
    pub fn new(config: &AuthConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            signer: AccessTokenSigner::new(&config.jwt_secret, config.access_token_ttl_secs),
            refresh_ttl: config.refresh_token_ttl(),
            reset_ttl: config.reset_token_ttl(),
            store_timeout: config.store_timeout(),
            metrics: Metrics::new(),
        }
    }

    /// Verifies a bearer access token without touching storage.
    ///
    /// # Errors
    /// Returns why the token was rejected.
    pub fn verify_access_token(&self, token: &str) -> std::result::Result<Uuid, AccessTokenError> {
        self.signer.verify(token)
    }

    /// Starts a new session for an already-authenticated user.
    ///
    /// # Errors
    /// Propagates storage failures and `AppError::Timeout`.
    #[tracing::instrument(skip(self, context), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn create_session(&self, user_id: Uuid, context: &RequestContext) -> Result<TokenPair> {
        let pair = self
            .within_deadline(async {
                let mut tx = self.store.begin().await?;
                let refresh_token =
                    self.insert_fresh(tx.as_mut(), user_id, TokenKind::Refresh, self.refresh_ttl, context).await?;
                let access_token = self.signer.issue(user_id)?;
                tx.commit().await?;

                Ok(TokenPair { access_token, refresh_token, expires_in: self.signer.ttl_secs() })
            })
            .await?;

        tracing::info!("Session created");
        self.metrics.sessions_created_total.add(1, &[]);
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair, consuming the presented token.
    ///
    /// The lookup, delete and insert share one transaction, so two concurrent rotations of the same
    /// token can never both succeed.
    ///
    /// # Errors
    /// `AppError::BadRequest` for an empty token; storage failures and timeouts propagate.
    #[tracing::instrument(
        skip(self, presented, context),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn rotate_session(&self, presented: &str, context: &RequestContext) -> Result<Option<TokenPair>> {
        let digest = digest_presented(presented)?;

        let pair = self
            .within_deadline(async {
                let mut tx = self.store.begin().await?;
                let Some(current) = self.find_usable(tx.as_mut(), &digest, TokenKind::Refresh).await? else {
                    tx.rollback().await?;
                    return Ok(None);
                };

                tracing::Span::current().record("user_id", tracing::field::display(current.user_id));

                tx.delete_by_id(current.id).await?;
                let refresh_token = self
                    .insert_fresh(tx.as_mut(), current.user_id, TokenKind::Refresh, self.refresh_ttl, context)
                    .await?;
                let access_token = self.signer.issue(current.user_id)?;
                tx.commit().await?;

                Ok(Some(TokenPair { access_token, refresh_token, expires_in: self.signer.ttl_secs() }))
            })
            .await?;

        let outcome = if pair.is_some() { "rotated" } else { "rejected" };
        tracing::info!(outcome, "Refresh token rotation finished");
        self.metrics.rotations_total.add(1, &[KeyValue::new("outcome", outcome)]);
        Ok(pair)
    }

    /// Revokes one session. Unknown or already revoked tokens are a silent no-op.
    ///
    /// # Errors
    /// `AppError::BadRequest` for an empty token; storage failures and timeouts propagate.
    #[tracing::instrument(skip(self, presented), err(level = "warn"))]
    pub async fn revoke_session(&self, presented: &str) -> Result<()> {
        let digest = digest_presented(presented)?;
        let filter = TokenFilter::by_digest(digest).with_kind(TokenKind::Refresh);

        let removed = self.delete_matching(&filter).await?;

        tracing::debug!(removed, "Session revoked");
        self.metrics.revocations_total.add(1, &[KeyValue::new("scope", "single")]);
        Ok(())
    }

    /// Revokes every refresh token the user holds. Returns how many were removed.
    ///
    /// # Errors
    /// Propagates storage failures and `AppError::Timeout`.
    #[tracing::instrument(skip(self), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64> {
        let filter = TokenFilter::by_user(user_id).with_kind(TokenKind::Refresh);

        let removed = self.delete_matching(&filter).await?;

        tracing::info!(removed, "All sessions revoked");
        self.metrics.revocations_total.add(1, &[KeyValue::new("scope", "all")]);
        Ok(removed)
    }

    /// Issues a single-use password reset token. Earlier outstanding reset tokens stay valid.
    ///
    /// # Errors
    /// Propagates storage failures and `AppError::Timeout`.
    #[tracing::instrument(skip(self, context), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn create_password_reset_token(&self, user_id: Uuid, context: &RequestContext) -> Result<String> {
        let token = self
            .within_deadline(async {
                let mut tx = self.store.begin().await?;
                let token =
                    self.insert_fresh(tx.as_mut(), user_id, TokenKind::ResetPassword, self.reset_ttl, context).await?;
                tx.commit().await?;
                Ok(token)
            })
            .await?;

        tracing::info!("Password reset token issued");
        self.metrics.reset_tokens_total.add(1, &[KeyValue::new("outcome", "issued")]);
        Ok(token)
    }

    /// Consumes a password reset token and returns its owner.
    ///
    /// # Errors
    /// `AppError::BadRequest` for an empty token; storage failures and timeouts propagate.
    #[tracing::instrument(skip(self, presented), fields(user_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn consume_password_reset_token(&self, presented: &str) -> Result<Option<Uuid>> {
        let digest = digest_presented(presented)?;

        let owner = self
            .within_deadline(async {
                let mut tx = self.store.begin().await?;
                let Some(current) = self.find_usable(tx.as_mut(), &digest, TokenKind::ResetPassword).await? else {
                    tx.rollback().await?;
                    return Ok(None);
                };

                tracing::Span::current().record("user_id", tracing::field::display(current.user_id));

                tx.delete_by_id(current.id).await?;
                tx.commit().await?;
                Ok(Some(current.user_id))
            })
            .await?;

        let outcome = if owner.is_some() { "consumed" } else { "rejected" };
        self.metrics.reset_tokens_total.add(1, &[KeyValue::new("outcome", outcome)]);
        Ok(owner)
    }

    async fn delete_matching(&self, filter: &TokenFilter) -> Result<u64> {
        self.within_deadline(async {
            let mut tx = self.store.begin().await?;
            let removed = tx.delete_by_filter(filter).await?;
            tx.commit().await?;
            Ok(removed)
        })
        .await
    }

    /// Looks up `digest` and applies the single validity rule shared by every read path.
    async fn find_usable(
        &self,
        tx: &mut dyn TokenTransaction,
        digest: &str,
        expected: TokenKind,
    ) -> Result<Option<AuthToken>> {
        let Some(token) = tx.find_active_by_digest(digest).await? else {
            tracing::debug!(reason = "unknown", "Token rejected");
            return Ok(None);
        };

        if let Some(reason) = rejection_reason(&token, expected, OffsetDateTime::now_utc()) {
            tracing::debug!(reason, kind = %token.kind, "Token rejected");
            return Ok(None);
        }

        Ok(Some(token))
    }

    /// Stores a token for a freshly generated secret and returns the raw secret.
    async fn insert_fresh(
        &self,
        tx: &mut dyn TokenTransaction,
        user_id: Uuid,
        kind: TokenKind,
        ttl: time::Duration,
        context: &RequestContext,
    ) -> Result<String> {
        for attempt in 1..=CREATE_ATTEMPTS {
            let secret = OpaqueToken::generate();
            let token = NewAuthToken {
                user_id,
                kind,
                secret_digest: OpaqueToken::digest(&secret),
                expires_at: OffsetDateTime::now_utc() + ttl,
                context: context.clone(),
            };

            match tx.create(token).await {
                Ok(_) => return Ok(secret),
                Err(AppError::Conflict(_)) => {
                    tracing::warn!(attempt, kind = %kind, "Token digest collision, regenerating secret");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::error!(kind = %kind, "Token digest collided on every attempt");
        Err(AppError::Internal)
    }

    /// Bounds a storage unit of work. On expiry the future, and with it any open transaction, is
    /// dropped, which rolls the transaction back.
    async fn within_deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.store_timeout, work).await.map_err(|_| {
            tracing::warn!(timeout = ?self.store_timeout, "Token store deadline exceeded");
            AppError::Timeout
        })?
    }
}

/// Hashes the token exactly as presented; surrounding whitespace is not part of any secret.
fn digest_presented(presented: &str) -> Result<String> {
    if presented.trim().is_empty() {
        return Err(AppError::BadRequest("Missing token".into()));
    }
    Ok(OpaqueToken::digest(presented))
}

fn rejection_reason(token: &AuthToken, expected: TokenKind, now: OffsetDateTime) -> Option<&'static str> {
    if token.kind != expected {
        Some("kind_mismatch")
    } else if token.is_expired_at(now) {
        Some("expired")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTokenStore;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test_secret".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_days: 30,
            reset_token_ttl_secs: 3600,
            store_timeout_ms: 5000,
            cookie_secure: true,
        }
    }

    fn setup_service() -> (SessionService, MemoryTokenStore) {
        let store = MemoryTokenStore::new();
        (SessionService::new(&config(), Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_raw_secret_is_never_stored() {
        let (service, store) = setup_service();
        let ctx = RequestContext::new(Some("curl/8.0".into()), Some("203.0.113.9".parse().unwrap()));

        let pair = service.create_session(Uuid::new_v4(), &ctx).await.unwrap();
        let rows = store.snapshot().await;

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].secret_digest, OpaqueToken::digest(&pair.refresh_token));
        assert_ne!(rows[0].secret_digest, pair.refresh_token);
        assert_eq!(rows[0].user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(rows[0].ip_address, ctx.ip_address);
    }

    #[tokio::test]
    async fn test_refresh_expiry_uses_configured_ttl() {
        let (service, store) = setup_service();

        service.create_session(Uuid::new_v4(), &RequestContext::default()).await.unwrap();
        let row = store.snapshot().await.remove(0);
        let remaining = row.expires_at - OffsetDateTime::now_utc();

        assert!(remaining > time::Duration::days(29));
        assert!(remaining <= time::Duration::days(30));
    }

    #[tokio::test]
    async fn test_reset_token_cannot_rotate_and_survives_attempt() {
        let (service, store) = setup_service();
        let user = Uuid::new_v4();

        let reset = service.create_password_reset_token(user, &RequestContext::default()).await.unwrap();
        assert!(service.rotate_session(&reset, &RequestContext::default()).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        service.revoke_session(&reset).await.unwrap();
        assert_eq!(service.consume_password_reset_token(&reset).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_reset_password() {
        let (service, _) = setup_service();

        let pair = service.create_session(Uuid::new_v4(), &RequestContext::default()).await.unwrap();
        assert!(service.consume_password_reset_token(&pair.refresh_token).await.unwrap().is_none());
        assert!(service.rotate_session(&pair.refresh_token, &RequestContext::default()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_token_is_validation_error() {
        let (service, _) = setup_service();

        assert!(matches!(
            service.rotate_session("  ", &RequestContext::default()).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(service.revoke_session("").await, Err(AppError::BadRequest(_))));
        assert!(matches!(service.consume_password_reset_token("").await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_padded_token_is_not_the_secret() {
        let (service, _) = setup_service();
        let ctx = RequestContext::default();

        let pair = service.create_session(Uuid::new_v4(), &ctx).await.unwrap();
        let padded = format!("  {}\t\n", pair.refresh_token);

        assert!(service.rotate_session(&padded, &ctx).await.unwrap().is_none());
        service.revoke_session(&padded).await.unwrap();
        assert!(service.rotate_session(&pair.refresh_token, &ctx).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_access_token_identifies_user() {
        let (service, _) = setup_service();
        let user = Uuid::new_v4();

        let pair = service.create_session(user, &RequestContext::default()).await.unwrap();
        assert_eq!(pair.expires_in, 900);
        assert_eq!(service.verify_access_token(&pair.access_token), Ok(user));
    }

    #[test]
    fn test_rejection_reasons() {
        let now = OffsetDateTime::now_utc();
        let token = AuthToken {
            id: Uuid::now_v7(),
            user_id: Uuid::new_v4(),
            kind: TokenKind::Refresh,
            secret_digest: "d".into(),
            expires_at: now + time::Duration::minutes(1),
            user_agent: None,
            ip_address: None,
            created_at: now,
        };

        assert_eq!(rejection_reason(&token, TokenKind::Refresh, now), None);
        assert_eq!(rejection_reason(&token, TokenKind::ResetPassword, now), Some("kind_mismatch"));
        assert_eq!(rejection_reason(&token, TokenKind::Refresh, now + time::Duration::minutes(1)), Some("expired"));
    }
}
