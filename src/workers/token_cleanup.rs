use crate::core::token_store::TokenStore;
use crate::error::Result;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    expired_deleted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("taskboard-sessions");
        Self {
            expired_deleted_total: meter
                .u64_counter("auth_tokens_expired_deleted_total")
                .with_description("Total expired refresh and reset tokens removed by the sweeper")
                .build(),
        }
    }
}

/// Removes expired tokens of every kind. Read paths already ignore expired rows; this only
/// reclaims space.
#[derive(Debug)]
pub struct TokenCleanupWorker {
    store: Arc<dyn TokenStore>,
    cleanup_interval_secs: u64,
    metrics: Metrics,
}

impl TokenCleanupWorker {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, cleanup_interval_secs: u64) -> Self {
        Self { store, cleanup_interval_secs, metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        if self.cleanup_interval_secs == 0 {
            tracing::info!("Token cleanup is disabled (interval = 0)");
            return;
        }

        let mut interval = tokio::time::interval(Duration::from_secs(self.cleanup_interval_secs));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.perform_cleanup()
                        .instrument(tracing::info_span!("run_token_cleanup"))
                        .await
                    {
                        tracing::error!(error = ?e, "Token cleanup iteration failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Token cleanup loop shutting down...");
    }

    /// Deletes every token whose expiry has passed and returns how many were removed.
    ///
    /// # Errors
    /// Returns an error if the store transaction fails.
    #[tracing::instrument(skip(self), err, fields(expired_deleted = tracing::field::Empty))]
    pub async fn perform_cleanup(&self) -> Result<u64> {
        tracing::debug!("Running token cleanup...");

        let mut tx = self.store.begin().await?;
        let count = tx.delete_expired(OffsetDateTime::now_utc()).await?;
        tx.commit().await?;

        if count > 0 {
            tracing::info!(count = %count, "Deleted expired tokens");
            tracing::Span::current().record("expired_deleted", count);
            self.metrics.expired_deleted_total.add(count, &[]);
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTokenStore;
    use crate::core::auth_token::{NewAuthToken, RequestContext, TokenKind};
    use uuid::Uuid;

    async fn seed(store: &MemoryTokenStore, digest: &str, kind: TokenKind, offset: time::Duration) {
        let mut tx = store.begin().await.unwrap();
        tx.create(NewAuthToken {
            user_id: Uuid::new_v4(),
            kind,
            secret_digest: digest.to_string(),
            expires_at: OffsetDateTime::now_utc() + offset,
            context: RequestContext::default(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired_rows() {
        let store = MemoryTokenStore::new();
        seed(&store, "stale-refresh", TokenKind::Refresh, time::Duration::days(-1)).await;
        seed(&store, "stale-reset", TokenKind::ResetPassword, time::Duration::minutes(-1)).await;
        seed(&store, "live", TokenKind::Refresh, time::Duration::days(1)).await;

        let worker = TokenCleanupWorker::new(Arc::new(store.clone()), 60);
        assert_eq!(worker.perform_cleanup().await.unwrap(), 2);
        assert_eq!(worker.perform_cleanup().await.unwrap(), 0);

        let remaining = store.snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].secret_digest, "live");
    }

    #[tokio::test]
    async fn test_disabled_worker_returns_immediately() {
        let (_tx, rx) = tokio::sync::watch::channel(false);
        let worker = TokenCleanupWorker::new(Arc::new(MemoryTokenStore::new()), 0);

        tokio::time::timeout(Duration::from_secs(1), worker.run(rx)).await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let worker = TokenCleanupWorker::new(Arc::new(MemoryTokenStore::new()), 3600);

        let handle = tokio::spawn(worker.run(rx));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
