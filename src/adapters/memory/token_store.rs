use crate::core::auth_token::{AuthToken, NewAuthToken, TokenFilter};
use crate::core::token_store::{TokenStore, TokenTransaction};
use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Rows keyed by digest, with an id index so deletes by id do not scan.
#[derive(Debug, Default)]
struct Table {
    by_digest: HashMap<String, AuthToken>,
    digest_by_id: HashMap<Uuid, String>,
}

impl Table {
    fn put(&mut self, row: AuthToken) {
        self.digest_by_id.insert(row.id, row.secret_digest.clone());
        self.by_digest.insert(row.secret_digest.clone(), row);
    }

    fn take(&mut self, digest: &str) -> Option<AuthToken> {
        let row = self.by_digest.remove(digest)?;
        self.digest_by_id.remove(&row.id);
        Some(row)
    }

    fn digests_where(&self, keep: impl Fn(&AuthToken) -> bool) -> Vec<String> {
        self.by_digest.values().filter(|row| !keep(row)).map(|row| row.secret_digest.clone()).collect()
    }
}

#[derive(Debug)]
enum Undo {
    Inserted(String),
    Removed(AuthToken),
}

/// Process-local token store.
///
/// Transactions are fully serialized: each one holds the table lock from `begin` until it is
/// committed, rolled back, or dropped. Writes land in the table immediately and are journaled;
/// anything short of a commit replays the journal backwards.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, expired or not.
    pub async fn len(&self) -> usize {
        self.table.lock().await.by_digest.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.by_digest.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<AuthToken> {
        self.table.lock().await.by_digest.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn begin(&self) -> Result<Box<dyn TokenTransaction>> {
        let table = Arc::clone(&self.table).lock_owned().await;
        Ok(Box::new(MemoryTokenTransaction { table, journal: Vec::new() }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryTokenTransaction {
    table: OwnedMutexGuard<Table>,
    journal: Vec<Undo>,
}

impl MemoryTokenTransaction {
    fn remove(&mut self, digest: &str) -> bool {
        match self.table.take(digest) {
            Some(row) => {
                self.journal.push(Undo::Removed(row));
                true
            }
            None => false,
        }
    }

    fn remove_where(&mut self, keep: impl Fn(&AuthToken) -> bool) -> u64 {
        let doomed = self.table.digests_where(keep);
        doomed.iter().filter(|digest| self.remove(digest)).count() as u64
    }

    fn revert(&mut self) {
        while let Some(entry) = self.journal.pop() {
            match entry {
                Undo::Inserted(digest) => {
                    self.table.take(&digest);
                }
                Undo::Removed(row) => self.table.put(row),
            }
        }
    }
}

impl Drop for MemoryTokenTransaction {
    fn drop(&mut self) {
        self.revert();
    }
}

#[async_trait::async_trait]
impl TokenTransaction for MemoryTokenTransaction {
    async fn create(&mut self, token: NewAuthToken) -> Result<AuthToken> {
        if self.table.by_digest.contains_key(&token.secret_digest) {
            return Err(AppError::Conflict("token digest already exists".into()));
        }

        let row = AuthToken {
            id: Uuid::now_v7(),
            user_id: token.user_id,
            kind: token.kind,
            secret_digest: token.secret_digest,
            expires_at: token.expires_at,
            user_agent: token.context.user_agent,
            ip_address: token.context.ip_address,
            created_at: OffsetDateTime::now_utc(),
        };
        self.table.put(row.clone());
        self.journal.push(Undo::Inserted(row.secret_digest.clone()));
        Ok(row)
    }

    async fn find_active_by_digest(&mut self, digest: &str) -> Result<Option<AuthToken>> {
        Ok(self.table.by_digest.get(digest).cloned())
    }

    async fn delete_by_id(&mut self, id: Uuid) -> Result<()> {
        if let Some(digest) = self.table.digest_by_id.get(&id).cloned() {
            self.remove(&digest);
        }
        Ok(())
    }

    async fn delete_by_filter(&mut self, filter: &TokenFilter) -> Result<u64> {
        if let Some(digest) = filter.digest.as_deref() {
            let hit = self.table.by_digest.get(digest).is_some_and(|row| filter.matches(row));
            return Ok(u64::from(hit && self.remove(digest)));
        }
        Ok(self.remove_where(|row| !filter.matches(row)))
    }

    async fn delete_expired(&mut self, now: OffsetDateTime) -> Result<u64> {
        Ok(self.remove_where(|row| row.expires_at >= now))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        tx.journal.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
