use crate::core::credentials::{CredentialRepository, Credentials};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct UserRow {
    email: String,
    password_hash: String,
}

/// Process-local account table keyed by user id. Emails are matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialRepository {
    users: Arc<RwLock<HashMap<Uuid, UserRow>>>,
}

impl MemoryCredentialRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with an already-hashed password and returns its id.
    pub async fn insert(&self, email: &str, password_hash: &str) -> Uuid {
        let user_id = Uuid::now_v7();
        self.users.write().await.insert(
            user_id,
            UserRow { email: email.trim().to_lowercase(), password_hash: password_hash.to_string() },
        );
        user_id
    }

    pub async fn password_hash(&self, user_id: Uuid) -> Option<String> {
        self.users.read().await.get(&user_id).map(|row| row.password_hash.clone())
    }
}

#[async_trait::async_trait]
impl CredentialRepository for MemoryCredentialRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credentials>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|(_, row)| row.email == email)
            .map(|(id, row)| Credentials { user_id: *id, password_hash: row.password_hash.clone() }))
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<bool> {
        Ok(self.users.write().await.get_mut(&user_id).is_some_and(|row| {
            row.password_hash = password_hash.to_string();
            true
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_update() {
        let repo = MemoryCredentialRepository::new();
        let user_id = repo.insert("Ada@Example.com", "hash-1").await;

        let creds = repo.find_by_email("ada@example.com ").await.unwrap().unwrap();
        assert_eq!(creds.user_id, user_id);
        assert_eq!(creds.password_hash, "hash-1");

        assert!(repo.update_password_hash(user_id, "hash-2").await.unwrap());
        assert_eq!(repo.password_hash(user_id).await.as_deref(), Some("hash-2"));

        assert!(!repo.update_password_hash(Uuid::new_v4(), "hash-3").await.unwrap());
        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
