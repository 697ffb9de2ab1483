use crate::error::Result;
use std::fmt::Debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
}

/// Account password storage owned by the wider application.
#[async_trait::async_trait]
pub trait CredentialRepository: Send + Sync + Debug {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credentials>>;

    /// Replaces the stored hash. Returns `false` when the user no longer exists.
    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<bool>;
}
