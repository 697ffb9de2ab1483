use crate::error::Result;
use std::fmt::Debug;

/// Delivers a freshly issued password reset token to the account owner.
#[async_trait::async_trait]
pub trait ResetTokenSender: Send + Sync + Debug {
    /// Sends `token` to `email`. The token is a live credential until consumed or expired.
    ///
    /// # Errors
    /// Returns an error if the delivery channel rejects the message.
    async fn send_reset_token(&self, email: &str, token: &str) -> Result<()>;
}
