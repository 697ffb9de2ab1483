use crate::core::reset_delivery::ResetTokenSender;
use crate::error::Result;

/// Stand-in sender for deployments without a mail integration. The token only appears at debug
/// level.
#[derive(Debug, Default)]
pub struct LogResetTokenSender;

#[async_trait::async_trait]
impl ResetTokenSender for LogResetTokenSender {
    async fn send_reset_token(&self, email: &str, token: &str) -> Result<()> {
        tracing::info!(email = %email, "STUB: Delivering password reset token");
        tracing::debug!(token = %token, "Password reset token");
        Ok(())
    }
}
