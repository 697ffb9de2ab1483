use crate::core::auth_token::RequestContext;
use crate::core::credentials::CredentialRepository;
use crate::core::password;
use crate::core::reset_delivery::ResetTokenSender;
use crate::core::session::TokenPair;
use crate::error::{AppError, Result};
use crate::services::session_service::SessionService;
use std::sync::Arc;

/// Credential checks and the password reset flow, layered over [`SessionService`].
#[derive(Clone, Debug)]
pub struct AccountService {
    sessions: SessionService,
    credentials: Arc<dyn CredentialRepository>,
    reset_sender: Arc<dyn ResetTokenSender>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        sessions: SessionService,
        credentials: Arc<dyn CredentialRepository>,
        reset_sender: Arc<dyn ResetTokenSender>,
    ) -> Self {
        Self { sessions, credentials, reset_sender }
    }

    /// Verifies email and password, then starts a session.
    ///
    /// Unknown email and wrong password both yield `None`.
    ///
    /// # Errors
    /// Propagates storage and hashing failures.
    #[tracing::instrument(
        skip(self, email, password, context),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn login(&self, email: &str, password: &str, context: &RequestContext) -> Result<Option<TokenPair>> {
        let Some(credentials) = self.credentials.find_by_email(email).await? else {
            tracing::warn!("Login failed: user not found");
            return Ok(None);
        };

        tracing::Span::current().record("user_id", tracing::field::display(credentials.user_id));

        if !self.verify_password(password, &credentials.password_hash).await? {
            tracing::warn!("Login failed: invalid password");
            return Ok(None);
        }

        self.sessions.create_session(credentials.user_id, context).await.map(Some)
    }

    /// Issues a reset token for the account behind `email`, if there is one.
    ///
    /// Delivering the token to the user is the caller's job.
    ///
    /// # Errors
    /// Propagates storage failures.
    #[tracing::instrument(skip(self, email, context), err(level = "warn"))]
    pub async fn request_password_reset(&self, email: &str, context: &RequestContext) -> Result<Option<String>> {
        let Some(credentials) = self.credentials.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        self.sessions.create_password_reset_token(credentials.user_id, context).await.map(Some)
    }

    /// Handles a forgot-password request: issues a reset token for a known email and hands it to
    /// the delivery port.
    ///
    /// Unknown emails and delivery failures look exactly like success to the caller.
    ///
    /// # Errors
    /// Propagates storage failures.
    #[tracing::instrument(skip(self, email, context), err(level = "warn"))]
    pub async fn forgot_password(&self, email: &str, context: &RequestContext) -> Result<()> {
        let Some(token) = self.request_password_reset(email, context).await? else {
            return Ok(());
        };

        if let Err(e) = self.reset_sender.send_reset_token(email.trim(), &token).await {
            tracing::warn!(error = %e, "Password reset token delivery failed");
        }
        Ok(())
    }

    /// Consumes a reset token, stores the new password hash and signs the user out everywhere.
    ///
    /// Returns `false` when the token does not authenticate anyone or the account behind it is
    /// gone. The password is validated before the token is touched, so a rejected password leaves
    /// the token usable.
    ///
    /// # Errors
    /// `AppError::BadRequest` for an unacceptable password or empty token; storage and hashing
    /// failures propagate.
    #[tracing::instrument(
        skip(self, token, new_password),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<bool> {
        password::validate_new_password(new_password)?;

        let Some(user_id) = self.sessions.consume_password_reset_token(token).await? else {
            return Ok(false);
        };

        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        let password_hash = self.hash_password(new_password).await?;
        let updated = self.credentials.update_password_hash(user_id, &password_hash).await?;

        self.sessions.revoke_all_sessions(user_id).await?;

        if !updated {
            tracing::warn!("Password reset for an account that no longer exists");
            return Ok(false);
        }

        tracing::info!("Password reset completed");
        Ok(true)
    }

    #[tracing::instrument(err, skip(self, password))]
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|_| AppError::Internal)?
    }

    #[tracing::instrument(err, skip(self, password, password_hash))]
    pub async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || password::verify_password(&password, &password_hash))
            .await
            .map_err(|_| AppError::Internal)?
    }
}
