use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessTokenError {
    #[error("access token signature is invalid")]
    InvalidSignature,
    #[error("access token has expired")]
    Expired,
    #[error("access token is malformed")]
    Malformed,
}

impl From<AccessTokenError> for AppError {
    fn from(_: AccessTokenError) -> Self {
        Self::AuthError
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    #[must_use]
    pub fn access(user_id: Uuid, issued_at: u64, ttl_secs: u64) -> Self {
        Self {
            sub: user_id,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
        }
    }
}

/// Issues and verifies stateless HS256 access tokens.
///
/// The key is loaded once from configuration and never changes for the life of the process.
#[derive(Clone)]
pub struct AccessTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl fmt::Debug for AccessTokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenSigner").field("ttl_secs", &self.ttl_secs).finish_non_exhaustive()
    }
}

impl AccessTokenSigner {
    #[must_use]
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    #[must_use]
    pub const fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issues an access token for `user_id` using the configured TTL.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if signing fails.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_with_ttl(user_id, self.ttl_secs)
    }

    /// Issues an access token valid for `ttl_secs` from now.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if signing fails.
    pub fn issue_with_ttl(&self, user_id: Uuid, ttl_secs: u64) -> Result<String, AppError> {
        let claims = Claims::access(user_id, now_unix(), ttl_secs);
        self.sign(&claims)
    }

    /// Verifies signature, expiry and token type, returning the subject.
    ///
    /// # Errors
    /// Returns the reason the token was rejected.
    pub fn verify(&self, token: &str) -> Result<Uuid, AccessTokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AccessTokenError::Expired,
            ErrorKind::InvalidSignature => AccessTokenError::InvalidSignature,
            _ => AccessTokenError::Malformed,
        })?;

        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AccessTokenError::Malformed);
        }

        Ok(data.claims.sub)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign access token");
            AppError::Internal
        })
    }
}

fn now_unix() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or(0)
}
