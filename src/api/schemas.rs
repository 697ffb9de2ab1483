use crate::core::session::TokenPair;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("email", &self.email).field("password", &"[REDACTED]").finish()
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = self.refresh_token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("RefreshRequest").field("refresh_token", &token).finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

impl std::fmt::Debug for PasswordResetConfirm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetConfirm")
            .field("token", &"[REDACTED]")
            .field("new_password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub token_store: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_hides_secrets() {
        let confirm: PasswordResetConfirm =
            serde_json::from_str(r#"{"token":"reset-secret","newPassword":"hunter2hunter2"}"#).unwrap();
        let refresh: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"refresh-secret"}"#).unwrap();
        let login: LoginRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"hunter2hunter2"}"#).unwrap();

        let rendered = format!("{confirm:?} {refresh:?} {login:?}");
        assert!(!rendered.contains("reset-secret"));
        assert!(!rendered.contains("refresh-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("a@example.com"));
    }
}
