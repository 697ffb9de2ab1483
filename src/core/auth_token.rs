use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_token_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Refresh,
    ResetPassword,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("REFRESH"),
            Self::ResetPassword => f.write_str("RESET_PASSWORD"),
        }
    }
}

/// Audit metadata captured when a token is issued. Never consulted for authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<IpAddr>,
}

impl RequestContext {
    #[must_use]
    pub const fn new(user_agent: Option<String>, ip_address: Option<IpAddr>) -> Self {
        Self { user_agent, ip_address }
    }
}

/// A stored refresh or password-reset token. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub secret_digest: String,
    pub expires_at: OffsetDateTime,
    pub user_agent: Option<String>,
    pub ip_address: Option<IpAddr>,
    pub created_at: OffsetDateTime,
}

impl AuthToken {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewAuthToken {
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub secret_digest: String,
    pub expires_at: OffsetDateTime,
    pub context: RequestContext,
}

/// Predicates for bulk deletion, combined with AND.
///
/// A filter must name a digest or a user; one that names neither matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFilter {
    pub digest: Option<String>,
    pub user_id: Option<Uuid>,
    pub kind: Option<TokenKind>,
}

impl TokenFilter {
    #[must_use]
    pub fn by_digest(digest: impl Into<String>) -> Self {
        Self { digest: Some(digest.into()), ..Self::default() }
    }

    #[must_use]
    pub fn by_user(user_id: Uuid) -> Self {
        Self { user_id: Some(user_id), ..Self::default() }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: TokenKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub const fn is_unscoped(&self) -> bool {
        self.digest.is_none() && self.user_id.is_none()
    }

    #[must_use]
    pub fn matches(&self, token: &AuthToken) -> bool {
        if self.is_unscoped() {
            return false;
        }
        self.digest.as_deref().is_none_or(|d| d == token.secret_digest)
            && self.user_id.is_none_or(|u| u == token.user_id)
            && self.kind.is_none_or(|k| k == token.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(user_id: Uuid, kind: TokenKind, digest: &str) -> AuthToken {
        let now = OffsetDateTime::now_utc();
        AuthToken {
            id: Uuid::now_v7(),
            user_id,
            kind,
            secret_digest: digest.to_string(),
            expires_at: now + time::Duration::hours(1),
            user_agent: None,
            ip_address: None,
            created_at: now,
        }
    }

    #[test]
    fn test_filter_and_semantics() {
        let user = Uuid::new_v4();
        let refresh = token(user, TokenKind::Refresh, "aaa");
        let reset = token(user, TokenKind::ResetPassword, "bbb");

        let filter = TokenFilter::by_user(user).with_kind(TokenKind::Refresh);
        assert!(filter.matches(&refresh));
        assert!(!filter.matches(&reset));

        let filter = TokenFilter::by_digest("aaa").with_kind(TokenKind::ResetPassword);
        assert!(!filter.matches(&refresh));

        let filter = TokenFilter::by_digest("bbb");
        assert!(filter.matches(&reset));
    }

    #[test]
    fn test_unscoped_filter_matches_nothing() {
        let refresh = token(Uuid::new_v4(), TokenKind::Refresh, "aaa");
        let filter = TokenFilter::default().with_kind(TokenKind::Refresh);

        assert!(filter.is_unscoped());
        assert!(!filter.matches(&refresh));
    }

    #[test]
    fn test_expiry_boundary_is_dead() {
        let mut t = token(Uuid::new_v4(), TokenKind::Refresh, "aaa");
        let now = OffsetDateTime::now_utc();
        t.expires_at = now;

        assert!(t.is_expired_at(now));
        assert!(!t.is_expired_at(now - time::Duration::seconds(1)));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TokenKind::Refresh.to_string(), "REFRESH");
        assert_eq!(TokenKind::ResetPassword.to_string(), "RESET_PASSWORD");
    }
}
