use crate::core::auth_token::{AuthToken, TokenKind};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct AuthTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub secret_digest: String,
    pub expires_at: OffsetDateTime,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<AuthTokenRecord> for AuthToken {
    fn from(record: AuthTokenRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            kind: record.kind,
            secret_digest: record.secret_digest,
            expires_at: record.expires_at,
            user_agent: record.user_agent,
            // Audit-only column; an unparsable value is dropped rather than failing the read.
            ip_address: record.ip_address.and_then(|ip| ip.parse().ok()),
            created_at: record.created_at,
        }
    }
}
