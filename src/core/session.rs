/// Credentials handed to a client when a session is created or rotated.
///
/// `refresh_token` is the raw secret; it is returned exactly once and only its digest is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}
