use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct OpaqueToken;

impl OpaqueToken {
    /// Generates a cryptographically secure random string (32 bytes -> Base64).
    #[must_use]
    pub fn generate() -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Hashes a token using SHA-256. Only this value is ever persisted.
    #[must_use]
    pub fn digest(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_token_generation() {
        let token1 = OpaqueToken::generate();
        let token2 = OpaqueToken::generate();

        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 43); // 32 bytes Base64 no pad
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_opaque_token_digest() {
        let token = "my_token";
        let hash1 = OpaqueToken::digest(token);
        let hash2 = OpaqueToken::digest(token);

        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, OpaqueToken::digest("my_token2"));
    }

    #[test]
    fn test_digest_known_vector() {
        assert_eq!(
            OpaqueToken::digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
