//! Refresh token transport via an `HttpOnly` cookie.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

pub const REFRESH_COOKIE_NAME: &str = "taskboard_refresh_token";

/// Scoped to the session endpoints; the cookie is never sent anywhere else.
const REFRESH_COOKIE_PATH: &str = "/v1/sessions";

#[derive(Clone, Copy, Debug)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookieSettings {
    /// Build the cookie carrying a freshly issued refresh token.
    ///
    /// # Errors
    /// Fails if the token contains bytes that are not valid in a header.
    pub fn refresh_cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{REFRESH_COOKIE_NAME}={token}; Path={REFRESH_COOKIE_PATH}; HttpOnly; SameSite=Strict; Max-Age={}",
            self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// Build the cookie that tells the browser to drop the refresh token.
    ///
    /// # Errors
    /// Never in practice; the value is a constant.
    pub fn cleared_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie =
            format!("{REFRESH_COOKIE_NAME}=; Path={REFRESH_COOKIE_PATH}; HttpOnly; SameSite=Strict; Max-Age=0");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Returns the refresh token from the request cookies, ignoring an empty value.
#[must_use]
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == REFRESH_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: CookieSettings = CookieSettings { secure: true, max_age_secs: 2_592_000 };

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = SETTINGS.refresh_cookie("abc").unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("taskboard_refresh_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let insecure = CookieSettings { secure: false, ..SETTINGS };
        let cookie = insecure.cleared_cookie().unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("taskboard_refresh_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_read_refresh_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; taskboard_refresh_token=tok-123 ; other=1"));
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("tok-123"));

        headers.insert(COOKIE, HeaderValue::from_static("taskboard_refresh_token="));
        assert_eq!(read_refresh_cookie(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(read_refresh_cookie(&headers), None);
    }

    #[test]
    fn test_read_refresh_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("taskboard_refresh_token=second"));
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("second"));
    }
}
