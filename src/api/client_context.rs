use crate::api::AppState;
use crate::core::auth_token::RequestContext;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use ipnetwork::IpNetwork;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

const MAX_USER_AGENT_LEN: usize = 512;

/// Resolves the real client address behind the configured reverse proxies.
#[derive(Clone, Debug)]
pub struct ClientIpResolver {
    trusted_proxies: Vec<IpNetwork>,
}

impl ClientIpResolver {
    #[must_use]
    pub const fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { trusted_proxies }
    }

    /// Walks `X-Forwarded-For` from the right and returns the first hop that is not a trusted
    /// proxy. The header is ignored entirely unless the peer itself is trusted.
    #[must_use]
    pub fn resolve(&self, headers: &HeaderMap, peer_addr: IpAddr) -> IpAddr {
        if !self.is_trusted(&peer_addr) {
            return peer_addr;
        }

        let xff = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());

        if let Some(xff_val) = xff
            && let Some(real_ip) =
                xff_val.rsplit(',').filter_map(|s| s.trim().parse::<IpAddr>().ok()).find(|ip| !self.is_trusted(ip))
        {
            return real_ip;
        }

        peer_addr
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(*ip))
    }
}

/// Request metadata recorded next to every issued token.
#[derive(Clone, Debug, Default)]
pub struct ClientContext(pub RequestContext);

impl FromRequestParts<AppState> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect::<String>())
            .filter(|ua| !ua.is_empty());

        let ip_address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| state.client_ip.resolve(&parts.headers, addr.ip()));

        Ok(Self(RequestContext::new(user_agent, ip_address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn resolver() -> ClientIpResolver {
        ClientIpResolver::new(vec!["10.0.0.0/8".parse().unwrap(), "127.0.0.1/32".parse().unwrap()])
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7"));
        let peer: IpAddr = "203.0.113.1".parse().unwrap();

        assert_eq!(resolver().resolve(&headers, peer), peer);
    }

    #[test]
    fn test_trusted_peer_uses_rightmost_untrusted_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1, 198.51.100.7, 10.0.0.5"));
        let peer: IpAddr = "10.0.0.2".parse().unwrap();

        assert_eq!(resolver().resolve(&headers, peer), "198.51.100.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trusted_peer_without_header_falls_back_to_peer() {
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(resolver().resolve(&HeaderMap::new(), peer), peer);
    }
}
