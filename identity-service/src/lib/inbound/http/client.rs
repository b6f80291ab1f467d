use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::ConnectInfo;
use axum::extract::FromRequestParts;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::domain::authentication::models::ClientContext;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Caller IP and user agent, for the audit log and token records.
///
/// The IP is the first `X-Forwarded-For` entry, then the peer address,
/// then `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo(pub ClientContext);

impl ClientInfo {
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip_address = forwarded
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Self(ClientContext::new(ip_address, user_agent))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self::from_parts(&parts.headers, peer))
    }
}

impl From<ClientInfo> for ClientContext {
    fn from(info: ClientInfo) -> Self {
        info.0
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_first_forwarded_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static("198.51.100.4, 10.0.0.1"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        let ClientInfo(client) = ClientInfo::from_parts(&headers, Some(peer));

        assert_eq!(client.ip_address, "198.51.100.4");
        assert_eq!(client.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let peer: SocketAddr = "192.0.2.9:443".parse().unwrap();

        assert_eq!(
            ClientInfo::from_parts(&HeaderMap::new(), Some(peer)).0.ip_address,
            "192.0.2.9"
        );
        assert_eq!(
            ClientInfo::from_parts(&HeaderMap::new(), None).0.ip_address,
            "unknown"
        );
    }
}
