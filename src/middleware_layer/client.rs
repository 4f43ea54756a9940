use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header::USER_AGENT, request::Parts},
};

use crate::models::session::ClientInfo;

/// Extracts the client IP address.
///
/// Prefers the first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer.
///
/// # Returns
///
/// The IP address as a string, or "unknown" if not found.
fn extract_real_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|ci| ci.0.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let device_info = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let ip_address = extract_real_ip(
            &parts.headers,
            parts.extensions.get::<ConnectInfo<SocketAddr>>(),
        );

        Ok(ClientInfo {
            device_info,
            ip_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_real_ip(&headers, None), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_peer_then_unknown() {
        let peer = ConnectInfo("192.0.2.1:5555".parse::<SocketAddr>().unwrap());
        assert_eq!(extract_real_ip(&HeaderMap::new(), Some(&peer)), "192.0.2.1");
        assert_eq!(extract_real_ip(&HeaderMap::new(), None), "unknown");
    }
}
