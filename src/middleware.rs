//! Request logging run before every handler.

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// First `X-Forwarded-For` entry, else the peer address.
pub fn client_address(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn log_request(request: Request, next: Next) -> Response {
    let ip = client_address(&request);
    tracing::info!("{} trying to access {}", ip, request.uri());
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn forwarded_header_wins() {
        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "10.0.0.7, 192.168.1.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_address(&req), "10.0.0.7");
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_address(&req), "unknown");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_address(&req), "127.0.0.1");
    }
}
