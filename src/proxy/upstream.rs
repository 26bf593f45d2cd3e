//! Upstream module for the proxy.
//!
//! Builds the Pingora peer for the origin and rewrites the outbound request
//! so it targets the origin instead of the proxy.

use pingora_core::upstreams::peer::HttpPeer;
use pingora_http::RequestHeader;
use std::time::Duration;

use crate::config::Origin;
use crate::error::ProxyError;

/// Resolve the origin and build a peer with the configured timeouts
///
/// Resolution happens here so a lookup failure surfaces as a 502 instead of
/// a panic inside the peer constructor.
pub async fn build_peer(origin: &Origin, timeout: Duration) -> Result<Box<HttpPeer>, ProxyError> {
    let addr = tokio::net::lookup_host((origin.host(), origin.port()))
        .await
        .map_err(|e| ProxyError::Upstream(format!("{}: {}", origin.host(), e)))?
        .next()
        .ok_or_else(|| {
            ProxyError::Upstream(format!("{}: no addresses resolved", origin.host()))
        })?;

    let mut peer = Box::new(HttpPeer::new(addr, origin.tls(), origin.host().to_string()));
    peer.options.connection_timeout = Some(timeout);
    peer.options.read_timeout = Some(timeout);
    peer.options.write_timeout = Some(timeout);

    tracing::debug!(
        origin = %origin,
        address = %addr,
        timeout_seconds = timeout.as_secs(),
        "Configured origin peer"
    );

    Ok(peer)
}

/// Point the outbound request at the origin
///
/// Method, remaining headers and body pass through untouched.
pub fn rewrite_request(request: &mut RequestHeader, origin: &Origin) -> Result<(), ProxyError> {
    let target = origin.upstream_path(request.uri.path(), request.uri.query());
    let uri = target
        .parse::<http::Uri>()
        .map_err(|e| ProxyError::Internal(format!("invalid upstream uri '{}': {}", target, e)))?;
    request.set_uri(uri);

    request
        .insert_header("Host", origin.host_header())
        .map_err(|e| ProxyError::Internal(format!("invalid host header: {}", e)))?;

    Ok(())
}
